//! Configuration module
//!
//! Settings come from defaults, then a config file, then `OVERHEAD_BENCH_*`
//! environment variables; command-line flags are applied last by the caller.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::benchmark::LoadSettings;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Load generation settings
    pub load: LoadSettings,

    /// Report format (text, json, json-pretty, markdown, csv)
    pub format: String,

    /// Debug-level logging
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            load: LoadSettings::default(),
            format: "text".to_string(),
            verbose: false,
        }
    }
}

/// Resolve the effective config file and apply environment overrides
///
/// An explicit path must exist. Without one, `OVERHEAD_BENCH_CONFIG` and
/// then the standard locations are tried; finding nothing is not an error.
pub fn resolve(explicit: Option<&Path>, env: &EnvConfig) -> Result<ConfigFile> {
    let mut file = match explicit {
        Some(path) => ConfigFile::load(path)?,
        None => match &env.config_file {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::load_default()?,
        },
    };

    env.apply(&mut file.app);
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::Backend;
    use crate::utils::LogLevel;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.format, "text");
        assert_eq!(config.load.threads, 12);
        assert_eq!(config.load.connections, 400);
        assert_eq!(config.load.duration_secs, 15);
        assert_eq!(config.load.backend, Backend::Wrk);
    }

    #[test]
    fn test_resolve_file_then_env() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.yaml");
        std::fs::write(
            &path,
            "version: \"1.0\"\napp:\n  load:\n    connections: 50\n    duration_secs: 5\n",
        )
        .unwrap();

        let env = EnvConfig {
            duration: Some(30),
            ..Default::default()
        };
        let file = resolve(Some(&path), &env).unwrap();

        assert_eq!(file.app.load.connections, 50);
        assert_eq!(file.app.load.duration_secs, 30);
        assert_eq!(file.app.load.threads, 12);
    }

    #[test]
    fn test_verbose_from_file_then_env() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.yaml");
        std::fs::write(&path, "app:\n  verbose: true\n").unwrap();

        let file = resolve(Some(&path), &EnvConfig::default()).unwrap();
        assert!(file.app.verbose);
        assert_eq!(LogLevel::resolve(None, file.app.verbose), LogLevel::Debug);

        let env = EnvConfig {
            verbose: Some(false),
            ..Default::default()
        };
        let file = resolve(Some(&path), &env).unwrap();
        assert_eq!(LogLevel::resolve(None, file.app.verbose), LogLevel::Info);
    }

    #[test]
    fn test_resolve_missing_explicit_path() {
        let env = EnvConfig::default();
        assert!(resolve(Some(Path::new("/nonexistent/bench.yaml")), &env).is_err());
    }
}
