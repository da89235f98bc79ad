//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use super::AppConfig;
use crate::benchmark::Backend;

/// Environment variable prefix
const ENV_PREFIX: &str = "OVERHEAD_BENCH";

/// Overrides read from `OVERHEAD_BENCH_*` variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// OVERHEAD_BENCH_BACKEND
    pub backend: Option<String>,
    /// OVERHEAD_BENCH_THREADS
    pub threads: Option<u32>,
    /// OVERHEAD_BENCH_CONNECTIONS
    pub connections: Option<u32>,
    /// OVERHEAD_BENCH_DURATION
    pub duration: Option<u64>,
    /// OVERHEAD_BENCH_TIMEOUT
    pub timeout: Option<u64>,
    /// OVERHEAD_BENCH_COLD_START
    pub cold_start: Option<u32>,
    /// OVERHEAD_BENCH_VIRTUAL_USERS
    pub virtual_users: Option<u32>,
    /// OVERHEAD_BENCH_WRK_PATH
    pub wrk_path: Option<String>,
    /// OVERHEAD_BENCH_CONFIG
    pub config_file: Option<String>,
    /// OVERHEAD_BENCH_FORMAT
    pub format: Option<String>,
    /// OVERHEAD_BENCH_VERBOSE
    pub verbose: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            backend: get_env("BACKEND"),
            threads: get_env_parse("THREADS"),
            connections: get_env_parse("CONNECTIONS"),
            duration: get_env_parse("DURATION"),
            timeout: get_env_parse("TIMEOUT"),
            cold_start: get_env_parse("COLD_START"),
            virtual_users: get_env_parse("VIRTUAL_USERS"),
            wrk_path: get_env("WRK_PATH"),
            config_file: get_env("CONFIG"),
            format: get_env("FORMAT"),
            verbose: get_env_bool("VERBOSE"),
        }
    }

    /// Overwrite every field that has a variable set
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(backend) = self.backend.as_deref().and_then(Backend::from_str) {
            config.load.backend = backend;
        }
        if let Some(threads) = self.threads {
            config.load.threads = threads;
        }
        if let Some(connections) = self.connections {
            config.load.connections = connections;
        }
        if let Some(duration) = self.duration {
            config.load.duration_secs = duration;
        }
        if let Some(timeout) = self.timeout {
            config.load.timeout_secs = timeout;
        }
        if let Some(cold_start) = self.cold_start {
            config.load.cold_start_requests = cold_start;
        }
        if let Some(users) = self.virtual_users {
            config.load.paired.virtual_users = users;
        }
        if let Some(wrk_path) = &self.wrk_path {
            config.load.wrk_path = wrk_path.clone();
        }
        if let Some(format) = &self.format {
            config.format = format.clone();
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {ENV_PREFIX}_BACKEND:      {:?}", self.backend);
        println!("  {ENV_PREFIX}_THREADS:      {:?}", self.threads);
        println!("  {ENV_PREFIX}_CONNECTIONS:  {:?}", self.connections);
        println!("  {ENV_PREFIX}_DURATION:     {:?}", self.duration);
        println!("  {ENV_PREFIX}_TIMEOUT:      {:?}", self.timeout);
        println!("  {ENV_PREFIX}_COLD_START:   {:?}", self.cold_start);
        println!("  {ENV_PREFIX}_VIRTUAL_USERS: {:?}", self.virtual_users);
        println!("  {ENV_PREFIX}_WRK_PATH:     {:?}", self.wrk_path);
        println!("  {ENV_PREFIX}_CONFIG:       {:?}", self.config_file);
        println!("  {ENV_PREFIX}_FORMAT:       {:?}", self.format);
        println!("  {ENV_PREFIX}_VERBOSE:      {:?}", self.verbose);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| parse_bool(&v))
}

fn parse_bool(v: &str) -> bool {
    matches!(
        v.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

/// Print all OVERHEAD_BENCH environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_BACKEND       Load generator (wrk, native, paired)");
    println!("  {ENV_PREFIX}_THREADS       wrk threads");
    println!("  {ENV_PREFIX}_CONNECTIONS   Open connections per endpoint");
    println!("  {ENV_PREFIX}_DURATION      Load duration per endpoint in seconds");
    println!("  {ENV_PREFIX}_TIMEOUT       Request timeout in seconds");
    println!("  {ENV_PREFIX}_COLD_START    Warm-up requests per endpoint");
    println!("  {ENV_PREFIX}_VIRTUAL_USERS Virtual users of the paired backend");
    println!("  {ENV_PREFIX}_WRK_PATH      Path to the wrk executable");
    println!("  {ENV_PREFIX}_CONFIG        Path to configuration file");
    println!("  {ENV_PREFIX}_FORMAT        Report format (text, json, markdown, csv)");
    println!("  {ENV_PREFIX}_VERBOSE       Enable debug logging (true/false)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_BACKEND=native");
    println!("  export {ENV_PREFIX}_DURATION=30");
    println!("  overhead-bench run");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_env_changes_nothing() {
        let mut config = AppConfig::default();
        EnvConfig::default().apply(&mut config);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_apply_overrides() {
        let env = EnvConfig {
            backend: Some("native".to_string()),
            threads: Some(4),
            connections: Some(64),
            cold_start: Some(0),
            virtual_users: Some(6),
            format: Some("json".to_string()),
            verbose: Some(true),
            ..Default::default()
        };
        let mut config = AppConfig::default();
        env.apply(&mut config);

        assert_eq!(config.load.backend, Backend::Native);
        assert_eq!(config.load.threads, 4);
        assert_eq!(config.load.connections, 64);
        assert_eq!(config.load.cold_start_requests, 0);
        assert_eq!(config.load.paired.virtual_users, 6);
        assert_eq!(config.load.duration_secs, 15);
        assert_eq!(config.format, "json");
        assert!(config.verbose);
    }

    #[test]
    fn test_unknown_backend_ignored() {
        let env = EnvConfig {
            backend: Some("ab".to_string()),
            ..Default::default()
        };
        let mut config = AppConfig::default();
        env.apply(&mut config);
        assert_eq!(config.load.backend, Backend::Wrk);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool("enabled"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("off"));
    }
}
