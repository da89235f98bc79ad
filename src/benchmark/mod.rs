//! Benchmark module
//!
//! Loads a treatment and a baseline endpoint, compares the two and decides
//! whether the treatment stays inside its latency and throughput budget.

mod compare;
mod driver;
mod metrics;
mod paired;
mod report;
mod request;
mod runner;
mod wrk;

pub use compare::Comparison;
pub use driver::{BenchmarkDriver, LoadDriver};
pub use metrics::LoadSample;
pub use report::{ComparisonReport, ReportFormat};
pub use request::BenchmarkRequest;
pub use wrk::{extract_sample, WrkOutput};

use paired::PairedSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures that end a benchmark run
#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("Cold start against {url} failed: {reason}")]
    ColdStart { url: String, reason: String },

    #[error("Load run against {url} failed: {reason}")]
    LoadFailed { url: String, reason: String },

    #[error("Could not read {field} from load output for {url}")]
    Parse { url: String, field: &'static str },

    #[error("Benchmark failed: {}", .0.verdict)]
    ThresholdExceeded(Box<Comparison>),
}

impl BenchmarkError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchmarkError::ColdStart { .. } => 255,
            _ => 1,
        }
    }
}

/// Load generator used for a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// External `wrk` process
    #[default]
    Wrk,
    /// In-process reqwest workers
    Native,
    /// Treatment and baseline requested back to back by each virtual user
    Paired,
}

impl Backend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "wrk" => Some(Backend::Wrk),
            "native" | "builtin" => Some(Backend::Native),
            "paired" => Some(Backend::Paired),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Wrk => "wrk",
            Backend::Native => "native",
            Backend::Paired => "paired",
        }
    }
}

/// How hard and how long each endpoint is loaded
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSettings {
    pub backend: Backend,
    /// wrk `--threads`
    pub threads: u32,
    /// Open connections (wrk `--connections`, native worker count)
    pub connections: u32,
    pub duration_secs: u64,
    /// Per-request timeout for cold start and native load
    pub timeout_secs: u64,
    /// Sequential warm-up requests per endpoint
    pub cold_start_requests: u32,
    /// wrk executable
    pub wrk_path: String,
    /// Virtual users and waiting-time limits of the paired backend
    pub paired: PairedSettings,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Wrk,
            threads: 12,
            connections: 400,
            duration_secs: 15,
            timeout_secs: 30,
            cold_start_requests: 10,
            wrk_path: "wrk".to_string(),
            paired: PairedSettings::default(),
        }
    }
}

impl LoadSettings {
    /// Reject settings wrk or the native runner cannot use
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.connections == 0 || self.threads == 0 {
            anyhow::bail!("threads and connections must be at least 1");
        }
        if self.backend == Backend::Wrk && self.connections < self.threads {
            // wrk refuses fewer connections than threads
            anyhow::bail!(
                "connections ({}) must be >= threads ({})",
                self.connections,
                self.threads
            );
        }
        if self.duration_secs == 0 {
            anyhow::bail!("duration_secs must be at least 1");
        }
        if self.backend == Backend::Paired {
            self.paired.validate()?;
        }
        Ok(())
    }
}
