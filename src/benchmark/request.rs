//! Benchmark request
//!
//! The parameters handed to a benchmark driver for one scenario.

use serde::{Deserialize, Serialize};

/// One treatment-vs-baseline benchmark scenario
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRequest {
    /// Endpoint of the instrumented application
    pub treatment_url: String,
    /// Endpoint of the unmodified application
    pub baseline_url: String,
    /// Free-text description of the scenario
    pub label: String,
    /// Maximum tolerated throughput decrease, in percent
    pub percentage_limit: f64,
    /// Maximum tolerated average latency increase, in milliseconds
    pub ms_limit: f64,
}

impl BenchmarkRequest {
    /// Create a request in call order: treatment first, baseline second
    pub fn new(
        treatment_url: impl Into<String>,
        baseline_url: impl Into<String>,
        label: impl Into<String>,
        percentage_limit: f64,
        ms_limit: f64,
    ) -> Self {
        Self {
            treatment_url: treatment_url.into(),
            baseline_url: baseline_url.into(),
            label: label.into(),
            percentage_limit,
            ms_limit,
        }
    }

    /// Reject requests the driver cannot act on
    pub fn validate(&self) -> anyhow::Result<()> {
        for url in [&self.treatment_url, &self.baseline_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("Invalid benchmark URL: {url}");
            }
        }
        if self.percentage_limit < 0.0 || self.ms_limit < 0.0 {
            anyhow::bail!(
                "Limits must be non-negative (percentage_limit={}, ms_limit={})",
                self.percentage_limit,
                self.ms_limit
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_call_order() {
        let req = BenchmarkRequest::new("http://a/x", "http://b/x", "label", 15.0, 200.0);
        assert_eq!(req.treatment_url, "http://a/x");
        assert_eq!(req.baseline_url, "http://b/x");
        assert_eq!(req.percentage_limit, 15.0);
        assert_eq!(req.ms_limit, 200.0);
    }

    #[test]
    fn test_validate() {
        let ok = BenchmarkRequest::new("http://a/x", "https://b/x", "label", 0.0, 0.0);
        assert!(ok.validate().is_ok());

        let bad_url = BenchmarkRequest::new("localhost:3001", "http://b/x", "label", 1.0, 1.0);
        assert!(bad_url.validate().is_err());

        let bad_limit = BenchmarkRequest::new("http://a/x", "http://b/x", "label", -1.0, 1.0);
        assert!(bad_limit.validate().is_err());
    }
}
