//! Default benchmark scenario
//!
//! An empty route with a 1ms simulated delay, served with the runtime
//! protection layer on port 3001 and without it on port 3002.

use crate::benchmark::{BenchmarkDriver, BenchmarkError, BenchmarkRequest, Comparison};

/// Application with the protection layer
pub const TREATMENT_URL: &str = "http://localhost:3001/benchmark";
/// Application without the protection layer
pub const BASELINE_URL: &str = "http://localhost:3002/benchmark";
pub const LABEL: &str = "An empty route (1ms simulated delay)";
pub const PERCENTAGE_LIMIT: f64 = 15.0;
pub const MS_LIMIT: f64 = 200.0;

pub fn empty_route() -> BenchmarkRequest {
    BenchmarkRequest::new(TREATMENT_URL, BASELINE_URL, LABEL, PERCENTAGE_LIMIT, MS_LIMIT)
}

/// Hand the default scenario to the driver once; errors pass through untouched
pub async fn run<D: BenchmarkDriver>(driver: &D) -> Result<Comparison, BenchmarkError> {
    driver.run_benchmark(&empty_route()).await
}
