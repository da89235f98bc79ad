//! Load metrics
//!
//! Latency and throughput statistics for one endpoint, plus the collector
//! the built-in load generator records into.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Throughput and average latency measured for one endpoint
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadSample {
    /// Requests per second over the whole run
    pub requests_per_sec: f64,
    /// Average latency in milliseconds
    pub latency_ms: f64,
}

impl LoadSample {
    pub fn new(requests_per_sec: f64, latency_ms: f64) -> Self {
        Self {
            requests_per_sec,
            latency_ms,
        }
    }
}

impl std::fmt::Display for LoadSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Requests/sec: {:?} | Latency in ms: {:?}",
            self.requests_per_sec, self.latency_ms
        )
    }
}

impl From<&LoadMetrics> for LoadSample {
    fn from(metrics: &LoadMetrics) -> Self {
        Self::new(metrics.throughput.rps, metrics.latency.mean)
    }
}

/// Latency percentiles in milliseconds
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Percentiles {
    /// Calculate percentiles from sorted latencies
    pub fn from_sorted(latencies: &[f64]) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }

        Self {
            p50: percentile(latencies, 50.0),
            p90: percentile(latencies, 90.0),
            p95: percentile(latencies, 95.0),
            p99: percentile(latencies, 99.0),
        }
    }
}

/// Linear interpolation between the two closest ranks
fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let idx = (p / 100.0) * (len - 1) as f64;
            let lower = idx.floor() as usize;
            let upper = (idx.ceil() as usize).min(len - 1);
            let fraction = idx - lower as f64;
            sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
        }
    }
}

/// Latency statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub percentiles: Percentiles,
    pub count: usize,
}

impl LatencyStats {
    /// Calculate statistics from latency samples (in milliseconds)
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;

        Self {
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            std_dev: variance.sqrt(),
            percentiles: Percentiles::from_sorted(&sorted),
            count,
        }
    }
}

/// Throughput statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ThroughputStats {
    /// Successful requests per second
    pub rps: f64,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub duration_secs: f64,
}

impl ThroughputStats {
    pub fn new(total: u64, failed: u64, duration: Duration) -> Self {
        let duration_secs = duration.as_secs_f64();
        let rps = if duration_secs > 0.0 {
            total.saturating_sub(failed) as f64 / duration_secs
        } else {
            0.0
        };

        Self {
            rps,
            total_requests: total,
            failed_requests: failed,
            duration_secs,
        }
    }
}

/// Failed requests by cause
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorStats {
    pub connection_errors: u64,
    pub timeout_errors: u64,
    /// Responses outside 2xx/3xx
    pub status_errors: u64,
}

impl ErrorStats {
    pub fn total(&self) -> u64 {
        self.connection_errors + self.timeout_errors + self.status_errors
    }
}

/// Everything measured for one endpoint by the built-in generator
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoadMetrics {
    pub latency: LatencyStats,
    pub throughput: ThroughputStats,
    pub errors: ErrorStats,
}

impl LoadMetrics {
    /// Render in the layout of wrk's summary so both backends print alike
    pub fn format_summary(&self, url: &str) -> String {
        format!(
            "Running {:.0}s test @ {url}\n  \
             Latency   {:.2}ms (stdev {:.2}ms, p50 {:.2}ms, p99 {:.2}ms, max {:.2}ms)\n  \
             {} requests, {} failed (connect {}, timeout {}, status {})\n\
             Requests/sec: {:.2}",
            self.throughput.duration_secs,
            self.latency.mean,
            self.latency.std_dev,
            self.latency.percentiles.p50,
            self.latency.percentiles.p99,
            self.latency.max,
            self.throughput.total_requests,
            self.throughput.failed_requests,
            self.errors.connection_errors,
            self.errors.timeout_errors,
            self.errors.status_errors,
            self.throughput.rps,
        )
    }
}

/// Outcome of a single request, as seen by a load worker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    Status(u16),
    Timeout,
    ConnectionError,
}

/// Accumulates per-request outcomes during a load run
///
/// Only 2xx/3xx responses contribute latency samples, like wrk, which keeps
/// socket errors and error statuses out of its latency distribution.
pub struct MetricsCollector {
    latencies: Vec<f64>,
    start_time: Instant,
    total: u64,
    failed: u64,
    errors: ErrorStats,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            latencies: Vec::new(),
            start_time: Instant::now(),
            total: 0,
            failed: 0,
            errors: ErrorStats::default(),
        }
    }

    /// Record one finished request
    pub fn record(&mut self, latency_ms: f64, outcome: RequestOutcome) {
        self.total += 1;
        match outcome {
            RequestOutcome::Status(code) if (200..400).contains(&code) => {
                self.latencies.push(latency_ms);
            }
            RequestOutcome::Status(_) => {
                self.failed += 1;
                self.errors.status_errors += 1;
            }
            RequestOutcome::Timeout => {
                self.failed += 1;
                self.errors.timeout_errors += 1;
            }
            RequestOutcome::ConnectionError => {
                self.failed += 1;
                self.errors.connection_errors += 1;
            }
        }
    }

    pub fn request_count(&self) -> u64 {
        self.total
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn current_rps(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.latencies.len() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Metrics over a fixed run duration
    pub fn finish(&self, duration: Duration) -> LoadMetrics {
        LoadMetrics {
            latency: LatencyStats::from_samples(&self.latencies),
            throughput: ThroughputStats::new(self.request_count(), self.failed, duration),
            errors: self.errors.clone(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
