//! Treatment vs. baseline comparison
//!
//! Applies the latency and throughput tolerances of a request to the two
//! measured samples.

use serde::{Deserialize, Serialize};

use super::metrics::LoadSample;
use super::paired::{PairedSettings, PairedStats};
use super::request::BenchmarkRequest;

/// Outcome of checking a comparison against its limits
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    LatencyExceeded { delta_ms: f64, limit: f64 },
    ThroughputExceeded { decrease_pct: f64, limit: f64 },
    /// A paired-run waiting-time percentile reached its limit
    PercentileExceeded {
        variant: String,
        stat: String,
        value_ms: f64,
        limit_ms: f64,
    },
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "within limits"),
            Verdict::LatencyExceeded { delta_ms, limit } => {
                write!(f, "latency delta {delta_ms}ms exceeds limit of {limit}ms")
            }
            Verdict::ThroughputExceeded {
                decrease_pct,
                limit,
            } => write!(
                f,
                "throughput decrease {decrease_pct}% exceeds limit of {limit}%"
            ),
            Verdict::PercentileExceeded {
                variant,
                stat,
                value_ms,
                limit_ms,
            } => write!(
                f,
                "{variant} {stat} waiting time {value_ms:.2}ms is not under {limit_ms}ms"
            ),
        }
    }
}

/// Both samples of a scenario and what they add up to
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Comparison {
    pub request: BenchmarkRequest,
    pub treatment: LoadSample,
    pub baseline: LoadSample,
    /// Treatment latency minus baseline latency, two decimals
    pub delta_ms: f64,
    /// Throughput lost by the treatment, whole percent
    pub throughput_decrease_pct: f64,
    pub verdict: Verdict,
    /// Iteration-level statistics, present for paired runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired: Option<PairedStats>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl Comparison {
    pub fn new(request: BenchmarkRequest, treatment: LoadSample, baseline: LoadSample) -> Self {
        let delta_ms = latency_delta_ms(&treatment, &baseline);
        let throughput_decrease_pct = throughput_decrease_pct(&treatment, &baseline);

        // Latency is checked before throughput.
        let verdict = if delta_ms > request.ms_limit {
            Verdict::LatencyExceeded {
                delta_ms,
                limit: request.ms_limit,
            }
        } else if throughput_decrease_pct > request.percentage_limit {
            Verdict::ThroughputExceeded {
                decrease_pct: throughput_decrease_pct,
                limit: request.percentage_limit,
            }
        } else {
            Verdict::Pass
        };

        Self {
            request,
            treatment,
            baseline,
            delta_ms,
            throughput_decrease_pct,
            verdict,
            paired: None,
            finished_at: chrono::Utc::now(),
        }
    }

    /// Attach paired statistics; their limits are checked after latency and throughput
    pub fn with_paired(mut self, stats: PairedStats, settings: &PairedSettings) -> Self {
        if self.verdict.passed() {
            if let Some(verdict) = stats.check(settings) {
                self.verdict = verdict;
            }
        }
        self.paired = Some(stats);
        self
    }

    /// Summary lines printed after both load runs
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("[ZEN ENABLED ] {}", self.treatment),
            format!("[ZEN DISABLED] {}", self.baseline),
            format!(
                "-> Delta in ms: {:?}ms after running load test on {}",
                self.delta_ms, self.request.label
            ),
            format!(
                "-> {}% decrease in throughput after running load test on {}",
                self.throughput_decrease_pct as i64, self.request.label
            ),
        ]
    }
}

fn latency_delta_ms(treatment: &LoadSample, baseline: &LoadSample) -> f64 {
    round2(treatment.latency_ms - baseline.latency_ms)
}

/// Round half away from zero on the decimal value as written, so 1.005
/// becomes 1.01 even though its binary value is slightly below.
fn round2(x: f64) -> f64 {
    let s = 100.0;
    let mut f = (x * s).round();
    if x > 0.0 && (f + 0.5) / s <= x {
        f += 1.0;
    } else if x < 0.0 && (f - 0.5) / s >= x {
        f -= 1.0;
    }
    f / s
}

/// A zero baseline leaves nothing to compare against and counts as no decrease.
fn throughput_decrease_pct(treatment: &LoadSample, baseline: &LoadSample) -> f64 {
    if baseline.requests_per_sec <= 0.0 {
        return 0.0;
    }
    ((baseline.requests_per_sec - treatment.requests_per_sec) / baseline.requests_per_sec * 100.0)
        .round()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BenchmarkRequest {
        BenchmarkRequest::new("http://t", "http://b", "route", 15.0, 200.0)
    }

    #[test]
    fn test_pass_within_limits() {
        let cmp = Comparison::new(
            request(),
            LoadSample::new(9000.0, 25.126),
            LoadSample::new(10000.0, 20.0),
        );
        assert_eq!(cmp.delta_ms, 5.13);
        assert_eq!(cmp.throughput_decrease_pct, 10.0);
        assert_eq!(cmp.verdict, Verdict::Pass);
    }

    #[test]
    fn test_limits_are_strict() {
        let cmp = Comparison::new(
            request(),
            LoadSample::new(8500.0, 220.0),
            LoadSample::new(10000.0, 20.0),
        );
        assert_eq!(cmp.delta_ms, 200.0);
        assert_eq!(cmp.throughput_decrease_pct, 15.0);
        assert!(cmp.verdict.passed());
    }

    #[test]
    fn test_latency_checked_first() {
        let cmp = Comparison::new(
            request(),
            LoadSample::new(1000.0, 300.0),
            LoadSample::new(10000.0, 20.0),
        );
        assert_eq!(
            cmp.verdict,
            Verdict::LatencyExceeded {
                delta_ms: 280.0,
                limit: 200.0
            }
        );
    }

    #[test]
    fn test_throughput_exceeded() {
        let cmp = Comparison::new(
            request(),
            LoadSample::new(8440.0, 21.0),
            LoadSample::new(10000.0, 20.0),
        );
        // 15.6% rounds up to 16
        assert_eq!(cmp.throughput_decrease_pct, 16.0);
        assert!(matches!(cmp.verdict, Verdict::ThroughputExceeded { .. }));
    }

    #[test]
    fn test_faster_treatment_is_negative() {
        let cmp = Comparison::new(
            request(),
            LoadSample::new(11000.0, 18.0),
            LoadSample::new(10000.0, 20.0),
        );
        assert_eq!(cmp.delta_ms, -2.0);
        assert_eq!(cmp.throughput_decrease_pct, -10.0);
        assert!(cmp.verdict.passed());
    }

    #[test]
    fn test_zero_baseline_throughput() {
        let cmp = Comparison::new(
            request(),
            LoadSample::new(0.0, 1.0),
            LoadSample::new(0.0, 1.0),
        );
        assert_eq!(cmp.throughput_decrease_pct, 0.0);
    }

    #[test]
    fn test_summary_lines() {
        let cmp = Comparison::new(
            request(),
            LoadSample::new(9000.5, 25.5),
            LoadSample::new(10000.0, 20.0),
        );
        let lines = cmp.summary_lines();
        assert_eq!(lines[0], "[ZEN ENABLED ] Requests/sec: 9000.5 | Latency in ms: 25.5");
        assert_eq!(lines[1], "[ZEN DISABLED] Requests/sec: 10000.0 | Latency in ms: 20.0");
        assert_eq!(lines[2], "-> Delta in ms: 5.5ms after running load test on route");
        assert_eq!(
            lines[3],
            "-> 10% decrease in throughput after running load test on route"
        );
    }

    #[test]
    fn test_summary_lines_keep_float_notation() {
        let cmp = Comparison::new(
            request(),
            LoadSample::new(11000.0, 18.0),
            LoadSample::new(10000.0, 20.0),
        );
        let lines = cmp.summary_lines();
        assert_eq!(lines[2], "-> Delta in ms: -2.0ms after running load test on route");
        assert_eq!(
            lines[3],
            "-> -10% decrease in throughput after running load test on route"
        );
    }

    #[test]
    fn test_round2_half_up_on_decimal_boundary() {
        assert_eq!(round2(1.005), 1.01);
        assert_eq!(round2(-1.005), -1.01);
        assert_eq!(round2(2.5), 2.5);
        assert_eq!(round2(5.126000000000001), 5.13);
        assert_eq!(round2(1.004), 1.0);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_paired_limits_checked_last() {
        let mut stats = PairedStats::default();
        stats.baseline.percentiles.p50 = 2.5;

        let cmp = Comparison::new(
            request(),
            LoadSample::new(1000.0, 2.0),
            LoadSample::new(1000.0, 2.0),
        )
        .with_paired(stats.clone(), &PairedSettings::default());
        assert_eq!(
            cmp.verdict,
            Verdict::PercentileExceeded {
                variant: "baseline".to_string(),
                stat: "median".to_string(),
                value_ms: 2.5,
                limit_ms: 2.0,
            }
        );
        assert!(cmp.paired.is_some());

        let slow = Comparison::new(
            request(),
            LoadSample::new(1000.0, 300.0),
            LoadSample::new(1000.0, 2.0),
        )
        .with_paired(stats, &PairedSettings::default());
        assert!(matches!(slow.verdict, Verdict::LatencyExceeded { .. }));
    }
}
