//! Paired load backend
//!
//! Each virtual user requests the treatment and then the baseline back to
//! back, so every iteration yields one directly comparable pair of
//! time-to-first-byte measurements. Besides the usual averages this tracks
//! how much slower the treatment answered, and how often it was not slower
//! at all.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, trace};

use super::compare::Verdict;
use super::metrics::{LatencyStats, LoadSample};
use super::LoadSettings;
use crate::http::HttpClient;

/// Virtual users and the waiting-time limits checked after a paired run
///
/// Limits are exclusive: a p95 of exactly `treatment_p95_ms` fails.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairedSettings {
    pub virtual_users: u32,
    pub treatment_p95_ms: f64,
    pub treatment_median_ms: f64,
    pub baseline_p95_ms: f64,
    pub baseline_median_ms: f64,
}

impl Default for PairedSettings {
    fn default() -> Self {
        // Sized for an empty route with a 1ms simulated delay
        Self {
            virtual_users: 4,
            treatment_p95_ms: 4.0,
            treatment_median_ms: 3.0,
            baseline_p95_ms: 3.0,
            baseline_median_ms: 2.0,
        }
    }
}

impl PairedSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.virtual_users == 0 {
            anyhow::bail!("paired.virtual_users must be at least 1");
        }
        let limits = [
            self.treatment_p95_ms,
            self.treatment_median_ms,
            self.baseline_p95_ms,
            self.baseline_median_ms,
        ];
        if limits.iter().any(|limit| *limit <= 0.0) {
            anyhow::bail!("paired waiting-time limits must be positive");
        }
        Ok(())
    }
}

/// Result of a paired run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PairedStats {
    pub iterations: u64,
    pub treatment_failed: u64,
    pub baseline_failed: u64,
    pub duration_secs: f64,
    /// Waiting time of successful treatment requests
    pub treatment: LatencyStats,
    /// Waiting time of successful baseline requests
    pub baseline: LatencyStats,
    /// Extra waiting time, over iterations where the treatment was slower
    pub delta: LatencyStats,
    /// `delta` as a percentage of the baseline waiting time
    pub overhead_pct: LatencyStats,
    /// Iterations where the treatment was no slower than the baseline
    pub treatment_fastest: u64,
    /// By how much, over those iterations
    pub treatment_fastest_by: LatencyStats,
}

impl PairedStats {
    pub fn failed_requests(&self) -> u64 {
        self.treatment_failed + self.baseline_failed
    }

    /// Per-side samples for the throughput and latency-delta checks
    pub fn samples(&self) -> (LoadSample, LoadSample) {
        let rps = |count: usize| {
            if self.duration_secs > 0.0 {
                count as f64 / self.duration_secs
            } else {
                0.0
            }
        };
        (
            LoadSample::new(rps(self.treatment.count), self.treatment.mean),
            LoadSample::new(rps(self.baseline.count), self.baseline.mean),
        )
    }

    /// First waiting-time limit this run did not stay under
    pub fn check(&self, settings: &PairedSettings) -> Option<Verdict> {
        let checks = [
            ("treatment", "p95", self.treatment.percentiles.p95, settings.treatment_p95_ms),
            ("treatment", "median", self.treatment.percentiles.p50, settings.treatment_median_ms),
            ("baseline", "p95", self.baseline.percentiles.p95, settings.baseline_p95_ms),
            ("baseline", "median", self.baseline.percentiles.p50, settings.baseline_median_ms),
        ];

        checks
            .into_iter()
            .find(|(_, _, value, limit)| value >= limit)
            .map(|(variant, stat, value_ms, limit_ms)| Verdict::PercentileExceeded {
                variant: variant.to_string(),
                stat: stat.to_string(),
                value_ms,
                limit_ms,
            })
    }

    pub fn format_summary(&self, treatment_url: &str, baseline_url: &str) -> String {
        let mut output = format!(
            "{} paired iterations in {:.1}s\n",
            self.iterations, self.duration_secs
        );
        for (name, url, stats, failed) in [
            ("treatment", treatment_url, &self.treatment, self.treatment_failed),
            ("baseline", baseline_url, &self.baseline, self.baseline_failed),
        ] {
            output.push_str(&format!(
                "  {name:<9} {url}\n    waiting avg={:.2}ms med={:.2}ms p95={:.2}ms max={:.2}ms, {failed} failed\n",
                stats.mean, stats.percentiles.p50, stats.percentiles.p95, stats.max
            ));
        }
        output.push_str(&format!(
            "  delta     avg={:.2}ms p95={:.2}ms, overhead avg={:.1}%\n",
            self.delta.mean, self.delta.percentiles.p95, self.overhead_pct.mean
        ));
        output.push_str(&format!(
            "  treatment fastest in {} iterations (by avg {:.2}ms)",
            self.treatment_fastest, self.treatment_fastest_by.mean
        ));
        output
    }
}

/// Accumulates iterations during a paired run
#[derive(Default)]
struct PairedCollector {
    treatment: Vec<f64>,
    baseline: Vec<f64>,
    delta: Vec<f64>,
    overhead: Vec<f64>,
    fastest_by: Vec<f64>,
    iterations: u64,
    treatment_failed: u64,
    baseline_failed: u64,
}

impl PairedCollector {
    /// `None` marks a failed request
    fn record(&mut self, treatment: Option<f64>, baseline: Option<f64>) {
        self.iterations += 1;
        match (treatment, baseline) {
            (Some(t), Some(b)) => {
                self.treatment.push(t);
                self.baseline.push(b);
                if t > b {
                    self.delta.push(t - b);
                    if b > 0.0 {
                        self.overhead.push(100.0 * (t - b) / b);
                    }
                } else {
                    self.fastest_by.push(b - t);
                }
            }
            (t, b) => {
                match t {
                    Some(t) => self.treatment.push(t),
                    None => self.treatment_failed += 1,
                }
                match b {
                    Some(b) => self.baseline.push(b),
                    None => self.baseline_failed += 1,
                }
            }
        }
    }

    fn finish(&self, duration: Duration) -> PairedStats {
        PairedStats {
            iterations: self.iterations,
            treatment_failed: self.treatment_failed,
            baseline_failed: self.baseline_failed,
            duration_secs: duration.as_secs_f64(),
            treatment: LatencyStats::from_samples(&self.treatment),
            baseline: LatencyStats::from_samples(&self.baseline),
            delta: LatencyStats::from_samples(&self.delta),
            overhead_pct: LatencyStats::from_samples(&self.overhead),
            treatment_fastest: self.fastest_by.len() as u64,
            treatment_fastest_by: LatencyStats::from_samples(&self.fastest_by),
        }
    }
}

/// Waiting time of one GET, or `None` when it failed
async fn waiting_ms(client: &HttpClient, url: &str) -> Option<f64> {
    match client.get(url).await {
        Ok(resp) if (200..400).contains(&resp.status_code) => Some(resp.waiting_ms),
        Ok(resp) => {
            trace!("{} answered {}", url, resp.status_code);
            None
        }
        Err(e) => {
            trace!("{} failed: {}", url, e);
            None
        }
    }
}

/// Drives paired load against a treatment and a baseline URL
pub struct PairedRunner {
    settings: LoadSettings,
    client: HttpClient,
}

impl PairedRunner {
    pub fn new(settings: LoadSettings, client: HttpClient) -> Self {
        Self { settings, client }
    }

    pub async fn run(&self, treatment_url: &str, baseline_url: &str) -> PairedStats {
        let duration = Duration::from_secs(self.settings.duration_secs);
        let users = self.settings.paired.virtual_users.max(1);
        info!(
            "Paired load: {} virtual users for {}s against {} and {}",
            users, self.settings.duration_secs, treatment_url, baseline_url
        );

        let collector = Arc::new(Mutex::new(PairedCollector::default()));
        let start = Instant::now();

        let workers: Vec<_> = (0..users)
            .map(|_| {
                let client = self.client.clone();
                let collector = collector.clone();
                let treatment_url = treatment_url.to_string();
                let baseline_url = baseline_url.to_string();

                tokio::spawn(async move {
                    while start.elapsed() < duration {
                        let treatment = waiting_ms(&client, &treatment_url).await;
                        let baseline = waiting_ms(&client, &baseline_url).await;
                        collector.lock().await.record(treatment, baseline);
                    }
                })
            })
            .collect();

        let progress_collector = collector.clone();
        let progress = tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(5)).await;
                let coll = progress_collector.lock().await;
                debug!(
                    "Progress: {:.0}s elapsed, {} iterations",
                    start.elapsed().as_secs_f64(),
                    coll.iterations
                );
            }
        });

        join_all(workers).await;
        progress.abort();

        let stats = collector.lock().await.finish(start.elapsed());
        info!(
            "Paired load complete: {} iterations, {} failed requests, treatment fastest {} times",
            stats.iterations,
            stats.failed_requests(),
            stats.treatment_fastest
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_url, spawn_server};

    fn collector_with(pairs: &[(f64, f64)]) -> PairedCollector {
        let mut collector = PairedCollector::default();
        for (t, b) in pairs {
            collector.record(Some(*t), Some(*b));
        }
        collector
    }

    #[test]
    fn test_record_splits_slower_and_faster_iterations() {
        let collector = collector_with(&[(3.0, 2.0), (2.0, 2.0), (1.5, 2.0)]);
        let stats = collector.finish(Duration::from_secs(1));

        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.delta.count, 1);
        assert_eq!(stats.delta.mean, 1.0);
        assert_eq!(stats.overhead_pct.mean, 50.0);
        // A tie counts for the treatment
        assert_eq!(stats.treatment_fastest, 2);
        assert_eq!(stats.treatment_fastest_by.mean, 0.25);
        assert_eq!(stats.failed_requests(), 0);
    }

    #[test]
    fn test_failed_requests_counted_per_side() {
        let mut collector = PairedCollector::default();
        collector.record(None, Some(2.0));
        collector.record(Some(3.0), None);
        collector.record(None, None);

        let stats = collector.finish(Duration::from_secs(1));
        assert_eq!(stats.treatment_failed, 2);
        assert_eq!(stats.baseline_failed, 2);
        assert_eq!(stats.treatment.count, 1);
        assert_eq!(stats.baseline.count, 1);
        assert_eq!(stats.delta.count, 0);
    }

    #[test]
    fn test_samples() {
        let stats = collector_with(&[(3.0, 2.0), (5.0, 2.0)]).finish(Duration::from_secs(2));
        let (treatment, baseline) = stats.samples();
        assert_eq!(treatment, LoadSample::new(1.0, 4.0));
        assert_eq!(baseline, LoadSample::new(1.0, 2.0));
    }

    #[test]
    fn test_check_limits_are_exclusive() {
        let settings = PairedSettings::default();

        let fast = collector_with(&[(1.5, 1.2); 20]).finish(Duration::from_secs(1));
        assert_eq!(fast.check(&settings), None);

        // Every baseline waiting time sits exactly on the 2ms median limit
        let on_limit = collector_with(&[(1.5, 2.0); 20]).finish(Duration::from_secs(1));
        assert_eq!(
            on_limit.check(&settings),
            Some(Verdict::PercentileExceeded {
                variant: "baseline".to_string(),
                stat: "median".to_string(),
                value_ms: 2.0,
                limit_ms: 2.0,
            })
        );
    }

    #[test]
    fn test_check_treatment_p95_first() {
        let mut pairs = vec![(1.0, 1.0); 18];
        pairs.extend([(50.0, 1.0), (50.0, 1.0)]);
        let stats = collector_with(&pairs).finish(Duration::from_secs(1));

        match stats.check(&PairedSettings::default()) {
            Some(Verdict::PercentileExceeded { variant, stat, .. }) => {
                assert_eq!(variant, "treatment");
                assert_eq!(stat, "p95");
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_settings_validate() {
        assert!(PairedSettings::default().validate().is_ok());

        let no_users = PairedSettings {
            virtual_users: 0,
            ..Default::default()
        };
        assert!(no_users.validate().is_err());

        let zero_limit = PairedSettings {
            baseline_median_ms: 0.0,
            ..Default::default()
        };
        assert!(zero_limit.validate().is_err());
    }

    #[tokio::test]
    async fn test_paired_run_against_local_servers() {
        let treatment = spawn_server(200).await;
        let baseline = spawn_server(200).await;
        let settings = LoadSettings {
            duration_secs: 1,
            paired: PairedSettings {
                virtual_users: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let runner = PairedRunner::new(settings, HttpClient::with_timeout(5).unwrap());

        let stats = runner.run(&treatment, &baseline).await;
        assert!(stats.iterations > 0);
        assert_eq!(stats.failed_requests(), 0);
        assert_eq!(stats.treatment.count as u64, stats.iterations);
        assert_eq!(
            stats.delta.count as u64 + stats.treatment_fastest,
            stats.iterations
        );
    }

    #[tokio::test]
    async fn test_paired_run_counts_dead_treatment() {
        let treatment = closed_url().await;
        let baseline = spawn_server(200).await;
        let settings = LoadSettings {
            duration_secs: 1,
            paired: PairedSettings {
                virtual_users: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let runner = PairedRunner::new(settings, HttpClient::with_timeout(5).unwrap());

        let stats = runner.run(&treatment, &baseline).await;
        assert!(stats.treatment_failed > 0);
        assert_eq!(stats.treatment.count, 0);
        assert_eq!(stats.baseline_failed, 0);
    }
}
