//! Benchmark driver
//!
//! `run_benchmark` warms up both endpoints, loads the treatment and then the
//! baseline (or both together with the paired backend), and checks the
//! comparison against the request's limits.

use std::future::Future;
use tracing::{info, warn};

use super::compare::Comparison;
use super::metrics::LoadSample;
use super::paired::PairedRunner;
use super::request::BenchmarkRequest;
use super::runner::{cold_start, LoadRunner};
use super::wrk::{extract_sample, WrkRunner};
use super::{Backend, BenchmarkError, LoadSettings};
use crate::http::HttpClient;
use crate::utils::Timer;

/// Anything that can run one treatment-vs-baseline benchmark
pub trait BenchmarkDriver {
    fn run_benchmark(
        &self,
        request: &BenchmarkRequest,
    ) -> impl Future<Output = Result<Comparison, BenchmarkError>>;
}

/// Driver that generates real HTTP load with the configured backend
pub struct LoadDriver {
    settings: LoadSettings,
    client: HttpClient,
}

impl LoadDriver {
    pub fn new(settings: LoadSettings) -> anyhow::Result<Self> {
        let client = HttpClient::with_timeout(settings.timeout_secs)?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    /// Load one endpoint, print the raw output under `heading`
    async fn measure(&self, url: &str, heading: &str) -> Result<LoadSample, BenchmarkError> {
        let timer = Timer::start(format!("{} load on {}", self.settings.backend.name(), url));

        let (raw, sample) = if self.settings.backend == Backend::Wrk {
            let runner =
                WrkRunner::new(self.settings.clone()).with_program(self.settings.wrk_path.clone());
            let output = runner.run(url).await?;
            let sample = extract_sample(url, &output);
            if !output.success {
                warn!("Error occurred running benchmark command: {}", output.stderr.trim());
            }
            (output.stdout, sample)
        } else {
            let runner = LoadRunner::new(self.settings.clone(), self.client.clone());
            let metrics = runner.run(url).await;
            let errors = &metrics.errors;
            // Any failed request fails the run, like a failed-request rate that must stay at 0
            let sample = if errors.total() > 0 {
                Err(BenchmarkError::LoadFailed {
                    url: url.to_string(),
                    reason: format!(
                        "{} of {} requests failed (connect {}, timeout {}, status {})",
                        errors.total(),
                        metrics.throughput.total_requests,
                        errors.connection_errors,
                        errors.timeout_errors,
                        errors.status_errors
                    ),
                })
            } else {
                Ok(LoadSample::from(&metrics))
            };
            (metrics.format_summary(url), sample)
        };
        timer.stop();

        print_output(heading, &raw);
        sample
    }

    /// Load both endpoints in lockstep and compare iteration by iteration
    async fn measure_paired(&self, request: &BenchmarkRequest) -> Result<Comparison, BenchmarkError> {
        let timer = Timer::start(format!(
            "paired load on {} and {}",
            request.treatment_url, request.baseline_url
        ));
        let runner = PairedRunner::new(self.settings.clone(), self.client.clone());
        let stats = runner
            .run(&request.treatment_url, &request.baseline_url)
            .await;
        timer.stop();

        print_output(
            "FIREWALL ENABLED VS DISABLED",
            &stats.format_summary(&request.treatment_url, &request.baseline_url),
        );

        for (url, failed, successful) in [
            (&request.treatment_url, stats.treatment_failed, stats.treatment.count),
            (&request.baseline_url, stats.baseline_failed, stats.baseline.count),
        ] {
            if failed > 0 {
                return Err(BenchmarkError::LoadFailed {
                    url: url.clone(),
                    reason: format!("{failed} of {} requests failed", failed + successful as u64),
                });
            }
        }

        let (treatment, baseline) = stats.samples();
        Ok(Comparison::new(request.clone(), treatment, baseline)
            .with_paired(stats, &self.settings.paired))
    }
}

fn print_output(heading: &str, raw: &str) {
    println!("================");
    println!("  OUTPUT {heading}:");
    println!("    {}", raw.trim_end().replace('\n', "\n    "));
    println!("================");
}

impl BenchmarkDriver for LoadDriver {
    async fn run_benchmark(&self, request: &BenchmarkRequest) -> Result<Comparison, BenchmarkError> {
        info!(
            "Benchmarking \"{}\" ({} backend): treatment {} vs baseline {}",
            request.label,
            self.settings.backend.name(),
            request.treatment_url,
            request.baseline_url
        );

        let count = self.settings.cold_start_requests;
        cold_start(&self.client, &request.baseline_url, count).await?;
        cold_start(&self.client, &request.treatment_url, count).await?;

        let comparison = if self.settings.backend == Backend::Paired {
            self.measure_paired(request).await?
        } else {
            let treatment = self
                .measure(&request.treatment_url, "FIREWALL ENABLED")
                .await?;
            let baseline = self
                .measure(&request.baseline_url, "FIREWALL DISABLED")
                .await?;
            Comparison::new(request.clone(), treatment, baseline)
        };
        for line in comparison.summary_lines() {
            println!("{line}");
        }

        if comparison.verdict.passed() {
            info!("\"{}\" within limits", request.label);
            Ok(comparison)
        } else {
            Err(BenchmarkError::ThresholdExceeded(Box::new(comparison)))
        }
    }
}
