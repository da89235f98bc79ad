//! Built-in load generator
//!
//! Cold start requests and a closed-loop load run over a pool of tokio
//! workers sharing one HTTP client.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, trace};

use super::metrics::{LoadMetrics, MetricsCollector, RequestOutcome};
use super::{BenchmarkError, LoadSettings};
use crate::http::{HttpClient, HttpError};

/// Send `count` sequential GETs and require each to succeed
pub async fn cold_start(client: &HttpClient, url: &str, count: u32) -> Result<(), BenchmarkError> {
    debug!("Cold start: {} requests to {}", count, url);

    for _ in 0..count {
        let response = client
            .get(url)
            .await
            .map_err(|e| BenchmarkError::ColdStart {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        trace!(
            "Cold start {} -> {} ({} bytes, {:.2}ms)",
            url,
            response.status_code,
            response.body.len(),
            response.duration_ms
        );
        if !response.is_success() {
            return Err(BenchmarkError::ColdStart {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status_code),
            });
        }
    }

    Ok(())
}

/// Drives load against one URL for a fixed duration
pub struct LoadRunner {
    settings: LoadSettings,
    client: HttpClient,
}

impl LoadRunner {
    pub fn new(settings: LoadSettings, client: HttpClient) -> Self {
        Self { settings, client }
    }

    /// Run `connections` workers back to back until the duration elapses
    pub async fn run(&self, url: &str) -> LoadMetrics {
        let duration = Duration::from_secs(self.settings.duration_secs);
        let connections = self.settings.connections.max(1);
        info!(
            "Native load: {} connections for {}s against {}",
            connections, self.settings.duration_secs, url
        );

        let collector = Arc::new(Mutex::new(MetricsCollector::new()));
        let start = Instant::now();

        let workers = (0..connections).map(|_| {
            let client = self.client.clone();
            let collector = collector.clone();
            let url = url.to_string();

            tokio::spawn(async move {
                while start.elapsed() < duration {
                    let request_start = Instant::now();
                    let outcome = match client.get(&url).await {
                        Ok(resp) => RequestOutcome::Status(resp.status_code),
                        Err(HttpError::Timeout(_)) => RequestOutcome::Timeout,
                        Err(_) => RequestOutcome::ConnectionError,
                    };
                    let latency_ms = request_start.elapsed().as_secs_f64() * 1000.0;

                    collector.lock().await.record(latency_ms, outcome);
                }
            })
        });
        let workers: Vec<_> = workers.collect();

        let progress_collector = collector.clone();
        let progress = tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(5)).await;
                let coll = progress_collector.lock().await;
                debug!(
                    "Progress: {:.0}s elapsed, {} requests, {:.1} RPS",
                    coll.elapsed().as_secs_f64(),
                    coll.request_count(),
                    coll.current_rps()
                );
            }
        });

        join_all(workers).await;
        progress.abort();

        let elapsed = start.elapsed();
        let metrics = collector.lock().await.finish(elapsed);
        info!(
            "Native load complete: {} requests ({} errors), {:.1} RPS, mean={:.2}ms",
            metrics.throughput.total_requests,
            metrics.errors.total(),
            metrics.throughput.rps,
            metrics.latency.mean
        );
        metrics
    }
}
