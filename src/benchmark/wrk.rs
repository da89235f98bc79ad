//! wrk load backend
//!
//! Runs the external `wrk` tool against a URL and extracts requests/sec and
//! average latency from its summary.

use regex::Regex;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::debug;

use super::metrics::LoadSample;
use super::{BenchmarkError, LoadSettings};

/// Captured output of one wrk process
#[derive(Clone, Debug)]
pub struct WrkOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Invokes wrk with the configured thread/connection/duration settings
#[derive(Clone, Debug)]
pub struct WrkRunner {
    program: String,
    settings: LoadSettings,
}

impl WrkRunner {
    pub fn new(settings: LoadSettings) -> Self {
        Self {
            program: "wrk".to_string(),
            settings,
        }
    }

    /// Use a wrk binary other than the one on PATH
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to wrk for a URL
    pub fn args(&self, url: &str) -> Vec<String> {
        vec![
            "--threads".to_string(),
            self.settings.threads.to_string(),
            "--connections".to_string(),
            self.settings.connections.to_string(),
            "--duration".to_string(),
            format!("{}s", self.settings.duration_secs),
            url.to_string(),
        ]
    }

    /// Full command line, for logging
    pub fn command_line(&self, url: &str) -> String {
        format!("{} {}", self.program, self.args(url).join(" "))
    }

    /// Run wrk and wait for it to finish
    pub async fn run(&self, url: &str) -> Result<WrkOutput, BenchmarkError> {
        debug!("Executing: {}", self.command_line(url));

        let output = Command::new(&self.program)
            .args(self.args(url))
            .output()
            .await
            .map_err(|e| BenchmarkError::LoadFailed {
                url: url.to_string(),
                reason: format!("failed to start {}: {e}", self.program),
            })?;

        Ok(WrkOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }
}

fn requests_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Requests/sec:\s+([\d.]+)").expect("valid regex"))
}

fn latency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Latency\s+([\d.]+)(us|ms|s|m)\b").expect("valid regex"))
}

/// Requests/sec from a wrk summary
pub fn parse_requests_per_sec(out: &str) -> Option<f64> {
    requests_re()
        .captures(out)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Average latency from a wrk summary, in milliseconds
pub fn parse_latency_ms(out: &str) -> Option<f64> {
    let caps = latency_re().captures(out)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let factor = match caps.get(2)?.as_str() {
        "us" => 0.001,
        "ms" => 1.0,
        "s" => 1000.0,
        "m" => 60_000.0,
        _ => return None,
    };
    Some(value * factor)
}

/// Turn a finished wrk run into a sample, or the error that stopped it
pub fn extract_sample(url: &str, output: &WrkOutput) -> Result<LoadSample, BenchmarkError> {
    if !output.success {
        return Err(BenchmarkError::LoadFailed {
            url: url.to_string(),
            reason: output.stderr.trim().to_string(),
        });
    }

    let requests_per_sec =
        parse_requests_per_sec(&output.stdout).ok_or_else(|| BenchmarkError::Parse {
            url: url.to_string(),
            field: "Requests/sec",
        })?;
    let latency_ms = parse_latency_ms(&output.stdout).ok_or_else(|| BenchmarkError::Parse {
        url: url.to_string(),
        field: "Latency",
    })?;

    Ok(LoadSample::new(requests_per_sec, latency_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRK_MS: &str = "Running 15s test @ http://localhost:3001/benchmark
  12 threads and 400 connections
  Thread Stats   Avg      Stdev     Max   +/- Stdev
    Latency    21.53ms    4.21ms  98.12ms   88.01%
    Req/Sec     1.54k   210.33     2.10k    71.22%
  276541 requests in 15.03s, 58.12MB read
Requests/sec:  18399.27
Transfer/sec:      3.87MB
";

    fn output(stdout: &str) -> WrkOutput {
        WrkOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            success: true,
        }
    }

    #[test]
    fn test_args_match_defaults() {
        let runner = WrkRunner::new(LoadSettings::default());
        assert_eq!(
            runner.command_line("http://localhost:3001/benchmark"),
            "wrk --threads 12 --connections 400 --duration 15s http://localhost:3001/benchmark"
        );
    }

    #[test]
    fn test_parse_ms_summary() {
        let sample = extract_sample("u", &output(WRK_MS)).unwrap();
        assert_eq!(sample.requests_per_sec, 18399.27);
        assert_eq!(sample.latency_ms, 21.53);
    }

    #[test]
    fn test_parse_latency_units() {
        assert_eq!(parse_latency_ms("    Latency   1.50s   0.2s"), Some(1500.0));
        assert!((parse_latency_ms("    Latency 512.00us  10us").unwrap() - 0.512).abs() < 1e-9);
        assert_eq!(parse_latency_ms("    Latency   2.00m"), Some(120_000.0));
        assert_eq!(parse_latency_ms("no latency line"), None);
    }

    #[test]
    fn test_missing_requests_is_parse_error() {
        let err = extract_sample("http://x", &output("    Latency 1.00ms\n")).unwrap_err();
        assert!(matches!(
            err,
            BenchmarkError::Parse {
                field: "Requests/sec",
                ..
            }
        ));
    }

    #[test]
    fn test_failed_process_is_load_error() {
        let out = WrkOutput {
            stdout: String::new(),
            stderr: "unable to connect to localhost:3001 Connection refused\n".to_string(),
            success: false,
        };
        match extract_sample("http://localhost:3001", &out).unwrap_err() {
            BenchmarkError::LoadFailed { reason, .. } => {
                assert_eq!(reason, "unable to connect to localhost:3001 Connection refused")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_load_error() {
        let runner =
            WrkRunner::new(LoadSettings::default()).with_program("/nonexistent/wrk-binary");
        let err = runner.run("http://localhost:1").await.unwrap_err();
        assert!(matches!(err, BenchmarkError::LoadFailed { .. }));
    }
}
