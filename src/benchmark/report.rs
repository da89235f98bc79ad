//! Comparison report generation
//!
//! Renders a finished comparison in the requested output format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::compare::Comparison;

/// Report output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Plain text block
    Text,
    Json,
    JsonPretty,
    Markdown,
    Csv,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "table" => Some(Self::Text),
            "json" => Some(Self::Json),
            "json-pretty" => Some(Self::JsonPretty),
            "markdown" | "md" => Some(Self::Markdown),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Comparison report generator
pub struct ComparisonReport;

impl ComparisonReport {
    pub fn render(comparison: &Comparison, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(Self::text(comparison)),
            ReportFormat::Json => {
                serde_json::to_string(comparison).context("Failed to serialize comparison")
            }
            ReportFormat::JsonPretty => {
                serde_json::to_string_pretty(comparison).context("Failed to serialize comparison")
            }
            ReportFormat::Markdown => Ok(Self::markdown(comparison)),
            ReportFormat::Csv => Self::csv(comparison),
        }
    }

    fn text(c: &Comparison) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n{:=^70}\n", format!(" {} ", c.request.label)));
        output.push_str(&format!("  Treatment:  {}\n", c.request.treatment_url));
        output.push_str(&format!("  Baseline:   {}\n", c.request.baseline_url));
        output.push_str(&format!(
            "  Limits:     {}% throughput, {}ms latency\n",
            c.request.percentage_limit, c.request.ms_limit
        ));

        output.push_str(&format!(
            "\n  {:<12} {:>14} {:>14}\n",
            "", "Requests/sec", "Latency (ms)"
        ));
        output.push_str(&format!(
            "  {:<12} {:>14.2} {:>14.2}\n",
            "Treatment", c.treatment.requests_per_sec, c.treatment.latency_ms
        ));
        output.push_str(&format!(
            "  {:<12} {:>14.2} {:>14.2}\n",
            "Baseline", c.baseline.requests_per_sec, c.baseline.latency_ms
        ));

        output.push_str(&format!("\n  Latency delta:        {}ms\n", c.delta_ms));
        output.push_str(&format!(
            "  Throughput decrease:  {}%\n",
            c.throughput_decrease_pct
        ));
        if let Some(p) = &c.paired {
            output.push_str(&format!(
                "\n  Paired iterations:    {} (treatment fastest in {})\n",
                p.iterations, p.treatment_fastest
            ));
            output.push_str(&format!(
                "  Waiting median/p95:   treatment {:.2}/{:.2}ms, baseline {:.2}/{:.2}ms\n",
                p.treatment.percentiles.p50,
                p.treatment.percentiles.p95,
                p.baseline.percentiles.p50,
                p.baseline.percentiles.p95
            ));
            output.push_str(&format!(
                "  Overhead when slower: {:.2}ms avg, {:.1}% avg\n",
                p.delta.mean, p.overhead_pct.mean
            ));
        }
        output.push_str(&format!(
            "  Result:               {} ({})\n",
            if c.verdict.passed() { "PASS" } else { "FAIL" },
            c.verdict
        ));

        output.push_str(&format!("{:=^70}\n", ""));
        output
    }

    fn markdown(c: &Comparison) -> String {
        let mut output = String::new();

        output.push_str(&format!("## {}\n\n", c.request.label));
        output.push_str("| Variant | URL | Requests/sec | Latency (ms) |\n");
        output.push_str("|---------|-----|-------------:|-------------:|\n");
        output.push_str(&format!(
            "| Treatment | {} | {:.2} | {:.2} |\n",
            c.request.treatment_url, c.treatment.requests_per_sec, c.treatment.latency_ms
        ));
        output.push_str(&format!(
            "| Baseline | {} | {:.2} | {:.2} |\n",
            c.request.baseline_url, c.baseline.requests_per_sec, c.baseline.latency_ms
        ));
        output.push_str(&format!(
            "\n- Latency delta: **{}ms** (limit {}ms)\n",
            c.delta_ms, c.request.ms_limit
        ));
        output.push_str(&format!(
            "- Throughput decrease: **{}%** (limit {}%)\n",
            c.throughput_decrease_pct, c.request.percentage_limit
        ));
        output.push_str(&format!(
            "- Result: {}\n",
            if c.verdict.passed() { "✅ pass" } else { "❌ fail" }
        ));
        output
    }

    fn csv(c: &Comparison) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "label",
            "treatment_url",
            "baseline_url",
            "treatment_rps",
            "treatment_latency_ms",
            "baseline_rps",
            "baseline_latency_ms",
            "delta_ms",
            "throughput_decrease_pct",
            "passed",
        ])?;
        writer.write_record([
            c.request.label.clone(),
            c.request.treatment_url.clone(),
            c.request.baseline_url.clone(),
            c.treatment.requests_per_sec.to_string(),
            c.treatment.latency_ms.to_string(),
            c.baseline.requests_per_sec.to_string(),
            c.baseline.latency_ms.to_string(),
            c.delta_ms.to_string(),
            c.throughput_decrease_pct.to_string(),
            c.verdict.passed().to_string(),
        ])?;

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV report: {e}"))?;
        String::from_utf8(bytes).context("CSV report is not UTF-8")
    }
}
