//! overhead-bench - Runtime protection overhead benchmark
//!
//! Loads two deployments of the same application, one with the runtime
//! protection layer and one without, and fails when the protected one is
//! too much slower.
//!
//! ## Usage
//!
//! ```bash
//! # Default scenario: :3001 (protected) vs :3002 (plain), 15% / 200ms
//! overhead-bench
//!
//! # Built-in load generator instead of wrk
//! overhead-bench run --backend native --duration 30
//!
//! # Treatment and baseline requested back to back, p95/median limits
//! overhead-bench run --backend paired --virtual-users 4
//!
//! # Any pair of endpoints
//! overhead-bench compare --treatment http://localhost:3001/cats \
//!     --baseline http://localhost:3002/cats --percentage-limit 10
//!
//! # Re-read a saved wrk run
//! overhead-bench parse wrk-output.txt
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::{debug, error, info, warn};

mod benchmark;
mod cli;
mod config;
mod http;
mod scenario;
#[cfg(test)]
mod test_support;
mod utils;

use benchmark::{
    Backend, BenchmarkDriver, BenchmarkError, BenchmarkRequest, Comparison, ComparisonReport,
    LoadDriver, LoadSample, ReportFormat, WrkOutput,
};
use cli::{Args, LoadArgs};
use config::{AppConfig, ConfigFile, EnvConfig};
use utils::LogLevel;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();
    let file = config::resolve(args.config.as_deref(), &env)?;

    // File and env verbosity are already folded into `file.app`
    let level = LogLevel::resolve(args.log_level.as_deref(), args.verbose || file.app.verbose);
    utils::init_logger(level);
    debug!("Effective configuration: {:?}", file.app);

    match args.command {
        None => run_scenario(cli::RunArgs::default(), &file).await,
        Some(cli::Command::Run(run_args)) => run_scenario(run_args, &file).await,
        Some(cli::Command::Compare(compare_args)) => {
            let request = BenchmarkRequest::new(
                compare_args.treatment,
                compare_args.baseline,
                compare_args.label,
                compare_args.percentage_limit,
                compare_args.ms_limit,
            );
            request.validate()?;

            let app = apply_load_args(file.app, &compare_args.load)?;
            let driver = LoadDriver::new(app.load.clone())?;
            let outcome = driver.run_benchmark(&request).await;
            finish(outcome, &app, &compare_args.load)
        }
        Some(cli::Command::Parse { file: path }) => parse_output(&path),
        Some(cli::Command::Config(config_args)) => manage_config(config_args, &file, &env),
    }
}

/// The default scenario, or a named one from the config file
async fn run_scenario(args: cli::RunArgs, file: &ConfigFile) -> Result<()> {
    let app = apply_load_args(file.app.clone(), &args.load)?;
    let driver = LoadDriver::new(app.load.clone())?;
    info!(
        "Backend: {}, {} connections, {}s per endpoint",
        driver.settings().backend.name(),
        driver.settings().connections,
        driver.settings().duration_secs
    );

    let outcome = match &args.scenario {
        Some(label) => {
            let request = file.scenario(label).with_context(|| {
                format!("No scenario labelled '{label}' in the configuration file")
            })?;
            driver.run_benchmark(request).await
        }
        None => scenario::run(&driver).await,
    };

    finish(outcome, &app, &args.load)
}

/// Layer command-line load flags over the resolved configuration
fn apply_load_args(mut app: AppConfig, load: &LoadArgs) -> Result<AppConfig> {
    if let Some(backend) = &load.backend {
        app.load.backend = Backend::from_str(backend)
            .with_context(|| format!("Unknown backend: {backend} (expected wrk, native or paired)"))?;
    }
    if let Some(threads) = load.threads {
        app.load.threads = threads;
    }
    if let Some(connections) = load.connections {
        app.load.connections = connections;
    }
    if let Some(duration) = load.duration {
        app.load.duration_secs = duration;
    }
    if let Some(cold_start) = load.cold_start {
        app.load.cold_start_requests = cold_start;
    }
    if let Some(users) = load.virtual_users {
        app.load.paired.virtual_users = users;
    }
    if let Some(format) = &load.format {
        app.format = format.clone();
    }
    app.load.validate()?;
    Ok(app)
}

/// Report the comparison and exit with the status of a failed run
fn finish(
    outcome: Result<Comparison, BenchmarkError>,
    app: &AppConfig,
    load: &LoadArgs,
) -> Result<()> {
    let code = report_outcome(&outcome, app, load.output.as_deref())?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Write the report whenever there is a comparison, even a failing one,
/// and return the exit status for the outcome
fn report_outcome(
    outcome: &Result<Comparison, BenchmarkError>,
    app: &AppConfig,
    output: Option<&Path>,
) -> Result<i32> {
    let comparison = match outcome {
        Ok(comparison) => Some(comparison),
        Err(BenchmarkError::ThresholdExceeded(comparison)) => Some(comparison.as_ref()),
        Err(_) => None,
    };
    if let Some(comparison) = comparison {
        write_report(comparison, app, output)?;
    }

    match outcome {
        Ok(_) => Ok(0),
        Err(err) => {
            error!("{err}");
            Ok(err.exit_code())
        }
    }
}

fn write_report(comparison: &Comparison, app: &AppConfig, output: Option<&Path>) -> Result<()> {
    let format = ReportFormat::from_str(&app.format).unwrap_or_else(|| {
        warn!("Unknown report format '{}', using text", app.format);
        ReportFormat::Text
    });
    let report = ComparisonReport::render(comparison, format)?;

    println!("{report}");

    if let Some(path) = output {
        std::fs::write(path, &report)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn parse_output(path: &Path) -> Result<()> {
    let stdout = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read wrk output: {}", path.display()))?;
    let output = WrkOutput {
        stdout,
        stderr: String::new(),
        success: true,
    };

    let sample: LoadSample = match benchmark::extract_sample(&path.display().to_string(), &output)
    {
        Ok(sample) => sample,
        Err(err) => {
            error!("{err}");
            std::process::exit(err.exit_code());
        }
    };
    println!("{sample}");
    Ok(())
}

fn manage_config(args: cli::ConfigArgs, file: &ConfigFile, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Show => {
            let yaml = serde_yaml::to_string(file).context("Failed to serialize config")?;
            println!("{yaml}");
        }
        cli::ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            ConfigFile::example().save(&path)?;
            println!("Example configuration written to {}", path.display());
        }
        cli::ConfigAction::Env => {
            config::print_env_help();
            println!();
            env.print_summary();
        }
    }
    Ok(())
}
