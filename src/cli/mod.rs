//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Runtime protection overhead benchmark
#[derive(Parser, Debug)]
#[command(name = "overhead-bench")]
#[command(version)]
#[command(about = "Compare an instrumented and a plain deployment under HTTP load")]
#[command(long_about = None)]
pub struct Args {
    /// Defaults to `run` with the built-in scenario
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error); overrides --verbose
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the default scenario, or a named one from the config file
    Run(RunArgs),

    /// Benchmark an explicit pair of endpoints
    Compare(CompareArgs),

    /// Parse saved wrk output and print the extracted sample
    Parse {
        /// File containing wrk stdout
        file: PathBuf,
    },

    /// Inspect or create configuration
    Config(ConfigArgs),
}

/// Load and report flags shared by `run` and `compare`
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct LoadArgs {
    /// Load generator (wrk, native, paired)
    #[arg(short, long)]
    pub backend: Option<String>,

    /// wrk threads
    #[arg(long)]
    pub threads: Option<u32>,

    /// Open connections per endpoint
    #[arg(long)]
    pub connections: Option<u32>,

    /// Load duration per endpoint in seconds
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Warm-up requests per endpoint
    #[arg(long)]
    pub cold_start: Option<u32>,

    /// Virtual users of the paired backend
    #[arg(long)]
    pub virtual_users: Option<u32>,

    /// Report format (text, json, json-pretty, markdown, csv)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Write the report to a file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for run command
#[derive(ClapArgs, Debug, Default)]
pub struct RunArgs {
    /// Scenario label from the config file
    #[arg(short, long)]
    pub scenario: Option<String>,

    #[command(flatten)]
    pub load: LoadArgs,
}

/// Arguments for compare command
#[derive(ClapArgs, Debug)]
pub struct CompareArgs {
    /// Endpoint of the instrumented application
    #[arg(long)]
    pub treatment: String,

    /// Endpoint of the unmodified application
    #[arg(long)]
    pub baseline: String,

    /// Scenario description
    #[arg(short, long, default_value = "Ad-hoc comparison")]
    pub label: String,

    /// Maximum tolerated throughput decrease in percent
    #[arg(long, default_value = "15")]
    pub percentage_limit: f64,

    /// Maximum tolerated latency increase in milliseconds
    #[arg(long, default_value = "200")]
    pub ms_limit: f64,

    #[command(flatten)]
    pub load: LoadArgs,
}

/// Arguments for config command
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write an example configuration file
    Init {
        /// Destination path
        #[arg(default_value = "overhead-bench.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List supported environment variables and their current values
    Env,
}
