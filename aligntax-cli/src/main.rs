//! aligntax CLI — alignment tax benchmarks from the terminal.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// aligntax: measure the computational cost of safety interventions
#[derive(Parser, Debug)]
#[command(name = "aligntax", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (looked up for `.aligntax/config.toml`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Benchmark one or all methods against the baseline
    Bench {
        /// Method to benchmark (all configured methods if omitted)
        #[arg(short, long)]
        method: Option<String>,
        /// Model size to benchmark at, e.g. 1.3B (all configured scales if omitted)
        #[arg(long)]
        model: Option<String>,
        /// Baseline task score (0.0-1.0) the aligned model is compared against
        #[arg(long)]
        baseline: Option<f64>,
        /// Output format: table or json
        #[arg(short, long)]
        format: Option<String>,
        /// Also write the JSON report to this path
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Fit a power-law scaling curve and extrapolate
    Fit {
        /// Method to fit (every method if omitted)
        #[arg(short, long)]
        method: Option<String>,
        /// Metric: flops, memory or task_regression
        #[arg(long, default_value = "flops")]
        metric: String,
        /// Scales to predict at, e.g. --predict 13B --predict 70B
        #[arg(long)]
        predict: Vec<String>,
        /// Output format: table or json
        #[arg(short, long)]
        format: Option<String>,
    },
    /// Pareto-optimal methods at one model size
    Pareto {
        /// Model size, e.g. 1.3B
        #[arg(long)]
        model: String,
        /// Overhead axis: flops or memory
        #[arg(long, default_value = "flops")]
        metric: String,
        /// Output format: table or json
        #[arg(short, long)]
        format: Option<String>,
    },
    /// List methods in the overhead table
    Methods,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default config to .aligntax/config.toml
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "aligntax", "aligntax")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "aligntax.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref())
}
