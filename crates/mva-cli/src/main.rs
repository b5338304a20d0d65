//! mvaprep CLI

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mva_core::config::AnalysisConfig;

mod export;
mod inspect;
mod plot;

#[derive(Parser)]
#[command(name = "mvaprep")]
#[command(about = "MVA training-set preparation and histogram export for HEP analyses")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List trees and branches of the configured input files
    Inspect {
        /// Configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Read the configuration from stdin instead of a file
        #[arg(long, conflicts_with = "config")]
        stdin: bool,
    },

    /// Render the diagnostic plots (variables, correlation, response)
    Plot {
        /// Configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Read the configuration from stdin instead of a file
        #[arg(long, conflicts_with = "config")]
        stdin: bool,

        /// Response expression over the feature branches. Without it the
        /// response overlay is skipped.
        #[arg(long)]
        response: Option<String>,
    },

    /// Evaluate a response expression and write the histogram container
    Export {
        /// Configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Read the configuration from stdin instead of a file
        #[arg(long, conflicts_with = "config")]
        stdin: bool,

        /// Response expression over the feature branches
        #[arg(long)]
        response: String,

        /// Lower edge of the response range
        #[arg(long, default_value = "0.0")]
        x_min: f64,

        /// Upper edge of the response range
        #[arg(long, default_value = "1.0")]
        x_max: f64,
    },
}

fn load_config(path: Option<&PathBuf>, stdin: bool) -> Result<AnalysisConfig> {
    match (path, stdin) {
        (Some(p), false) => AnalysisConfig::from_path(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        (None, true) => AnalysisConfig::from_reader(io::stdin().lock())
            .context("failed to load config from stdin"),
        (None, false) => anyhow::bail!("either --config or --stdin is required"),
        (Some(_), true) => unreachable!("clap rejects --config with --stdin"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Inspect { config, stdin } => {
            let cfg = load_config(config.as_ref(), stdin)?;
            inspect::run(&cfg)
        }
        Commands::Plot { config, stdin, response } => {
            let cfg = load_config(config.as_ref(), stdin)?;
            plot::run(&cfg, response.as_deref())
        }
        Commands::Export { config, stdin, response, x_min, x_max } => {
            let cfg = load_config(config.as_ref(), stdin)?;
            export::run(&cfg, &response, (x_min, x_max))
        }
    }
}
