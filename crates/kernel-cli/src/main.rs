//! rth-kernel: thermal structure functions from transient measurements.
//!
//! Runs the full pipeline from an impedance (or temperature) transient to
//! the cumulative structure function, or converts a Foster network given on
//! the command line into a Cauer ladder.

mod bootstrap;
mod config;
mod orchestrator;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::CauerKind;
use lib_network::{synthesize, CauerConfig, Precision, DEFAULT_BLOCKWISE_SUM_WIDTH};
use lib_types::FosterNetwork;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rth-kernel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the structure function of a transient
    Analyze {
        /// Path to the analysis configuration file (TOML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory, overriding the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a Foster network into a Cauer ladder
    Synthesize {
        /// Foster resistances (K/W), comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        resistance: Vec<f64>,

        /// Foster capacitances (J/K), comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        capacitance: Vec<f64>,

        /// Synthesis algorithm
        #[arg(short, long, default_value = "sobhy")]
        method: CauerKind,

        /// Mantissa bits for the arbitrary-precision arithmetic
        #[arg(short, long, default_value_t = lib_network::DEFAULT_PRECISION_BITS)]
        precision_bits: usize,

        /// Lanczos rung merging width (1 disables)
        #[arg(long, default_value_t = DEFAULT_BLOCKWISE_SUM_WIDTH)]
        blockwise_sum_width: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Analyze { config, output } => {
            run_analysis(&config, output.as_deref(), cli.format)?;
        }
        Commands::Synthesize {
            resistance,
            capacitance,
            method,
            precision_bits,
            blockwise_sum_width,
        } => {
            let config = CauerConfig {
                method: method.method(blockwise_sum_width),
                precision: Precision::new(precision_bits)?,
                ..CauerConfig::default()
            };
            run_synthesis(resistance, capacitance, &config, cli.format)?;
        }
    }

    Ok(())
}

fn run_analysis(config_path: &Path, output_dir: Option<&Path>, format: OutputFormat) -> Result<()> {
    tracing::info!("Loading configuration from {:?}", config_path);

    let config = config::load_config(config_path)?;
    let orchestrator = orchestrator::Orchestrator::new(config)?;
    let results = orchestrator.run()?;

    let output_dir = output_dir.unwrap_or(orchestrator.config().output.directory.as_path());
    output::write_results(&results, output_dir, format)
        .with_context(|| format!("Failed to write results to {:?}", output_dir))?;
    output::print_results(&results)?;

    tracing::info!("Analysis complete. Results written to {:?}", output_dir);
    Ok(())
}

fn run_synthesis(resistance: Vec<f64>, capacitance: Vec<f64>, config: &CauerConfig, format: OutputFormat) -> Result<()> {
    let foster = FosterNetwork::new(resistance, capacitance)?;
    tracing::info!(
        "Synthesizing {} Foster pairs with {} at {} bits",
        foster.len(),
        config.method.name(),
        config.precision.bits()
    );

    let cauer = synthesize(&foster, config).context("Cauer synthesis failed")?;
    output::print_ladder(&cauer, format)
}
