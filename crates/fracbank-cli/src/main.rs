//! FracBank CLI - fractional ownership with revenue streams
//!
//! Runs entirely in-process against an in-memory stablecoin.
//!
//! # Quick Start
//!
//! ```bash
//! fracbank demo
//! fracbank stress --iterations 5000 --seed 7
//! FRACBANK__LEDGER__STREAM_UNIT_COST=2000 fracbank config --json
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod display;

use crate::commands::{demo, stress};
use crate::config::{AppConfig, LoggingConfig};

/// FracBank CLI - fractional shares, revenue streams and a partial-fill marketplace
#[derive(Parser)]
#[command(name = "fracbank")]
#[command(author = "FracBank Contributors")]
#[command(version)]
#[command(about = "Fractional asset ownership with pull-based revenue distribution", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (toml, json or yaml)
    #[arg(short, long, global = true, env = "FRACBANK_CONFIG")]
    config: Option<String>,

    /// Log level, overrides the configured one
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through minting, revenue collection, settlement on transfer and a sale
    Demo,

    /// Seeded random trading run that checks conservation after every step
    Stress {
        /// Number of random steps
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Number of trading accounts
        #[arg(short, long)]
        accounts: Option<usize>,

        /// Number of asset classes
        #[arg(long)]
        classes: Option<usize>,

        /// RNG seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the resolved configuration
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .try_init()?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Commands::Stress {
        iterations,
        accounts,
        classes,
        seed,
        ..
    } = &cli.command
    {
        let stress = &mut config.stress;
        stress.iterations = iterations.unwrap_or(stress.iterations);
        stress.accounts = accounts.unwrap_or(stress.accounts);
        stress.classes = classes.unwrap_or(stress.classes);
        stress.seed = seed.unwrap_or(stress.seed);
    }
    config.validate()?;

    init_logging(&config.logging)?;
    tracing::debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Demo => demo::run_demo(config.ledger).await?,
        Commands::Stress { json, .. } => stress::run(config.ledger, &config.stress, json).await?,
        Commands::Config { json } => commands::config::show(&config, json)?,
    }

    Ok(())
}
