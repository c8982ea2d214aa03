//! Volume Cycler - randomized buy/sell cycling across a pool of Solana wallets
//!
//! # WARNING
//! - This tool trades with real money unless `--dry-run` is given.
//! - Every swap pays network and priority fees; cycling volume costs SOL.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, warn};

// Use the library crate
use volume_cycler::cli::commands;
use volume_cycler::config::Config;
use volume_cycler::Error;

/// Exit status when the wallet pool can no longer cover a cycle
const EXIT_DISTRIBUTION_FAILED: i32 = 2;

/// Volume Cycler - randomized swap cycling over a wallet pool
#[derive(Parser)]
#[command(name = "cycler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the cycle loop
    Run {
        /// Run every step but do not send swaps
        #[arg(long)]
        dry_run: bool,

        /// Use the existing balance snapshot instead of refreshing over RPC
        #[arg(long)]
        offline: bool,

        /// Run a single cycle and print its result
        #[arg(long)]
        once: bool,

        /// Seed the sizing RNG for reproducible cycles
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Refresh wallet balances over RPC into the snapshot
    Refresh,

    /// Convert wallets.txt into wallets.csv
    Convert,

    /// Show wallet balances from the snapshot
    Status,

    /// Write a scaled copy of the balance snapshot
    Scale {
        /// Multiplier applied to every balance
        #[arg(long, default_value = "0.9")]
        factor: f64,

        /// Output file
        #[arg(long, default_value = "updated_wallet_balances.csv")]
        output: String,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.json)?;

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Run {
            dry_run,
            offline,
            once,
            seed,
        } => commands::run(&config, dry_run, offline, once, seed).await,
        Commands::Refresh => commands::refresh(&config).await,
        Commands::Convert => commands::convert(&config),
        Commands::Status => commands::status(&config),
        Commands::Scale { factor, output } => commands::scale(&config, factor, &output),
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        if let Some(Error::DistributionFailed { .. }) = e.downcast_ref::<Error>() {
            warn!("Halting: {}", e);
            std::process::exit(EXIT_DISTRIBUTION_FAILED);
        }
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("volume_cycler=info".parse()?);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }

    Ok(())
}
