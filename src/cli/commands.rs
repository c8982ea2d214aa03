//! CLI command implementations

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use solana_client::nonblocking::rpc_client::RpcClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::balance::convert::convert_txt_to_csv;
use crate::balance::{BalanceSource, RetryPolicy, RpcBalanceSource, SnapshotFile};
use crate::config::Config;
use crate::cycle::{CycleSettings, CycleStep, Orchestrator};
use crate::error::Error;
use crate::ledger::snapshot::scale_snapshot;
use crate::ledger::Ledger;
use crate::strategy::allocation::total_usable;
use crate::strategy::{Direction, SizingPolicy};
use crate::trading::{DryRunExecutor, SwapExecutor, SwapParams, TradeApiClient, TradeApiExecutor};

/// Start the cycle loop
pub async fn run(
    config: &Config,
    dry_run: bool,
    offline: bool,
    once: bool,
    seed: Option<u64>,
) -> Result<()> {
    if dry_run {
        warn!("Running in DRY-RUN mode - no real swaps will be executed");
    }

    info!("Starting volume cycler...");
    info!(
        "Pool: amm={} mint={} ({}), slippage {}%",
        if config.pool.amm_id.is_empty() { "-" } else { config.pool.amm_id.as_str() },
        config.pool.mint,
        config.pool.pool_kind,
        config.pool.slippage_pct
    );

    let rpc = Arc::new(rpc_client(config));

    let source: Arc<dyn BalanceSource> = if offline {
        info!("Using existing snapshot {} as balance source", config.files.balances_csv);
        Arc::new(SnapshotFile::new(&config.files.balances_csv))
    } else {
        Arc::new(rpc_source(config, rpc.clone())?)
    };

    let executor: Arc<dyn SwapExecutor> = if dry_run {
        Arc::new(DryRunExecutor::default())
    } else {
        let api = TradeApiClient::new(
            config.pool.trade_api_url.clone(),
            Duration::from_millis(config.rpc.timeout_ms),
        )?;
        info!("Building swaps through {}", api.url());
        Arc::new(TradeApiExecutor::new(
            api,
            rpc,
            SwapParams {
                mint: config.pool.mint.clone(),
                pool: config.pool.pool_kind,
                slippage_pct: config.pool.slippage_pct,
                priority_fee_sol: config.pool.priority_fee_sol,
            },
        ))
    };

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal.cancel();
        }
    });

    let mut orchestrator = Orchestrator::new(
        CycleSettings::from(&config.cycle),
        source,
        executor,
        shutdown,
    )
    .with_sizing(SizingPolicy::new(seed));

    if !once {
        orchestrator.run().await?;
        return Ok(());
    }

    match orchestrator.run_cycle().await {
        CycleStep::Completed(result) => {
            result.log_summary();
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        CycleStep::RefreshFailed(e) => Err(e.into()),
        CycleStep::DistributionFailed {
            direction,
            target_amount,
        } => Err(Error::DistributionFailed {
            direction: direction.to_string(),
            target: target_amount,
        }
        .into()),
        CycleStep::Cancelled => {
            info!("Cancelled before any swap was issued");
            Ok(())
        }
    }
}

/// Refresh balances from RPC into the snapshot once
pub async fn refresh(config: &Config) -> Result<()> {
    let source = rpc_source(config, Arc::new(rpc_client(config)))?;
    let path = source.refresh().await?;

    let mut ledger = Ledger::new();
    let count = ledger.load(&path)?;
    let totals = ledger.totals();
    println!(
        "Refreshed {} wallets into {}: {:.9} SOL, {:.6} tokens",
        count,
        path.display(),
        totals.total_sol,
        totals.total_token
    );
    Ok(())
}

/// Convert the whitespace separated wallet list into CSV
pub fn convert(config: &Config) -> Result<()> {
    let count = convert_txt_to_csv(
        Path::new(&config.files.wallets_txt),
        Path::new(&config.files.wallets_csv),
    )?;
    println!(
        "Converted {} wallets from {} to {}",
        count, config.files.wallets_txt, config.files.wallets_csv
    );
    Ok(())
}

/// Show ledger totals and per-wallet balances from the snapshot
pub fn status(config: &Config) -> Result<()> {
    let mut ledger = Ledger::new();
    ledger.load(Path::new(&config.files.balances_csv))?;
    let totals = ledger.totals();

    println!("\n=== WALLET POOL STATUS ===\n");
    println!("Wallets: {}", ledger.len());
    println!("Total SOL: {:.9}", totals.total_sol);
    println!("Total tokens: {:.6}", totals.total_token);
    println!(
        "Usable for BUY: {:.9} SOL",
        total_usable(ledger.records(), Direction::Buy)
    );
    println!(
        "Usable for SELL: {:.6} tokens",
        total_usable(ledger.records(), Direction::Sell)
    );
    println!(
        "Sizing range: {}% .. {}%",
        config.cycle.min_percent, config.cycle.max_percent
    );

    println!("\n=== WALLETS ===\n");
    if ledger.is_empty() {
        println!("No wallets.");
    }
    for record in ledger.records() {
        println!(
            "{:>4}  {:<44}  {:>16.9} SOL  {:>20.6} tokens",
            record.index, record.public_address, record.sol_balance, record.token_balance
        );
    }

    Ok(())
}

/// Write a copy of the snapshot with every balance multiplied by `factor`
pub fn scale(config: &Config, factor: f64, output: &str) -> Result<()> {
    let count = scale_snapshot(
        Path::new(&config.files.balances_csv),
        Path::new(output),
        factor,
    )?;
    println!("Scaled {} wallets by {} into {}", count, factor, output);
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

fn rpc_client(config: &Config) -> RpcClient {
    RpcClient::new_with_timeout(
        config.rpc.endpoint.clone(),
        Duration::from_millis(config.rpc.timeout_ms),
    )
}

fn rpc_source(config: &Config, rpc: Arc<RpcClient>) -> Result<RpcBalanceSource> {
    let source = RpcBalanceSource::new(
        rpc,
        &config.pool.mint,
        &config.files.wallets_csv,
        &config.files.balances_csv,
    )?
    .with_retry(RetryPolicy {
        max_elapsed: Duration::from_millis(config.rpc.retry_max_elapsed_ms),
        ..RetryPolicy::default()
    });
    Ok(source)
}
