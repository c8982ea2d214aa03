//! Cycle orchestrator
//!
//! Drives the loop: refresh → size → allocate → execute → settle → wait.
//! Exactly one cycle runs at a time and swaps inside a cycle run strictly
//! one after another, in allocation order. Every suspension point (refresh,
//! swap, inter-swap delay, cycle delay) also listens for shutdown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::report::{CycleResult, SwapOutcome, SwapStatus};
use crate::balance::BalanceSource;
use crate::config::CycleConfig;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::strategy::allocation::allocated_total;
use crate::strategy::{allocate, AllocationEntry, Direction, SizingPolicy};
use crate::trading::{SwapExecutor, SwapRequest};

/// Immutable pacing and sizing settings for the loop
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub min_percent: f64,
    pub max_percent: f64,
    pub per_swap_timeout: Duration,
    pub inter_swap_delay: Duration,
    pub cycle_delay: Duration,
    pub refresh_retry_delay: Duration,
    pub persist_after_settle: bool,
}

impl From<&CycleConfig> for CycleSettings {
    fn from(config: &CycleConfig) -> Self {
        Self {
            min_percent: config.min_percent,
            max_percent: config.max_percent,
            per_swap_timeout: Duration::from_millis(config.per_swap_timeout_ms),
            inter_swap_delay: Duration::from_millis(config.inter_swap_delay_ms),
            cycle_delay: Duration::from_secs(config.cycle_delay_secs),
            refresh_retry_delay: Duration::from_millis(config.refresh_retry_delay_ms),
            persist_after_settle: config.persist_after_settle,
        }
    }
}

/// How a single cycle ended
#[derive(Debug)]
pub enum CycleStep {
    /// Swaps ran (possibly cut short by shutdown) and were settled
    Completed(CycleResult),
    /// Balance refresh or ledger load failed; nothing was traded
    RefreshFailed(Error),
    /// Wallet pool cannot cover the target; the loop must halt
    DistributionFailed {
        direction: Direction,
        target_amount: f64,
    },
    /// Shutdown requested before any swap was issued
    Cancelled,
}

pub struct Orchestrator {
    settings: CycleSettings,
    ledger: Ledger,
    source: Arc<dyn BalanceSource>,
    executor: Arc<dyn SwapExecutor>,
    sizing: SizingPolicy,
    shutdown: CancellationToken,
    cycles: u64,
}

impl Orchestrator {
    pub fn new(
        settings: CycleSettings,
        source: Arc<dyn BalanceSource>,
        executor: Arc<dyn SwapExecutor>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            settings,
            ledger: Ledger::new(),
            source,
            executor,
            sizing: SizingPolicy::from_entropy(),
            shutdown,
            cycles: 0,
        }
    }

    /// Replace the sizing policy (e.g. a seeded one)
    pub fn with_sizing(mut self, sizing: SizingPolicy) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Cycles started so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run cycles until shutdown or an infeasible allocation
    ///
    /// Returns `Ok(())` on shutdown and `Err(Error::DistributionFailed)`
    /// when the pool can no longer cover a cycle's target.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            source = self.source.name(),
            executor = self.executor.name(),
            "Starting cycle loop ({}%..{}%, cycle delay {:?})",
            self.settings.min_percent,
            self.settings.max_percent,
            self.settings.cycle_delay
        );

        while !self.shutdown.is_cancelled() {
            match self.run_cycle().await {
                CycleStep::Completed(result) => {
                    result.log_summary();
                    debug!("Waiting {:?} before next cycle", self.settings.cycle_delay);
                    if !self.pause(self.settings.cycle_delay).await {
                        break;
                    }
                }
                CycleStep::RefreshFailed(e) => {
                    if e.is_refresh_failure() {
                        error!(cycle = self.cycles, "Balance refresh failed: {}", e);
                    } else {
                        error!(cycle = self.cycles, "Cycle aborted before sizing: {}", e);
                    }
                    let delay = self.settings.refresh_retry_delay;
                    if !delay.is_zero() && !self.pause(delay).await {
                        break;
                    }
                }
                CycleStep::DistributionFailed {
                    direction,
                    target_amount,
                } => {
                    error!(
                        cycle = self.cycles,
                        %direction,
                        target_amount,
                        "Cannot distribute target across wallets, stopping"
                    );
                    return Err(Error::DistributionFailed {
                        direction: direction.to_string(),
                        target: target_amount,
                    });
                }
                CycleStep::Cancelled => break,
            }
        }

        info!(cycles = self.cycles, "Cycle loop stopped");
        Ok(())
    }

    /// Run one cycle without the trailing cycle delay
    pub async fn run_cycle(&mut self) -> CycleStep {
        self.cycles += 1;
        let cycle = self.cycles;
        let started_at = Utc::now();

        // Refreshing
        let shutdown = self.shutdown.clone();
        let refreshed = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return CycleStep::Cancelled,
            refreshed = self.source.refresh() => refreshed,
        };
        let snapshot = match refreshed {
            Ok(path) => path,
            Err(e) => return CycleStep::RefreshFailed(e),
        };
        if let Err(e) = self.ledger.load(&snapshot) {
            return CycleStep::RefreshFailed(e);
        }

        // Sizing
        let totals = self.ledger.totals();
        let plan = self
            .sizing
            .plan(&totals, self.settings.min_percent, self.settings.max_percent);
        info!(
            cycle,
            direction = %plan.direction,
            total_sol = totals.total_sol,
            total_token = totals.total_token,
            "Sized trade: {:.6} ({:.2}% of pool)",
            plan.target_amount,
            plan.percentage
        );

        // Allocating
        let allocation = allocate(self.ledger.records(), plan.target_amount, plan.direction);
        if allocation.is_empty() {
            return CycleStep::DistributionFailed {
                direction: plan.direction,
                target_amount: plan.target_amount,
            };
        }
        info!(
            cycle,
            "Allocated {:.6} across {} wallets",
            allocated_total(&allocation),
            allocation.len()
        );

        // Executing
        let (outcomes, cancelled) = self.execute(&allocation, plan.direction).await;
        if cancelled {
            warn!(
                cycle,
                "Shutdown during execution, {} of {} swaps attempted",
                outcomes.len(),
                allocation.len()
            );
        }

        // Settling
        self.settle(&outcomes, plan.direction);

        CycleStep::Completed(CycleResult {
            cycle,
            started_at,
            finished_at: Utc::now(),
            direction: plan.direction,
            percentage: plan.percentage,
            target_amount: plan.target_amount,
            allocation,
            outcomes,
        })
    }

    /// Swap each entry in order; the flag is set when shutdown cut it short
    async fn execute(
        &self,
        allocation: &[AllocationEntry],
        direction: Direction,
    ) -> (Vec<SwapOutcome>, bool) {
        let mut outcomes = Vec::with_capacity(allocation.len());

        for (i, entry) in allocation.iter().enumerate() {
            if i > 0 && !self.pause(self.settings.inter_swap_delay).await {
                return (outcomes, true);
            }

            let started = Instant::now();
            let status = match self.swap_with_timeout(entry, direction).await {
                Some(status) => status,
                None => return (outcomes, true),
            };

            match &status {
                SwapStatus::Succeeded { tx_id } => info!(
                    wallet = entry.wallet_index,
                    amount = entry.amount,
                    %direction,
                    "Swap succeeded: {}",
                    tx_id
                ),
                SwapStatus::Failed { reason } => warn!(
                    wallet = entry.wallet_index,
                    amount = entry.amount,
                    %direction,
                    "Swap failed: {}",
                    reason
                ),
            }

            outcomes.push(SwapOutcome {
                entry: entry.clone(),
                status,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        (outcomes, false)
    }

    /// Race one swap against the per-swap timeout
    ///
    /// The swap runs as its own task. When the timer wins the task is left
    /// running detached and its result is dropped. `None` means shutdown.
    async fn swap_with_timeout(
        &self,
        entry: &AllocationEntry,
        direction: Direction,
    ) -> Option<SwapStatus> {
        let Some(record) = self.ledger.get(entry.wallet_index) else {
            return Some(SwapStatus::Failed {
                reason: format!("wallet {} not in ledger", entry.wallet_index),
            });
        };

        debug!(
            wallet = entry.wallet_index,
            address = record.short_address(),
            amount = entry.amount,
            %direction,
            "Submitting swap"
        );

        let request = SwapRequest {
            wallet_index: entry.wallet_index,
            credential: record.credential.clone(),
            amount: entry.amount,
            direction,
        };

        let executor = Arc::clone(&self.executor);
        let handle = tokio::spawn(async move { executor.execute(request).await });
        let timeout = self.settings.per_swap_timeout;

        let status = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return None,
            joined = tokio::time::timeout(timeout, handle) => match joined {
                Ok(Ok(Ok(tx_id))) => SwapStatus::Succeeded { tx_id },
                Ok(Ok(Err(e))) => SwapStatus::Failed { reason: e.to_string() },
                Ok(Err(e)) => SwapStatus::Failed {
                    reason: Error::SwapAborted(e.to_string()).to_string(),
                },
                Err(_) => SwapStatus::Failed {
                    reason: Error::SwapTimeout(timeout.as_millis() as u64).to_string(),
                },
            },
        };

        Some(status)
    }

    /// Book successful swaps; failed entries leave their wallet untouched
    fn settle(&mut self, outcomes: &[SwapOutcome], direction: Direction) {
        let mut settled = 0;
        for outcome in outcomes.iter().filter(|o| o.status.is_success()) {
            if self
                .ledger
                .apply_update(outcome.entry.wallet_index, outcome.entry.amount, direction)
                .is_some()
            {
                settled += 1;
            }
        }
        debug!("Settled {} of {} swaps", settled, outcomes.len());

        if self.settings.persist_after_settle && settled > 0 {
            if let Err(e) = self.ledger.flush() {
                error!("Failed to persist settled balances: {}", e);
            }
        }
    }

    /// Sleep unless shutdown comes first; `false` means shutdown
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
