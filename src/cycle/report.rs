//! Per-cycle results

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::strategy::{AllocationEntry, Direction};

/// Outcome of one swap attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SwapStatus {
    Succeeded { tx_id: String },
    Failed { reason: String },
}

impl SwapStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SwapStatus::Succeeded { .. })
    }
}

/// One allocation entry and what happened to it
#[derive(Debug, Clone, Serialize)]
pub struct SwapOutcome {
    pub entry: AllocationEntry,
    pub status: SwapStatus,
    pub elapsed_ms: u64,
}

/// Everything a completed cycle did
#[derive(Debug, Clone, Serialize)]
pub struct CycleResult {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub direction: Direction,
    pub percentage: f64,
    pub target_amount: f64,
    pub allocation: Vec<AllocationEntry>,
    pub outcomes: Vec<SwapOutcome>,
}

impl CycleResult {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Allocation entries that were never attempted (shutdown mid-cycle)
    pub fn skipped(&self) -> usize {
        self.allocation.len().saturating_sub(self.outcomes.len())
    }

    /// Amount booked into the ledger
    pub fn settled_amount(&self) -> f64 {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_success())
            .map(|o| o.entry.amount)
            .sum()
    }

    pub fn log_summary(&self) {
        let unit = if self.direction.is_sol_denominated() {
            "SOL"
        } else {
            "tokens"
        };
        let duration_ms = (self.finished_at - self.started_at).num_milliseconds();

        info!(
            cycle = self.cycle,
            duration_ms,
            "Cycle complete: {} {:.6} {} ({:.2}%) | {} ok, {} failed, {} skipped | settled {:.6} {}",
            self.direction,
            self.target_amount,
            unit,
            self.percentage,
            self.succeeded(),
            self.failed(),
            self.skipped(),
            self.settled_amount(),
            unit
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: u32, amount: f64) -> AllocationEntry {
        AllocationEntry {
            wallet_index: index,
            public_address: format!("Addr{}", index),
            amount,
        }
    }

    #[test]
    fn test_counts_and_settled_amount() {
        let now = Utc::now();
        let result = CycleResult {
            cycle: 3,
            started_at: now,
            finished_at: now,
            direction: Direction::Sell,
            percentage: 10.0,
            target_amount: 160.0,
            allocation: vec![entry(1, 100.0), entry(2, 50.0), entry(3, 10.0)],
            outcomes: vec![
                SwapOutcome {
                    entry: entry(1, 100.0),
                    status: SwapStatus::Succeeded {
                        tx_id: "sig".into(),
                    },
                    elapsed_ms: 12,
                },
                SwapOutcome {
                    entry: entry(2, 50.0),
                    status: SwapStatus::Failed {
                        reason: "timed out".into(),
                    },
                    elapsed_ms: 5000,
                },
            ],
        };

        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.skipped(), 1);
        assert_eq!(result.settled_amount(), 100.0);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&SwapStatus::Failed {
            reason: "boom".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"boom"}"#);
    }
}
