//! Shared strategy types
//!
//! Trade direction and the fixed SOL-denominated fee overheads used by both
//! allocation (fee reservation) and settlement (balance bookkeeping).

use serde::{Deserialize, Serialize};

/// Base signature fee per swap transaction (SOL)
pub const TRANSACTION_FEE_SOL: f64 = 0.00006;

/// Compute budget (priority) fee per swap transaction (SOL)
pub const COMPUTE_BUDGET_FEE_SOL: f64 = 0.000065;

/// Approximate rent-exempt balance for creating the associated token account (SOL)
pub const ATA_CREATION_FEE_SOL: f64 = 0.00513928;

/// Fee charged per executed swap, applied at settlement
pub const SWAP_FEE_SOL: f64 = TRANSACTION_FEE_SOL + COMPUTE_BUDGET_FEE_SOL;

/// SOL reserved in each wallet before it can fund a BUY
pub const TOTAL_ADDITIONAL_FEE_SOL: f64 =
    TRANSACTION_FEE_SOL + COMPUTE_BUDGET_FEE_SOL + ATA_CREATION_FEE_SOL;

/// Trade direction for a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Spend SOL, receive tokens
    Buy,
    /// Spend tokens, receive SOL
    Sell,
}

impl Direction {
    /// Whether the traded amount is denominated in SOL
    pub fn is_sol_denominated(&self) -> bool {
        matches!(self, Direction::Buy)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}
