//! Trade strategy
//!
//! Per-cycle decisions: which direction to trade, how much, and which
//! wallets fund it.

pub mod allocation;
pub mod sizing;
pub mod types;

pub use allocation::{allocate, AllocationEntry};
pub use sizing::{SizingPolicy, TradePlan};
pub use types::Direction;
