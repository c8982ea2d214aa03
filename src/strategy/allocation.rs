//! Wallet allocation
//!
//! Splits a cycle's target amount across as few wallets as possible,
//! largest balance first. BUY allocations hold back
//! [`TOTAL_ADDITIONAL_FEE_SOL`] in every wallet so it can still pay for the
//! transaction and token account. SELL allocations use the full token
//! balance; the fee comes out of the wallet's existing SOL.
//!
//! The result is all-or-nothing: if the pool cannot cover the target, the
//! allocation is empty and nothing is traded.

use serde::Serialize;
use tracing::{debug, warn};

use super::types::{Direction, TOTAL_ADDITIONAL_FEE_SOL};
use crate::ledger::WalletRecord;

/// Instruction to swap `amount` from one wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationEntry {
    pub wallet_index: u32,
    pub public_address: String,
    pub amount: f64,
}

/// Balance the direction spends from
pub fn relevant_balance(record: &WalletRecord, direction: Direction) -> f64 {
    match direction {
        Direction::Buy => record.sol_balance,
        Direction::Sell => record.token_balance,
    }
}

/// Amount a wallet can contribute after fee reservation
pub fn usable_amount(record: &WalletRecord, direction: Direction) -> f64 {
    match direction {
        Direction::Buy => (record.sol_balance - TOTAL_ADDITIONAL_FEE_SOL).max(0.0),
        Direction::Sell => record.token_balance.max(0.0),
    }
}

/// Total usable amount over all wallets
pub fn total_usable<'a, I>(records: I, direction: Direction) -> f64
where
    I: IntoIterator<Item = &'a WalletRecord>,
{
    records
        .into_iter()
        .map(|r| usable_amount(r, direction))
        .sum()
}

/// Cover `target` using the fewest wallets, largest balance first
///
/// Records are expected in index order; equal balances keep that order.
/// Entries sum to `target` when the result is non-empty. The result is
/// empty when `target` is not a positive finite number or when the usable
/// balance of the whole pool falls short.
pub fn allocate<'a, I>(records: I, target: f64, direction: Direction) -> Vec<AllocationEntry>
where
    I: IntoIterator<Item = &'a WalletRecord>,
{
    if !target.is_finite() || target <= 0.0 {
        warn!(target, %direction, "Nothing to allocate");
        return Vec::new();
    }

    let mut sorted: Vec<&WalletRecord> = records.into_iter().collect();
    // Stable sort: ties keep index order
    sorted.sort_by(|a, b| {
        relevant_balance(b, direction).total_cmp(&relevant_balance(a, direction))
    });

    let mut allocation = Vec::new();
    let mut remaining = target;

    for wallet in sorted {
        if relevant_balance(wallet, direction) <= 0.0 {
            continue;
        }

        let amount = usable_amount(wallet, direction).min(remaining);
        if amount <= 0.0 {
            continue;
        }

        allocation.push(AllocationEntry {
            wallet_index: wallet.index,
            public_address: wallet.public_address.clone(),
            amount,
        });

        remaining -= amount;
        if remaining <= 0.0 {
            break;
        }
    }

    if remaining > 0.0 {
        warn!(
            target,
            remaining,
            %direction,
            "Not enough balance to distribute the total amount"
        );
        return Vec::new();
    }

    debug!(
        target,
        %direction,
        wallets = allocation.len(),
        "Allocation complete"
    );

    allocation
}

/// Sum of allocated amounts
pub fn allocated_total(allocation: &[AllocationEntry]) -> f64 {
    allocation.iter().map(|e| e.amount).sum()
}
