//! In-memory balance ledger
//!
//! Rebuilt from the snapshot at the start of every cycle and mutated in
//! place by settlement. The ledger is only local bookkeeping: the next
//! refresh from the balance source always wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::snapshot;
use super::types::{Totals, WalletRecord};
use crate::error::Result;
use crate::strategy::types::{Direction, SWAP_FEE_SOL};

/// Wallet records keyed by index
#[derive(Debug, Default)]
pub struct Ledger {
    records: BTreeMap<u32, WalletRecord>,
    loaded_from: Option<PathBuf>,
}

/// Balances of a wallet before and after a settlement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceChange {
    pub sol_before: f64,
    pub token_before: f64,
    pub sol_after: f64,
    pub token_after: f64,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from records (later duplicates of an index are dropped)
    pub fn from_records(records: impl IntoIterator<Item = WalletRecord>) -> Self {
        let mut ledger = Self::new();
        ledger.replace(records);
        ledger
    }

    /// Replace the whole ledger with the snapshot at `path`
    ///
    /// On error the previous contents are left untouched.
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        let records = snapshot::read_snapshot(path)?;
        self.replace(records);
        self.loaded_from = Some(path.to_path_buf());

        info!("Loaded {} wallets from {}", self.records.len(), path.display());
        Ok(self.records.len())
    }

    fn replace(&mut self, records: impl IntoIterator<Item = WalletRecord>) {
        self.records.clear();
        for record in records {
            if self.records.contains_key(&record.index) {
                warn!(wallet = record.index, "Duplicate wallet index in snapshot, keeping first");
                continue;
            }
            self.records.insert(record.index, record);
        }
    }

    /// Write the current balances back to the snapshot they were loaded from
    pub fn flush(&self) -> Result<()> {
        match &self.loaded_from {
            Some(path) => self.flush_to(path),
            None => {
                debug!("Ledger was not loaded from a file, nothing to flush");
                Ok(())
            }
        }
    }

    /// Write the current balances to `path`
    pub fn flush_to(&self, path: &Path) -> Result<()> {
        let written = snapshot::write_snapshot(path, self.records.values())?;
        debug!("Flushed {} wallets to {}", written, path.display());
        Ok(())
    }

    /// Sum of balances over all records (zero if empty)
    pub fn totals(&self) -> Totals {
        self.records.values().fold(Totals::default(), |acc, r| Totals {
            total_sol: acc.total_sol + r.sol_balance,
            total_token: acc.total_token + r.token_balance,
        })
    }

    /// Records in index order
    pub fn records(&self) -> impl Iterator<Item = &WalletRecord> {
        self.records.values()
    }

    pub fn get(&self, index: u32) -> Option<&WalletRecord> {
        self.records.get(&index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Book a successful swap against a wallet
    ///
    /// BUY: `sol -= amount + fee; token += amount`.
    /// SELL: `token -= amount; sol += amount - fee`.
    /// Results are clamped: non-finite balances reset both sides to zero,
    /// negative balances become zero. Returns `None` when the wallet is
    /// unknown or the amount is not a positive finite number.
    pub fn apply_update(
        &mut self,
        index: u32,
        amount: f64,
        direction: Direction,
    ) -> Option<BalanceChange> {
        if !amount.is_finite() || amount <= 0.0 {
            error!(wallet = index, amount, "Invalid settlement amount, ignoring");
            return None;
        }

        let Some(wallet) = self.records.get_mut(&index) else {
            warn!(wallet = index, "Settlement for unknown wallet, ignoring");
            return None;
        };

        let sol_before = wallet.sol_balance;
        let token_before = wallet.token_balance;

        match direction {
            Direction::Buy => {
                wallet.sol_balance -= amount + SWAP_FEE_SOL;
                wallet.token_balance += amount;
            }
            Direction::Sell => {
                wallet.token_balance -= amount;
                wallet.sol_balance += amount - SWAP_FEE_SOL;
            }
        }

        if !wallet.sol_balance.is_finite() || !wallet.token_balance.is_finite() {
            error!(
                wallet = index,
                sol = wallet.sol_balance,
                token = wallet.token_balance,
                "Invalid balance detected, resetting to zero"
            );
            wallet.sol_balance = 0.0;
            wallet.token_balance = 0.0;
        }

        wallet.sol_balance = wallet.sol_balance.max(0.0);
        wallet.token_balance = wallet.token_balance.max(0.0);

        let change = BalanceChange {
            sol_before,
            token_before,
            sol_after: wallet.sol_balance,
            token_after: wallet.token_balance,
        };

        debug!(
            wallet = index,
            %direction,
            amount,
            fee = SWAP_FEE_SOL,
            sol_before,
            token_before,
            sol_after = change.sol_after,
            token_after = change.token_after,
            "Balance updated"
        );

        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::Credential;
    use tempfile::tempdir;

    fn wallet(index: u32, sol: f64, token: f64) -> WalletRecord {
        WalletRecord::new(index, format!("Addr{}", index), Credential::new("k"), sol, token)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_totals() {
        assert_eq!(Ledger::new().totals(), Totals::default());

        let ledger = Ledger::from_records(vec![wallet(1, 1.5, 10.0), wallet(2, 2.5, 30.0)]);
        let totals = ledger.totals();
        assert_eq!(totals.total_sol, 4.0);
        assert_eq!(totals.total_token, 40.0);
    }

    #[test]
    fn test_records_ordered_by_index_and_deduplicated() {
        let ledger = Ledger::from_records(vec![
            wallet(3, 1.0, 0.0),
            wallet(1, 2.0, 0.0),
            wallet(3, 9.0, 0.0),
        ]);

        let indexes: Vec<u32> = ledger.records().map(|r| r.index).collect();
        assert_eq!(indexes, vec![1, 3]);
        assert_eq!(ledger.get(3).unwrap().sol_balance, 1.0);
    }

    #[test]
    fn test_buy_update() {
        let mut ledger = Ledger::from_records(vec![wallet(1, 10.0, 0.0)]);
        let change = ledger.apply_update(1, 2.0, Direction::Buy).unwrap();

        assert!(approx(change.sol_after, 10.0 - 2.0 - SWAP_FEE_SOL));
        assert!(approx(change.token_after, 2.0));
        assert_eq!(change.sol_before, 10.0);
    }

    #[test]
    fn test_sell_update() {
        let mut ledger = Ledger::from_records(vec![wallet(1, 1.0, 500.0)]);
        ledger.apply_update(1, 100.0, Direction::Sell).unwrap();

        let record = ledger.get(1).unwrap();
        assert!(approx(record.token_balance, 400.0));
        assert!(approx(record.sol_balance, 1.0 + 100.0 - SWAP_FEE_SOL));
    }

    #[test]
    fn test_update_never_goes_negative() {
        let mut ledger = Ledger::from_records(vec![wallet(1, 0.0001, 0.0), wallet(2, 0.0, 1.0)]);

        ledger.apply_update(1, 5.0, Direction::Buy).unwrap();
        assert_eq!(ledger.get(1).unwrap().sol_balance, 0.0);

        ledger.apply_update(2, 0.00001, Direction::Sell).unwrap();
        let record = ledger.get(2).unwrap();
        assert_eq!(record.sol_balance, 0.0);
        assert!(record.token_balance >= 0.0);
    }

    #[test]
    fn test_overflow_resets_to_zero() {
        let mut ledger = Ledger::from_records(vec![wallet(1, 1.0, f64::MAX)]);
        ledger.apply_update(1, f64::MAX, Direction::Buy).unwrap();

        let record = ledger.get(1).unwrap();
        assert_eq!(record.sol_balance, 0.0);
        assert_eq!(record.token_balance, 0.0);
    }

    #[test]
    fn test_invalid_amount_is_ignored() {
        let mut ledger = Ledger::from_records(vec![wallet(1, 1.0, 1.0)]);

        assert!(ledger.apply_update(1, 0.0, Direction::Buy).is_none());
        assert!(ledger.apply_update(1, -1.0, Direction::Buy).is_none());
        assert!(ledger.apply_update(1, f64::NAN, Direction::Sell).is_none());
        assert!(ledger.apply_update(9, 1.0, Direction::Sell).is_none());

        assert_eq!(ledger.get(1).unwrap(), &wallet(1, 1.0, 1.0));
    }

    #[test]
    fn test_updates_are_order_independent() {
        let records = vec![wallet(1, 5.0, 10.0), wallet(2, 3.0, 20.0), wallet(3, 1.0, 30.0)];
        let updates = [(1, 1.0), (2, 0.5), (3, 0.25)];

        let mut forward = Ledger::from_records(records.clone());
        for (i, amount) in updates {
            forward.apply_update(i, amount, Direction::Buy);
        }

        let mut reverse = Ledger::from_records(records);
        for (i, amount) in updates.iter().rev() {
            reverse.apply_update(*i, *amount, Direction::Buy);
        }

        let (a, b) = (forward.totals(), reverse.totals());
        assert!(approx(a.total_sol, b.total_sol));
        assert!(approx(a.total_token, b.total_token));
        assert!(approx(a.total_sol, 9.0 - 1.75 - 3.0 * SWAP_FEE_SOL));
        assert!(approx(a.total_token, 61.75));
    }

    #[test]
    fn test_load_replaces_contents_and_flushes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet_balances.csv");
        std::fs::write(&path, "index,pub_key,pr_key,sol_bal,token_bal\n1,A,K,2,0\n").unwrap();

        let mut ledger = Ledger::from_records(vec![wallet(7, 100.0, 0.0)]);
        assert_eq!(ledger.load(&path).unwrap(), 1);
        assert!(ledger.get(7).is_none());

        ledger.apply_update(1, 1.0, Direction::Buy).unwrap();
        ledger.flush().unwrap();

        let mut reloaded = Ledger::new();
        reloaded.load(&path).unwrap();
        assert!(approx(reloaded.get(1).unwrap().sol_balance, 1.0 - SWAP_FEE_SOL));
        assert!(approx(reloaded.get(1).unwrap().token_balance, 1.0));
    }

    #[test]
    fn test_failed_load_keeps_previous_contents() {
        let dir = tempdir().unwrap();
        let mut ledger = Ledger::from_records(vec![wallet(1, 1.0, 0.0)]);

        assert!(ledger.load(&dir.path().join("missing.csv")).is_err());
        assert_eq!(ledger.len(), 1);
    }
}
