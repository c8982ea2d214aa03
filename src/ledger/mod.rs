//! Balance ledger
//!
//! ```text
//! BalanceSource ─▶ snapshot.csv ─▶ Ledger ─▶ SizingPolicy / allocate()
//!                                    ▲
//!                          settlement (apply_update)
//! ```

pub mod book;
pub mod snapshot;
pub mod types;

pub use book::{BalanceChange, Ledger};
pub use types::{Credential, Totals, WalletRecord};
