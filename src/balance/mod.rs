//! Balance refresh
//!
//! Everything that produces the persisted snapshot the ledger loads:
//! wallet list conversion, on-chain balance lookup, and a file-only source
//! for offline runs.

pub mod convert;
pub mod rpc;
pub mod source;

pub use rpc::{RetryPolicy, RpcBalanceSource};
pub use source::{BalanceSource, SnapshotFile};
