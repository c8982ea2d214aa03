//! Trading module - swap execution
//!
//! Supports two execution methods:
//! - Trade API (unsigned tx from the API, signed and sent locally)
//! - Dry run (no network, synthetic transaction ids)

pub mod dry_run;
pub mod executor;
pub mod swap_api;

pub use dry_run::DryRunExecutor;
pub use executor::{SwapExecutor, SwapParams, SwapRequest, TradeApiExecutor};
pub use swap_api::{PoolType, TradeApiClient};
