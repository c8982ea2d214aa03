//! Volume Cycler Library
//!
//! Repeatedly sizes a random buy or sell against the aggregate balance of a
//! wallet pool, spreads it over as few wallets as possible and swaps them one
//! by one under a hard timeout.

pub mod balance;
pub mod cli;
pub mod config;
pub mod cycle;
pub mod error;
pub mod ledger;
pub mod strategy;
pub mod trading;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
