//! Cycle loop and per-cycle reporting

pub mod orchestrator;
pub mod report;

pub use orchestrator::{CycleSettings, CycleStep, Orchestrator};
pub use report::{CycleResult, SwapOutcome, SwapStatus};
