//! Dry-run executor
//!
//! Validates the credential and returns a synthetic transaction id without
//! touching the network.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::executor::{SwapExecutor, SwapRequest};
use crate::error::Result;

pub struct DryRunExecutor {
    counter: AtomicU64,
    latency: Duration,
}

impl DryRunExecutor {
    pub fn new(latency: Duration) -> Self {
        Self {
            counter: AtomicU64::new(0),
            latency,
        }
    }
}

impl Default for DryRunExecutor {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl SwapExecutor for DryRunExecutor {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn execute(&self, request: SwapRequest) -> Result<String> {
        request.credential.to_keypair(request.wallet_index)?;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            wallet = request.wallet_index,
            amount = request.amount,
            direction = %request.direction,
            "[DRY RUN] Would swap"
        );

        Ok(format!("dry-run-{}", n))
    }
}
