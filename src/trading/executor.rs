//! Swap execution
//!
//! The orchestrator only sees [`SwapExecutor`]: one request in, one
//! transaction signature or error out. Pool lookup, pricing and
//! transaction assembly are the executor's business.

use std::sync::Arc;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::VersionedTransaction;
use tracing::info;

use super::swap_api::{LocalTradeRequest, PoolType, TradeApiClient};
use crate::error::{Error, Result};
use crate::ledger::Credential;
use crate::strategy::Direction;

/// A single swap for a single wallet
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub wallet_index: u32,
    pub credential: Credential,
    pub amount: f64,
    pub direction: Direction,
}

/// Performs one swap and returns its transaction id
///
/// Implementations may hang; callers enforce their own timeout and may
/// abandon the returned future without further notice.
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    /// Executor name for logging
    fn name(&self) -> &str;

    async fn execute(&self, request: SwapRequest) -> Result<String>;
}

/// Trade parameters shared by every swap
#[derive(Debug, Clone)]
pub struct SwapParams {
    pub mint: String,
    pub pool: PoolType,
    pub slippage_pct: u32,
    pub priority_fee_sol: f64,
}

/// Builds the swap via the trade API, signs locally, submits over RPC
pub struct TradeApiExecutor {
    api: TradeApiClient,
    rpc: Arc<RpcClient>,
    params: SwapParams,
}

impl TradeApiExecutor {
    pub fn new(api: TradeApiClient, rpc: Arc<RpcClient>, params: SwapParams) -> Self {
        Self { api, rpc, params }
    }
}

#[async_trait]
impl SwapExecutor for TradeApiExecutor {
    fn name(&self) -> &str {
        "trade-api"
    }

    async fn execute(&self, request: SwapRequest) -> Result<String> {
        let keypair = request.credential.to_keypair(request.wallet_index)?;

        let trade = LocalTradeRequest::new(
            keypair.pubkey().to_string(),
            request.direction,
            &self.params.mint,
            request.amount,
            self.params.slippage_pct,
            self.params.priority_fee_sol,
            self.params.pool,
        );

        let bytes = self.api.build_transaction(&trade).await?;

        let unsigned: VersionedTransaction = bincode::deserialize(&bytes)
            .map_err(|e| Error::TransactionBuild(format!("Invalid transaction bytes: {}", e)))?;

        let signed = VersionedTransaction::try_new(unsigned.message, &[&keypair])
            .map_err(|e| Error::TransactionBuild(format!("Signing failed: {}", e)))?;

        let signature = self
            .rpc
            .send_and_confirm_transaction(&signed)
            .await
            .map_err(|e| Error::TransactionSend(e.to_string()))?;

        info!(
            wallet = request.wallet_index,
            "Transaction successful: https://solscan.io/tx/{}", signature
        );

        Ok(signature.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn executor() -> TradeApiExecutor {
        let api = TradeApiClient::new("http://127.0.0.1:9/api/trade-local", Duration::from_millis(200))
            .unwrap();
        let rpc = Arc::new(RpcClient::new("http://127.0.0.1:9".to_string()));
        TradeApiExecutor::new(
            api,
            rpc,
            SwapParams {
                mint: "So11111111111111111111111111111111111111112".to_string(),
                pool: PoolType::default(),
                slippage_pct: 10,
                priority_fee_sol: 0.0,
            },
        )
    }

    #[tokio::test]
    async fn test_invalid_credential_fails_before_network() {
        let result = executor()
            .execute(SwapRequest {
                wallet_index: 5,
                credential: Credential::new("definitely-not-a-key"),
                amount: 0.1,
                direction: Direction::Buy,
            })
            .await;

        assert!(matches!(
            result,
            Err(Error::InvalidCredential { index: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_api_failure_surfaces_as_error() {
        let keypair = solana_sdk::signature::Keypair::new();
        let result = executor()
            .execute(SwapRequest {
                wallet_index: 1,
                credential: Credential::new(keypair.to_base58_string()),
                amount: 0.1,
                direction: Direction::Sell,
            })
            .await;

        assert!(matches!(result, Err(Error::TradeApi(_))));
    }
}
