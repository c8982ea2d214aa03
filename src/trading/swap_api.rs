//! Trade API client
//!
//! Builds unsigned swap transactions through a PumpPortal-style local
//! trade endpoint. The endpoint answers with the serialized transaction
//! bytes; signing and submission stay local.
//!
//! API Documentation: https://pumpportal.fun/local-trading-api/trading-api

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::strategy::Direction;

/// Local Transaction API endpoint (build your own tx)
pub const DEFAULT_TRADE_API_URL: &str = "https://pumpportal.fun/api/trade-local";

/// Trade action
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl From<Direction> for TradeAction {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Buy => TradeAction::Buy,
            Direction::Sell => TradeAction::Sell,
        }
    }
}

/// Pool the trade is routed through
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolType {
    Pump,
    Raydium,
    #[default]
    RaydiumCpmm,
    PumpAmm,
    Auto,
}

impl std::fmt::Display for PoolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolType::Pump => write!(f, "pump"),
            PoolType::Raydium => write!(f, "raydium"),
            PoolType::RaydiumCpmm => write!(f, "raydium-cpmm"),
            PoolType::PumpAmm => write!(f, "pump-amm"),
            PoolType::Auto => write!(f, "auto"),
        }
    }
}

/// Local trade request (returns unsigned transaction)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalTradeRequest {
    /// Public key of the trader
    pub public_key: String,
    /// "buy" or "sell"
    pub action: TradeAction,
    /// Token mint address
    pub mint: String,
    /// SOL for buy, tokens for sell
    pub amount: f64,
    /// "true" if amount is in SOL
    pub denominated_in_sol: String,
    /// Slippage percentage
    pub slippage: u32,
    /// Priority fee in SOL
    pub priority_fee: f64,
    pub pool: PoolType,
}

impl LocalTradeRequest {
    pub fn new(
        public_key: String,
        direction: Direction,
        mint: &str,
        amount: f64,
        slippage: u32,
        priority_fee: f64,
        pool: PoolType,
    ) -> Self {
        Self {
            public_key,
            action: direction.into(),
            mint: mint.to_string(),
            amount,
            denominated_in_sol: direction.is_sol_denominated().to_string(),
            slippage,
            priority_fee,
            pool,
        }
    }
}

/// Client for the local trade endpoint
pub struct TradeApiClient {
    client: Client,
    url: String,
}

impl TradeApiClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::TradeApi(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request the serialized, unsigned transaction for a trade
    pub async fn build_transaction(&self, request: &LocalTradeRequest) -> Result<Vec<u8>> {
        debug!(
            action = ?request.action,
            amount = request.amount,
            pool = %request.pool,
            "Requesting swap transaction"
        );

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::TradeApi(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TradeApi(format!("{}: {}", status, body.trim())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::TradeApi(format!("Failed to read response: {}", e)))?;

        if bytes.is_empty() {
            return Err(Error::TransactionBuild("Empty transaction in response".to_string()));
        }

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_request_serialization() {
        let request = LocalTradeRequest::new(
            "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".to_string(),
            Direction::Buy,
            "DYw8jCTfwHNRJhhmFcbXvVDTqWMEVFBX6ZKUmG5CNSKK",
            0.01,
            10,
            0.00005,
            PoolType::RaydiumCpmm,
        );

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"action\":\"buy\""));
        assert!(json.contains("\"denominatedInSol\":\"true\""));
        assert!(json.contains("\"publicKey\":\"7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU\""));
        assert!(json.contains("\"pool\":\"raydium-cpmm\""));
    }

    #[test]
    fn test_sell_is_token_denominated() {
        let request = LocalTradeRequest::new(
            "pk".to_string(),
            Direction::Sell,
            "mint",
            1500.0,
            10,
            0.0,
            PoolType::Auto,
        );

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"action\":\"sell\""));
        assert!(json.contains("\"denominatedInSol\":\"false\""));
        assert!(json.contains("\"amount\":1500.0"));
    }

    #[test]
    fn test_pool_type_deserialize() {
        let pool: PoolType = serde_json::from_str("\"pump-amm\"").unwrap();
        assert_eq!(pool, PoolType::PumpAmm);
        assert_eq!(PoolType::default(), PoolType::RaydiumCpmm);
        assert_eq!(PoolType::RaydiumCpmm.to_string(), "raydium-cpmm");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_trade_api_error() {
        let client = TradeApiClient::new("http://127.0.0.1:9/api/trade-local", Duration::from_millis(200))
            .unwrap();
        let request = LocalTradeRequest::new(
            "pk".to_string(),
            Direction::Buy,
            "mint",
            0.1,
            10,
            0.0,
            PoolType::Auto,
        );

        let result = client.build_transaction(&request).await;
        assert!(matches!(result, Err(Error::TradeApi(_))));
    }
}
