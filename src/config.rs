//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;

use crate::trading::swap_api::{PoolType, DEFAULT_TRADE_API_URL};

/// Bare environment variables accepted alongside `CYCLER__*`
const ENV_OVERRIDES: [(&str, &str); 6] = [
    ("A", "cycle.min_percent"),
    ("B", "cycle.max_percent"),
    ("DELAY_SECONDS", "cycle.cycle_delay_secs"),
    ("AMM_ID", "pool.amm_id"),
    ("MINT", "pool.mint"),
    ("SOLANA_ENDPOINT", "rpc.endpoint"),
];

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    pub pool: PoolConfig,
    pub cycle: CycleConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Give up retrying a single balance call after this long
    #[serde(default = "default_retry_max_elapsed_ms")]
    pub retry_max_elapsed_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_ms: default_timeout_ms(),
            retry_max_elapsed_ms: default_retry_max_elapsed_ms(),
        }
    }
}

/// Traded pool and asset
///
/// Swaps are routed by `mint` and `pool_kind`: the trade API picks the pool
/// itself and takes no pool address. `amm_id` identifies the expected pool
/// for logs and `config` output only, and must be a valid address when set.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// AMM pool id, not sent with swaps
    #[serde(default)]
    pub amm_id: String,
    /// Token mint address
    pub mint: String,
    #[serde(default = "default_trade_api_url")]
    pub trade_api_url: String,
    #[serde(default)]
    pub pool_kind: PoolType,
    #[serde(default = "default_slippage_pct")]
    pub slippage_pct: u32,
    #[serde(default = "default_priority_fee_sol")]
    pub priority_fee_sol: f64,
}

/// Cycle pacing and sizing bounds
#[derive(Debug, Clone, Deserialize)]
pub struct CycleConfig {
    /// Lower percentage bound (inclusive)
    pub min_percent: f64,
    /// Upper percentage bound (exclusive)
    pub max_percent: f64,
    #[serde(default = "default_per_swap_timeout_ms")]
    pub per_swap_timeout_ms: u64,
    #[serde(default = "default_inter_swap_delay_ms")]
    pub inter_swap_delay_ms: u64,
    #[serde(default = "default_cycle_delay_secs")]
    pub cycle_delay_secs: u64,
    /// Pause after a failed refresh (0 retries immediately)
    #[serde(default)]
    pub refresh_retry_delay_ms: u64,
    /// Write settled balances back to the snapshot after each cycle
    #[serde(default)]
    pub persist_after_settle: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_wallets_txt")]
    pub wallets_txt: String,
    #[serde(default = "default_wallets_csv")]
    pub wallets_csv: String,
    #[serde(default = "default_balances_csv")]
    pub balances_csv: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            wallets_txt: default_wallets_txt(),
            wallets_csv: default_wallets_csv(),
            balances_csv: default_balances_csv(),
        }
    }
}

// Default value functions
fn default_rpc_endpoint() -> String {
    "https://api.mainnet-beta.solana.com".into()
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_retry_max_elapsed_ms() -> u64 {
    3000
}

fn default_trade_api_url() -> String {
    DEFAULT_TRADE_API_URL.into()
}

fn default_slippage_pct() -> u32 {
    10
}

fn default_priority_fee_sol() -> f64 {
    0.00005
}

fn default_per_swap_timeout_ms() -> u64 {
    5000
}

fn default_inter_swap_delay_ms() -> u64 {
    1000
}

fn default_cycle_delay_secs() -> u64 {
    60
}

fn default_wallets_txt() -> String {
    "wallets.txt".into()
}

fn default_wallets_csv() -> String {
    "wallets.csv".into()
}

fn default_balances_csv() -> String {
    "wallet_balances.csv".into()
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path.as_ref()).required(false))
            // Override with environment variables (prefix CYCLER_)
            .add_source(
                config::Environment::with_prefix("CYCLER")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(key, std::env::var(var).ok())?;
        }

        let config: Config = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// `min_percent > max_percent` is accepted; sizing interpolates either way.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_percent", self.cycle.min_percent),
            ("max_percent", self.cycle.max_percent),
        ] {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{} must be a non-negative number, got {}", name, value);
            }
        }

        if self.cycle.min_percent > self.cycle.max_percent {
            tracing::warn!(
                "min_percent ({}) is above max_percent ({}), percentages will fall between them",
                self.cycle.min_percent,
                self.cycle.max_percent
            );
        }

        if self.cycle.per_swap_timeout_ms == 0 {
            anyhow::bail!("per_swap_timeout_ms must be positive");
        }

        if self.pool.mint.trim().is_empty() {
            anyhow::bail!("pool.mint must be set (or MINT in the environment)");
        }

        if !self.pool.amm_id.trim().is_empty() && Pubkey::from_str(self.pool.amm_id.trim()).is_err() {
            anyhow::bail!("pool.amm_id is not a valid address: {}", self.pool.amm_id);
        }

        if self.pool.slippage_pct > 100 {
            anyhow::bail!("slippage_pct cannot exceed 100");
        }

        if !self.pool.priority_fee_sol.is_finite() || self.pool.priority_fee_sol < 0.0 {
            anyhow::bail!("priority_fee_sol must be a non-negative number");
        }

        if self.cycle.refresh_retry_delay_ms == 0 {
            tracing::debug!("Refresh failures retry immediately (no backoff)");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    timeout: {}ms
  Pool:
    amm_id: {}
    mint: {}
    trade_api: {}
    pool_kind: {}
    slippage: {}%
    priority_fee: {} SOL
  Cycle:
    percent range: {}% .. {}%
    per_swap_timeout: {}ms
    inter_swap_delay: {}ms
    cycle_delay: {}s
    refresh_retry_delay: {}ms
    persist_after_settle: {}
  Files:
    wallets_txt: {}
    wallets_csv: {}
    balances_csv: {}
"#,
            mask_url(&self.rpc.endpoint),
            self.rpc.timeout_ms,
            if self.pool.amm_id.is_empty() {
                "(not set)"
            } else {
                self.pool.amm_id.as_str()
            },
            self.pool.mint,
            mask_url(&self.pool.trade_api_url),
            self.pool.pool_kind,
            self.pool.slippage_pct,
            self.pool.priority_fee_sol,
            self.cycle.min_percent,
            self.cycle.max_percent,
            self.cycle.per_swap_timeout_ms,
            self.cycle.inter_swap_delay_ms,
            self.cycle.cycle_delay_secs,
            self.cycle.refresh_retry_delay_ms,
            self.cycle.persist_after_settle,
            self.files.wallets_txt,
            self.files.wallets_csv,
            self.files.balances_csv,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}
