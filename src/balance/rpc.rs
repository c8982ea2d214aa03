//! RPC-backed balance source
//!
//! Reads the wallet list (`index,pub_key,pr_key`), queries SOL and token
//! balances for each wallet and writes the snapshot the ledger loads.
//! A failed lookup for a single wallet is logged and recorded as zero;
//! the refresh only fails when the wallet list is unusable or the RPC
//! endpoint answers no SOL balance query at all.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use tracing::{debug, error, info, warn};

use super::source::BalanceSource;
use crate::error::{Error, Result};
use crate::ledger::{snapshot, Credential, WalletRecord};

/// Retry policy for individual RPC calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            max_elapsed: Duration::from_secs(3),
        }
    }
}

/// Wallet entry from the wallet list
#[derive(Debug, Clone)]
pub struct ListedWallet {
    pub index: u32,
    pub public_address: String,
    pub credential: Credential,
}

/// Balance source querying a Solana RPC endpoint
pub struct RpcBalanceSource {
    rpc: Arc<RpcClient>,
    mint: Pubkey,
    wallet_list: PathBuf,
    snapshot_path: PathBuf,
    retry: RetryPolicy,
}

impl RpcBalanceSource {
    pub fn new(
        rpc: Arc<RpcClient>,
        mint: &str,
        wallet_list: impl AsRef<Path>,
        snapshot_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let mint = Pubkey::from_str(mint)
            .map_err(|e| Error::Config(format!("Invalid mint address {}: {}", mint, e)))?;

        Ok(Self {
            rpc,
            mint,
            wallet_list: wallet_list.as_ref().to_path_buf(),
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// SOL balance in whole SOL
    async fn sol_balance(&self, owner: &Pubkey) -> Result<f64> {
        let lamports = self
            .call_with_retry("get_balance", || self.rpc.get_balance(owner))
            .await?;
        Ok(lamports as f64 / LAMPORTS_PER_SOL as f64)
    }

    /// Token balance of the configured mint in UI units (0 without an account)
    async fn token_balance(&self, owner: &Pubkey) -> Result<f64> {
        let accounts = self
            .call_with_retry("get_token_accounts_by_owner", || {
                self.rpc
                    .get_token_accounts_by_owner(owner, TokenAccountsFilter::Mint(self.mint))
            })
            .await?;

        let Some(account) = accounts.first() else {
            return Ok(0.0);
        };

        let token_account = Pubkey::from_str(&account.pubkey)
            .map_err(|e| Error::Rpc(format!("Invalid token account {}: {}", account.pubkey, e)))?;

        let balance = self
            .call_with_retry("get_token_account_balance", || {
                self.rpc.get_token_account_balance(&token_account)
            })
            .await?;

        let raw: u64 = balance
            .amount
            .parse()
            .map_err(|_| Error::Deserialization(format!("Invalid token amount {}", balance.amount)))?;

        Ok(raw as f64 / 10f64.powi(i32::from(balance.decimals)))
    }

    async fn call_with_retry<T, F, Fut>(&self, method: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ClientError>>,
    {
        let backoff = ExponentialBackoff {
            initial_interval: self.retry.base_delay,
            max_interval: self.retry.base_delay * 4,
            max_elapsed_time: Some(self.retry.max_elapsed),
            ..Default::default()
        };

        retry(backoff, || {
            let call = op();
            async move {
                call.await.map_err(|e| {
                    let err = Error::from(e);
                    if err.is_retryable() {
                        debug!(method, "Retryable RPC error: {}", err);
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }
}

#[async_trait]
impl BalanceSource for RpcBalanceSource {
    fn name(&self) -> &str {
        "rpc"
    }

    async fn refresh(&self) -> Result<PathBuf> {
        let wallets = read_wallet_list(&self.wallet_list)?;
        info!("Fetching balances for {} wallets", wallets.len());

        let mut records = Vec::with_capacity(wallets.len());
        let mut sol_failures = 0;

        for wallet in wallets {
            let owner = match Pubkey::from_str(&wallet.public_address) {
                Ok(pk) => pk,
                Err(e) => {
                    warn!(wallet = wallet.index, "Invalid public key {}: {}", wallet.public_address, e);
                    continue;
                }
            };

            let (sol, token) = futures::join!(self.sol_balance(&owner), self.token_balance(&owner));

            let sol = match sol {
                Ok(sol) => sol,
                Err(e) => {
                    error!(wallet = wallet.index, "Error fetching SOL balance for {}: {}", owner, e);
                    sol_failures += 1;
                    0.0
                }
            };

            let token = match token {
                Ok(token) => token,
                Err(e) => {
                    error!(wallet = wallet.index, "Error fetching token balance for {}: {}", owner, e);
                    0.0
                }
            };

            debug!(wallet = wallet.index, sol, token, "Fetched balances");
            records.push(WalletRecord::new(
                wallet.index,
                wallet.public_address,
                wallet.credential,
                sol,
                token,
            ));
        }

        if records.is_empty() {
            return Err(Error::WalletList(format!(
                "No usable wallets in {}",
                self.wallet_list.display()
            )));
        }

        if sol_failures == records.len() {
            return Err(Error::BalanceRefresh(format!(
                "All {} SOL balance lookups failed",
                sol_failures
            )));
        }

        snapshot::write_snapshot(&self.snapshot_path, &records)?;
        info!("Wallet balances written to {}", self.snapshot_path.display());

        Ok(self.snapshot_path.clone())
    }
}

/// Read `index,pub_key,pr_key` rows, checking each secret against its address
///
/// Rows missing a key or with an undecodable secret are skipped. When the
/// secret's public key differs from the listed one, the derived key wins.
pub fn read_wallet_list(path: &Path) -> Result<Vec<ListedWallet>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::WalletList(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut wallets = Vec::new();

    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                warn!("Skipping unreadable wallet row: {}", e);
                continue;
            }
            Err(e) => return Err(Error::WalletList(e.to_string())),
        };

        let (Some(index), Some(public), Some(secret)) = (row.get(0), row.get(1), row.get(2)) else {
            continue;
        };
        if public.is_empty() || secret.is_empty() {
            continue;
        }

        let Ok(index) = index.parse::<u32>() else {
            warn!("Skipping wallet row with invalid index '{}'", index);
            continue;
        };

        let credential = Credential::new(secret);
        let keypair = match credential.to_keypair(index) {
            Ok(kp) => kp,
            Err(e) => {
                warn!(wallet = index, "Skipping wallet: {}", e);
                continue;
            }
        };

        let derived = keypair.pubkey().to_string();
        if derived != public {
            warn!(
                wallet = index,
                listed = public,
                derived = %derived,
                "Listed address does not match secret key, using derived address"
            );
        }

        wallets.push(ListedWallet {
            index,
            public_address: derived,
            credential,
        });
    }

    Ok(wallets)
}
