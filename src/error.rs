//! Error types for the volume cycler

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the volume cycler
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid credential for wallet {index}: {reason}")]
    InvalidCredential { index: u32, reason: String },

    // Ledger snapshot errors
    #[error("Balance snapshot not found: {0}")]
    SnapshotMissing(String),

    #[error("Balance snapshot malformed: {0}")]
    SnapshotMalformed(String),

    #[error("Wallet list error: {0}")]
    WalletList(String),

    // RPC errors
    #[error("RPC error: {0}")]
    Rpc(String),

    // Swap errors
    #[error("Trade API error: {0}")]
    TradeApi(String),

    #[error("Transaction build failed: {0}")]
    TransactionBuild(String),

    #[error("Transaction send failed: {0}")]
    TransactionSend(String),

    #[error("Swap timed out after {0}ms")]
    SwapTimeout(u64),

    #[error("Swap task aborted: {0}")]
    SwapAborted(String),

    // Cycle errors
    #[error("Balance refresh failed: {0}")]
    BalanceRefresh(String),

    #[error("Cannot distribute {target} across wallets for {direction}")]
    DistributionFailed { direction: String, target: f64 },

    // Parse errors
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Rpc(_) | Error::TradeApi(_) | Error::TransactionSend(_)
        )
    }

    /// Errors that abort a cycle at the refresh step rather than a single swap
    pub fn is_refresh_failure(&self) -> bool {
        matches!(
            self,
            Error::BalanceRefresh(_)
                | Error::SnapshotMissing(_)
                | Error::SnapshotMalformed(_)
                | Error::WalletList(_)
        )
    }
}

// Conversion from solana_client errors
impl From<solana_client::client_error::ClientError> for Error {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        Error::Rpc(e.to_string())
    }
}

// Conversion from csv errors
impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::SnapshotMalformed(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
