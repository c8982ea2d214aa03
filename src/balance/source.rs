//! Balance source abstraction

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Produces a fresh balance snapshot on disk
///
/// Called once per cycle. The returned path is what the ledger loads next;
/// any error aborts the cycle before sizing.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &str;

    /// Refresh balances and return the snapshot path
    async fn refresh(&self) -> Result<PathBuf>;
}

/// Uses an existing snapshot as-is (no network access)
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl BalanceSource for SnapshotFile {
    fn name(&self) -> &str {
        "snapshot-file"
    }

    async fn refresh(&self) -> Result<PathBuf> {
        if tokio::fs::try_exists(&self.path).await? {
            Ok(self.path.clone())
        } else {
            Err(Error::SnapshotMissing(self.path.display().to_string()))
        }
    }
}
