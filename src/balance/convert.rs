//! Wallet list conversion
//!
//! `wallets.txt` holds one wallet per line as `index pub_key pr_key`
//! separated by spaces. The balance source reads the comma-separated form.

use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};

/// Convert a space-separated wallet list into CSV, returning the row count
pub fn convert_txt_to_csv(input: &Path, output: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(input)
        .map_err(|e| Error::WalletList(format!("Failed to read {}: {}", input.display(), e)))?;

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(output)?;

    let mut rows = 0;
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        writer.write_record(line.split_whitespace())?;
        rows += 1;
    }
    writer.flush()?;

    info!(
        "Converted {} to {} ({} wallets)",
        input.display(),
        output.display(),
        rows
    );
    Ok(rows)
}
