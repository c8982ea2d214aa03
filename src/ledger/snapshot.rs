//! Persisted balance snapshot
//!
//! Plain CSV with the columns `index,pub_key,pr_key,sol_bal,token_bal`.
//! Written by the balance source, read back by the ledger at the start of
//! every cycle. Rows with the wrong field count or unparseable numbers are
//! skipped with a warning; only a missing or unreadable file is fatal.

use std::path::Path;

use tracing::{debug, warn};

use super::types::{Credential, WalletRecord};
use crate::error::{Error, Result};

/// Snapshot header row
pub const SNAPSHOT_HEADER: [&str; 5] = ["index", "pub_key", "pr_key", "sol_bal", "token_bal"];

const SNAPSHOT_FIELDS: usize = SNAPSHOT_HEADER.len();

/// Read all well-formed wallet rows from a snapshot file
pub fn read_snapshot(path: &Path) -> Result<Vec<WalletRecord>> {
    if !path.exists() {
        return Err(Error::SnapshotMissing(path.display().to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut records = Vec::new();

    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                warn!(line, "Skipping malformed snapshot row: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        if row.iter().all(str::is_empty) {
            continue;
        }

        if row.get(0).is_some_and(|f| f.starts_with("index")) {
            continue;
        }

        if row.len() != SNAPSHOT_FIELDS {
            warn!(
                line,
                fields = row.len(),
                "Skipping malformed snapshot row: {}",
                row.iter().collect::<Vec<_>>().join(",")
            );
            continue;
        }

        match parse_row(&row) {
            Ok(record) => records.push(record),
            Err(reason) => {
                warn!(line, "Skipping malformed snapshot row: {}", reason);
            }
        }
    }

    debug!("Read {} wallet rows from {}", records.len(), path.display());
    Ok(records)
}

fn parse_row(row: &csv::StringRecord) -> std::result::Result<WalletRecord, String> {
    let index: u32 = row[0]
        .parse()
        .map_err(|_| format!("invalid index '{}'", &row[0]))?;
    let sol: f64 = row[3]
        .parse()
        .map_err(|_| format!("invalid sol_bal '{}' for wallet {}", &row[3], index))?;
    let token: f64 = row[4]
        .parse()
        .map_err(|_| format!("invalid token_bal '{}' for wallet {}", &row[4], index))?;

    if !(sol.is_finite() && sol >= 0.0 && token.is_finite() && token >= 0.0) {
        warn!(
            wallet = index,
            sol, token, "Out-of-range balance in snapshot, clamping to zero"
        );
    }

    Ok(WalletRecord::new(
        index,
        &row[1],
        Credential::new(&row[2]),
        sol,
        token,
    ))
}

/// Write records with full-precision balances
pub fn write_snapshot<'a, I>(path: &Path, records: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a WalletRecord>,
{
    write_with(path, records, |v| v.to_string())
}

/// Multiply every balance by `factor` and write the result to `output`
///
/// Balances are rounded to 9 decimals (lamport precision for SOL).
pub fn scale_snapshot(input: &Path, output: &Path, factor: f64) -> Result<usize> {
    if !factor.is_finite() || factor < 0.0 {
        return Err(Error::Config(format!(
            "scale factor must be finite and non-negative, got {}",
            factor
        )));
    }

    let scaled: Vec<WalletRecord> = read_snapshot(input)?
        .into_iter()
        .map(|r| {
            WalletRecord::new(
                r.index,
                r.public_address,
                r.credential,
                r.sol_balance * factor,
                r.token_balance * factor,
            )
        })
        .collect();

    write_with(output, &scaled, |v| format!("{:.9}", v))
}

fn write_with<'a, I, F>(path: &Path, records: I, fmt: F) -> Result<usize>
where
    I: IntoIterator<Item = &'a WalletRecord>,
    F: Fn(f64) -> String,
{
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(SNAPSHOT_HEADER)?;

    let mut written = 0;
    for record in records {
        writer.write_record([
            record.index.to_string(),
            record.public_address.clone(),
            record.credential.expose().to_string(),
            fmt(record.sol_balance),
            fmt(record.token_balance),
        ])?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_snapshot_is_error() {
        let dir = tempdir().unwrap();
        let result = read_snapshot(&dir.path().join("nope.csv"));
        assert!(matches!(result, Err(Error::SnapshotMissing(_))));
    }

    #[test]
    fn test_read_skips_header_blank_and_malformed_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet_balances.csv");
        std::fs::write(
            &path,
            "index,pub_key,pr_key,sol_bal,token_bal\n\
             1,AddrOne,KeyOne,1.5,200\n\
             \n\
             2,AddrTwo,KeyTwo,0.25\n\
             3, AddrThree , KeyThree ,2,0\n\
             x,AddrBad,KeyBad,1,1\n",
        )
        .unwrap();

        let records = read_snapshot(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 1);
        assert_eq!(records[0].sol_balance, 1.5);
        assert_eq!(records[0].token_balance, 200.0);
        assert_eq!(records[1].index, 3);
        assert_eq!(records[1].public_address, "AddrThree");
        assert_eq!(records[1].credential.expose(), "KeyThree");
    }

    #[test]
    fn test_read_skips_row_with_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet_balances.csv");
        let mut content = b"1,A,K,1,1\n2,B".to_vec();
        content.push(0xff);
        content.extend_from_slice(b",K,1,1\n3,C,K,2,2\n");
        std::fs::write(&path, content).unwrap();

        let records = read_snapshot(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 1);
        assert_eq!(records[1].index, 3);
        assert_eq!(records[1].sol_balance, 2.0);
    }

    #[test]
    fn test_read_clamps_invalid_balances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet_balances.csv");
        std::fs::write(&path, "1,A,K,NaN,-4\n2,B,K,inf,3\n").unwrap();

        let records = read_snapshot(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sol_balance, 0.0);
        assert_eq!(records[0].token_balance, 0.0);
        assert_eq!(records[1].sol_balance, 0.0);
        assert_eq!(records[1].token_balance, 3.0);
    }

    #[test]
    fn test_write_then_read_preserves_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet_balances.csv");
        let records = vec![
            WalletRecord::new(1, "A", Credential::new("KA"), 0.123456789, 10.0),
            WalletRecord::new(2, "B", Credential::new("KB"), 2.0, 0.5),
        ];

        assert_eq!(write_snapshot(&path, &records).unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("index,pub_key,pr_key,sol_bal,token_bal\n"));

        assert_eq!(read_snapshot(&path).unwrap(), records);
    }

    #[test]
    fn test_scale_snapshot() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("wallet_balances.csv");
        let output = dir.path().join("updated_wallet_balances.csv");
        std::fs::write(&input, "index,pub_key,pr_key,sol_bal,token_bal\n1,A,K,1,1000\n").unwrap();

        assert_eq!(scale_snapshot(&input, &output, 0.9).unwrap(), 1);

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("1,A,K,0.900000000,900.000000000"));
    }

    #[test]
    fn test_scale_rejects_bad_factor() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, "1,A,K,1,1\n").unwrap();

        assert!(scale_snapshot(&input, &output, -1.0).is_err());
        assert!(scale_snapshot(&input, &output, f64::NAN).is_err());
    }
}
