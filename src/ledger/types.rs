//! Core ledger types
//!
//! Wallet records as loaded from the balance snapshot, plus the opaque
//! credential handle the swap executor signs with.

use serde::{Deserialize, Serialize};
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

use crate::error::{Error, Result};

/// Base58-encoded secret key for a wallet
///
/// Never printed: `Debug` and `Display` are masked.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into().trim().to_string())
    }

    /// Raw base58 string, for writing the snapshot back out
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode into a signing keypair
    pub fn to_keypair(&self, index: u32) -> Result<Keypair> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| Error::InvalidCredential {
                index,
                reason: format!("base58 decode failed: {}", e),
            })?;

        Keypair::from_bytes(&bytes).map_err(|e| Error::InvalidCredential {
            index,
            reason: format!("invalid keypair bytes: {}", e),
        })
    }

    /// Public address derived from the secret key
    pub fn derive_address(&self, index: u32) -> Result<String> {
        Ok(self.to_keypair(index)?.pubkey().to_string())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(***)")
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "***")
    }
}

/// One wallet of the pool with its last known balances
#[derive(Debug, Clone, PartialEq)]
pub struct WalletRecord {
    /// Stable ordering key, unique within a ledger
    pub index: u32,
    pub public_address: String,
    pub credential: Credential,
    pub sol_balance: f64,
    pub token_balance: f64,
}

impl WalletRecord {
    pub fn new(
        index: u32,
        public_address: impl Into<String>,
        credential: Credential,
        sol_balance: f64,
        token_balance: f64,
    ) -> Self {
        Self {
            index,
            public_address: public_address.into(),
            credential,
            sol_balance: sanitize_balance(sol_balance),
            token_balance: sanitize_balance(token_balance),
        }
    }

    /// Short address for log lines
    pub fn short_address(&self) -> &str {
        let end = self.public_address.len().min(8);
        self.public_address
            .get(..end)
            .unwrap_or(&self.public_address)
    }
}

/// Aggregate balances over the whole ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total_sol: f64,
    pub total_token: f64,
}

/// Clamp a balance to a finite, non-negative value
pub fn sanitize_balance(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_is_masked() {
        let cred = Credential::new("supersecret");
        assert_eq!(format!("{:?}", cred), "Credential(***)");
        assert_eq!(cred.to_string(), "***");
        assert_eq!(cred.expose(), "supersecret");
    }

    #[test]
    fn test_credential_roundtrip_keypair() {
        let keypair = Keypair::new();
        let cred = Credential::new(keypair.to_base58_string());

        let decoded = cred.to_keypair(1).unwrap();
        assert_eq!(decoded.pubkey(), keypair.pubkey());
        assert_eq!(cred.derive_address(1).unwrap(), keypair.pubkey().to_string());
    }

    #[test]
    fn test_invalid_credential() {
        let cred = Credential::new("0OIl-not-base58");
        assert!(matches!(
            cred.to_keypair(3),
            Err(Error::InvalidCredential { index: 3, .. })
        ));

        let short = Credential::new(bs58::encode([1u8; 10]).into_string());
        assert!(short.to_keypair(4).is_err());
    }

    #[test]
    fn test_record_sanitizes_balances() {
        let record = WalletRecord::new(1, "addr", Credential::new("k"), f64::NAN, -3.0);
        assert_eq!(record.sol_balance, 0.0);
        assert_eq!(record.token_balance, 0.0);

        let record = WalletRecord::new(2, "addr", Credential::new("k"), f64::INFINITY, 5.0);
        assert_eq!(record.sol_balance, 0.0);
        assert_eq!(record.token_balance, 5.0);
    }

    #[test]
    fn test_short_address() {
        let record = WalletRecord::new(
            1,
            "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
            Credential::new("k"),
            1.0,
            0.0,
        );
        assert_eq!(record.short_address(), "7xKXtg2C");

        let tiny = WalletRecord::new(2, "abc", Credential::new("k"), 1.0, 0.0);
        assert_eq!(tiny.short_address(), "abc");
    }
}
