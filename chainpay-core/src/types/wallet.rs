//! Wallet types.
//!
//! The platform holds pooled merchant funds in custodial wallets; users
//! withdraw to their own addresses, of which the engine only ever knows the
//! address string.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::Currency;

/// A blockchain address, stored as the chain-native string form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Wraps an address string. No chain-side validation happens here;
    /// liveness is checked against the explorer by the gateway.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into().trim().to_string())
    }

    /// The raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison. Ethereum addresses are hex and compare
    /// caseless; bitcoin base58/bech32 comparison is effectively exact
    /// because wallets emit a single canonical casing.
    pub fn matches(&self, other: &WalletAddress) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WalletAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A platform-controlled wallet holding pooled merchant funds.
///
/// The private key is stored only in encrypted form; decryption happens
/// inside the gateway's send path, through the vault, for the duration of
/// one signing operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustodialWallet {
    /// Wallet identifier.
    pub id: Uuid,
    /// Chain this wallet lives on.
    pub currency: Currency,
    /// Receiving/spending address.
    pub address: WalletAddress,
    /// Vault-encrypted private key material (hex ciphertext).
    pub encrypted_private_key: String,
    /// Operator-facing label.
    pub label: String,
}

impl CustodialWallet {
    /// Creates a custodial wallet record. The key must already be
    /// vault-encrypted; this type never sees plaintext.
    pub fn new(
        currency: Currency,
        address: WalletAddress,
        encrypted_private_key: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            currency,
            address,
            encrypted_private_key: encrypted_private_key.into(),
            label: label.into(),
        }
    }
}

/// Decrypted private-key material, alive only for a single signing
/// operation.
///
/// The wrapper zeroizes its contents on drop and deliberately implements
/// neither `Clone` nor `Serialize`, so plaintext keys cannot be copied out
/// of the signing path or end up in a log or store by accident.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretMaterial(String);

impl SecretMaterial {
    /// Wraps decrypted key material.
    pub fn new(plaintext: String) -> Self {
        Self(plaintext)
    }

    /// Exposes the plaintext to a signer. Callers must not persist or log
    /// the returned slice.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMaterial(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_matches_is_caseless() {
        let a = WalletAddress::new("0xAbCdEf0123");
        let b = WalletAddress::new("0xabcdef0123");
        assert!(a.matches(&b));
        assert!(!a.matches(&WalletAddress::new("0xabcdef0124")));
    }

    #[test]
    fn test_address_trims_whitespace() {
        assert_eq!(WalletAddress::new("  addr  ").as_str(), "addr");
    }

    #[test]
    fn test_secret_material_debug_is_redacted() {
        let secret = SecretMaterial::new("cVt4o7BGAig1UXy".into());
        assert_eq!(format!("{:?}", secret), "SecretMaterial(<redacted>)");
        assert_eq!(secret.expose(), "cVt4o7BGAig1UXy");
    }
}
