//! AES-256-GCM vault implementation.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use tracing::instrument;
use zeroize::Zeroizing;

use chainpay_core::error::{ChainPayError, Result};
use chainpay_core::types::SecretMaterial;

/// Nonce length of AES-GCM, prefixed to every ciphertext.
const NONCE_LEN: usize = 12;

/// Encrypts and decrypts custodial key material under one protection
/// context.
///
/// The wire form is `hex(nonce || ciphertext)` with the context string as
/// AEAD associated data. A fresh random nonce is drawn per encryption, so
/// encrypting the same key twice yields different ciphertext.
pub struct SecretVault {
    cipher: Aes256Gcm,
    context: String,
}

impl SecretVault {
    /// Creates a vault from a 32-byte master key, scoped to the named
    /// protection context.
    pub fn new(master_key: [u8; 32], context: impl Into<String>) -> Self {
        let key = Zeroizing::new(master_key);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));
        Self {
            cipher,
            context: context.into(),
        }
    }

    /// The protection context this vault is scoped to.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Encrypts plaintext key material for storage.
    #[instrument(skip_all, fields(context = %self.context))]
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: self.context.as_bytes(),
                },
            )
            .map_err(|_| ChainPayError::Vault("encryption failed".into()))?;

        let mut wire = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        wire.extend_from_slice(&nonce);
        wire.extend_from_slice(&ciphertext);
        Ok(hex::encode(wire))
    }

    /// Decrypts stored ciphertext into a zeroize-on-drop wrapper.
    ///
    /// The result must live no longer than the one signing operation it was
    /// decrypted for.
    #[instrument(skip_all, fields(context = %self.context))]
    pub fn decrypt(&self, ciphertext_hex: &str) -> Result<SecretMaterial> {
        let wire = hex::decode(ciphertext_hex)
            .map_err(|_| ChainPayError::Vault("ciphertext is not valid hex".into()))?;
        if wire.len() <= NONCE_LEN {
            return Err(ChainPayError::Vault("ciphertext too short".into()));
        }

        let (nonce, body) = wire.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: body,
                    aad: self.context.as_bytes(),
                },
            )
            .map_err(|_| ChainPayError::Vault("decryption failed".into()))?;

        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| ChainPayError::Vault("decrypted material is not valid UTF-8".into()))?;
        Ok(SecretMaterial::new(plaintext))
    }
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVault")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY: [u8; 32] = [0x5C; 32];

    #[test]
    fn test_round_trip() {
        let vault = SecretVault::new(KEY, "custodial-wallets");
        let ciphertext = vault.encrypt("cVt4o7BGAig1UXywgGSmARhxMdzP5qvQsxKkSsc1XEkw3tDTQFpy").unwrap();
        let recovered = vault.decrypt(&ciphertext).unwrap();
        assert_eq!(
            recovered.expose(),
            "cVt4o7BGAig1UXywgGSmARhxMdzP5qvQsxKkSsc1XEkw3tDTQFpy"
        );
    }

    #[test]
    fn test_nonce_freshness() {
        let vault = SecretVault::new(KEY, "custodial-wallets");
        let a = vault.encrypt("same-key").unwrap();
        let b = vault.encrypt("same-key").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_cross_context_rejection() {
        let wallets = SecretVault::new(KEY, "custodial-wallets");
        let other = SecretVault::new(KEY, "session-tokens");
        let ciphertext = wallets.encrypt("secret").unwrap();
        assert!(matches!(
            other.decrypt(&ciphertext),
            Err(ChainPayError::Vault(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let vault = SecretVault::new(KEY, "custodial-wallets");
        let mut ciphertext = vault.encrypt("secret").unwrap();
        // Flip the last nibble
        let flipped = if ciphertext.ends_with('0') { '1' } else { '0' };
        ciphertext.pop();
        ciphertext.push(flipped);
        assert!(vault.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn test_garbage_inputs() {
        let vault = SecretVault::new(KEY, "custodial-wallets");
        assert!(vault.decrypt("not-hex!").is_err());
        assert!(vault.decrypt("00ff").is_err()); // shorter than a nonce
    }

    proptest! {
        #[test]
        fn prop_round_trip_any_key_material(plaintext in "[ -~]{1,128}") {
            let vault = SecretVault::new(KEY, "custodial-wallets");
            let ciphertext = vault.encrypt(&plaintext).unwrap();
            let recovered = vault.decrypt(&ciphertext).unwrap();
            prop_assert_eq!(recovered.expose(), plaintext);
        }
    }
}
