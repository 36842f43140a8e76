//! # ChainPay Vault
//!
//! Symmetric encryption of custodial wallet private keys at rest.
//!
//! Custodial key material is only ever stored encrypted; the vault decrypts
//! it into a zeroize-on-drop wrapper for the duration of a single signing
//! operation inside a gateway's send path.
//!
//! ## Protection contexts
//!
//! A vault is scoped to one named protection context, bound into the AEAD
//! as associated data. Ciphertext produced under one context cannot be
//! decrypted under another, so key material encrypted for custodial
//! wallets can never be unwrapped by a vault instance created for any
//! other purpose.
//!
//! ## Example
//!
//! ```rust
//! use chainpay_vault::SecretVault;
//!
//! let vault = SecretVault::new([7u8; 32], "custodial-wallets");
//! let ciphertext = vault.encrypt("L1aW4aubDFB7yfras2S1mN3bqg9nwySY8nkoLmJebSLD5BWv3ENZ").unwrap();
//! let key = vault.decrypt(&ciphertext).unwrap();
//! assert!(key.expose().starts_with("L1aW"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod vault;

pub use vault::SecretVault;
