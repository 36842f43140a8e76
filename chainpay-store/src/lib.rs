//! # ChainPay Store
//!
//! In-memory backends for the ChainPay persistence traits.
//!
//! Suitable for development, testing, and single-process deployments; a
//! production deployment substitutes database-backed implementations of the
//! same traits. The payment store enforces the chain-transaction-hash
//! uniqueness that makes inbound verification idempotent.
//!
//! ## Example
//!
//! ```rust,ignore
//! use chainpay_store::{MemoryPaymentStore, MemoryWalletStore, MemoryWithdrawalStore};
//!
//! let wallets = MemoryWalletStore::new();
//! wallets.insert(custodial_wallet).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod memory;

pub use memory::{MemoryPaymentStore, MemoryWalletStore, MemoryWithdrawalStore};
