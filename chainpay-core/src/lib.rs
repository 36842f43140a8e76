//! # ChainPay Core
//!
//! Core types, errors, and capability traits for the ChainPay custody and
//! settlement engine.
//!
//! This crate provides the foundational building blocks used by all other
//! ChainPay crates:
//!
//! - **Types**: Domain models for currencies, wallets, withdrawals, and
//!   settled payments
//! - **Errors**: Comprehensive error taxonomy with context
//! - **Constants**: Matching tolerances, confirmation thresholds, unit scales
//! - **Traits**: Capability interfaces for chain gateways, signers, stores,
//!   and notification sinks
//!
//! ## Example
//!
//! ```rust
//! use chainpay_core::{Currency, WalletAddress};
//!
//! let currency: Currency = "btc".parse().unwrap();
//! assert_eq!(currency.code(), "BTC");
//! let addr = WalletAddress::new("tb1qexampleaddress");
//! assert!(!addr.as_str().is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{ChainPayError, GatewayError, Result};
pub use traits::*;
pub use types::*;
