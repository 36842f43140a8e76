//! # ChainPay Settlement
//!
//! The orchestration layer of the custody engine:
//!
//! - [`WalletAllocator`]: picks a live custodial wallet for a currency
//! - [`InboundVerifier`]: matches claimed payments against the chain and
//!   credits the earnings ledger
//! - [`WithdrawalEngine`]: debits the ledger against a successful
//!   broadcast and reconciles the debit with the eventual on-chain
//!   outcome (compensating refund on failure)
//!
//! Everything chain-specific stays behind the gateway registry; this crate
//! never branches on a currency code.
//!
//! ## Correctness properties
//!
//! - Funds are never debited without a broadcast transaction hash to
//!   track; a failed broadcast leaves the ledger untouched.
//! - A failed withdrawal is refunded exactly once, on the
//!   `Pending → Failed` edge.
//! - Per-(user, currency) check-and-debit sections are serialized, so
//!   concurrent withdrawals cannot oversell a balance.
//! - A chain transaction settles at most one inbound payment record; a
//!   replayed verification reports the existing record without a second
//!   credit.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod allocator;
mod engine;
mod verifier;

#[cfg(test)]
pub(crate) mod testkit;

pub use allocator::WalletAllocator;
pub use engine::WithdrawalEngine;
pub use verifier::{InboundVerifier, PaymentClaim, VerifyOutcome};
