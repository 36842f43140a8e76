//! # ChainPay Ledger
//!
//! Per-user running balances — the single source of truth for withdrawable
//! funds.
//!
//! Balances are mutated exclusively through [`EarningsLedger::credit`],
//! [`EarningsLedger::debit`], and [`EarningsLedger::refund`]; no other
//! component writes balances. Each primitive operation is atomic per
//! account. The cross-operation serialization a withdrawal needs (read
//! balance, broadcast, debit) is owned by the withdrawal engine, which
//! holds a per-(user, currency) lock around that critical section.
//!
//! The invariant, per user and currency:
//!
//! ```text
//! current_balance = total_earned − Σ(completed withdrawal debits)
//!                                + Σ(refunds of failed withdrawals)
//! ```
//!
//! Fiat mirrors are display convenience, never a source of truth, and
//! never gate a debit.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod ledger;

pub use ledger::{CurrencyBalance, EarningsAccount, EarningsLedger};
