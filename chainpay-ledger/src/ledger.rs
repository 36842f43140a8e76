//! Earnings ledger implementation.

use std::collections::HashMap;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use chainpay_core::error::{ChainPayError, Result};
use chainpay_core::types::Currency;

/// Running totals for one currency within an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyBalance {
    /// Lifetime earnings in this currency.
    pub total_earned: Decimal,
    /// Currently withdrawable balance.
    pub current_balance: Decimal,
}

/// One user's earnings account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EarningsAccount {
    /// Owning user.
    pub user_id: String,
    /// Per-currency running totals.
    pub balances: HashMap<Currency, CurrencyBalance>,
    /// Lifetime earnings mirrored in reference fiat.
    pub total_earned_fiat: Decimal,
    /// Withdrawable balance mirrored in reference fiat.
    pub current_balance_fiat: Decimal,
}

impl EarningsAccount {
    fn zeroed(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            balances: HashMap::new(),
            total_earned_fiat: Decimal::ZERO,
            current_balance_fiat: Decimal::ZERO,
        }
    }

    /// Withdrawable balance in the given currency.
    pub fn balance(&self, currency: Currency) -> Decimal {
        self.balances
            .get(&currency)
            .map(|b| b.current_balance)
            .unwrap_or_default()
    }

    /// Lifetime earnings in the given currency.
    pub fn total_earned(&self, currency: Currency) -> Decimal {
        self.balances
            .get(&currency)
            .map(|b| b.total_earned)
            .unwrap_or_default()
    }
}

/// The per-user earnings ledger.
///
/// Accounts are created lazily with zero balances at first touch and never
/// deleted. A detected inconsistency freezes the affected (user, currency)
/// pair: all further mutation is rejected pending manual review.
#[derive(Default)]
pub struct EarningsLedger {
    accounts: DashMap<String, EarningsAccount>,
    frozen: DashMap<(String, Currency), String>,
}

impl EarningsLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits earned income: raises both `total_earned` and
    /// `current_balance`, with the fiat mirrors alongside.
    pub fn credit(
        &self,
        user_id: &str,
        currency: Currency,
        amount: Decimal,
        amount_fiat: Decimal,
    ) -> Result<()> {
        self.check_mutable(user_id, currency, amount)?;
        let mut account = self
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| EarningsAccount::zeroed(user_id));
        let balance = account.balances.entry(currency).or_default();
        balance.total_earned += amount;
        balance.current_balance += amount;
        account.total_earned_fiat += amount_fiat;
        account.current_balance_fiat += amount_fiat;
        debug!(user_id, %currency, %amount, "ledger credited");
        Ok(())
    }

    /// Debits a withdrawal: checks sufficiency, then lowers
    /// `current_balance` and its fiat mirror. `total_earned` is lifetime
    /// and untouched.
    pub fn debit(
        &self,
        user_id: &str,
        currency: Currency,
        amount: Decimal,
        amount_fiat: Decimal,
    ) -> Result<()> {
        self.check_mutable(user_id, currency, amount)?;
        let mut account = self
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| EarningsAccount::zeroed(user_id));
        let balance = account.balances.entry(currency).or_default();

        if balance.current_balance < Decimal::ZERO {
            // A stored balance can only be negative if something outside
            // the credit/debit/refund primitives wrote it. Stop the
            // account rather than keep mutating on top of corruption.
            let detail = format!("stored balance is {}", balance.current_balance);
            drop(account);
            self.freeze(user_id, currency, &detail);
            error!(user_id, %currency, %detail, "ledger inconsistency detected");
            return Err(ChainPayError::LedgerInconsistency {
                user_id: user_id.to_string(),
                currency,
                detail,
            });
        }
        if balance.current_balance < amount {
            return Err(ChainPayError::InsufficientFunds {
                currency,
                requested: amount,
                available: balance.current_balance,
            });
        }

        balance.current_balance -= amount;
        account.current_balance_fiat -= amount_fiat;
        debug!(user_id, %currency, %amount, "ledger debited");
        Ok(())
    }

    /// Compensating credit for a failed withdrawal: restores
    /// `current_balance` (and the fiat mirror) without touching lifetime
    /// earnings.
    pub fn refund(
        &self,
        user_id: &str,
        currency: Currency,
        amount: Decimal,
        amount_fiat: Decimal,
    ) -> Result<()> {
        self.check_mutable(user_id, currency, amount)?;
        let mut account = self
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| EarningsAccount::zeroed(user_id));
        let balance = account.balances.entry(currency).or_default();
        balance.current_balance += amount;
        account.current_balance_fiat += amount_fiat;
        debug!(user_id, %currency, %amount, "ledger refunded");
        Ok(())
    }

    /// Snapshot of a user's account (zeroed if never touched).
    pub fn account(&self, user_id: &str) -> EarningsAccount {
        self.accounts
            .get(user_id)
            .map(|a| a.clone())
            .unwrap_or_else(|| EarningsAccount::zeroed(user_id))
    }

    /// Withdrawable balance for one currency.
    pub fn balance(&self, user_id: &str, currency: Currency) -> Decimal {
        self.account(user_id).balance(currency)
    }

    /// Recomputes the fiat mirrors from current spot prices. Missing
    /// prices contribute zero; crypto balances are untouched.
    pub fn refresh_fiat_totals(
        &self,
        user_id: &str,
        prices: &HashMap<Currency, Decimal>,
    ) -> EarningsAccount {
        let mut account = self
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| EarningsAccount::zeroed(user_id));
        let mut earned = Decimal::ZERO;
        let mut current = Decimal::ZERO;
        for (currency, balance) in &account.balances {
            let price = prices.get(currency).copied().unwrap_or_default();
            earned += balance.total_earned * price;
            current += balance.current_balance * price;
        }
        account.total_earned_fiat = earned;
        account.current_balance_fiat = current;
        account.clone()
    }

    /// Whether the (user, currency) pair is frozen.
    pub fn is_frozen(&self, user_id: &str, currency: Currency) -> bool {
        self.frozen
            .contains_key(&(user_id.to_string(), currency))
    }

    fn freeze(&self, user_id: &str, currency: Currency, reason: &str) {
        self.frozen
            .insert((user_id.to_string(), currency), reason.to_string());
    }

    fn check_mutable(&self, user_id: &str, currency: Currency, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(ChainPayError::Validation(format!(
                "ledger amounts must be positive, got {amount}"
            )));
        }
        if self.is_frozen(user_id, currency) {
            return Err(ChainPayError::AccountFrozen {
                user_id: user_id.to_string(),
                currency,
            });
        }
        Ok(())
    }

    #[cfg(test)]
    fn force_balance(&self, user_id: &str, currency: Currency, value: Decimal) {
        let mut account = self
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| EarningsAccount::zeroed(user_id));
        account.balances.entry(currency).or_default().current_balance = value;
    }
}
