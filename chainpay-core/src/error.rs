//! Error types for ChainPay.
//!
//! This module provides the engine-wide error hierarchy using `thiserror`.
//! Chain-explorer failures are typed separately in [`GatewayError`] so
//! callers can distinguish transport trouble from domain rejections.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::types::Currency;

/// Result type alias using `ChainPayError`.
pub type Result<T> = std::result::Result<T, ChainPayError>;

/// Failure of a chain-explorer or price API call.
///
/// Every outbound HTTP request is issued with an explicit timeout; a hung
/// upstream can only ever surface as `Timeout`, never as an unbounded wait.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The explorer did not answer within the configured deadline.
    #[error("chain API timed out: {0}")]
    Timeout(String),

    /// The explorer answered 429.
    #[error("chain API rate limited: {0}")]
    RateLimited(String),

    /// The explorer answered, but the body could not be decoded.
    #[error("malformed chain API response: {0}")]
    MalformedResponse(String),

    /// Transport failure or an unexpected HTTP status.
    #[error("chain API request failed: {0}")]
    Http(String),
}

/// Main error type for all ChainPay operations.
#[derive(Debug, Error)]
pub enum ChainPayError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CHAIN GATEWAY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// An explorer or price API call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The network rejected a signed transaction at broadcast.
    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    /// The fee lookup failed before any funds moved. Fee can never be
    /// assumed zero, so this aborts the enclosing operation.
    #[error("fee estimation failed: {0}")]
    FeeEstimationFailed(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // WITHDRAWAL / LEDGER ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The user's ledger balance cannot cover the requested amount, or a
    /// custodial wallet has no spendable inputs.
    #[error("insufficient funds: requested {requested} {currency}, available {available}")]
    InsufficientFunds {
        /// Currency of the attempted movement.
        currency: Currency,
        /// Amount requested.
        requested: Decimal,
        /// Amount actually available.
        available: Decimal,
    },

    /// No custodial wallet for the currency passed live-address validation.
    #[error("no suitable custodial wallet for {0}")]
    NoSuitableWallet(Currency),

    /// The destination address failed explorer validation.
    #[error("invalid {currency} address: {address}")]
    AddressInvalid {
        /// Currency the address was checked against.
        currency: Currency,
        /// The rejected address.
        address: String,
    },

    /// A balance would have gone negative despite the per-account
    /// serialization guarantee. Unreachable in correct operation; observing
    /// it freezes the account pending manual review.
    #[error("ledger inconsistency for user {user_id} in {currency}: {detail}")]
    LedgerInconsistency {
        /// Affected user.
        user_id: String,
        /// Affected currency.
        currency: Currency,
        /// What was observed.
        detail: String,
    },

    /// The account was frozen by a previous inconsistency; all further
    /// mutation for this user/currency is rejected.
    #[error("account frozen for user {user_id} in {currency}")]
    AccountFrozen {
        /// Affected user.
        user_id: String,
        /// Affected currency.
        currency: Currency,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // VAULT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Encryption or decryption of custodial key material failed. The
    /// message never contains key bytes.
    #[error("vault operation failed: {0}")]
    Vault(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// An inbound payment with this chain transaction hash was already
    /// settled. The hash is the idempotency key; a replayed verification
    /// must not credit twice.
    #[error("payment already settled for chain transaction {0}")]
    DuplicatePayment(String),

    /// A withdrawal id was not found in the store.
    #[error("withdrawal not found: {0}")]
    WithdrawalNotFound(Uuid),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The currency code is not supported by any registered gateway.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Input validation failed.
    #[error("validation error: {0}")]
    Validation(String),
}

impl ChainPayError {
    /// Returns true if this error is transient and the operation can be
    /// retried as-is (explorer hiccups, not domain rejections).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChainPayError::Gateway(
                GatewayError::Timeout(_) | GatewayError::RateLimited(_) | GatewayError::Http(_)
            )
        )
    }

    /// Returns true if this error means the caller's request was rejected
    /// before any funds moved.
    pub fn is_pre_flight_rejection(&self) -> bool {
        matches!(
            self,
            ChainPayError::InsufficientFunds { .. }
                | ChainPayError::NoSuitableWallet(_)
                | ChainPayError::AddressInvalid { .. }
                | ChainPayError::UnsupportedCurrency(_)
                | ChainPayError::Validation(_)
        )
    }

    /// Returns true if this error must halt further ledger mutation for the
    /// affected account.
    pub fn is_fatal_for_account(&self) -> bool {
        matches!(
            self,
            ChainPayError::LedgerInconsistency { .. } | ChainPayError::AccountFrozen { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        let err = ChainPayError::InsufficientFunds {
            currency: Currency::Btc,
            requested: dec!(0.5),
            available: dec!(0.1),
        };
        assert!(err.to_string().contains("0.5"));
        assert!(err.to_string().contains("0.1"));
        assert!(err.to_string().contains("BTC"));
    }

    #[test]
    fn test_error_classification() {
        assert!(ChainPayError::Gateway(GatewayError::Timeout("t".into())).is_recoverable());
        assert!(ChainPayError::Gateway(GatewayError::RateLimited("r".into())).is_recoverable());
        assert!(!ChainPayError::BroadcastRejected("no".into()).is_recoverable());

        assert!(ChainPayError::NoSuitableWallet(Currency::Eth).is_pre_flight_rejection());
        assert!(!ChainPayError::BroadcastRejected("no".into()).is_pre_flight_rejection());

        let inconsistency = ChainPayError::LedgerInconsistency {
            user_id: "u1".into(),
            currency: Currency::Btc,
            detail: "negative balance".into(),
        };
        assert!(inconsistency.is_fatal_for_account());
    }

    #[test]
    fn test_gateway_error_conversion() {
        let err: ChainPayError = GatewayError::MalformedResponse("bad json".into()).into();
        assert!(matches!(
            err,
            ChainPayError::Gateway(GatewayError::MalformedResponse(_))
        ));
    }
}
