//! Notification hook payloads.
//!
//! The engine never sends email itself; it emits these events through the
//! [`crate::traits::Notifier`] capability and the excluded delivery layer
//! subscribes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Currency;

/// An event emitted on every balance-affecting operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SettlementEvent {
    /// An inbound payment matched and the payee's ledger was credited.
    PaymentSettled {
        /// Payment page that received the funds.
        page_id: u64,
        /// Credited user.
        user_id: String,
        /// Payer's contact email.
        payer_email: String,
        /// Currency of the payment.
        currency: Currency,
        /// Credited (observed) amount.
        amount: Decimal,
        /// Chain transaction hash.
        tx_hash: String,
    },
    /// A withdrawal broadcast succeeded and the ledger was debited.
    WithdrawalInitiated {
        /// Withdrawal identifier.
        withdrawal_id: Uuid,
        /// Debited user.
        user_id: String,
        /// Currency withdrawn.
        currency: Currency,
        /// Debited amount.
        amount: Decimal,
        /// Destination address.
        destination: String,
        /// Broadcast transaction hash.
        tx_hash: String,
    },
    /// A pending withdrawal reached chain finality.
    WithdrawalConfirmed {
        /// Withdrawal identifier.
        withdrawal_id: Uuid,
        /// Owning user.
        user_id: String,
        /// Currency withdrawn.
        currency: Currency,
        /// Withdrawn amount.
        amount: Decimal,
        /// Transaction hash.
        tx_hash: String,
    },
    /// A pending withdrawal failed on chain and the debit was refunded.
    WithdrawalFailed {
        /// Withdrawal identifier.
        withdrawal_id: Uuid,
        /// Refunded user.
        user_id: String,
        /// Currency refunded.
        currency: Currency,
        /// Refunded amount.
        amount: Decimal,
        /// Transaction hash that failed.
        tx_hash: String,
    },
}

impl SettlementEvent {
    /// The user this event concerns.
    pub fn user_id(&self) -> &str {
        match self {
            Self::PaymentSettled { user_id, .. }
            | Self::WithdrawalInitiated { user_id, .. }
            | Self::WithdrawalConfirmed { user_id, .. }
            | Self::WithdrawalFailed { user_id, .. } => user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_user_id() {
        let event = SettlementEvent::WithdrawalFailed {
            withdrawal_id: Uuid::new_v4(),
            user_id: "merchant-9".into(),
            currency: Currency::Btc,
            amount: dec!(0.01),
            tx_hash: "h".into(),
        };
        assert_eq!(event.user_id(), "merchant-9");
    }
}
