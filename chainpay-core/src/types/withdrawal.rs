//! Withdrawal lifecycle types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Currency, WalletAddress};

/// A monetary amount with its fiat equivalent snapshotted at request time.
///
/// The fiat mirror is a display convenience, never a source of truth: it
/// must not gate any debit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AmountDetails {
    /// Currency of the crypto amount.
    pub currency: Currency,
    /// Amount in the currency's human unit.
    pub amount_crypto: Decimal,
    /// Reference-fiat equivalent at the spot price of the moment.
    pub amount_fiat: Decimal,
}

impl AmountDetails {
    /// Snapshots an amount at the given spot price.
    pub fn at_spot(currency: Currency, amount_crypto: Decimal, spot_price: Decimal) -> Self {
        Self {
            currency,
            amount_crypto,
            amount_fiat: amount_crypto * spot_price,
        }
    }
}

/// Persisted state of a withdrawal.
///
/// The transient request phase (balance check, wallet allocation, broadcast)
/// is never persisted: a record exists only once funds were debited against
/// a successful broadcast, and it starts life as `Pending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// Broadcast succeeded, debit applied, awaiting chain confirmation.
    Pending,
    /// Chain-confirmed. Terminal; the record is immutable from here.
    Confirmed,
    /// The chain rejected or dropped the transaction; the debit was
    /// refunded. Terminal.
    Failed,
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Confirmed => write!(f, "Confirmed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// A withdrawal of earned funds from a custodial wallet to a user's own
/// address.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Withdrawal identifier.
    pub id: Uuid,
    /// Owner of the debited ledger account.
    pub user_id: String,
    /// Custodial wallet the funds left from.
    pub source_wallet_id: Uuid,
    /// Address of that custodial wallet (denormalized for reporting).
    pub source_address: WalletAddress,
    /// User-owned destination address.
    pub destination_address: WalletAddress,
    /// Amount with its fiat snapshot at request time.
    pub amount: AmountDetails,
    /// Current lifecycle status.
    pub status: WithdrawalStatus,
    /// Hash returned by the broadcast; the handle for confirmation polling.
    pub chain_tx_id: String,
    /// When the withdrawal was requested.
    pub requested_at: DateTime<Utc>,
    /// When the withdrawal reached `Confirmed`, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

impl WithdrawalRequest {
    /// Creates a `Pending` record for a successfully broadcast withdrawal.
    pub fn pending(
        user_id: impl Into<String>,
        source_wallet_id: Uuid,
        source_address: WalletAddress,
        destination_address: WalletAddress,
        amount: AmountDetails,
        chain_tx_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            source_wallet_id,
            source_address,
            destination_address,
            amount,
            status: WithdrawalStatus::Pending,
            chain_tx_id: chain_tx_id.into(),
            requested_at: Utc::now(),
            completed_at: None,
        }
    }

    /// True once the record may no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            WithdrawalStatus::Confirmed | WithdrawalStatus::Failed
        )
    }
}

/// Result of one confirmation poll, surfaced to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WithdrawalOutcome {
    /// Not yet seen on chain; poll again later.
    Pending,
    /// On chain with fewer than the required confirmations.
    InProgress {
        /// Confirmations observed so far.
        confirmations: u32,
    },
    /// Chain-confirmed; the debit stands.
    Confirmed {
        /// When the withdrawal completed.
        completed_at: DateTime<Utc>,
    },
    /// The chain rejected the transaction; the debit was refunded.
    Failed,
}
