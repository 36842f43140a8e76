//! Inbound payment types.
//!
//! A payment page quotes an amount and a receiving custodial wallet; the
//! payer sends on-chain, then the page asks the engine to verify. A settled
//! payment becomes an [`InboundPaymentRecord`], keyed by its chain
//! transaction hash.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Currency, WalletAddress};

/// One explorer-reported transfer touching an address.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionDetails {
    /// Chain transaction hash.
    pub hash: String,
    /// Sender address (first input for UTXO chains).
    pub from_address: WalletAddress,
    /// Receiver address (first output for UTXO chains).
    pub to_address: WalletAddress,
    /// Transferred amount in the human unit.
    pub amount: Decimal,
    /// When the chain saw the transaction.
    pub timestamp: DateTime<Utc>,
}

/// On-chain state of a transaction by hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationStatus {
    /// Not yet observed on chain.
    Pending,
    /// On chain, but below the currency's confirmation threshold. Callers
    /// can show progress without declaring success.
    Seen {
        /// Confirmations observed so far.
        confirmations: u32,
    },
    /// At or above the confirmation threshold; final.
    Confirmed,
    /// The chain reports the transaction as failed or dropped.
    Failed,
}

/// A settled inbound payment to a payment page.
///
/// Created exactly once per matched chain transaction; the hash is the
/// natural idempotency key and the record store enforces its uniqueness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InboundPaymentRecord {
    /// Record identifier.
    pub id: Uuid,
    /// Payment page the funds were for.
    pub page_id: u64,
    /// User who owns that page and receives the credit.
    pub payee_user_id: String,
    /// Chain transaction hash (idempotency key).
    pub tx_hash: String,
    /// Payer's wallet address.
    pub sender_address: WalletAddress,
    /// Amount actually observed on-chain, which is what gets credited.
    pub amount: AmountObserved,
    /// Network fee the payer spent, if the explorer reported one.
    pub fee: Option<Decimal>,
    /// Block metadata as reported by the explorer.
    pub block: BlockMetadata,
    /// Payer's contact email, carried through to the notification hook.
    pub payer_email: String,
    /// When the engine settled the record.
    pub settled_at: DateTime<Utc>,
}

/// The observed amount of a settled payment.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AmountObserved {
    /// Currency of the payment.
    pub currency: Currency,
    /// Amount seen on-chain; may differ from the page's quoted amount
    /// within tolerance, or arbitrarily for donations.
    pub amount_crypto: Decimal,
}

/// Block-level metadata of the settling transaction.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// Block number, when known.
    pub number: Option<u64>,
    /// Block timestamp, when known.
    pub timestamp: Option<DateTime<Utc>>,
    /// Position of the transaction within the block, when known.
    pub transaction_index: Option<u32>,
}

impl InboundPaymentRecord {
    /// Builds a settled record from a matched explorer transaction.
    pub fn settled(
        page_id: u64,
        payee_user_id: impl Into<String>,
        currency: Currency,
        tx: &TransactionDetails,
        fee: Option<Decimal>,
        payer_email: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            page_id,
            payee_user_id: payee_user_id.into(),
            tx_hash: tx.hash.clone(),
            sender_address: tx.from_address.clone(),
            amount: AmountObserved {
                currency,
                amount_crypto: tx.amount,
            },
            fee,
            block: BlockMetadata {
                number: None,
                timestamp: Some(tx.timestamp),
                transaction_index: None,
            },
            payer_email: payer_email.into(),
            settled_at: Utc::now(),
        }
    }
}
