//! Inbound payment verification.
//!
//! A payment page claims "wallet A paid wallet B this much"; the verifier
//! checks the chain and, on a match, settles the payment: one persisted
//! record, one ledger credit, one notification. The chain transaction hash
//! is the idempotency key, so replaying the same claim can never credit
//! twice.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use chainpay_core::constants::{PAYMENT_AMOUNT_TOLERANCE, RECENT_TX_WINDOW_SECS};
use chainpay_core::error::{ChainPayError, Result};
use chainpay_core::traits::{Notifier, PaymentRecordStore};
use chainpay_core::types::{
    Currency, InboundPaymentRecord, SettlementEvent, TransactionDetails, WalletAddress,
};
use chainpay_gateway::GatewayRegistry;
use chainpay_ledger::EarningsLedger;

/// A claimed payment, as reported by the payment page front end.
///
/// The page-to-user resolution happens in the page CRUD layer; by the time
/// a claim reaches the engine it carries the payee directly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentClaim {
    /// Payment page the payer used.
    pub page_id: u64,
    /// User who owns the page and receives the credit.
    pub payee_user_id: String,
    /// Currency the page quoted.
    pub currency: Currency,
    /// Payer's wallet address.
    pub from_address: WalletAddress,
    /// The page's receiving custodial wallet address.
    pub to_address: WalletAddress,
    /// Amount the page quoted.
    pub expected_amount: Decimal,
    /// Payer's contact email.
    pub payer_email: String,
    /// Donation pages accept any amount; only the addresses must match.
    pub is_donation: bool,
}

/// Result of a verification attempt.
#[derive(Clone, Debug)]
pub enum VerifyOutcome {
    /// A matching chain transaction settled: record persisted, ledger
    /// credited with the observed amount.
    Matched(InboundPaymentRecord),
    /// The matching chain transaction was settled by an earlier call; no
    /// new credit happened.
    AlreadySettled(InboundPaymentRecord),
    /// No matching transaction in the recent window. Callers retry later;
    /// there is no internal retry loop.
    NotFound,
}

/// Matches claimed payments against recent chain activity.
pub struct InboundVerifier {
    gateways: Arc<GatewayRegistry>,
    ledger: Arc<EarningsLedger>,
    payments: Arc<dyn PaymentRecordStore>,
    notifier: Arc<dyn Notifier>,
}

impl InboundVerifier {
    /// Creates a verifier over the gateway registry, ledger, payment
    /// store, and notification sink.
    pub fn new(
        gateways: Arc<GatewayRegistry>,
        ledger: Arc<EarningsLedger>,
        payments: Arc<dyn PaymentRecordStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateways,
            ledger,
            payments,
            notifier,
        }
    }

    /// Verifies a claimed payment against the chain.
    ///
    /// Explorer trouble during the scan yields `NotFound` rather than an
    /// error: a flaky explorer must never tell a payer their payment
    /// failed. The cost is that a genuinely-paid invoice can look unpaid
    /// at that instant; the caller retries.
    #[instrument(skip(self, claim), fields(page_id = claim.page_id, currency = %claim.currency))]
    pub async fn verify(&self, claim: PaymentClaim) -> Result<VerifyOutcome> {
        if claim.payer_email.trim().is_empty() {
            return Err(ChainPayError::Validation(
                "payer email is required".into(),
            ));
        }
        let gateway = self.gateways.get(claim.currency)?;

        let window = Duration::from_secs(RECENT_TX_WINDOW_SECS);
        let transactions = match gateway
            .recent_transactions(&claim.to_address, window)
            .await
        {
            Ok(transactions) => transactions,
            Err(err) => {
                warn!(%err, "scan failed; reporting payment not found");
                return Ok(VerifyOutcome::NotFound);
            }
        };

        let Some(tx) = transactions.iter().find(|tx| self.matches(&claim, tx)) else {
            debug!(scanned = transactions.len(), "no matching transaction");
            return Ok(VerifyOutcome::NotFound);
        };

        // Fee is record metadata only; a failed lookup never blocks
        // settlement.
        let fee = gateway.estimate_fee().await.ok();
        let record = InboundPaymentRecord::settled(
            claim.page_id,
            &claim.payee_user_id,
            claim.currency,
            tx,
            fee,
            &claim.payer_email,
        );

        // Claim the hash before crediting; the store's uniqueness check is
        // what makes a replay harmless.
        match self.payments.insert(record.clone()).await {
            Ok(()) => {}
            Err(ChainPayError::DuplicatePayment(_)) => {
                debug!(tx_hash = %tx.hash, "transaction already settled");
                return Ok(match self.payments.by_tx_hash(&tx.hash).await? {
                    Some(existing) => VerifyOutcome::AlreadySettled(existing),
                    None => VerifyOutcome::NotFound,
                });
            }
            Err(err) => return Err(err),
        }

        // The ledger is credited with what the chain actually moved, not
        // what the page quoted. Fiat mirror is best-effort.
        let fiat = match gateway.spot_price().await {
            Ok(price) => price * tx.amount,
            Err(err) => {
                warn!(%err, "spot price unavailable; fiat mirror recorded as zero");
                Decimal::ZERO
            }
        };
        self.ledger
            .credit(&claim.payee_user_id, claim.currency, tx.amount, fiat)?;

        self.notifier
            .notify(SettlementEvent::PaymentSettled {
                page_id: claim.page_id,
                user_id: claim.payee_user_id.clone(),
                payer_email: claim.payer_email.clone(),
                currency: claim.currency,
                amount: tx.amount,
                tx_hash: tx.hash.clone(),
            })
            .await;

        debug!(tx_hash = %tx.hash, amount = %tx.amount, "payment settled");
        Ok(VerifyOutcome::Matched(record))
    }

    fn matches(&self, claim: &PaymentClaim, tx: &TransactionDetails) -> bool {
        tx.from_address.matches(&claim.from_address)
            && tx.to_address.matches(&claim.to_address)
            && (claim.is_donation
                || (tx.amount - claim.expected_amount).abs() < PAYMENT_AMOUNT_TOLERANCE)
    }
}
