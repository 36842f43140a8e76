//! The withdrawal engine.
//!
//! Lifecycle: a request is transient until broadcast succeeds, then a
//! `Pending` record exists with the ledger optimistically debited; a later
//! confirmation poll moves it to `Confirmed` (debit stands) or `Failed`
//! (debit refunded). The debit-now-refund-on-failure pairing lives
//! entirely in this component — no other call site mutates balances around
//! withdrawals.
//!
//! # Serialization
//!
//! The read-balance → broadcast → debit critical section holds an
//! exclusive per-(user, currency) lock, so two concurrent withdrawals (or
//! a withdrawal racing a confirmation poll of another) cannot interleave
//! check-and-debit and oversell a balance. Inbound credits only ever grow
//! a balance, so they stay outside the lock.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use chainpay_core::error::{ChainPayError, Result};
use chainpay_core::traits::{Notifier, WithdrawalStore};
use chainpay_core::types::{
    AmountDetails, ConfirmationStatus, Currency, SettlementEvent, WalletAddress,
    WithdrawalOutcome, WithdrawalRequest, WithdrawalStatus,
};
use chainpay_gateway::GatewayRegistry;
use chainpay_ledger::EarningsLedger;

use crate::allocator::WalletAllocator;

/// Orchestrates outbound withdrawals from custodial wallets.
pub struct WithdrawalEngine {
    gateways: Arc<GatewayRegistry>,
    allocator: WalletAllocator,
    ledger: Arc<EarningsLedger>,
    withdrawals: Arc<dyn WithdrawalStore>,
    notifier: Arc<dyn Notifier>,
    account_locks: DashMap<(String, Currency), Arc<Mutex<()>>>,
}

impl WithdrawalEngine {
    /// Creates the engine over its collaborators.
    pub fn new(
        gateways: Arc<GatewayRegistry>,
        allocator: WalletAllocator,
        ledger: Arc<EarningsLedger>,
        withdrawals: Arc<dyn WithdrawalStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateways,
            allocator,
            ledger,
            withdrawals,
            notifier,
            account_locks: DashMap::new(),
        }
    }

    fn account_lock(&self, user_id: &str, currency: Currency) -> Arc<Mutex<()>> {
        self.account_locks
            .entry((user_id.to_string(), currency))
            .or_default()
            .clone()
    }

    /// Requests a withdrawal of earned funds to a user-owned address.
    ///
    /// Rejections (invalid address, no suitable wallet, insufficient
    /// balance) happen before any funds move. The ledger is debited only
    /// after the broadcast returns a transaction hash; a failed broadcast
    /// therefore leaves the ledger untouched.
    #[instrument(skip(self))]
    pub async fn request_withdrawal(
        &self,
        user_id: &str,
        currency: Currency,
        amount: Decimal,
        destination: WalletAddress,
    ) -> Result<WithdrawalRequest> {
        if amount <= Decimal::ZERO {
            return Err(ChainPayError::Validation(format!(
                "withdrawal amount must be positive, got {amount}"
            )));
        }
        let gateway = self.gateways.get(currency)?;

        if !gateway.validate_address(&destination).await {
            return Err(ChainPayError::AddressInvalid {
                currency,
                address: destination.to_string(),
            });
        }
        if self.ledger.is_frozen(user_id, currency) {
            return Err(ChainPayError::AccountFrozen {
                user_id: user_id.to_string(),
                currency,
            });
        }

        let spot_price = gateway.spot_price().await?;
        let amount_details = AmountDetails::at_spot(currency, amount, spot_price);
        let source = self.allocator.suitable_wallet(currency).await?;

        let lock = self.account_lock(user_id, currency);
        let guard = lock.lock().await;

        let available = self.ledger.balance(user_id, currency);
        if available < amount {
            return Err(ChainPayError::InsufficientFunds {
                currency,
                requested: amount,
                available,
            });
        }

        // Point of no return: once broadcast, the transaction cannot be
        // recalled, so the debit must follow.
        let tx_hash = gateway.send(&source, &destination, amount).await?;
        self.ledger
            .debit(user_id, currency, amount, amount_details.amount_fiat)?;

        let withdrawal = WithdrawalRequest::pending(
            user_id,
            source.id,
            source.address.clone(),
            destination.clone(),
            amount_details,
            &tx_hash,
        );
        self.withdrawals.insert(withdrawal.clone()).await?;
        drop(guard);

        info!(withdrawal = %withdrawal.id, %tx_hash, "withdrawal broadcast and debited");
        self.notifier
            .notify(SettlementEvent::WithdrawalInitiated {
                withdrawal_id: withdrawal.id,
                user_id: user_id.to_string(),
                currency,
                amount,
                destination: destination.to_string(),
                tx_hash,
            })
            .await;

        Ok(withdrawal)
    }

    /// Polls the chain once for a pending withdrawal and reconciles the
    /// ledger with the outcome.
    ///
    /// There is no background poller; each call performs exactly one
    /// confirmation lookup. Terminal records short-circuit without
    /// touching the chain, which is what makes the failure refund
    /// idempotent: it can only ever happen on the `Pending → Failed` edge.
    #[instrument(skip(self))]
    pub async fn check_withdrawal_status(&self, withdrawal_id: Uuid) -> Result<WithdrawalOutcome> {
        let withdrawal = self.load(withdrawal_id).await?;
        if let Some(outcome) = Self::terminal_outcome(&withdrawal) {
            return Ok(outcome);
        }

        let currency = withdrawal.amount.currency;
        let gateway = self.gateways.get(currency)?;

        let lock = self.account_lock(&withdrawal.user_id, currency);
        let guard = lock.lock().await;

        // Reload under the lock: a concurrent poll may have settled it.
        let withdrawal = self.load(withdrawal_id).await?;
        if let Some(outcome) = Self::terminal_outcome(&withdrawal) {
            return Ok(outcome);
        }

        match gateway
            .confirmation_status(&withdrawal.chain_tx_id)
            .await?
        {
            ConfirmationStatus::Confirmed => {
                let completed_at = Utc::now();
                let mut updated = withdrawal.clone();
                updated.status = WithdrawalStatus::Confirmed;
                updated.completed_at = Some(completed_at);
                self.withdrawals.update(updated).await?;
                drop(guard);

                info!(withdrawal = %withdrawal.id, "withdrawal confirmed");
                self.notifier
                    .notify(SettlementEvent::WithdrawalConfirmed {
                        withdrawal_id: withdrawal.id,
                        user_id: withdrawal.user_id.clone(),
                        currency,
                        amount: withdrawal.amount.amount_crypto,
                        tx_hash: withdrawal.chain_tx_id.clone(),
                    })
                    .await;
                Ok(WithdrawalOutcome::Confirmed { completed_at })
            }
            ConfirmationStatus::Failed => {
                let mut updated = withdrawal.clone();
                updated.status = WithdrawalStatus::Failed;
                self.withdrawals.update(updated).await?;

                // Compensate the optimistic debit. The crypto amount is
                // exact; the fiat mirror uses the current spot price,
                // falling back to the request-time snapshot when the
                // price source is down.
                let refund_fiat = match gateway.spot_price().await {
                    Ok(price) => price * withdrawal.amount.amount_crypto,
                    Err(err) => {
                        warn!(%err, "spot price unavailable; refunding fiat at request-time snapshot");
                        withdrawal.amount.amount_fiat
                    }
                };
                if let Err(err) = self.ledger.refund(
                    &withdrawal.user_id,
                    currency,
                    withdrawal.amount.amount_crypto,
                    refund_fiat,
                ) {
                    error!(withdrawal = %withdrawal.id, %err, "refund blocked; account needs manual review");
                    return Err(err);
                }
                drop(guard);

                warn!(withdrawal = %withdrawal.id, "withdrawal failed on chain; debit refunded");
                self.notifier
                    .notify(SettlementEvent::WithdrawalFailed {
                        withdrawal_id: withdrawal.id,
                        user_id: withdrawal.user_id.clone(),
                        currency,
                        amount: withdrawal.amount.amount_crypto,
                        tx_hash: withdrawal.chain_tx_id.clone(),
                    })
                    .await;
                Ok(WithdrawalOutcome::Failed)
            }
            ConfirmationStatus::Seen { confirmations } => {
                debug!(withdrawal = %withdrawal.id, confirmations, "withdrawal gathering confirmations");
                Ok(WithdrawalOutcome::InProgress { confirmations })
            }
            ConfirmationStatus::Pending => Ok(WithdrawalOutcome::Pending),
        }
    }

    async fn load(&self, withdrawal_id: Uuid) -> Result<WithdrawalRequest> {
        self.withdrawals
            .by_id(withdrawal_id)
            .await?
            .ok_or(ChainPayError::WithdrawalNotFound(withdrawal_id))
    }

    fn terminal_outcome(withdrawal: &WithdrawalRequest) -> Option<WithdrawalOutcome> {
        match withdrawal.status {
            WithdrawalStatus::Confirmed => Some(WithdrawalOutcome::Confirmed {
                completed_at: withdrawal.completed_at.unwrap_or(withdrawal.requested_at),
            }),
            WithdrawalStatus::Failed => Some(WithdrawalOutcome::Failed),
            WithdrawalStatus::Pending => None,
        }
    }
}
