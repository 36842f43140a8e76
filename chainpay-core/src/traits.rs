//! Capability traits for ChainPay.
//!
//! These traits define the seams between orchestration and everything
//! chain-, storage-, or delivery-specific, enabling one implementation per
//! chain and full substitution in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{
    ConfirmationStatus, Currency, CustodialWallet, InboundPaymentRecord, SecretMaterial,
    SettlementEvent, TransactionDetails, WalletAddress, WithdrawalRequest,
};

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN GATEWAY
// ═══════════════════════════════════════════════════════════════════════════════

/// The abstraction over one blockchain's explorer/RPC API.
///
/// Implemented once per supported currency and registered by currency code,
/// so the withdrawal engine and the inbound verifier stay chain-agnostic
/// while unit precision, fee models, and confirmation semantics remain
/// isolated to one implementation each.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// The currency this gateway serves.
    fn currency(&self) -> Currency;

    /// Confirmations required before an outbound transaction is final.
    fn min_confirmations(&self) -> u32 {
        self.currency().min_confirmations()
    }

    /// Whether the explorer currently accepts an account lookup for the
    /// address. Any non-2xx or transport failure yields `false`; a
    /// malformed-but-well-typed address never produces an error.
    async fn validate_address(&self, address: &WalletAddress) -> bool;

    /// Current network fee rate (satoshis per kilobyte for bitcoin-style
    /// chains, gwei for ethereum-style). Failure is fatal to the enclosing
    /// operation: fee is never assumed zero.
    async fn estimate_fee(&self) -> Result<Decimal>;

    /// Balance of the address in the human unit, converted from the chain's
    /// native integer unit with fixed-point precision.
    async fn balance(&self, address: &WalletAddress) -> Result<Decimal>;

    /// Builds, signs, and broadcasts a transfer from a custodial wallet.
    ///
    /// Decrypts the wallet's key through the vault for the duration of one
    /// signing operation only. Fails with `InsufficientFunds` when the
    /// wallet has no spendable funds, `FeeEstimationFailed` when the fee
    /// lookup fails first, and `BroadcastRejected` when the network refuses
    /// the signed transaction.
    async fn send(
        &self,
        from: &CustodialWallet,
        to: &WalletAddress,
        amount: Decimal,
    ) -> Result<String>;

    /// Transactions touching the address within the recent `window`.
    async fn recent_transactions(
        &self,
        address: &WalletAddress,
        window: Duration,
    ) -> Result<Vec<TransactionDetails>>;

    /// On-chain status of a transaction by hash.
    async fn confirmation_status(&self, tx_hash: &str) -> Result<ConfirmationStatus>;

    /// Reference-fiat price per unit of this currency.
    async fn spot_price(&self) -> Result<Decimal>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN SIGNER
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything a signer needs to produce one signed transfer.
pub struct TransferIntent<'a> {
    /// Decrypted key material; must not outlive the signing call.
    pub private_key: &'a SecretMaterial,
    /// Spending address.
    pub from: &'a WalletAddress,
    /// Destination address.
    pub to: &'a WalletAddress,
    /// Amount in the human unit.
    pub amount: Decimal,
    /// Fee rate, in the gateway's native fee unit.
    pub fee: Decimal,
}

/// A transaction ready for broadcast.
#[derive(Clone, Debug)]
pub struct SignedTransfer {
    /// Chain wire format, hex encoded.
    pub raw_hex: String,
}

/// The currency-SDK capability: input selection, nonce handling, and
/// signature production for one chain.
///
/// Gateways own the orchestration around this seam (key decryption, fee and
/// balance lookups, broadcast); the transaction-building mathematics itself
/// is the SDK's concern and is injected here.
pub trait ChainSigner: Send + Sync {
    /// Builds and signs a transfer, returning the broadcastable wire form.
    fn sign_transfer(&self, intent: TransferIntent<'_>) -> Result<SignedTransfer>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORES
// ═══════════════════════════════════════════════════════════════════════════════

/// Storage for custodial wallets. Provisioning writes them; the allocator
/// and gateways read them.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Registers a custodial wallet.
    async fn insert(&self, wallet: CustodialWallet) -> Result<()>;

    /// Wallet by id.
    async fn by_id(&self, id: Uuid) -> Result<Option<CustodialWallet>>;

    /// All wallets for a currency, in registration order.
    async fn for_currency(&self, currency: Currency) -> Result<Vec<CustodialWallet>>;
}

/// Storage for withdrawal records.
#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    /// Persists a new withdrawal record.
    async fn insert(&self, withdrawal: WithdrawalRequest) -> Result<()>;

    /// Withdrawal by id.
    async fn by_id(&self, id: Uuid) -> Result<Option<WithdrawalRequest>>;

    /// Replaces the stored record (status/completion updates).
    async fn update(&self, withdrawal: WithdrawalRequest) -> Result<()>;

    /// A user's withdrawals requested within a date range, for report feeds.
    async fn by_user_in_range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalRequest>>;
}

/// Storage for settled inbound payments.
///
/// The chain transaction hash is a unique key: inserting a record whose
/// hash was already settled fails with `DuplicatePayment`, which is what
/// makes replayed verification calls idempotent.
#[async_trait]
pub trait PaymentRecordStore: Send + Sync {
    /// Persists a settled payment. Fails with `DuplicatePayment` when the
    /// chain transaction hash was already recorded.
    async fn insert(&self, record: InboundPaymentRecord) -> Result<()>;

    /// The settled record for a chain transaction hash, if any.
    async fn by_tx_hash(&self, tx_hash: &str) -> Result<Option<InboundPaymentRecord>>;

    /// All settled payments for a payment page.
    async fn by_page(&self, page_id: u64) -> Result<Vec<InboundPaymentRecord>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// NOTIFICATION SINK
// ═══════════════════════════════════════════════════════════════════════════════

/// Receiver for balance-affecting events.
///
/// Email (or any other delivery) lives outside the engine; implementations
/// of this trait are the subscription point. Delivery failures are the
/// sink's problem — emitting an event never fails the settlement operation
/// that produced it.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one event.
    async fn notify(&self, event: SettlementEvent);
}

/// A notifier that drops every event. Default wiring for tests and for
/// deployments without a delivery layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _event: SettlementEvent) {}
}
