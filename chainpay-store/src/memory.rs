//! In-memory entity stores.
//!
//! Thread-safe via concurrent maps; no external synchronization required.
//! Wallet registration order is preserved because the allocator picks the
//! first validating wallet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use chainpay_core::error::{ChainPayError, Result};
use chainpay_core::traits::{PaymentRecordStore, WalletStore, WithdrawalStore};
use chainpay_core::types::{Currency, CustodialWallet, InboundPaymentRecord, WithdrawalRequest};

/// In-memory custodial wallet store.
#[derive(Default)]
pub struct MemoryWalletStore {
    wallets: DashMap<Uuid, CustodialWallet>,
    /// Registration order per currency; the allocator scans in this order.
    order: DashMap<Currency, Vec<Uuid>>,
}

impl MemoryWalletStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered wallets.
    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    /// True when no wallets are registered.
    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

#[async_trait]
impl WalletStore for MemoryWalletStore {
    async fn insert(&self, wallet: CustodialWallet) -> Result<()> {
        self.order
            .entry(wallet.currency)
            .or_default()
            .push(wallet.id);
        debug!(wallet = %wallet.id, currency = %wallet.currency, "custodial wallet registered");
        self.wallets.insert(wallet.id, wallet);
        Ok(())
    }

    async fn by_id(&self, id: Uuid) -> Result<Option<CustodialWallet>> {
        Ok(self.wallets.get(&id).map(|w| w.clone()))
    }

    async fn for_currency(&self, currency: Currency) -> Result<Vec<CustodialWallet>> {
        let ids = self
            .order
            .get(&currency)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.wallets.get(&id).map(|w| w.clone()))
            .collect())
    }
}

/// In-memory withdrawal store.
#[derive(Default)]
pub struct MemoryWithdrawalStore {
    withdrawals: DashMap<Uuid, WithdrawalRequest>,
}

impl MemoryWithdrawalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WithdrawalStore for MemoryWithdrawalStore {
    async fn insert(&self, withdrawal: WithdrawalRequest) -> Result<()> {
        debug!(withdrawal = %withdrawal.id, status = %withdrawal.status, "withdrawal persisted");
        self.withdrawals.insert(withdrawal.id, withdrawal);
        Ok(())
    }

    async fn by_id(&self, id: Uuid) -> Result<Option<WithdrawalRequest>> {
        Ok(self.withdrawals.get(&id).map(|w| w.clone()))
    }

    async fn update(&self, withdrawal: WithdrawalRequest) -> Result<()> {
        if !self.withdrawals.contains_key(&withdrawal.id) {
            return Err(ChainPayError::WithdrawalNotFound(withdrawal.id));
        }
        self.withdrawals.insert(withdrawal.id, withdrawal);
        Ok(())
    }

    async fn by_user_in_range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalRequest>> {
        let mut matching: Vec<WithdrawalRequest> = self
            .withdrawals
            .iter()
            .filter(|entry| {
                let w = entry.value();
                w.user_id == user_id && w.requested_at >= from && w.requested_at <= to
            })
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by_key(|w| w.requested_at);
        Ok(matching)
    }
}

/// In-memory settled payment store.
///
/// # Indexing
///
/// Records are indexed by:
/// - ID: for direct lookup
/// - Normalized tx hash: for duplicate rejection (the idempotency key)
/// - Page id: for per-page listings
#[derive(Default)]
pub struct MemoryPaymentStore {
    records: DashMap<Uuid, InboundPaymentRecord>,
    tx_hash_index: DashMap<String, Uuid>,
    page_index: DashMap<u64, Vec<Uuid>>,
}

impl MemoryPaymentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes a tx hash for indexing (lowercase, trimmed).
    fn normalize_tx_hash(hash: &str) -> String {
        hash.trim().to_lowercase()
    }

    /// Number of settled records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no payments are settled.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PaymentRecordStore for MemoryPaymentStore {
    async fn insert(&self, record: InboundPaymentRecord) -> Result<()> {
        let key = Self::normalize_tx_hash(&record.tx_hash);
        // Claim the hash first; the entry API makes claim-and-insert atomic.
        match self.tx_hash_index.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(ChainPayError::DuplicatePayment(record.tx_hash.clone()));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record.id);
            }
        }
        self.page_index
            .entry(record.page_id)
            .or_default()
            .push(record.id);
        debug!(record = %record.id, tx_hash = %record.tx_hash, "inbound payment settled");
        self.records.insert(record.id, record);
        Ok(())
    }

    async fn by_tx_hash(&self, tx_hash: &str) -> Result<Option<InboundPaymentRecord>> {
        let key = Self::normalize_tx_hash(tx_hash);
        Ok(self
            .tx_hash_index
            .get(&key)
            .and_then(|id| self.records.get(id.value()).map(|r| r.clone())))
    }

    async fn by_page(&self, page_id: u64) -> Result<Vec<InboundPaymentRecord>> {
        let ids = self
            .page_index
            .get(&page_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.records.get(&id).map(|r| r.clone()))
            .collect())
    }
}
