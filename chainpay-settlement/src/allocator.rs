//! Custodial wallet allocation.

use std::sync::Arc;

use tracing::{debug, instrument};

use chainpay_core::error::{ChainPayError, Result};
use chainpay_core::traits::WalletStore;
use chainpay_core::types::{Currency, CustodialWallet};
use chainpay_gateway::GatewayRegistry;

/// Picks the custodial wallet a withdrawal will spend from.
pub struct WalletAllocator {
    wallets: Arc<dyn WalletStore>,
    gateways: Arc<GatewayRegistry>,
}

impl WalletAllocator {
    /// Creates an allocator over the wallet store and gateway registry.
    pub fn new(wallets: Arc<dyn WalletStore>, gateways: Arc<GatewayRegistry>) -> Self {
        Self { wallets, gateways }
    }

    /// Returns the first custodial wallet for the currency whose address
    /// the chain explorer currently validates as live.
    ///
    /// `NoSuitableWallet` is a hard stop for the enclosing withdrawal; no
    /// cross-currency fallback is attempted.
    #[instrument(skip(self))]
    pub async fn suitable_wallet(&self, currency: Currency) -> Result<CustodialWallet> {
        let gateway = self.gateways.get(currency)?;

        for wallet in self.wallets.for_currency(currency).await? {
            if gateway.validate_address(&wallet.address).await {
                debug!(wallet = %wallet.id, label = %wallet.label, "custodial wallet allocated");
                return Ok(wallet);
            }
            debug!(wallet = %wallet.id, label = %wallet.label, "custodial wallet failed validation");
        }

        Err(ChainPayError::NoSuitableWallet(currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::TestGateway;
    use chainpay_core::types::WalletAddress;
    use chainpay_store::MemoryWalletStore;

    async fn store_with(addresses: &[&str]) -> Arc<MemoryWalletStore> {
        let store = Arc::new(MemoryWalletStore::new());
        for address in addresses {
            store
                .insert(CustodialWallet::new(
                    Currency::Btc,
                    WalletAddress::new(*address),
                    "ciphertext",
                    *address,
                ))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_first_live_wallet_wins() {
        let store = store_with(&["dead-1", "live-1", "live-2"]).await;
        let gateway = TestGateway::btc();
        gateway.mark_valid("live-1");
        gateway.mark_valid("live-2");
        let registry = Arc::new(GatewayRegistry::new().with(Arc::new(gateway)));

        let allocator = WalletAllocator::new(store, registry);
        let wallet = allocator.suitable_wallet(Currency::Btc).await.unwrap();
        assert_eq!(wallet.label, "live-1");
    }

    #[tokio::test]
    async fn test_no_validating_wallet_is_hard_stop() {
        let store = store_with(&["dead-1", "dead-2"]).await;
        let registry = Arc::new(GatewayRegistry::new().with(Arc::new(TestGateway::btc())));

        let allocator = WalletAllocator::new(store, registry);
        let err = allocator.suitable_wallet(Currency::Btc).await.unwrap_err();
        assert!(matches!(err, ChainPayError::NoSuitableWallet(Currency::Btc)));
    }

    #[tokio::test]
    async fn test_unregistered_currency() {
        let store = store_with(&[]).await;
        let registry = Arc::new(GatewayRegistry::new());

        let allocator = WalletAllocator::new(store, registry);
        let err = allocator.suitable_wallet(Currency::Eth).await.unwrap_err();
        assert!(matches!(err, ChainPayError::UnsupportedCurrency(_)));
    }
}
