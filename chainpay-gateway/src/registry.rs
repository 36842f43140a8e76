//! Gateway registry.
//!
//! Keys one gateway per currency so orchestration code never branches on a
//! currency code. Adding a chain means registering one more implementation.

use std::collections::HashMap;
use std::sync::Arc;

use chainpay_core::error::{ChainPayError, Result};
use chainpay_core::traits::ChainGateway;
use chainpay_core::types::Currency;

/// Registry of chain gateways keyed by currency.
#[derive(Default)]
pub struct GatewayRegistry {
    gateways: HashMap<Currency, Arc<dyn ChainGateway>>,
}

impl GatewayRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gateway under its own currency, replacing any previous
    /// registration for that currency.
    pub fn register(&mut self, gateway: Arc<dyn ChainGateway>) -> &mut Self {
        self.gateways.insert(gateway.currency(), gateway);
        self
    }

    /// Builder-style registration.
    pub fn with(mut self, gateway: Arc<dyn ChainGateway>) -> Self {
        self.register(gateway);
        self
    }

    /// The gateway for a currency.
    pub fn get(&self, currency: Currency) -> Result<Arc<dyn ChainGateway>> {
        self.gateways
            .get(&currency)
            .cloned()
            .ok_or_else(|| ChainPayError::UnsupportedCurrency(currency.code().to_string()))
    }

    /// Currencies with a registered gateway.
    pub fn currencies(&self) -> Vec<Currency> {
        self.gateways.keys().copied().collect()
    }
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("currencies", &self.currencies())
            .finish()
    }
}
