//! Scripted gateway for settlement tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use chainpay_core::error::{ChainPayError, Result};
use chainpay_core::traits::ChainGateway;
use chainpay_core::types::{
    ConfirmationStatus, Currency, CustodialWallet, TransactionDetails, WalletAddress,
};

/// How a scripted `send` behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendBehavior {
    /// Return the scripted hash.
    Succeed,
    /// Fail with `BroadcastRejected`.
    RejectBroadcast,
    /// Fail with `InsufficientFunds` (no spendable inputs on chain).
    NoSpendableFunds,
}

/// A fully scripted chain gateway.
///
/// Every knob is interior-mutable so tests can flip behavior mid-scenario
/// (e.g. let a broadcast succeed, then report the transaction failed on a
/// later confirmation poll).
pub struct TestGateway {
    currency: Currency,
    valid_addresses: Mutex<HashSet<String>>,
    transactions: Mutex<Vec<TransactionDetails>>,
    send_behavior: Mutex<SendBehavior>,
    send_delay: Mutex<Duration>,
    sent: Mutex<Vec<(String, String, Decimal)>>,
    confirmation: Mutex<ConfirmationStatus>,
    price: Mutex<Decimal>,
    fail_scan: Mutex<bool>,
    tx_hash: String,
}

impl TestGateway {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            valid_addresses: Mutex::new(HashSet::new()),
            transactions: Mutex::new(Vec::new()),
            send_behavior: Mutex::new(SendBehavior::Succeed),
            send_delay: Mutex::new(Duration::ZERO),
            sent: Mutex::new(Vec::new()),
            confirmation: Mutex::new(ConfirmationStatus::Pending),
            price: Mutex::new(Decimal::new(1000, 0)),
            fail_scan: Mutex::new(false),
            tx_hash: "scripted-hash".into(),
        }
    }

    pub fn btc() -> Self {
        Self::new(Currency::Btc)
    }

    pub fn eth() -> Self {
        Self::new(Currency::Eth)
    }

    pub fn mark_valid(&self, address: &str) {
        self.valid_addresses
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    pub fn push_transaction(&self, tx: TransactionDetails) {
        self.transactions.lock().unwrap().push(tx);
    }

    pub fn set_send_behavior(&self, behavior: SendBehavior) {
        *self.send_behavior.lock().unwrap() = behavior;
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = delay;
    }

    pub fn set_confirmation(&self, status: ConfirmationStatus) {
        *self.confirmation.lock().unwrap() = status;
    }

    pub fn set_price(&self, price: Decimal) {
        *self.price.lock().unwrap() = price;
    }

    pub fn fail_next_scans(&self, fail: bool) {
        *self.fail_scan.lock().unwrap() = fail;
    }

    /// Broadcasts observed by the scripted gateway, as (from, to, amount).
    pub fn sent(&self) -> Vec<(String, String, Decimal)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn scripted_hash(&self) -> &str {
        &self.tx_hash
    }
}

#[async_trait]
impl ChainGateway for TestGateway {
    fn currency(&self) -> Currency {
        self.currency
    }

    async fn validate_address(&self, address: &WalletAddress) -> bool {
        self.valid_addresses
            .lock()
            .unwrap()
            .contains(address.as_str())
    }

    async fn estimate_fee(&self) -> Result<Decimal> {
        Ok(Decimal::new(20_000, 0))
    }

    async fn balance(&self, _address: &WalletAddress) -> Result<Decimal> {
        Ok(Decimal::new(10, 0))
    }

    async fn send(
        &self,
        from: &CustodialWallet,
        to: &WalletAddress,
        amount: Decimal,
    ) -> Result<String> {
        let delay = *self.send_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match *self.send_behavior.lock().unwrap() {
            SendBehavior::Succeed => {
                self.sent.lock().unwrap().push((
                    from.address.as_str().to_string(),
                    to.as_str().to_string(),
                    amount,
                ));
                Ok(self.tx_hash.clone())
            }
            SendBehavior::RejectBroadcast => {
                Err(ChainPayError::BroadcastRejected("scripted rejection".into()))
            }
            SendBehavior::NoSpendableFunds => Err(ChainPayError::InsufficientFunds {
                currency: self.currency,
                requested: amount,
                available: Decimal::ZERO,
            }),
        }
    }

    async fn recent_transactions(
        &self,
        _address: &WalletAddress,
        _window: Duration,
    ) -> Result<Vec<TransactionDetails>> {
        if *self.fail_scan.lock().unwrap() {
            return Err(chainpay_core::error::GatewayError::Timeout("scripted".into()).into());
        }
        Ok(self.transactions.lock().unwrap().clone())
    }

    async fn confirmation_status(&self, _tx_hash: &str) -> Result<ConfirmationStatus> {
        Ok(*self.confirmation.lock().unwrap())
    }

    async fn spot_price(&self) -> Result<Decimal> {
        Ok(*self.price.lock().unwrap())
    }
}

/// A transfer as the explorer would report it.
pub fn chain_tx(hash: &str, from: &str, to: &str, amount: Decimal) -> TransactionDetails {
    TransactionDetails {
        hash: hash.into(),
        from_address: WalletAddress::new(from),
        to_address: WalletAddress::new(to),
        amount,
        timestamp: chrono::Utc::now(),
    }
}
