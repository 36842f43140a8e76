//! Bitcoin gateway.
//!
//! Talks to a BlockCypher-shaped explorer. Amounts cross the wire in
//! satoshis and are converted to BTC with fixed-point division; fee rates
//! are satoshis per kilobyte; finality is six confirmations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use chainpay_core::constants::SATS_PER_BTC;
use chainpay_core::error::{ChainPayError, GatewayError, Result};
use chainpay_core::traits::{ChainGateway, ChainSigner, TransferIntent};
use chainpay_core::types::{
    ConfirmationStatus, Currency, CustodialWallet, TransactionDetails, WalletAddress,
};
use chainpay_vault::SecretVault;

use crate::config::BitcoinConfig;
use crate::http::{classify_transport, require_success};

/// Gateway for the bitcoin-style chain.
pub struct BitcoinGateway {
    config: BitcoinConfig,
    http: reqwest::Client,
    vault: Arc<SecretVault>,
    signer: Arc<dyn ChainSigner>,
}

impl BitcoinGateway {
    /// Creates a gateway from explicit configuration, the key vault, and
    /// the injected transaction signer.
    pub fn new(config: BitcoinConfig, vault: Arc<SecretVault>, signer: Arc<dyn ChainSigner>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http,
            vault,
            signer,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}?token={}",
            self.config.base_url.trim_end_matches('/'),
            path,
            self.config.api_key
        )
    }

    fn sats_to_btc(sats: i64) -> Decimal {
        Decimal::from(sats) / SATS_PER_BTC
    }

    async fn address_balance(&self, address: &WalletAddress) -> Result<AddressBalance> {
        let response = self
            .http
            .get(self.url(&format!("/addrs/{}/balance", address)))
            .send()
            .await
            .map_err(classify_transport)?;
        let response = require_success(response)?;
        let balance = response
            .json::<AddressBalance>()
            .await
            .map_err(classify_transport)?;
        Ok(balance)
    }

    async fn broadcast(&self, raw_hex: &str) -> Result<String> {
        let response = self
            .http
            .post(self.url("/txs/push"))
            .json(&serde_json::json!({ "tx": raw_hex }))
            .send()
            .await
            .map_err(classify_transport)?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChainPayError::BroadcastRejected(detail));
        }

        let pushed = response
            .json::<PushResponse>()
            .await
            .map_err(classify_transport)?;
        Ok(pushed.tx.hash)
    }
}

#[async_trait]
impl ChainGateway for BitcoinGateway {
    fn currency(&self) -> Currency {
        Currency::Btc
    }

    #[instrument(skip(self))]
    async fn validate_address(&self, address: &WalletAddress) -> bool {
        match self.address_balance(address).await {
            Ok(_) => true,
            Err(err) => {
                debug!(%address, %err, "address failed explorer lookup");
                false
            }
        }
    }

    /// Medium fee rate in satoshis per kilobyte, from the explorer's chain
    /// info.
    #[instrument(skip(self))]
    async fn estimate_fee(&self) -> Result<Decimal> {
        let response = self
            .http
            .get(self.url(""))
            .send()
            .await
            .map_err(classify_transport)?;
        let response = require_success(response)?;
        let info = response
            .json::<ChainInfo>()
            .await
            .map_err(classify_transport)?;
        Ok(Decimal::from(info.medium_fee_per_kb))
    }

    #[instrument(skip(self))]
    async fn balance(&self, address: &WalletAddress) -> Result<Decimal> {
        let balance = self.address_balance(address).await?;
        Ok(Self::sats_to_btc(balance.final_balance))
    }

    #[instrument(skip(self, from), fields(from = %from.address))]
    async fn send(
        &self,
        from: &CustodialWallet,
        to: &WalletAddress,
        amount: Decimal,
    ) -> Result<String> {
        let fee = self
            .estimate_fee()
            .await
            .map_err(|e| ChainPayError::FeeEstimationFailed(e.to_string()))?;

        let spendable = self.balance(&from.address).await?;
        if spendable <= Decimal::ZERO || spendable < amount {
            return Err(ChainPayError::InsufficientFunds {
                currency: Currency::Btc,
                requested: amount,
                available: spendable,
            });
        }

        // Key material lives exactly as long as the signing call.
        let signed = {
            let key = self.vault.decrypt(&from.encrypted_private_key)?;
            self.signer.sign_transfer(TransferIntent {
                private_key: &key,
                from: &from.address,
                to,
                amount,
                fee,
            })?
        };

        let hash = self.broadcast(&signed.raw_hex).await?;
        debug!(%hash, "broadcast accepted");
        Ok(hash)
    }

    #[instrument(skip(self))]
    async fn recent_transactions(
        &self,
        address: &WalletAddress,
        window: Duration,
    ) -> Result<Vec<TransactionDetails>> {
        let response = self
            .http
            .get(self.url(&format!("/addrs/{}/full", address)))
            .send()
            .await
            .map_err(classify_transport)?;
        let response = require_success(response)?;
        let full = response
            .json::<FullAddress>()
            .await
            .map_err(classify_transport)?;

        let cutoff = Utc::now()
            - chrono::Duration::from_std(window)
                .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let mut transactions = Vec::new();
        for tx in full.txs {
            // A coinbase or malformed entry has nothing to match against.
            let (Some(input), Some(output)) = (tx.inputs.first(), tx.outputs.first()) else {
                continue;
            };
            let (Some(from_addr), Some(to_addr)) =
                (input.addresses.first(), output.addresses.first())
            else {
                continue;
            };
            if from_addr.is_empty() || to_addr.is_empty() || output.value == 0 {
                continue;
            }
            // Entries the explorer reports without a timestamp are treated
            // as fresh rather than silently hidden.
            if let Some(received) = tx.received {
                if received < cutoff {
                    continue;
                }
            }

            transactions.push(TransactionDetails {
                hash: tx.hash,
                from_address: WalletAddress::new(from_addr),
                to_address: WalletAddress::new(to_addr),
                amount: Self::sats_to_btc(output.value as i64),
                timestamp: tx.received.unwrap_or_else(Utc::now),
            });
        }

        debug!(count = transactions.len(), "recent transactions fetched");
        Ok(transactions)
    }

    #[instrument(skip(self))]
    async fn confirmation_status(&self, tx_hash: &str) -> Result<ConfirmationStatus> {
        let response = self
            .http
            .get(self.url(&format!("/txs/{tx_hash}")))
            .send()
            .await
            .map_err(classify_transport)?;
        let response = require_success(response)?;
        let status = response
            .json::<TxStatus>()
            .await
            .map_err(classify_transport)?;

        if let Some(error) = status.error {
            warn!(%tx_hash, %error, "explorer reports transaction failure");
            return Ok(ConfirmationStatus::Failed);
        }
        Ok(match status.confirmations {
            n if n >= self.min_confirmations() => ConfirmationStatus::Confirmed,
            n if n >= 1 => ConfirmationStatus::Seen { confirmations: n },
            _ => ConfirmationStatus::Pending,
        })
    }

    #[instrument(skip(self))]
    async fn spot_price(&self) -> Result<Decimal> {
        let response = self
            .http
            .get(&self.config.price_url)
            .send()
            .await
            .map_err(classify_transport)?;
        let response = require_success(response)?;
        let price = response
            .json::<PriceResponse>()
            .await
            .map_err(classify_transport)?;
        Ok(price.bitcoin.usd)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPLORER RESPONSE SHAPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct AddressBalance {
    final_balance: i64,
}

#[derive(Debug, Deserialize)]
struct ChainInfo {
    medium_fee_per_kb: u64,
}

#[derive(Debug, Deserialize)]
struct FullAddress {
    #[serde(default)]
    txs: Vec<RawTx>,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    hash: String,
    #[serde(default)]
    received: Option<DateTime<Utc>>,
    #[serde(default)]
    inputs: Vec<TxInput>,
    #[serde(default)]
    outputs: Vec<TxOutput>,
}

#[derive(Debug, Deserialize)]
struct TxInput {
    #[serde(default)]
    addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TxOutput {
    #[serde(default)]
    addresses: Vec<String>,
    #[serde(default)]
    value: u64,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    tx: PushedTx,
}

#[derive(Debug, Deserialize)]
struct PushedTx {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TxStatus {
    #[serde(default)]
    confirmations: u32,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    bitcoin: PricePoint,
}

#[derive(Debug, Deserialize)]
struct PricePoint {
    usd: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainpay_core::traits::SignedTransfer;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StubSigner;

    impl ChainSigner for StubSigner {
        fn sign_transfer(&self, intent: TransferIntent<'_>) -> Result<SignedTransfer> {
            assert!(!intent.private_key.expose().is_empty());
            Ok(SignedTransfer {
                raw_hex: "0100beef".into(),
            })
        }
    }

    fn vault() -> Arc<SecretVault> {
        Arc::new(SecretVault::new([9u8; 32], "custodial-wallets"))
    }

    fn gateway(server: &MockServer) -> BitcoinGateway {
        let config = BitcoinConfig {
            api_key: "test-token".into(),
            base_url: server.uri(),
            price_url: format!("{}/price", server.uri()),
            testnet: true,
            timeout_seconds: 5,
        };
        BitcoinGateway::new(config, vault(), Arc::new(StubSigner))
    }

    fn hot_wallet(vault: &SecretVault) -> CustodialWallet {
        CustodialWallet::new(
            Currency::Btc,
            WalletAddress::new("mfrom000"),
            vault.encrypt("cVt4o7BGAig1UXy").unwrap(),
            "hot-1",
        )
    }

    #[tokio::test]
    async fn test_balance_converts_satoshis() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/addrs/maddr/balance"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "final_balance": 123_456_789 })),
            )
            .mount(&server)
            .await;

        let balance = gateway(&server)
            .balance(&WalletAddress::new("maddr"))
            .await
            .unwrap();
        assert_eq!(balance, dec!(1.23456789));
    }

    #[tokio::test]
    async fn test_validate_address_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/addrs/good/balance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "final_balance": 0 })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/addrs/bad/balance"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gw = gateway(&server);
        assert!(gw.validate_address(&WalletAddress::new("good")).await);
        assert!(!gw.validate_address(&WalletAddress::new("bad")).await);
    }

    #[tokio::test]
    async fn test_estimate_fee_reads_chain_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "medium_fee_per_kb": 25_000 })),
            )
            .mount(&server)
            .await;

        assert_eq!(gateway(&server).estimate_fee().await.unwrap(), dec!(25000));
    }

    #[tokio::test]
    async fn test_recent_transactions_skip_rules() {
        let server = MockServer::start().await;
        let fresh = Utc::now().to_rfc3339();
        Mock::given(method("GET"))
            .and(path("/addrs/page/full"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "txs": [
                    // Good entry
                    { "hash": "aa", "received": fresh,
                      "inputs": [{ "addresses": ["payer"] }],
                      "outputs": [{ "addresses": ["page"], "value": 50_000_000 }] },
                    // Coinbase-like: no inputs
                    { "hash": "bb", "received": fresh,
                      "inputs": [], "outputs": [{ "addresses": ["page"], "value": 1 }] },
                    // Zero value
                    { "hash": "cc", "received": fresh,
                      "inputs": [{ "addresses": ["payer"] }],
                      "outputs": [{ "addresses": ["page"], "value": 0 }] },
                    // Stale: outside the window
                    { "hash": "dd", "received": "2020-01-01T00:00:00Z",
                      "inputs": [{ "addresses": ["payer"] }],
                      "outputs": [{ "addresses": ["page"], "value": 1_000 }] }
                ]
            })))
            .mount(&server)
            .await;

        let txs = gateway(&server)
            .recent_transactions(&WalletAddress::new("page"), Duration::from_secs(4 * 3600))
            .await
            .unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].hash, "aa");
        assert_eq!(txs[0].amount, dec!(0.5));
        assert_eq!(txs[0].from_address.as_str(), "payer");
    }

    #[tokio::test]
    async fn test_confirmation_thresholds() {
        let server = MockServer::start().await;
        for (hash, body) in [
            ("final", json!({ "confirmations": 6 })),
            ("young", json!({ "confirmations": 2 })),
            ("unseen", json!({ "confirmations": 0 })),
            ("broken", json!({ "confirmations": 0, "error": "rejected" })),
        ] {
            Mock::given(method("GET"))
                .and(path(format!("/txs/{hash}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;
        }

        let gw = gateway(&server);
        assert_eq!(
            gw.confirmation_status("final").await.unwrap(),
            ConfirmationStatus::Confirmed
        );
        assert_eq!(
            gw.confirmation_status("young").await.unwrap(),
            ConfirmationStatus::Seen { confirmations: 2 }
        );
        assert_eq!(
            gw.confirmation_status("unseen").await.unwrap(),
            ConfirmationStatus::Pending
        );
        assert_eq!(
            gw.confirmation_status("broken").await.unwrap(),
            ConfirmationStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_send_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "medium_fee_per_kb": 20_000 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/addrs/.+/balance$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "final_balance": 200_000_000 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/txs/push"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "tx": { "hash": "feedface" } })),
            )
            .mount(&server)
            .await;

        let gw = gateway(&server);
        let wallet = hot_wallet(&vault());
        let hash = gw
            .send(&wallet, &WalletAddress::new("mdest"), dec!(0.5))
            .await
            .unwrap();
        assert_eq!(hash, "feedface");
    }

    #[tokio::test]
    async fn test_send_no_spendable_funds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "medium_fee_per_kb": 20_000 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/addrs/.+/balance$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "final_balance": 0 })))
            .mount(&server)
            .await;

        let gw = gateway(&server);
        let wallet = hot_wallet(&vault());
        let err = gw
            .send(&wallet, &WalletAddress::new("mdest"), dec!(0.5))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainPayError::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn test_send_fee_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gw = gateway(&server);
        let wallet = hot_wallet(&vault());
        let err = gw
            .send(&wallet, &WalletAddress::new("mdest"), dec!(0.5))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainPayError::FeeEstimationFailed(_)));
    }

    #[tokio::test]
    async fn test_send_broadcast_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "medium_fee_per_kb": 20_000 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/addrs/.+/balance$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "final_balance": 200_000_000 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/txs/push"))
            .respond_with(ResponseTemplate::new(400).set_body_string("dust output"))
            .mount(&server)
            .await;

        let gw = gateway(&server);
        let wallet = hot_wallet(&vault());
        let err = gw
            .send(&wallet, &WalletAddress::new("mdest"), dec!(0.5))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainPayError::BroadcastRejected(detail) if detail.contains("dust")));
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/addrs/maddr/balance"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .balance(&WalletAddress::new("maddr"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChainPayError::Gateway(GatewayError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn test_garbage_body_is_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/addrs/maddr/balance"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .balance(&WalletAddress::new("maddr"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChainPayError::Gateway(GatewayError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_hung_explorer_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/addrs/slow/balance"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "final_balance": 0 }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = BitcoinConfig {
            api_key: "t".into(),
            base_url: server.uri(),
            price_url: format!("{}/price", server.uri()),
            testnet: true,
            timeout_seconds: 1,
        };
        let gw = BitcoinGateway::new(config, vault(), Arc::new(StubSigner));
        let err = gw.balance(&WalletAddress::new("slow")).await.unwrap_err();
        assert!(matches!(
            err,
            ChainPayError::Gateway(GatewayError::Timeout(_))
        ));
        assert!(err.is_recoverable());
    }
}
