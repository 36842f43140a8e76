//! # ChainPay Gateway
//!
//! Chain-explorer gateway implementations for the ChainPay engine.
//!
//! One [`chainpay_core::ChainGateway`] implementation exists per supported
//! currency, each talking to that chain's public explorer and price APIs
//! over HTTP:
//!
//! - [`BitcoinGateway`]: BlockCypher-shaped explorer (UTXO model, satoshi
//!   units, fee per kilobyte, 6-confirmation finality)
//! - [`EthereumGateway`]: Etherscan-shaped explorer (account model, wei
//!   units, gas-price fees, receipt-status finality)
//!
//! The [`GatewayRegistry`] keys gateways by currency so orchestration code
//! stays chain-agnostic. All endpoints, API keys, and timeouts come from
//! explicit config structs passed to the constructors — nothing is read
//! from the ambient environment at call time.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod bitcoin;
mod config;
mod ethereum;
mod http;
mod registry;

pub use bitcoin::BitcoinGateway;
pub use config::{BitcoinConfig, EthereumConfig};
pub use ethereum::EthereumGateway;
pub use registry::GatewayRegistry;
