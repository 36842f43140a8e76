//! Supported currencies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{BTC_MIN_CONFIRMATIONS, ETH_MIN_CONFIRMATIONS};
use crate::error::ChainPayError;

/// A cryptocurrency supported by the engine.
///
/// Every chain differs in unit precision, fee model, and confirmation
/// semantics; those quirks live behind the gateway implementation for the
/// currency, keyed by this enum. Adding a chain means adding a variant and
/// a gateway, not touching orchestration code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Bitcoin (UTXO model, 8 decimal places, fee per kilobyte).
    Btc,
    /// Ethereum (account model, 18 decimal places, gas price fees).
    Eth,
}

impl Currency {
    /// Canonical uppercase ticker code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Btc => "BTC",
            Currency::Eth => "ETH",
        }
    }

    /// Decimal places of the human unit.
    pub fn decimals(&self) -> u32 {
        match self {
            Currency::Btc => 8,
            Currency::Eth => 18,
        }
    }

    /// Confirmations required before an outbound transaction is final.
    pub fn min_confirmations(&self) -> u32 {
        match self {
            Currency::Btc => BTC_MIN_CONFIRMATIONS,
            Currency::Eth => ETH_MIN_CONFIRMATIONS,
        }
    }

    /// All supported currencies.
    pub fn all() -> &'static [Currency] {
        &[Currency::Btc, Currency::Eth]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ChainPayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BTC" => Ok(Currency::Btc),
            "ETH" => Ok(Currency::Eth),
            other => Err(ChainPayError::UnsupportedCurrency(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("btc", Currency::Btc ; "lowercase btc")]
    #[test_case("BTC", Currency::Btc ; "uppercase btc")]
    #[test_case(" eth ", Currency::Eth ; "padded eth")]
    fn test_parse(input: &str, expected: Currency) {
        assert_eq!(input.parse::<Currency>().unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "DOGE".parse::<Currency>().unwrap_err();
        assert!(matches!(err, ChainPayError::UnsupportedCurrency(code) if code == "DOGE"));
    }

    #[test]
    fn test_display_round_trip() {
        for c in Currency::all() {
            assert_eq!(c.code().parse::<Currency>().unwrap(), *c);
        }
    }
}
