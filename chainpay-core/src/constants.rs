//! Engine constants.
//!
//! Matching tolerances, lookback windows, and native unit scales shared by
//! the gateway, verifier, and ledger crates.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ═══════════════════════════════════════════════════════════════════════════════
// INBOUND PAYMENT MATCHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Absolute tolerance when matching an observed on-chain amount against the
/// amount a payment page expected.
///
/// This absorbs rounding between the payer's wallet software and the page's
/// quoted amount. It is not a security control; donations skip the amount
/// check entirely.
pub const PAYMENT_AMOUNT_TOLERANCE: Decimal = dec!(0.0001);

/// How far back the verifier scans an address for a claimed payment, in
/// seconds. Four hours covers slow-fee confirmation lag without paging
/// through deep explorer history.
pub const RECENT_TX_WINDOW_SECS: u64 = 4 * 3600;

// ═══════════════════════════════════════════════════════════════════════════════
// NATIVE UNIT SCALES
// ═══════════════════════════════════════════════════════════════════════════════

/// Satoshis per bitcoin.
pub const SATS_PER_BTC: Decimal = dec!(100_000_000);

/// Wei per ether.
pub const WEI_PER_ETH: Decimal = dec!(1_000_000_000_000_000_000);

/// Wei per gwei (fee rates are quoted in gwei).
pub const WEI_PER_GWEI: Decimal = dec!(1_000_000_000);

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIRMATION THRESHOLDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Confirmations after which a bitcoin-style transaction is final.
pub const BTC_MIN_CONFIRMATIONS: u32 = 6;

/// Confirmations after which an ethereum-style transaction is final.
///
/// The ethereum explorer path reports a settled receipt status rather than a
/// running confirmation count, so a single confirmed receipt is terminal.
pub const ETH_MIN_CONFIRMATIONS: u32 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM BLOCK TIME
// ═══════════════════════════════════════════════════════════════════════════════

/// Approximate seconds per ethereum block, used to translate a time window
/// into an explorer block range.
pub const ETH_SECS_PER_BLOCK: u64 = 15;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_scales_are_exact() {
        assert_eq!(SATS_PER_BTC * dec!(0.00000001), dec!(1));
        assert_eq!(WEI_PER_ETH / WEI_PER_GWEI, dec!(1_000_000_000));
    }

    #[test]
    fn tolerance_is_sub_cent_scale() {
        assert!(PAYMENT_AMOUNT_TOLERANCE > Decimal::ZERO);
        assert!(PAYMENT_AMOUNT_TOLERANCE < dec!(0.001));
    }
}
