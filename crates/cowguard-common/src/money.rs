//! Fixed-point money helpers
//!
//! Every stored amount is a `u64` in the smallest stablecoin unit
//! (6 decimals, 1 USDC = 1_000_000 units). Rates travel as `f64` while they
//! are being computed and are quantized to a [`Decimal`] before they touch
//! an amount.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::PricingError;

/// Amount in smallest units
pub type Amount = u64;

/// Stablecoin decimals
pub const TOKEN_DECIMALS: u32 = 6;

/// Units per whole token
pub const UNITS_PER_TOKEN: Amount = 1_000_000;

/// Basis point denominator (10000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Decimal places kept when quantizing a rate
pub const RATE_DECIMALS: u32 = 6;

/// Convert whole tokens into units
pub fn to_units(whole: u64) -> Option<Amount> {
    whole.checked_mul(UNITS_PER_TOKEN)
}

/// Quantize a floating rate to [`RATE_DECIMALS`] places
pub fn quantize_rate(rate: f64) -> Result<Decimal, PricingError> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(PricingError::Quantization(rate));
    }
    Decimal::try_from(rate)
        .map(|d| d.round_dp(RATE_DECIMALS))
        .map_err(|_| PricingError::Quantization(rate))
}

/// `amount × rate`, floored to whole units
pub fn apply_rate(amount: Amount, rate: Decimal) -> Result<Amount, PricingError> {
    Decimal::from(amount)
        .checked_mul(rate)
        .and_then(|v| v.floor().to_u64())
        .ok_or(PricingError::Overflow)
}

/// `amount × bps / 10000`, floored
pub fn apply_bps(amount: Amount, bps: u16) -> Amount {
    // bps <= u16::MAX keeps the product inside u128 and the quotient inside u64
    // whenever bps <= BPS_DENOMINATOR, which product validation enforces.
    let scaled = amount as u128 * bps as u128 / BPS_DENOMINATOR as u128;
    scaled.min(u64::MAX as u128) as Amount
}

/// Render units as a decimal token amount (for logs)
pub fn format_units(amount: Amount) -> String {
    Decimal::from_i128_with_scale(amount as i128, TOKEN_DECIMALS).to_string()
}
