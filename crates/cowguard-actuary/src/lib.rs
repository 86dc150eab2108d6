//! # Actuary
//!
//! Risk scoring and premium pricing for CowGuard.
//!
//! ## Pricing Formula
//!
//! ```text
//! rate = clamp(((E × L + C + M) / (1 − X)) × R, 1%, 20%)
//! ```
//!
//! Where:
//! - E: expected claim rate
//! - L: expected loss ratio
//! - C: operating cost
//! - M: profit margin
//! - X: cancellation rate
//! - R: risk multiplier derived from the risk score

pub mod calculator;
pub mod scorer;
pub mod tariff;

pub use calculator::{ActuarialResult, PremiumCalculator, PricingBreakdown};
pub use scorer::RiskScorer;
pub use tariff::{BaseRates, TariffTable};
