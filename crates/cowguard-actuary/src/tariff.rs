//! Tariff table - every constant the premium formula reads
//!
//! Injected into [`crate::PremiumCalculator`] at construction so alternate
//! tariffs can be substituted without touching the formula.

use cowguard_common::money::BPS_DENOMINATOR;
use cowguard_common::{CoverageType, LifecycleStage, PricingError, PREMIUM_RATE_CAP, PREMIUM_RATE_FLOOR};
use serde::{Deserialize, Serialize};

/// Base rate per coverage type for one lifecycle tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseRates {
    pub rug_pull: f64,
    pub price_drop: f64,
    pub smart_contract: f64,
    pub comprehensive: f64,
}

impl BaseRates {
    pub fn get(&self, coverage_type: CoverageType) -> f64 {
        match coverage_type {
            CoverageType::RugPull => self.rug_pull,
            CoverageType::PriceDrop => self.price_drop,
            CoverageType::SmartContract => self.smart_contract,
            CoverageType::Comprehensive => self.comprehensive,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (CoverageType, f64)> + '_ {
        CoverageType::ALL.into_iter().map(move |ct| (ct, self.get(ct)))
    }
}

/// Immutable pricing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TariffTable {
    /// Regular tokens
    pub standard_rates: BaseRates,
    /// Bonding-curve stage tokens
    pub launch_rates: BaseRates,
    /// Tokens past liquidity migration
    pub matured_rates: BaseRates,

    pub operating_cost: f64,
    pub profit_margin: f64,
    /// Expected share of policies cancelled before term
    pub cancellation_rate: f64,
    /// Share of an expected claim that is actually paid
    pub expected_loss_ratio: f64,

    /// Claim rate assumed without enough history
    pub default_claim_rate: f64,
    /// Policies needed before history is trusted
    pub min_policies_for_history: u64,
    pub high_trend_threshold: f64,
    pub high_trend_multiplier: f64,
    pub low_trend_threshold: f64,
    pub low_trend_multiplier: f64,

    /// Policy count at which data confidence saturates
    pub full_confidence_policies: u64,
    pub data_confidence_weight: f64,
    pub completeness_weight: f64,

    pub premium_floor: f64,
    pub premium_cap: f64,

    /// Share of the premium withheld on cancellation
    pub cancellation_fee_rate: f64,
    /// Share of the premium routed to the treasury on cancellation
    pub treasury_fee_rate: f64,
}

impl Default for TariffTable {
    fn default() -> Self {
        Self {
            standard_rates: BaseRates {
                rug_pull: 0.02,
                price_drop: 0.03,
                smart_contract: 0.05,
                comprehensive: 0.08,
            },
            launch_rates: BaseRates {
                rug_pull: 0.07,
                price_drop: 0.08,
                smart_contract: 0.09,
                comprehensive: 0.10,
            },
            matured_rates: BaseRates {
                rug_pull: 0.03,
                price_drop: 0.04,
                smart_contract: 0.05,
                comprehensive: 0.06,
            },
            operating_cost: 0.05,
            profit_margin: 0.12,
            cancellation_rate: 0.10,
            expected_loss_ratio: 0.8,
            default_claim_rate: 0.10,
            min_policies_for_history: 100,
            high_trend_threshold: 0.15,
            high_trend_multiplier: 1.2,
            low_trend_threshold: 0.05,
            low_trend_multiplier: 0.8,
            full_confidence_policies: 1000,
            data_confidence_weight: 0.7,
            completeness_weight: 0.3,
            premium_floor: PREMIUM_RATE_FLOOR,
            premium_cap: PREMIUM_RATE_CAP,
            cancellation_fee_rate: 0.30,
            treasury_fee_rate: 0.03,
        }
    }
}

impl TariffTable {
    /// Base rate for a coverage type at a lifecycle stage
    pub fn base_rate(&self, coverage_type: CoverageType, stage: LifecycleStage) -> f64 {
        let tier = match stage {
            LifecycleStage::Standard => &self.standard_rates,
            LifecycleStage::LaunchPhase => &self.launch_rates,
            LifecycleStage::Matured => &self.matured_rates,
        };
        tier.get(coverage_type)
    }

    /// Cancellation fee in basis points
    pub fn cancellation_fee_bps(&self) -> u16 {
        rate_to_bps(self.cancellation_fee_rate)
    }

    /// Treasury fee in basis points
    pub fn treasury_fee_bps(&self) -> u16 {
        rate_to_bps(self.treasury_fee_rate)
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        for (tier, rates) in [
            ("standard", &self.standard_rates),
            ("launch", &self.launch_rates),
            ("matured", &self.matured_rates),
        ] {
            for (ct, rate) in rates.iter() {
                unit_interval(&format!("{} base rate for {}", tier, ct), rate)?;
            }
        }

        unit_interval("operating_cost", self.operating_cost)?;
        unit_interval("profit_margin", self.profit_margin)?;
        unit_interval("expected_loss_ratio", self.expected_loss_ratio)?;
        unit_interval("default_claim_rate", self.default_claim_rate)?;
        unit_interval("data_confidence_weight", self.data_confidence_weight)?;
        unit_interval("completeness_weight", self.completeness_weight)?;

        if !(0.0..1.0).contains(&self.cancellation_rate) {
            return Err(invalid(format!(
                "cancellation_rate {} must be in [0, 1)",
                self.cancellation_rate
            )));
        }
        if self.full_confidence_policies == 0 {
            return Err(invalid("full_confidence_policies must be positive".into()));
        }
        if !(self.premium_floor > 0.0 && self.premium_floor <= self.premium_cap && self.premium_cap <= 1.0) {
            return Err(invalid(format!(
                "premium bounds [{}, {}] must satisfy 0 < floor <= cap <= 1",
                self.premium_floor, self.premium_cap
            )));
        }
        if self.low_trend_threshold > self.high_trend_threshold {
            return Err(invalid("low trend threshold above high trend threshold".into()));
        }

        unit_interval("cancellation_fee_rate", self.cancellation_fee_rate)?;
        unit_interval("treasury_fee_rate", self.treasury_fee_rate)?;
        if self.cancellation_fee_bps() as u64 + self.treasury_fee_bps() as u64 > BPS_DENOMINATOR {
            return Err(invalid("cancellation and treasury fees exceed the premium".into()));
        }
        Ok(())
    }
}

fn rate_to_bps(rate: f64) -> u16 {
    (rate * BPS_DENOMINATOR as f64).round().clamp(0.0, BPS_DENOMINATOR as f64) as u16
}

fn unit_interval(name: &str, value: f64) -> Result<(), PricingError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{} = {} outside [0, 1]", name, value)))
    }
}

fn invalid(msg: String) -> PricingError {
    PricingError::InvalidTariff(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tariff_is_valid() {
        TariffTable::default().validate().unwrap();
    }

    #[test]
    fn test_base_rate_tiers() {
        let tariff = TariffTable::default();
        assert_eq!(tariff.base_rate(CoverageType::RugPull, LifecycleStage::Standard), 0.02);
        assert_eq!(tariff.base_rate(CoverageType::RugPull, LifecycleStage::LaunchPhase), 0.07);
        assert_eq!(tariff.base_rate(CoverageType::Comprehensive, LifecycleStage::Matured), 0.06);
    }

    #[test]
    fn test_fee_bps() {
        let tariff = TariffTable::default();
        assert_eq!(tariff.cancellation_fee_bps(), 3000);
        assert_eq!(tariff.treasury_fee_bps(), 300);
    }

    #[test]
    fn test_invalid_tariffs() {
        let mut tariff = TariffTable::default();
        tariff.cancellation_rate = 1.0;
        assert!(tariff.validate().is_err());

        let mut tariff = TariffTable::default();
        tariff.premium_floor = 0.3;
        assert!(tariff.validate().is_err());

        let mut tariff = TariffTable::default();
        tariff.cancellation_fee_rate = 0.99;
        tariff.treasury_fee_rate = 0.05;
        assert!(tariff.validate().is_err());

        let mut tariff = TariffTable::default();
        tariff.launch_rates.price_drop = f64::NAN;
        assert!(tariff.validate().is_err());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let tariff: TariffTable = serde_json::from_str(r#"{"profit_margin": 0.2}"#).unwrap();
        assert_eq!(tariff.profit_margin, 0.2);
        assert_eq!(tariff.operating_cost, 0.05);
    }
}
