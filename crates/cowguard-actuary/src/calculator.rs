//! Premium calculator
//!
//! ```text
//! premium_rate = clamp(((E × L + C + M) / (1 − X)) × R, floor, cap)
//! ```
//!
//! Where:
//! - E: expected claim rate (history with trend, or the default without enough data)
//! - L: expected loss ratio
//! - C / M: operating cost and profit margin
//! - X: cancellation rate
//! - R: risk multiplier, `0.5 + score/100 × 1.5`

use cowguard_common::money::{apply_rate, quantize_rate};
use cowguard_common::{Amount, CoverageType, LifecycleStage, PricingError, RiskFactors, MAX_RISK_SCORE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::scorer::RiskScorer;
use crate::tariff::TariffTable;

/// Risk multiplier at score 0
pub const MIN_RISK_MULTIPLIER: f64 = 0.5;
/// Risk multiplier at score 100
pub const MAX_RISK_MULTIPLIER: f64 = 2.0;

/// Inputs and intermediates of one premium calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub coverage_type: CoverageType,
    pub lifecycle_stage: LifecycleStage,
    pub launch_phase: bool,
    /// Tier base rate; reported only, not part of the premium rate
    pub base_rate: f64,
    /// Risk multiplier applied
    pub risk_adjustment: f64,
    /// Expected claim rate used
    pub claim_rate_adjustment: f64,
    /// Trend multiplier applied to the historical rate (1.0 when unused)
    pub trend_multiplier: f64,
    /// Fewer policies than the history threshold
    pub insufficient_data: bool,
    pub operating_cost: f64,
    pub profit_margin: f64,
    pub cancellation_rate: f64,
    /// Rate before clamping to the floor/cap
    pub unclamped_rate: f64,
}

/// Premium calculation output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuarialResult {
    /// Premium rate in [floor, cap]
    pub premium_rate: f64,
    pub expected_claim_rate: f64,
    /// Risk score in [0, 100]
    pub risk_score: f64,
    /// Risk multiplier in [0.5, 2.0]
    pub risk_multiplier: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub breakdown: PricingBreakdown,
}

impl ActuarialResult {
    /// Premium rate quantized for money arithmetic
    pub fn quantized_rate(&self) -> Result<Decimal, PricingError> {
        quantize_rate(self.premium_rate)
    }

    /// Premium owed for `coverage` units, floored
    pub fn premium_for(&self, coverage: Amount) -> Result<Amount, PricingError> {
        apply_rate(coverage, self.quantized_rate()?)
    }

    /// The rate hit the floor or cap
    pub fn is_clamped(&self) -> bool {
        self.premium_rate != self.breakdown.unclamped_rate
    }
}

/// Stateless premium calculator over an injected tariff
#[derive(Debug, Clone)]
pub struct PremiumCalculator {
    tariff: Arc<TariffTable>,
}

impl PremiumCalculator {
    /// Create a calculator, rejecting an inconsistent tariff
    pub fn new(tariff: TariffTable) -> Result<Self, PricingError> {
        tariff.validate()?;
        Ok(Self {
            tariff: Arc::new(tariff),
        })
    }

    pub fn tariff(&self) -> &TariffTable {
        &self.tariff
    }

    /// Price one coverage request
    #[instrument(level = "debug", skip(self, factors))]
    pub fn calculate(
        &self,
        coverage_type: CoverageType,
        factors: &RiskFactors,
        stage: LifecycleStage,
        is_launch_phase: bool,
    ) -> Result<ActuarialResult, PricingError> {
        factors.validate()?;

        // 1. Expected claim rate
        let (expected_claim_rate, trend_multiplier, insufficient_data) = self.expected_claim_rate(factors);

        // 2. Risk score
        let risk_score = RiskScorer::score(coverage_type, factors, is_launch_phase);

        // 3. Tier base rate (reporting only)
        let base_rate = self.tariff.base_rate(coverage_type, stage);

        // 4. Risk multiplier
        let risk_multiplier = Self::risk_multiplier(risk_score);

        // 5-6. Final rate, clamped
        let unclamped_rate = self.final_rate(expected_claim_rate, risk_multiplier);
        let premium_rate = unclamped_rate.clamp(self.tariff.premium_floor, self.tariff.premium_cap);

        // 7. Confidence
        let confidence = self.confidence(factors);

        debug!(
            %coverage_type,
            risk_score,
            expected_claim_rate,
            unclamped_rate,
            premium_rate,
            confidence,
            "Premium calculated"
        );

        Ok(ActuarialResult {
            premium_rate,
            expected_claim_rate,
            risk_score,
            risk_multiplier,
            confidence,
            breakdown: PricingBreakdown {
                coverage_type,
                lifecycle_stage: stage,
                launch_phase: is_launch_phase,
                base_rate,
                risk_adjustment: risk_multiplier,
                claim_rate_adjustment: expected_claim_rate,
                trend_multiplier,
                insufficient_data,
                operating_cost: self.tariff.operating_cost,
                profit_margin: self.tariff.profit_margin,
                cancellation_rate: self.tariff.cancellation_rate,
                unclamped_rate,
            },
        })
    }

    /// Expected claim rate, the trend multiplier used, and whether the
    /// default was substituted for missing history
    pub fn expected_claim_rate(&self, factors: &RiskFactors) -> (f64, f64, bool) {
        let t = &self.tariff;
        if factors.total_policies < t.min_policies_for_history {
            return (t.default_claim_rate, 1.0, true);
        }

        let historical = factors.total_claims as f64 / factors.total_policies as f64;
        let trend = self.trend_multiplier(factors.historical_claim_rate);
        (historical * trend, trend, false)
    }

    fn trend_multiplier(&self, recent_claim_rate: f64) -> f64 {
        let t = &self.tariff;
        if recent_claim_rate > t.high_trend_threshold {
            t.high_trend_multiplier
        } else if recent_claim_rate < t.low_trend_threshold {
            t.low_trend_multiplier
        } else {
            1.0
        }
    }

    /// Map a risk score onto [0.5, 2.0]
    pub fn risk_multiplier(risk_score: f64) -> f64 {
        let normalized = (risk_score / MAX_RISK_SCORE).clamp(0.0, 1.0);
        MIN_RISK_MULTIPLIER + normalized * (MAX_RISK_MULTIPLIER - MIN_RISK_MULTIPLIER)
    }

    /// Unclamped rate for an expected claim rate and risk multiplier
    pub fn final_rate(&self, expected_claim_rate: f64, risk_multiplier: f64) -> f64 {
        let t = &self.tariff;
        let expected_loss = expected_claim_rate * t.expected_loss_ratio;
        let numerator = expected_loss + t.operating_cost + t.profit_margin;
        (numerator / (1.0 - t.cancellation_rate)) * risk_multiplier
    }

    /// How much data backs the calculation, in [0, 1]
    pub fn confidence(&self, factors: &RiskFactors) -> f64 {
        let t = &self.tariff;
        let data_confidence = (factors.total_policies as f64 / t.full_confidence_policies as f64).min(1.0);

        let present = [
            factors.historical_claim_rate,
            factors.volatility,
            factors.liquidity,
            factors.audit_score,
        ]
        .iter()
        .filter(|v| **v > 0.0)
        .count();
        let completeness = present as f64 / 4.0;

        data_confidence * t.data_confidence_weight + completeness * t.completeness_weight
    }
}

impl Default for PremiumCalculator {
    fn default() -> Self {
        Self {
            tariff: Arc::new(TariffTable::default()),
        }
    }
}
