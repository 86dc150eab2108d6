//! Risk inputs - coverage types, lifecycle stages and the risk factor snapshot

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{InputError, PricingError};
use crate::money::Amount;

/// Category of loss event insured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    /// Liquidity pulled / project abandoned
    RugPull,
    /// Price collapse
    PriceDrop,
    /// Contract exploit
    SmartContract,
    /// Weighted blend of the three above
    Comprehensive,
}

impl CoverageType {
    pub const ALL: [CoverageType; 4] = [
        CoverageType::RugPull,
        CoverageType::PriceDrop,
        CoverageType::SmartContract,
        CoverageType::Comprehensive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageType::RugPull => "rug_pull",
            CoverageType::PriceDrop => "price_drop",
            CoverageType::SmartContract => "smart_contract",
            CoverageType::Comprehensive => "comprehensive",
        }
    }
}

impl std::fmt::Display for CoverageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoverageType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "rug_pull" | "rugpull" => Ok(CoverageType::RugPull),
            "price_drop" | "pricedrop" => Ok(CoverageType::PriceDrop),
            "smart_contract" | "smartcontract" => Ok(CoverageType::SmartContract),
            "comprehensive" => Ok(CoverageType::Comprehensive),
            _ => Err(InputError::UnknownCoverageType(s.to_string())),
        }
    }
}

/// Token lifecycle stage, selects the base-rate tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// Regular listed token
    #[default]
    Standard,
    /// Bonding-curve stage, before liquidity migration
    LaunchPhase,
    /// Bonding curve completed, liquidity migrated
    Matured,
}

impl LifecycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStage::Standard => "standard",
            LifecycleStage::LaunchPhase => "launch_phase",
            LifecycleStage::Matured => "matured",
        }
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStage {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "standard" => Ok(LifecycleStage::Standard),
            "launch_phase" | "launchphase" | "launch" => Ok(LifecycleStage::LaunchPhase),
            "matured" | "migrated" => Ok(LifecycleStage::Matured),
            _ => Err(InputError::UnknownLifecycleStage(s.to_string())),
        }
    }
}

/// Historical claim aggregates for a product line
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoricalClaims {
    pub total_policies: u64,
    pub total_claims: u64,
    pub total_premiums: Amount,
    pub total_payouts: Amount,
}

impl HistoricalClaims {
    /// Observed claims per policy, 0 when nothing has been sold
    pub fn claim_rate(&self) -> f64 {
        if self.total_policies == 0 {
            0.0
        } else {
            self.total_claims as f64 / self.total_policies as f64
        }
    }
}

/// Snapshot of the signals backing one coverage request
///
/// Passed by value and never mutated once built.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskFactors {
    // Historical aggregates
    /// Recent claim rate (0-1), drives the trend adjustment
    pub historical_claim_rate: f64,
    pub total_policies: u64,
    pub total_claims: u64,
    pub total_premiums: Amount,
    pub total_payouts: Amount,

    // Market signals
    /// Price volatility (0-1)
    pub volatility: f64,
    /// Liquidity score (0-100)
    pub liquidity: f64,
    /// Market capitalisation in USD
    pub market_cap: f64,
    /// Trading volume in USD
    pub trading_volume: f64,

    // Assessment signals
    /// Audit score (0-100)
    pub audit_score: f64,
    /// Holder distribution score (0-100, higher is more dispersed)
    pub holder_distribution: f64,
    /// Team verification (0-1)
    pub team_verification: f64,
    /// Contract complexity (0-100)
    pub contract_complexity: f64,
}

impl RiskFactors {
    /// Replace the historical aggregates
    pub fn with_history(mut self, history: HistoricalClaims) -> Self {
        self.total_policies = history.total_policies;
        self.total_claims = history.total_claims;
        self.total_premiums = history.total_premiums;
        self.total_payouts = history.total_payouts;
        self.historical_claim_rate = history.claim_rate();
        self
    }

    /// Check every signal against its documented range
    pub fn validate(&self) -> Result<(), PricingError> {
        check_range("historical_claim_rate", self.historical_claim_rate, 0.0, 1.0)?;
        check_range("volatility", self.volatility, 0.0, 1.0)?;
        check_range("liquidity", self.liquidity, 0.0, 100.0)?;
        check_range("market_cap", self.market_cap, 0.0, f64::MAX)?;
        check_range("trading_volume", self.trading_volume, 0.0, f64::MAX)?;
        check_range("audit_score", self.audit_score, 0.0, 100.0)?;
        check_range("holder_distribution", self.holder_distribution, 0.0, 100.0)?;
        check_range("team_verification", self.team_verification, 0.0, 1.0)?;
        check_range("contract_complexity", self.contract_complexity, 0.0, 100.0)?;
        // a product line cannot pay out more claims than it sold policies
        check_range("total_claims", self.total_claims as f64, 0.0, self.total_policies as f64)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), PricingError> {
    if !value.is_finite() {
        return Err(PricingError::NonFiniteFactor { field });
    }
    if value < min || value > max {
        return Err(PricingError::FactorOutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
