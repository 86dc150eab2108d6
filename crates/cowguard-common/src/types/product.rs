//! Insurance products - admin-managed coverage offerings

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::money::{apply_bps, to_units, Amount, BPS_DENOMINATOR};
use crate::types::risk::CoverageType;
use crate::{MAX_LISTED_PREMIUM_BPS, SECONDS_PER_DAY};

/// Product identifier
pub type ProductId = u32;

/// Admin input describing a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub name: String,
    pub coverage_type: CoverageType,
    /// Listed premium rate in basis points (display only, priced policies use the calculator)
    pub premium_rate_bps: u16,
    /// Fraction of coverage payable on an approved claim, basis points
    pub coverage_rate_bps: u16,
    pub min_coverage: Amount,
    pub max_coverage: Amount,
    pub duration_days: u16,
}

impl ProductSpec {
    pub fn validate(&self) -> Result<(), InputError> {
        if self.premium_rate_bps == 0 || self.premium_rate_bps > MAX_LISTED_PREMIUM_BPS {
            return Err(InputError::InvalidProduct(format!(
                "premium rate {} bps outside (0, {}]",
                self.premium_rate_bps, MAX_LISTED_PREMIUM_BPS
            )));
        }
        if self.coverage_rate_bps == 0 || self.coverage_rate_bps as u64 > BPS_DENOMINATOR {
            return Err(InputError::InvalidProduct(format!(
                "coverage rate {} bps outside (0, {}]",
                self.coverage_rate_bps, BPS_DENOMINATOR
            )));
        }
        if self.min_coverage >= self.max_coverage {
            return Err(InputError::InvalidProduct(format!(
                "min coverage {} must be below max coverage {}",
                self.min_coverage, self.max_coverage
            )));
        }
        if self.duration_days == 0 {
            return Err(InputError::InvalidProduct("duration must be at least one day".into()));
        }
        Ok(())
    }

    /// The four launch products
    pub fn default_catalogue() -> Vec<ProductSpec> {
        let usdc = |whole: u64| to_units(whole).unwrap_or(Amount::MAX);
        vec![
            ProductSpec {
                name: "Rug Pull Protection".into(),
                coverage_type: CoverageType::RugPull,
                premium_rate_bps: 500,
                coverage_rate_bps: 8000,
                min_coverage: usdc(100),
                max_coverage: usdc(50_000),
                duration_days: 30,
            },
            ProductSpec {
                name: "Price Drop Protection".into(),
                coverage_type: CoverageType::PriceDrop,
                premium_rate_bps: 300,
                coverage_rate_bps: 7000,
                min_coverage: usdc(50),
                max_coverage: usdc(100_000),
                duration_days: 14,
            },
            ProductSpec {
                name: "Smart Contract Cover".into(),
                coverage_type: CoverageType::SmartContract,
                premium_rate_bps: 200,
                coverage_rate_bps: 9000,
                min_coverage: usdc(100),
                max_coverage: usdc(200_000),
                duration_days: 90,
            },
            ProductSpec {
                name: "Comprehensive Cover".into(),
                coverage_type: CoverageType::Comprehensive,
                premium_rate_bps: 800,
                coverage_rate_bps: 8500,
                min_coverage: usdc(500),
                max_coverage: usdc(500_000),
                duration_days: 30,
            },
        ]
    }
}

/// A live product with its sales bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceProduct {
    pub id: ProductId,
    pub name: String,
    pub coverage_type: CoverageType,
    pub premium_rate_bps: u16,
    pub coverage_rate_bps: u16,
    pub min_coverage: Amount,
    pub max_coverage: Amount,
    pub duration_days: u16,
    /// Policies sold
    pub total_policies: u64,
    /// Coverage sold
    pub total_coverage: Amount,
    pub is_active: bool,
    pub created_at: i64,
}

impl InsuranceProduct {
    pub fn from_spec(id: ProductId, spec: ProductSpec, now: i64) -> Self {
        Self {
            id,
            name: spec.name,
            coverage_type: spec.coverage_type,
            premium_rate_bps: spec.premium_rate_bps,
            coverage_rate_bps: spec.coverage_rate_bps,
            min_coverage: spec.min_coverage,
            max_coverage: spec.max_coverage,
            duration_days: spec.duration_days,
            total_policies: 0,
            total_coverage: 0,
            is_active: true,
            created_at: now,
        }
    }

    /// Reject coverage outside `[min_coverage, max_coverage]`
    pub fn check_coverage(&self, amount: Amount) -> Result<(), InputError> {
        if amount < self.min_coverage || amount > self.max_coverage {
            return Err(InputError::CoverageOutOfBounds {
                amount,
                min: self.min_coverage,
                max: self.max_coverage,
            });
        }
        Ok(())
    }

    /// Policy term in seconds
    pub fn duration_secs(&self) -> i64 {
        self.duration_days as i64 * SECONDS_PER_DAY
    }

    /// Largest payout a policy of `coverage` can receive
    pub fn max_payout(&self, coverage: Amount) -> Amount {
        apply_bps(coverage, self.coverage_rate_bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ProductSpec {
        ProductSpec::default_catalogue().remove(0)
    }

    #[test]
    fn test_default_catalogue_is_valid() {
        for spec in ProductSpec::default_catalogue() {
            spec.validate().unwrap();
        }
    }

    #[test]
    fn test_invalid_specs() {
        let mut s = spec();
        s.premium_rate_bps = 2001;
        assert!(s.validate().is_err());

        let mut s = spec();
        s.coverage_rate_bps = 10_001;
        assert!(s.validate().is_err());

        let mut s = spec();
        s.min_coverage = s.max_coverage;
        assert!(s.validate().is_err());

        let mut s = spec();
        s.duration_days = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_coverage_bounds_and_payout() {
        let product = InsuranceProduct::from_spec(0, spec(), 0);
        assert!(product.check_coverage(product.min_coverage).is_ok());
        assert!(product.check_coverage(product.max_coverage).is_ok());
        assert!(matches!(
            product.check_coverage(product.max_coverage + 1),
            Err(InputError::CoverageOutOfBounds { .. })
        ));
        // 80% coverage rate
        assert_eq!(product.max_payout(1_000), 800);
        assert_eq!(product.duration_secs(), 30 * 86_400);
    }
}
