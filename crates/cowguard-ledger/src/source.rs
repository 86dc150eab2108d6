//! Risk data sources
//!
//! The ledger asks a [`RiskDataSource`] for the signals behind every quote.
//! Market feeds and on-chain readers live outside this crate.

use cowguard_common::{CoverageType, DataSourceError, HistoricalClaims, LifecycleStage, ProductId, RiskFactors};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Signals and token stage backing one quote
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSnapshot {
    pub factors: RiskFactors,
    pub stage: LifecycleStage,
    pub is_launch_phase: bool,
}

impl RiskSnapshot {
    pub fn new(factors: RiskFactors) -> Self {
        Self {
            factors,
            ..Default::default()
        }
    }

    /// Bonding-curve stage snapshot
    pub fn launch_phase(factors: RiskFactors) -> Self {
        Self {
            factors,
            stage: LifecycleStage::LaunchPhase,
            is_launch_phase: true,
        }
    }
}

/// Supplies risk signals for a product
pub trait RiskDataSource: Send + Sync {
    fn snapshot(&self, product_id: ProductId, coverage_type: CoverageType) -> Result<RiskSnapshot, DataSourceError>;
}

/// Fixed snapshots keyed by product, with an optional fallback
#[derive(Debug, Default)]
pub struct StaticRiskDataSource {
    snapshots: DashMap<ProductId, RiskSnapshot>,
    fallback: Option<RiskSnapshot>,
}

impl StaticRiskDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `snapshot` for every product without its own entry
    pub fn with_fallback(snapshot: RiskSnapshot) -> Self {
        Self {
            snapshots: DashMap::new(),
            fallback: Some(snapshot),
        }
    }

    pub fn insert(&self, product_id: ProductId, snapshot: RiskSnapshot) {
        self.snapshots.insert(product_id, snapshot);
    }

    /// Replace the historical aggregates of a product's snapshot
    pub fn refresh_history(&self, product_id: ProductId, history: HistoricalClaims) {
        if let Some(mut entry) = self.snapshots.get_mut(&product_id) {
            entry.factors = entry.factors.with_history(history);
        } else if let Some(fallback) = self.fallback {
            let mut snapshot = fallback;
            snapshot.factors = snapshot.factors.with_history(history);
            self.snapshots.insert(product_id, snapshot);
        }
    }
}

impl RiskDataSource for StaticRiskDataSource {
    fn snapshot(&self, product_id: ProductId, _coverage_type: CoverageType) -> Result<RiskSnapshot, DataSourceError> {
        self.snapshots
            .get(&product_id)
            .map(|s| *s)
            .or(self.fallback)
            .ok_or(DataSourceError::UnknownProduct(product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_fallback() {
        let source = StaticRiskDataSource::new();
        assert_eq!(
            source.snapshot(1, CoverageType::RugPull),
            Err(DataSourceError::UnknownProduct(1))
        );

        let launch = RiskSnapshot::launch_phase(RiskFactors {
            liquidity: 10.0,
            ..Default::default()
        });
        source.insert(1, launch);
        assert_eq!(source.snapshot(1, CoverageType::RugPull).unwrap(), launch);

        let fallback = StaticRiskDataSource::with_fallback(RiskSnapshot::default());
        assert!(fallback.snapshot(42, CoverageType::PriceDrop).is_ok());
    }

    #[test]
    fn test_refresh_history() {
        let source = StaticRiskDataSource::with_fallback(RiskSnapshot::default());
        source.refresh_history(
            3,
            HistoricalClaims {
                total_policies: 200,
                total_claims: 20,
                ..Default::default()
            },
        );
        let snapshot = source.snapshot(3, CoverageType::RugPull).unwrap();
        assert_eq!(snapshot.factors.total_policies, 200);
        assert!((snapshot.factors.historical_claim_rate - 0.1).abs() < 1e-12);
    }
}
