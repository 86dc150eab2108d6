//! Risk scoring: weighted gap sums per coverage type, scaled to [0, 100]

use cowguard_common::{CoverageType, RiskFactors};

/// Standard-token market cap below which rug risk is elevated
const RUG_MARKET_CAP_THRESHOLD: f64 = 1_000_000.0;
/// Launch-phase market cap below which rug risk is elevated
const LAUNCH_MARKET_CAP_THRESHOLD: f64 = 50_000.0;
/// Trading volume below which price-drop risk is elevated
const THIN_VOLUME_THRESHOLD: f64 = 10_000.0;

/// Comprehensive blend weights (rug pull, price drop, smart contract)
const COMPREHENSIVE_WEIGHTS: (f64, f64, f64) = (0.3, 0.3, 0.4);

/// Per-signal gaps, each normalized to [0, 1] where 1 is riskiest
#[derive(Debug, Clone, Copy, PartialEq)]
struct Gaps {
    liquidity: f64,
    holder: f64,
    audit: f64,
    team: f64,
    complexity: f64,
}

impl Gaps {
    fn from_factors(f: &RiskFactors) -> Self {
        Self {
            liquidity: (100.0 - f.liquidity) / 100.0,
            holder: (100.0 - f.holder_distribution) / 100.0,
            audit: (100.0 - f.audit_score) / 100.0,
            team: 1.0 - f.team_verification,
            complexity: f.contract_complexity / 100.0,
        }
    }
}

pub struct RiskScorer;

impl RiskScorer {
    /// Risk score in [0, 100] for validated factors
    pub fn score(coverage_type: CoverageType, factors: &RiskFactors, is_launch_phase: bool) -> f64 {
        match coverage_type {
            CoverageType::RugPull => Self::rug_pull(factors, is_launch_phase),
            CoverageType::PriceDrop => Self::price_drop(factors),
            CoverageType::SmartContract => Self::smart_contract(factors),
            CoverageType::Comprehensive => {
                let (rug, drop, contract) = COMPREHENSIVE_WEIGHTS;
                Self::rug_pull(factors, is_launch_phase) * rug
                    + Self::price_drop(factors) * drop
                    + Self::smart_contract(factors) * contract
            }
        }
    }

    fn rug_pull(factors: &RiskFactors, is_launch_phase: bool) -> f64 {
        let gaps = Gaps::from_factors(factors);

        if is_launch_phase {
            // No audit expectation before migration; liquidity and holder
            // concentration carry the score.
            let market_cap = if factors.market_cap < LAUNCH_MARKET_CAP_THRESHOLD { 0.9 } else { 0.3 };
            return (gaps.liquidity * 0.35
                + gaps.holder * 0.25
                + gaps.audit * 0.10
                + gaps.team * 0.10
                + market_cap * 0.20)
                * 100.0;
        }

        let market_cap = if factors.market_cap < RUG_MARKET_CAP_THRESHOLD { 0.8 } else { 0.2 };
        (gaps.liquidity * 0.30
            + gaps.holder * 0.20
            + gaps.audit * 0.20
            + gaps.team * 0.15
            + market_cap * 0.15)
            * 100.0
    }

    fn price_drop(factors: &RiskFactors) -> f64 {
        let gaps = Gaps::from_factors(factors);
        let volume = if factors.trading_volume < THIN_VOLUME_THRESHOLD { 0.8 } else { 0.2 };
        (factors.volatility * 0.40 + volume * 0.30 + gaps.liquidity * 0.30) * 100.0
    }

    fn smart_contract(factors: &RiskFactors) -> f64 {
        let gaps = Gaps::from_factors(factors);
        (gaps.audit * 0.60 + gaps.complexity * 0.40) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn reference_factors() -> RiskFactors {
        RiskFactors {
            liquidity: 80.0,
            holder_distribution: 70.0,
            audit_score: 90.0,
            team_verification: 1.0,
            market_cap: 2_000_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_rug_pull_standard() {
        let score = RiskScorer::score(CoverageType::RugPull, &reference_factors(), false);
        assert!(close(score, 17.0), "score = {}", score);
    }

    #[test]
    fn test_rug_pull_launch_phase() {
        // liq 0.2*0.35 + holder 0.3*0.25 + audit 0.1*0.10 + team 0 + mcap 0.3*0.20
        let score = RiskScorer::score(CoverageType::RugPull, &reference_factors(), true);
        assert!(close(score, 21.5), "score = {}", score);

        let tiny = RiskFactors {
            market_cap: 10_000.0,
            ..reference_factors()
        };
        // mcap gap jumps to 0.9
        let score = RiskScorer::score(CoverageType::RugPull, &tiny, true);
        assert!(close(score, 33.5), "score = {}", score);
    }

    #[test]
    fn test_price_drop() {
        let factors = RiskFactors {
            volatility: 0.5,
            trading_volume: 5_000.0,
            liquidity: 40.0,
            ..Default::default()
        };
        // 0.5*0.4 + 0.8*0.3 + 0.6*0.3
        let score = RiskScorer::score(CoverageType::PriceDrop, &factors, false);
        assert!(close(score, 62.0), "score = {}", score);
    }

    #[test]
    fn test_smart_contract() {
        let factors = RiskFactors {
            audit_score: 50.0,
            contract_complexity: 25.0,
            ..Default::default()
        };
        let score = RiskScorer::score(CoverageType::SmartContract, &factors, false);
        assert!(close(score, 40.0), "score = {}", score);
    }

    #[test]
    fn test_comprehensive_blend_passes_launch_flag() {
        let f = reference_factors();
        for launch in [false, true] {
            let expected = RiskScorer::score(CoverageType::RugPull, &f, launch) * 0.3
                + RiskScorer::score(CoverageType::PriceDrop, &f, launch) * 0.3
                + RiskScorer::score(CoverageType::SmartContract, &f, launch) * 0.4;
            let blended = RiskScorer::score(CoverageType::Comprehensive, &f, launch);
            assert!(close(blended, expected));
        }
    }

    #[test]
    fn test_extremes_stay_in_range() {
        let worst = RiskFactors::default();
        let best = RiskFactors {
            volatility: 0.0,
            liquidity: 100.0,
            market_cap: 1e12,
            trading_volume: 1e12,
            audit_score: 100.0,
            holder_distribution: 100.0,
            team_verification: 1.0,
            contract_complexity: 0.0,
            ..Default::default()
        };
        for ct in CoverageType::ALL {
            for launch in [false, true] {
                let hi = RiskScorer::score(ct, &worst, launch);
                let lo = RiskScorer::score(ct, &best, launch);
                assert!((0.0..=100.0).contains(&hi), "{} {}", ct, hi);
                assert!((0.0..=100.0).contains(&lo), "{} {}", ct, lo);
                assert!(lo <= hi);
            }
        }
    }
}
