//! Protocol statistics
//!
//! Read-only snapshot over the ledger and claim book. Expiry is derived at
//! read time from the ledger clock.

use cowguard_common::{Amount, ClaimStatus, HistoricalClaims, PolicyStatus, ProductId};
use serde::{Deserialize, Serialize};

use crate::claims::ClaimProcessor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolStats {
    pub observed_at: i64,
    pub paused: bool,
    pub active_products: usize,

    // Policies by status
    pub live_policies: u64,
    pub expired_policies: u64,
    pub cancelled_policies: u64,
    pub claimed_policies: u64,

    // Claims by status
    pub pending_claims: u64,
    pub approved_claims: u64,
    pub rejected_claims: u64,

    // Money
    pub total_premiums: Amount,
    /// Coverage of Active, unexpired policies
    pub live_coverage: Amount,
    pub total_payouts: Amount,
    pub total_refunds: Amount,
    pub total_treasury_fees: Amount,
    pub total_cancellation_fees: Amount,
    pub pool_available: Amount,
}

impl ProtocolStats {
    pub fn total_policies(&self) -> u64 {
        self.live_policies + self.expired_policies + self.cancelled_policies + self.claimed_policies
    }

    pub fn claims_processed(&self) -> u64 {
        self.approved_claims + self.rejected_claims
    }

    /// Payouts over premiums, 0 before any premium
    pub fn loss_ratio(&self) -> f64 {
        if self.total_premiums == 0 {
            0.0
        } else {
            self.total_payouts as f64 / self.total_premiums as f64
        }
    }

    /// Aggregates in the shape pricing consumes; paid claims count as claims
    pub fn historical_claims(&self) -> HistoricalClaims {
        HistoricalClaims {
            total_policies: self.total_policies(),
            total_claims: self.approved_claims,
            total_premiums: self.total_premiums,
            total_payouts: self.total_payouts,
        }
    }
}

pub struct ProtocolStatsAggregator;

impl ProtocolStatsAggregator {
    pub fn collect(claims: &ClaimProcessor) -> ProtocolStats {
        let ledger = claims.ledger();
        let now = ledger.now();
        let (total_refunds, total_treasury_fees, total_cancellation_fees) = ledger.cancellation_totals();

        let mut stats = ProtocolStats {
            observed_at: now,
            paused: ledger.is_paused(),
            active_products: ledger.products().iter().filter(|p| p.is_active).count(),
            live_policies: 0,
            expired_policies: 0,
            cancelled_policies: 0,
            claimed_policies: 0,
            pending_claims: 0,
            approved_claims: 0,
            rejected_claims: 0,
            total_premiums: 0,
            live_coverage: 0,
            total_payouts: 0,
            total_refunds,
            total_treasury_fees,
            total_cancellation_fees,
            pool_available: ledger.pool_available(),
        };

        for policy in ledger.policies() {
            stats.total_premiums = stats.total_premiums.saturating_add(policy.premium_paid);
            match policy.status {
                PolicyStatus::Active if policy.is_expired_at(now) => stats.expired_policies += 1,
                PolicyStatus::Active => {
                    stats.live_policies += 1;
                    stats.live_coverage = stats.live_coverage.saturating_add(policy.coverage_amount);
                }
                PolicyStatus::Cancelled => stats.cancelled_policies += 1,
                PolicyStatus::Claimed => stats.claimed_policies += 1,
            }
        }

        for claim in claims.claims() {
            match claim.status {
                ClaimStatus::Pending => stats.pending_claims += 1,
                ClaimStatus::Approved => {
                    stats.approved_claims += 1;
                    stats.total_payouts = stats
                        .total_payouts
                        .saturating_add(claim.payout_amount.unwrap_or(0));
                }
                ClaimStatus::Rejected => stats.rejected_claims += 1,
            }
        }

        stats
    }

    /// History of one product line
    pub fn product_history(claims: &ClaimProcessor, product_id: ProductId) -> HistoricalClaims {
        let policies: Vec<_> = claims
            .ledger()
            .policies()
            .into_iter()
            .filter(|p| p.product_id == product_id)
            .collect();

        let mut history = HistoricalClaims {
            total_policies: policies.len() as u64,
            total_premiums: policies.iter().map(|p| p.premium_paid).fold(0, Amount::saturating_add),
            ..Default::default()
        };
        for claim in claims.claims() {
            if claim.status != ClaimStatus::Approved || !policies.iter().any(|p| p.id == claim.policy_id) {
                continue;
            }
            history.total_claims += 1;
            history.total_payouts = history
                .total_payouts
                .saturating_add(claim.payout_amount.unwrap_or(0));
        }
        history
    }
}
