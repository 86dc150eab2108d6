//! Claim processor
//!
//! Submission records a Pending claim without touching the policy status, but
//! under the policy gate so it never lands on a closed policy. Resolution is
//! serialized per claim; an approval moves the policy to Claimed and pays the
//! claimant out of the pool.

use cowguard_common::{
    Amount, Claim, ClaimDecision, ClaimEvidence, ClaimStatus, ClaimType, ClaimWarning, InputError, Result,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::events::InsuranceEvent;
use crate::evidence::{evidence_digest, validate_evidence};
use crate::ledger::PolicyLedger;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub claim_id: Uuid,
    pub status: ClaimStatus,
    pub warnings: Vec<ClaimWarning>,
    pub evidence_digest: String,
}

pub struct ClaimProcessor {
    ledger: Arc<PolicyLedger>,
    claims: DashMap<Uuid, Arc<Mutex<Claim>>>,
}

impl ClaimProcessor {
    pub fn new(ledger: Arc<PolicyLedger>) -> Self {
        Self {
            ledger,
            claims: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<PolicyLedger> {
        &self.ledger
    }

    /// File a claim against a live policy
    #[instrument(skip(self, evidence))]
    pub fn submit_claim(
        &self,
        policy_id: Uuid,
        claimant_id: &str,
        claim_type: ClaimType,
        claim_amount: Amount,
        evidence: ClaimEvidence,
    ) -> Result<ClaimReceipt> {
        let policy = self.ledger.get_policy(policy_id)?;
        if policy.holder_id != claimant_id {
            return Err(InputError::NotPolicyHolder {
                policy_id,
                requester: claimant_id.to_string(),
            }
            .into());
        }
        let now = self.ledger.now();

        // the insert happens under the policy gate so an approval or cancel
        // cannot close the policy between the open check and the new claim
        let (claim_id, warnings, digest) = self.ledger.with_open_policy(policy_id, now, |policy| {
            if claim_amount == 0 {
                return Err(InputError::InvalidClaimAmount.into());
            }
            if claim_amount > policy.coverage_amount {
                return Err(InputError::ClaimExceedsCoverage {
                    claim: claim_amount,
                    coverage: policy.coverage_amount,
                }
                .into());
            }

            let warnings = validate_evidence(claim_type, &evidence)?;
            let digest = evidence_digest(&evidence)?;

            let claim = Claim {
                id: Uuid::now_v7(),
                policy_id,
                claimant_id: claimant_id.to_string(),
                claim_type,
                claim_amount,
                evidence,
                evidence_digest: digest.clone(),
                warnings: warnings.clone(),
                status: ClaimStatus::Pending,
                submitted_at: now,
                processed_at: None,
                payout_amount: None,
                rejection_reason: None,
            };
            let claim_id = claim.id;
            self.claims.insert(claim_id, Arc::new(Mutex::new(claim)));
            Ok((claim_id, warnings, digest))
        })?;

        self.ledger.events().emit(InsuranceEvent::ClaimSubmitted {
            claim_id,
            policy_id,
            claim_type,
            claim_amount,
            warnings: warnings.len(),
        });
        info!(%claim_id, %policy_id, %claim_type, claim_amount, warnings = warnings.len(), "Claim submitted");

        Ok(ClaimReceipt {
            claim_id,
            status: ClaimStatus::Pending,
            warnings,
            evidence_digest: digest,
        })
    }

    /// Approve or reject a pending claim
    ///
    /// An approval pays `min(payout override or claim amount, coverage × coverage rate)`.
    /// If the pool cannot cover it the claim stays Pending and the error is
    /// retryable.
    #[instrument(skip(self))]
    pub fn resolve_claim(&self, claim_id: Uuid, decision: ClaimDecision) -> Result<Claim> {
        let entry = self
            .claims
            .get(&claim_id)
            .map(|c| Arc::clone(c.value()))
            .ok_or(InputError::ClaimNotFound(claim_id))?;
        let mut claim = entry.lock();

        if !claim.is_pending() {
            return Err(InputError::ClaimNotPending {
                claim_id,
                status: claim.status,
            }
            .into());
        }

        match decision {
            ClaimDecision::Approve { payout_amount } => {
                if let Some(payout) = payout_amount {
                    if payout > claim.claim_amount {
                        return Err(InputError::PayoutExceedsClaim {
                            payout,
                            claim: claim.claim_amount,
                        }
                        .into());
                    }
                }
                let policy = self.ledger.get_policy(claim.policy_id)?;
                let payout = payout_amount
                    .unwrap_or(claim.claim_amount)
                    .min(policy.max_payout());
                if payout == 0 {
                    return Err(InputError::InvalidClaimAmount.into());
                }

                self.ledger.pay_claim(claim.policy_id, &claim.claimant_id, payout)?;

                claim.status = ClaimStatus::Approved;
                claim.payout_amount = Some(payout);
            }
            ClaimDecision::Reject { reason } => {
                claim.status = ClaimStatus::Rejected;
                claim.rejection_reason = reason;
            }
        }
        claim.processed_at = Some(self.ledger.now());

        let resolved = claim.clone();
        drop(claim);

        self.ledger.events().emit(InsuranceEvent::ClaimResolved {
            claim_id,
            policy_id: resolved.policy_id,
            status: resolved.status,
            payout_amount: resolved.payout_amount,
        });
        info!(
            %claim_id,
            status = %resolved.status,
            payout = ?resolved.payout_amount,
            "Claim resolved"
        );

        Ok(resolved)
    }

    pub fn get_claim(&self, claim_id: Uuid) -> Result<Claim> {
        let entry = self
            .claims
            .get(&claim_id)
            .map(|c| Arc::clone(c.value()))
            .ok_or(InputError::ClaimNotFound(claim_id))?;
        let claim = entry.lock().clone();
        Ok(claim)
    }

    /// Snapshot of every claim, oldest first
    pub fn claims(&self) -> Vec<Claim> {
        let entries: Vec<_> = self.claims.iter().map(|c| Arc::clone(c.value())).collect();
        let mut claims: Vec<_> = entries.iter().map(|c| c.lock().clone()).collect();
        claims.sort_by_key(|c| (c.submitted_at, c.id));
        claims
    }

    pub fn claims_for_policy(&self, policy_id: Uuid) -> Vec<Claim> {
        self.claims()
            .into_iter()
            .filter(|c| c.policy_id == policy_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::NullEventSink;
    use crate::ledger::LedgerSettings;
    use crate::pool::InMemoryPool;
    use crate::source::{RiskSnapshot, StaticRiskDataSource};
    use cowguard_actuary::PremiumCalculator;
    use cowguard_common::{
        CowGuardError, ErrorKind, PolicyStateReason, PolicyStatus, PriceData, ProductSpec, RiskFactors,
    };

    const USDC: Amount = 1_000_000;

    fn processor(capital: Amount) -> (ClaimProcessor, Arc<InMemoryPool>, Arc<ManualClock>) {
        let pool = Arc::new(InMemoryPool::with_capital(capital));
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let factors = RiskFactors {
            liquidity: 80.0,
            holder_distribution: 70.0,
            audit_score: 90.0,
            team_verification: 1.0,
            market_cap: 2_000_000.0,
            ..Default::default()
        };
        let ledger = PolicyLedger::new(
            PremiumCalculator::default(),
            LedgerSettings::default(),
            Arc::new(StaticRiskDataSource::with_fallback(RiskSnapshot::new(factors))),
            pool.clone(),
            Arc::new(NullEventSink),
            clock.clone(),
        );
        for spec in ProductSpec::default_catalogue() {
            ledger.create_product(spec).unwrap();
        }
        pool.deposit("alice", 10_000 * USDC).unwrap();
        (ClaimProcessor::new(Arc::new(ledger)), pool, clock)
    }

    fn address() -> ClaimEvidence {
        ClaimEvidence {
            contract_address: Some("0xabc".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_submit_leaves_policy_active() {
        let (claims, _, _) = processor(0);
        let policy = claims.ledger().purchase(0, "alice", 1_000 * USDC).unwrap();

        let receipt = claims
            .submit_claim(policy.policy_id, "alice", ClaimType::RugPull, 500 * USDC, address())
            .unwrap();
        assert_eq!(receipt.status, ClaimStatus::Pending);
        assert_eq!(receipt.evidence_digest.len(), 64);
        assert_eq!(
            claims.ledger().get_policy(policy.policy_id).unwrap().status,
            PolicyStatus::Active
        );
        assert_eq!(claims.claims_for_policy(policy.policy_id).len(), 1);
    }

    #[test]
    fn test_price_drop_warning() {
        let (claims, _, _) = processor(0);
        let policy = claims.ledger().purchase(1, "alice", 1_000 * USDC).unwrap();
        let evidence = ClaimEvidence {
            price_data: Some(PriceData {
                before_price: 2.0,
                after_price: 1.2,
                observed_at: 1_700_000_100,
            }),
            ..Default::default()
        };

        let receipt = claims
            .submit_claim(policy.policy_id, "alice", ClaimType::PriceDrop, 100 * USDC, evidence)
            .unwrap();
        assert_eq!(receipt.status, ClaimStatus::Pending);
        assert_eq!(receipt.warnings.len(), 1);
    }

    #[test]
    fn test_submit_rejections() {
        let (claims, _, _) = processor(0);
        let policy = claims.ledger().purchase(0, "alice", 1_000 * USDC).unwrap();
        let id = policy.policy_id;

        let err = claims
            .submit_claim(id, "alice", ClaimType::RugPull, 1_001 * USDC, address())
            .unwrap_err();
        assert!(matches!(
            err,
            CowGuardError::InvalidInput(InputError::ClaimExceedsCoverage { .. })
        ));

        let err = claims
            .submit_claim(id, "alice", ClaimType::RugPull, 0, address())
            .unwrap_err();
        assert!(matches!(err, CowGuardError::InvalidInput(InputError::InvalidClaimAmount)));

        let err = claims
            .submit_claim(id, "bob", ClaimType::RugPull, 10 * USDC, address())
            .unwrap_err();
        assert!(matches!(
            err,
            CowGuardError::InvalidInput(InputError::NotPolicyHolder { .. })
        ));

        let err = claims
            .submit_claim(id, "alice", ClaimType::RugPull, 10 * USDC, ClaimEvidence::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EvidenceValidation);

        assert!(claims.claims().is_empty());
    }

    #[test]
    fn test_approval_pays_capped_amount() {
        let (claims, pool, _) = processor(0);
        let policy = claims.ledger().purchase(0, "alice", 1_000 * USDC).unwrap();
        let receipt = claims
            .submit_claim(policy.policy_id, "alice", ClaimType::RugPull, 1_000 * USDC, address())
            .unwrap();

        // pool holds only the 200 premium
        pool.fund(5_000 * USDC).unwrap();
        let before = pool.balance_of("alice");

        let resolved = claims
            .resolve_claim(receipt.claim_id, ClaimDecision::Approve { payout_amount: None })
            .unwrap();
        assert_eq!(resolved.status, ClaimStatus::Approved);
        // 80% coverage rate
        assert_eq!(resolved.payout_amount, Some(800 * USDC));
        assert_eq!(pool.balance_of("alice"), before + 800 * USDC);
        assert_eq!(
            claims.ledger().get_policy(policy.policy_id).unwrap().status,
            PolicyStatus::Claimed
        );

        let err = claims
            .resolve_claim(receipt.claim_id, ClaimDecision::Reject { reason: None })
            .unwrap_err();
        assert!(matches!(
            err,
            CowGuardError::InvalidInput(InputError::ClaimNotPending {
                status: ClaimStatus::Approved,
                ..
            })
        ));
    }

    #[test]
    fn test_payout_override() {
        let (claims, pool, _) = processor(10_000 * USDC);
        let policy = claims.ledger().purchase(0, "alice", 1_000 * USDC).unwrap();
        let receipt = claims
            .submit_claim(policy.policy_id, "alice", ClaimType::RugPull, 300 * USDC, address())
            .unwrap();

        let err = claims
            .resolve_claim(
                receipt.claim_id,
                ClaimDecision::Approve {
                    payout_amount: Some(301 * USDC),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CowGuardError::InvalidInput(InputError::PayoutExceedsClaim { .. })
        ));

        let before = pool.balance_of("alice");
        let resolved = claims
            .resolve_claim(
                receipt.claim_id,
                ClaimDecision::Approve {
                    payout_amount: Some(250 * USDC),
                },
            )
            .unwrap();
        assert_eq!(resolved.payout_amount, Some(250 * USDC));
        assert_eq!(pool.balance_of("alice"), before + 250 * USDC);
    }

    #[test]
    fn test_pool_exhaustion_keeps_claim_pending() {
        let (claims, pool, _) = processor(0);
        let policy = claims.ledger().purchase(0, "alice", 1_000 * USDC).unwrap();
        let receipt = claims
            .submit_claim(policy.policy_id, "alice", ClaimType::RugPull, 500 * USDC, address())
            .unwrap();

        let err = claims
            .resolve_claim(receipt.claim_id, ClaimDecision::Approve { payout_amount: None })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PoolExhaustion);
        assert!(err.kind().is_retryable());
        assert!(claims.get_claim(receipt.claim_id).unwrap().is_pending());
        assert_eq!(
            claims.ledger().get_policy(policy.policy_id).unwrap().status,
            PolicyStatus::Active
        );

        // replenished
        pool.fund(1_000 * USDC).unwrap();
        let resolved = claims
            .resolve_claim(receipt.claim_id, ClaimDecision::Approve { payout_amount: None })
            .unwrap();
        assert_eq!(resolved.payout_amount, Some(500 * USDC));
    }

    #[test]
    fn test_rejection_leaves_policy_active() {
        let (claims, _, _) = processor(0);
        let policy = claims.ledger().purchase(0, "alice", 1_000 * USDC).unwrap();
        let receipt = claims
            .submit_claim(policy.policy_id, "alice", ClaimType::Other, 10 * USDC, ClaimEvidence::default())
            .unwrap();

        let resolved = claims
            .resolve_claim(
                receipt.claim_id,
                ClaimDecision::Reject {
                    reason: Some("no loss observed".into()),
                },
            )
            .unwrap();
        assert_eq!(resolved.status, ClaimStatus::Rejected);
        assert_eq!(resolved.rejection_reason.as_deref(), Some("no loss observed"));
        assert!(resolved.processed_at.is_some());
        assert_eq!(
            claims.ledger().get_policy(policy.policy_id).unwrap().status,
            PolicyStatus::Active
        );
    }

    #[test]
    fn test_second_approval_on_claimed_policy() {
        let (claims, pool, _) = processor(10_000 * USDC);
        let policy = claims.ledger().purchase(0, "alice", 1_000 * USDC).unwrap();
        let first = claims
            .submit_claim(policy.policy_id, "alice", ClaimType::RugPull, 100 * USDC, address())
            .unwrap();
        let second = claims
            .submit_claim(policy.policy_id, "alice", ClaimType::RugPull, 100 * USDC, address())
            .unwrap();

        claims
            .resolve_claim(first.claim_id, ClaimDecision::Approve { payout_amount: None })
            .unwrap();
        let available = pool.pool_account().available;

        let err = claims
            .resolve_claim(second.claim_id, ClaimDecision::Approve { payout_amount: None })
            .unwrap_err();
        assert!(matches!(
            err,
            CowGuardError::PolicyState(ref e) if e.reason == PolicyStateReason::AlreadyClaimed
        ));
        assert!(claims.get_claim(second.claim_id).unwrap().is_pending());
        assert_eq!(pool.pool_account().available, available);
        assert_eq!(pool.pool_account().reserved, 0);
    }

    #[test]
    fn test_approval_after_term_for_timely_claim() {
        let (claims, _, clock) = processor(10_000 * USDC);
        let policy = claims.ledger().purchase(0, "alice", 1_000 * USDC).unwrap();
        let receipt = claims
            .submit_claim(policy.policy_id, "alice", ClaimType::RugPull, 100 * USDC, address())
            .unwrap();

        clock.set(policy.end_time + 3_600);
        let err = claims
            .submit_claim(policy.policy_id, "alice", ClaimType::RugPull, 100 * USDC, address())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyState);

        let resolved = claims
            .resolve_claim(receipt.claim_id, ClaimDecision::Approve { payout_amount: None })
            .unwrap();
        assert_eq!(resolved.status, ClaimStatus::Approved);
    }

    #[test]
    fn test_unknown_claim() {
        let (claims, _, _) = processor(0);
        let err = claims
            .resolve_claim(Uuid::now_v7(), ClaimDecision::Reject { reason: None })
            .unwrap_err();
        assert!(matches!(err, CowGuardError::InvalidInput(InputError::ClaimNotFound(_))));
    }
}
