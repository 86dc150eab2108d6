//! Claim evidence checks
//!
//! | Claim type       | Mandatory               |
//! |------------------|-------------------------|
//! | rug_pull         | contract address        |
//! | contract_exploit | contract address        |
//! | price_drop       | before/after price data |
//! | other            | nothing                 |
//!
//! A price drop smaller than the coverage threshold is recorded as a warning
//! for the reviewer, never rejected here.

use cowguard_common::{
    ClaimEvidence, ClaimType, ClaimWarning, CowGuardError, EvidenceError, PRICE_DROP_THRESHOLD_PERCENT,
};

/// Check mandatory evidence and collect warnings
pub fn validate_evidence(claim_type: ClaimType, evidence: &ClaimEvidence) -> Result<Vec<ClaimWarning>, EvidenceError> {
    let mut missing = Vec::new();
    let mut invalid = Vec::new();
    let mut warnings = Vec::new();

    match claim_type {
        ClaimType::RugPull | ClaimType::ContractExploit => {
            let has_address = evidence
                .contract_address
                .as_deref()
                .is_some_and(|addr| !addr.trim().is_empty());
            if !has_address {
                missing.push("contract_address");
            }
        }
        ClaimType::PriceDrop => match &evidence.price_data {
            None => missing.push("price_data"),
            Some(prices) => {
                if !prices.before_price.is_finite() || prices.before_price <= 0.0 {
                    invalid.push(format!("before_price {} must be positive", prices.before_price));
                }
                if !prices.after_price.is_finite() || prices.after_price < 0.0 {
                    invalid.push(format!("after_price {} must not be negative", prices.after_price));
                }
                if invalid.is_empty() {
                    if let Some(drop) = prices.drop_percent() {
                        if drop < PRICE_DROP_THRESHOLD_PERCENT {
                            warnings.push(ClaimWarning::PriceDropBelowThreshold {
                                drop_percent: drop,
                                threshold_percent: PRICE_DROP_THRESHOLD_PERCENT,
                            });
                        }
                    }
                }
            }
        },
        ClaimType::Other => {}
    }

    if missing.is_empty() && invalid.is_empty() {
        Ok(warnings)
    } else {
        Err(EvidenceError {
            claim_type,
            missing,
            invalid,
        })
    }
}

/// blake3 hex digest of the evidence as JSON
pub fn evidence_digest(evidence: &ClaimEvidence) -> Result<String, CowGuardError> {
    let bytes = serde_json::to_vec(evidence)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cowguard_common::PriceData;

    fn prices(before: f64, after: f64) -> ClaimEvidence {
        ClaimEvidence {
            price_data: Some(PriceData {
                before_price: before,
                after_price: after,
                observed_at: 0,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_contract_address_required() {
        for claim_type in [ClaimType::RugPull, ClaimType::ContractExploit] {
            let err = validate_evidence(claim_type, &ClaimEvidence::default()).unwrap_err();
            assert_eq!(err.missing, vec!["contract_address"]);

            let blank = ClaimEvidence {
                contract_address: Some("   ".into()),
                ..Default::default()
            };
            assert!(validate_evidence(claim_type, &blank).is_err());

            let ok = ClaimEvidence {
                contract_address: Some("0xdeadbeef".into()),
                ..Default::default()
            };
            assert!(validate_evidence(claim_type, &ok).unwrap().is_empty());
        }
    }

    #[test]
    fn test_price_data_required() {
        let err = validate_evidence(ClaimType::PriceDrop, &ClaimEvidence::default()).unwrap_err();
        assert_eq!(err.missing, vec!["price_data"]);
    }

    #[test]
    fn test_small_drop_warns() {
        let warnings = validate_evidence(ClaimType::PriceDrop, &prices(1.0, 0.6)).unwrap();
        assert_eq!(warnings.len(), 1);
        match &warnings[0] {
            ClaimWarning::PriceDropBelowThreshold { drop_percent, .. } => {
                assert!((drop_percent - 40.0).abs() < 1e-9)
            }
        }

        let warnings = validate_evidence(ClaimType::PriceDrop, &prices(1.0, 0.3)).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_bad_prices_rejected() {
        let err = validate_evidence(ClaimType::PriceDrop, &prices(0.0, 0.5)).unwrap_err();
        assert_eq!(err.invalid.len(), 1);

        let err = validate_evidence(ClaimType::PriceDrop, &prices(1.0, -0.1)).unwrap_err();
        assert_eq!(err.invalid.len(), 1);
    }

    #[test]
    fn test_other_needs_nothing() {
        assert!(validate_evidence(ClaimType::Other, &ClaimEvidence::default()).is_ok());
    }

    #[test]
    fn test_digest_is_stable() {
        let a = prices(1.0, 0.6);
        let b = prices(1.0, 0.6);
        assert_eq!(evidence_digest(&a).unwrap(), evidence_digest(&b).unwrap());
        assert_eq!(evidence_digest(&a).unwrap().len(), 64);
        assert_ne!(evidence_digest(&a).unwrap(), evidence_digest(&prices(1.0, 0.5)).unwrap());
    }
}
