//! Claims - holder requests for payout against a live policy

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::InputError;
use crate::money::Amount;

/// Loss event being claimed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    RugPull,
    PriceDrop,
    #[serde(alias = "smart_contract")]
    ContractExploit,
    Other,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::RugPull => "rug_pull",
            ClaimType::PriceDrop => "price_drop",
            ClaimType::ContractExploit => "contract_exploit",
            ClaimType::Other => "other",
        }
    }
}

impl std::fmt::Display for ClaimType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "rug_pull" | "rugpull" => Ok(ClaimType::RugPull),
            "price_drop" | "pricedrop" => Ok(ClaimType::PriceDrop),
            "contract_exploit" | "contractexploit" | "smart_contract" | "smartcontract" => {
                Ok(ClaimType::ContractExploit)
            }
            "other" => Ok(ClaimType::Other),
            _ => Err(InputError::UnknownClaimType(s.to_string())),
        }
    }
}

/// Claim review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimStatus::Pending => write!(f, "pending"),
            ClaimStatus::Approved => write!(f, "approved"),
            ClaimStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Reviewer / oracle outcome applied to a pending claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ClaimDecision {
    /// Approve, optionally paying less than the claimed amount
    Approve { payout_amount: Option<Amount> },
    Reject { reason: Option<String> },
}

/// Before/after token prices backing a price-drop claim
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    pub before_price: f64,
    pub after_price: f64,
    /// Unix seconds the after price was observed
    pub observed_at: i64,
}

impl PriceData {
    /// Percentage drop from before to after, `None` when the before price is unusable
    pub fn drop_percent(&self) -> Option<f64> {
        if !self.before_price.is_finite() || self.before_price <= 0.0 || !self.after_price.is_finite() {
            return None;
        }
        Some((self.before_price - self.after_price) / self.before_price * 100.0)
    }
}

/// Type-dependent supporting material for a claim
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimEvidence {
    /// Token or program address involved
    pub contract_address: Option<String>,
    pub transaction_hash: Option<String>,
    pub price_data: Option<PriceData>,
    pub screenshots: Vec<String>,
    pub description: Option<String>,
}

/// Non-blocking observation recorded with a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ClaimWarning {
    PriceDropBelowThreshold {
        drop_percent: f64,
        threshold_percent: f64,
    },
}

impl std::fmt::Display for ClaimWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimWarning::PriceDropBelowThreshold {
                drop_percent,
                threshold_percent,
            } => write!(
                f,
                "price drop {:.2}% below {:.0}% coverage threshold",
                drop_percent, threshold_percent
            ),
        }
    }
}

/// Point-in-time view of a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: Uuid,
    pub policy_id: Uuid,
    pub claimant_id: String,
    pub claim_type: ClaimType,
    pub claim_amount: Amount,
    pub evidence: ClaimEvidence,
    /// blake3 hex digest of the evidence at submission
    pub evidence_digest: String,
    pub warnings: Vec<ClaimWarning>,
    pub status: ClaimStatus,
    pub submitted_at: i64,
    pub processed_at: Option<i64>,
    /// Set only when approved
    pub payout_amount: Option<Amount>,
    pub rejection_reason: Option<String>,
}

impl Claim {
    pub fn is_pending(&self) -> bool {
        self.status == ClaimStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_type_parse() {
        assert_eq!("contract_exploit".parse::<ClaimType>().unwrap(), ClaimType::ContractExploit);
        assert_eq!("RugPull".parse::<ClaimType>().unwrap(), ClaimType::RugPull);
        assert_eq!("smart_contract".parse::<ClaimType>().unwrap(), ClaimType::ContractExploit);
        assert!("flood".parse::<ClaimType>().is_err());

        let legacy: ClaimType = serde_json::from_str(r#""smart_contract""#).unwrap();
        assert_eq!(legacy, ClaimType::ContractExploit);
    }

    #[test]
    fn test_drop_percent() {
        let data = PriceData {
            before_price: 1.0,
            after_price: 0.6,
            observed_at: 0,
        };
        assert!((data.drop_percent().unwrap() - 40.0).abs() < 1e-9);

        let zero = PriceData {
            before_price: 0.0,
            after_price: 0.6,
            observed_at: 0,
        };
        assert!(zero.drop_percent().is_none());
    }

    #[test]
    fn test_decision_serde() {
        let json = r#"{"decision":"approve","payout_amount":500}"#;
        let decision: ClaimDecision = serde_json::from_str(json).unwrap();
        assert_eq!(
            decision,
            ClaimDecision::Approve {
                payout_amount: Some(500)
            }
        );
    }
}
