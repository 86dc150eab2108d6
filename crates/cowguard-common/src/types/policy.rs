//! Policies - purchased, time-bounded coverage contracts
//!
//! Stored status is one of Active / Cancelled / Claimed. "Expired" is never
//! stored: it is `now > end_time` while the status is still Active.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PolicyStateError, PolicyStateReason};
use crate::money::{apply_bps, Amount};
use crate::types::product::ProductId;
use crate::types::risk::CoverageType;

/// Stored policy status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PolicyStatus {
    Active = 0,
    Cancelled = 1,
    Claimed = 2,
}

impl PolicyStatus {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a value written by [`PolicyStatus::as_u8`]
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(PolicyStatus::Active),
            1 => Some(PolicyStatus::Cancelled),
            2 => Some(PolicyStatus::Claimed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        match self {
            PolicyStatus::Active => false,
            PolicyStatus::Cancelled | PolicyStatus::Claimed => true,
        }
    }

    /// Fail unless a policy in this status, ending at `end_time`, can still
    /// be cancelled or claimed at `now`.
    pub fn ensure_open(self, policy_id: Uuid, end_time: i64, now: i64) -> Result<(), PolicyStateError> {
        match self {
            PolicyStatus::Cancelled => Err(PolicyStateError::new(
                policy_id,
                PolicyStateReason::AlreadyCancelled,
            )),
            PolicyStatus::Claimed => Err(PolicyStateError::new(
                policy_id,
                PolicyStateReason::AlreadyClaimed,
            )),
            PolicyStatus::Active if now > end_time => {
                Err(PolicyStateError::new(policy_id, PolicyStateReason::Expired))
            }
            PolicyStatus::Active => Ok(()),
        }
    }
}

impl std::fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyStatus::Active => write!(f, "active"),
            PolicyStatus::Cancelled => write!(f, "cancelled"),
            PolicyStatus::Claimed => write!(f, "claimed"),
        }
    }
}

/// Point-in-time view of a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub product_id: ProductId,
    pub holder_id: String,
    pub coverage_type: CoverageType,
    pub coverage_amount: Amount,
    /// Premium charged at purchase, frozen
    pub premium_paid: Amount,
    /// Quantized premium rate the premium was computed from
    pub premium_rate: Decimal,
    /// Coverage rate of the product at purchase time
    pub coverage_rate_bps: u16,
    pub start_time: i64,
    pub end_time: i64,
    pub status: PolicyStatus,
}

impl Policy {
    /// Derived expiry: still Active but past its end time
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.status == PolicyStatus::Active && now > self.end_time
    }

    /// Active and within term
    pub fn is_live_at(&self, now: i64) -> bool {
        self.status == PolicyStatus::Active && now <= self.end_time
    }

    pub fn ensure_open(&self, now: i64) -> Result<(), PolicyStateError> {
        self.status.ensure_open(self.id, self.end_time, now)
    }

    /// Payout ceiling: coverage × coverage rate
    pub fn max_payout(&self) -> Amount {
        apply_bps(self.coverage_amount, self.coverage_rate_bps)
    }
}
