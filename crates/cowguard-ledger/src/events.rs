//! Domain events
//!
//! Emission is fire-and-forget: a sink never fails the operation that
//! raised the event.

use cowguard_common::{Amount, ClaimStatus, ClaimType, CoverageType, ProductId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InsuranceEvent {
    /// Quote scored at or above the alert threshold
    HighRiskScore {
        product_id: ProductId,
        coverage_type: CoverageType,
        holder_id: String,
        risk_score: f64,
        threshold: f64,
    },
    PolicyPurchased {
        policy_id: Uuid,
        product_id: ProductId,
        holder_id: String,
        coverage_amount: Amount,
        premium_paid: Amount,
        end_time: i64,
    },
    PolicyCancelled {
        policy_id: Uuid,
        holder_id: String,
        refund_amount: Amount,
        treasury_fee: Amount,
        cancellation_fee: Amount,
    },
    /// An operation found the policy past its end time
    PolicyExpired { policy_id: Uuid, observed_at: i64 },
    ClaimSubmitted {
        claim_id: Uuid,
        policy_id: Uuid,
        claim_type: ClaimType,
        claim_amount: Amount,
        warnings: usize,
    },
    ClaimResolved {
        claim_id: Uuid,
        policy_id: Uuid,
        status: ClaimStatus,
        payout_amount: Option<Amount>,
    },
}

impl InsuranceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InsuranceEvent::HighRiskScore { .. } => "high_risk_score",
            InsuranceEvent::PolicyPurchased { .. } => "policy_purchased",
            InsuranceEvent::PolicyCancelled { .. } => "policy_cancelled",
            InsuranceEvent::PolicyExpired { .. } => "policy_expired",
            InsuranceEvent::ClaimSubmitted { .. } => "claim_submitted",
            InsuranceEvent::ClaimResolved { .. } => "claim_resolved",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: InsuranceEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: InsuranceEvent) {
        (**self).emit(event)
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: InsuranceEvent) {}
}

/// Logs events as structured tracing records
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: InsuranceEvent) {
        match &event {
            InsuranceEvent::HighRiskScore {
                product_id,
                coverage_type,
                holder_id,
                risk_score,
                threshold,
            } => warn!(
                event = event.name(),
                product_id,
                %coverage_type,
                holder_id = holder_id.as_str(),
                risk_score,
                threshold,
                "High risk score"
            ),
            InsuranceEvent::PolicyPurchased {
                policy_id,
                product_id,
                holder_id,
                coverage_amount,
                premium_paid,
                end_time,
            } => info!(
                event = event.name(),
                %policy_id,
                product_id,
                holder_id = holder_id.as_str(),
                coverage_amount,
                premium_paid,
                end_time,
                "Policy purchased"
            ),
            InsuranceEvent::PolicyCancelled {
                policy_id,
                holder_id,
                refund_amount,
                treasury_fee,
                cancellation_fee,
            } => info!(
                event = event.name(),
                %policy_id,
                holder_id = holder_id.as_str(),
                refund_amount,
                treasury_fee,
                cancellation_fee,
                "Policy cancelled"
            ),
            InsuranceEvent::PolicyExpired {
                policy_id,
                observed_at,
            } => info!(event = event.name(), %policy_id, observed_at, "Policy expired"),
            InsuranceEvent::ClaimSubmitted {
                claim_id,
                policy_id,
                claim_type,
                claim_amount,
                warnings,
            } => info!(
                event = event.name(),
                %claim_id,
                %policy_id,
                %claim_type,
                claim_amount,
                warnings,
                "Claim submitted"
            ),
            InsuranceEvent::ClaimResolved {
                claim_id,
                policy_id,
                status,
                payout_amount,
            } => info!(
                event = event.name(),
                %claim_id,
                %policy_id,
                %status,
                payout_amount = ?payout_amount,
                "Claim resolved"
            ),
        }
    }
}

/// Forwards events to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<InsuranceEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<InsuranceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: InsuranceEvent) {
        if self.tx.send(event).is_err() {
            // Receiver dropped
            tracing::trace!("Event channel closed, dropping event");
        }
    }
}
