//! # CowGuard Common
//!
//! Shared domain types, money helpers and errors for the CowGuard token-loss
//! insurance engine.
//!
//! ## Core Types
//!
//! - [`RiskFactors`]: signal snapshot backing one coverage request
//! - [`CoverageType`] / [`LifecycleStage`]: what is insured and at which token stage
//! - [`InsuranceProduct`]: admin-managed coverage offering
//! - [`Policy`]: purchased coverage with an Active / Cancelled / Claimed status
//! - [`Claim`]: payout request with type-dependent evidence
//! - [`PoolAccount`]: fixed-point balance with reserve/settle escrow
//!
//! ## Money
//!
//! Amounts are `u64` in 6-decimal stablecoin units, see [`money`].

pub mod error;
pub mod money;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{
    CowGuardError, DataSourceError, ErrorKind, EvidenceError, InputError, PolicyStateError,
    PolicyStateReason, PoolError, PricingError, Result,
};
pub use money::Amount;
pub use types::{
    claim::{Claim, ClaimDecision, ClaimEvidence, ClaimStatus, ClaimType, ClaimWarning, PriceData},
    policy::{Policy, PolicyStatus},
    pool_account::PoolAccount,
    product::{InsuranceProduct, ProductId, ProductSpec},
    risk::{CoverageType, HistoricalClaims, LifecycleStage, RiskFactors},
};

/// CowGuard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seconds in a policy day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Highest listed premium a product may advertise (20%)
pub const MAX_LISTED_PREMIUM_BPS: u16 = 2_000;

/// Premium rate floor
pub const PREMIUM_RATE_FLOOR: f64 = 0.01;

/// Premium rate cap
pub const PREMIUM_RATE_CAP: f64 = 0.20;

/// Upper bound of every risk score
pub const MAX_RISK_SCORE: f64 = 100.0;

/// Risk score at which a high-risk event is emitted
pub const DEFAULT_HIGH_RISK_THRESHOLD: f64 = 70.0;

/// Price drop (percent) a price-drop claim is expected to exceed
pub const PRICE_DROP_THRESHOLD_PERCENT: f64 = 50.0;
