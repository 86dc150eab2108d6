//! Error types for the CowGuard engine
//!
//! Provides a unified error type, the domain-specific error variants and the
//! [`ErrorKind`] classification callers use to decide how to react.

use thiserror::Error;
use uuid::Uuid;

use crate::money::Amount;
use crate::types::claim::{ClaimStatus, ClaimType};

/// Result type alias using CowGuardError
pub type Result<T> = std::result::Result<T, CowGuardError>;

/// Unified error type for CowGuard operations
#[derive(Debug, Error)]
pub enum CowGuardError {
    // Request validation errors
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    // Risk factor / tariff errors
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    // Lifecycle errors
    #[error("Policy state error: {0}")]
    PolicyState(#[from] PolicyStateError),

    // Claim evidence errors
    #[error("Evidence validation failed: {0}")]
    Evidence(#[from] EvidenceError),

    // Pool funds errors
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    // Risk data source errors
    #[error("Risk data error: {0}")]
    DataSource(#[from] DataSourceError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of every error the engine returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected before any state mutation
    InvalidInput,
    /// Operation attempted on a cancelled, claimed or expired policy
    PolicyState,
    /// Mandatory claim evidence missing or malformed
    EvidenceValidation,
    /// Pool cannot cover a payout or refund
    PoolExhaustion,
    /// External risk data could not be obtained
    DataUnavailable,
    /// Configuration or internal failure
    Internal,
}

impl ErrorKind {
    /// Whether the caller may retry the same request later unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::PoolExhaustion | ErrorKind::DataUnavailable)
    }
}

impl CowGuardError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CowGuardError::InvalidInput(_) | CowGuardError::Pricing(_) => ErrorKind::InvalidInput,
            CowGuardError::PolicyState(_) => ErrorKind::PolicyState,
            CowGuardError::Evidence(_) => ErrorKind::EvidenceValidation,
            CowGuardError::Pool(err) => err.kind(),
            CowGuardError::DataSource(_) => ErrorKind::DataUnavailable,
            CowGuardError::Config(_)
            | CowGuardError::Serialization(_)
            | CowGuardError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Request validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("Product not found: {0}")]
    ProductNotFound(u32),

    #[error("Product {0} is inactive")]
    ProductInactive(u32),

    #[error("Protocol is paused")]
    ProtocolPaused,

    #[error("Coverage amount {amount} outside product bounds [{min}, {max}]")]
    CoverageOutOfBounds { amount: Amount, min: Amount, max: Amount },

    #[error("Computed premium is zero for coverage {coverage}")]
    ZeroPremium { coverage: Amount },

    #[error("Invalid product definition: {0}")]
    InvalidProduct(String),

    #[error("Policy not found: {0}")]
    PolicyNotFound(Uuid),

    #[error("Requester {requester} is not the holder of policy {policy_id}")]
    NotPolicyHolder { policy_id: Uuid, requester: String },

    #[error("Claim amount must be positive")]
    InvalidClaimAmount,

    #[error("Claim amount {claim} exceeds coverage {coverage}")]
    ClaimExceedsCoverage { claim: Amount, coverage: Amount },

    #[error("Claim not found: {0}")]
    ClaimNotFound(Uuid),

    #[error("Claim {claim_id} is not pending (status: {status})")]
    ClaimNotPending { claim_id: Uuid, status: ClaimStatus },

    #[error("Payout {payout} exceeds claim amount {claim}")]
    PayoutExceedsClaim { payout: Amount, claim: Amount },

    #[error("Unknown coverage type: {0}")]
    UnknownCoverageType(String),

    #[error("Unknown claim type: {0}")]
    UnknownClaimType(String),

    #[error("Unknown lifecycle stage: {0}")]
    UnknownLifecycleStage(String),
}

/// Risk factor and tariff validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PricingError {
    #[error("Risk factor {field} = {value} outside [{min}, {max}]")]
    FactorOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Risk factor {field} is not a finite number")]
    NonFiniteFactor { field: &'static str },

    #[error("Invalid tariff: {0}")]
    InvalidTariff(String),

    #[error("Rate {0} cannot be quantized")]
    Quantization(f64),

    #[error("Pricing calculation overflow")]
    Overflow,
}

/// Why a policy refused a state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyStateReason {
    AlreadyCancelled,
    AlreadyClaimed,
    Expired,
}

impl std::fmt::Display for PolicyStateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyStateReason::AlreadyCancelled => write!(f, "already cancelled"),
            PolicyStateReason::AlreadyClaimed => write!(f, "already claimed"),
            PolicyStateReason::Expired => write!(f, "expired"),
        }
    }
}

/// Cancel or claim attempted on a policy that is no longer open
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("policy {policy_id} is {reason}")]
pub struct PolicyStateError {
    pub policy_id: Uuid,
    pub reason: PolicyStateReason,
}

impl PolicyStateError {
    pub fn new(policy_id: Uuid, reason: PolicyStateReason) -> Self {
        Self { policy_id, reason }
    }
}

/// Mandatory evidence missing for a claim type
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{claim_type} claim rejected: missing [{}], invalid [{}]", .missing.join(", "), .invalid.join(", "))]
pub struct EvidenceError {
    pub claim_type: ClaimType,
    /// Evidence fields that were absent
    pub missing: Vec<&'static str>,
    /// Evidence fields that were present but unusable
    pub invalid: Vec<String>,
}

/// Pool funds errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoolError {
    #[error("Pool exhausted: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("Insufficient reserved funds: required {required}, reserved {reserved}")]
    InsufficientReserved { required: Amount, reserved: Amount },

    #[error("Holder {holder} cannot pay {required}: balance {available}")]
    InsufficientHolderBalance {
        holder: String,
        required: Amount,
        available: Amount,
    },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Pool arithmetic overflow")]
    Overflow,
}

impl PoolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::InsufficientFunds { .. } => ErrorKind::PoolExhaustion,
            PoolError::InsufficientHolderBalance { .. } | PoolError::InvalidAmount => {
                ErrorKind::InvalidInput
            }
            PoolError::InsufficientReserved { .. } | PoolError::Overflow => ErrorKind::Internal,
        }
    }
}

/// Risk data source errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataSourceError {
    #[error("No risk data for product {0}")]
    UnknownProduct(u32),

    #[error("Risk data source unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for CowGuardError {
    fn from(err: serde_json::Error) -> Self {
        CowGuardError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for CowGuardError {
    fn from(err: anyhow::Error) -> Self {
        CowGuardError::Internal(err.to_string())
    }
}
