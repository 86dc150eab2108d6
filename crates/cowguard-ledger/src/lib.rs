//! # Ledger
//!
//! Policy and claim lifecycle for CowGuard.
//!
//! ## Lifecycle
//!
//! ```text
//! purchase ──> Active ──cancel──> Cancelled
//!                 │
//!                 └──approved claim──> Claimed
//! ```
//!
//! Expired is never stored: an Active policy past its end time rejects
//! cancels and new claims.
//!
//! ## Collaborators
//!
//! - [`RiskDataSource`]: risk factors per product
//! - [`PoolFunds`]: premium collection, reserve / disburse / release
//! - [`EventSink`]: fire-and-forget domain events
//! - [`Clock`]: unix-second time

pub mod claims;
pub mod clock;
pub mod config;
pub mod events;
pub mod evidence;
pub mod ledger;
pub mod pool;
pub mod source;
pub mod stats;

pub use claims::{ClaimProcessor, ClaimReceipt};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use events::{ChannelEventSink, EventSink, InsuranceEvent, NullEventSink, TracingEventSink};
pub use ledger::{CancellationReceipt, LedgerSettings, PolicyLedger, PolicyQuote, PurchaseReceipt};
pub use pool::{InMemoryPool, PoolFunds};
pub use source::{RiskDataSource, RiskSnapshot, StaticRiskDataSource};
pub use stats::{ProtocolStats, ProtocolStatsAggregator};
