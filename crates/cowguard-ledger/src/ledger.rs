//! Policy ledger
//!
//! Owns products and policies. Policy status is an atomic cell; every
//! transition is a compare-and-set from Active, so at most one cancel or one
//! claim approval wins per policy. Outflows are reserved in the pool before
//! the transition and released if it loses.

use cowguard_actuary::{ActuarialResult, PremiumCalculator};
use cowguard_common::money::{apply_bps, apply_rate};
use cowguard_common::{
    Amount, CoverageType, CowGuardError, InputError, InsuranceProduct, Policy, PolicyStateError,
    PolicyStateReason, PolicyStatus, ProductId, ProductSpec, Result, DEFAULT_HIGH_RISK_THRESHOLD,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::events::{EventSink, InsuranceEvent};
use crate::pool::PoolFunds;
use crate::source::RiskDataSource;

/// Ledger behaviour knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Risk score at or above which `HighRiskScore` is emitted
    pub high_risk_threshold: f64,
    /// Account credited with the treasury fee on cancellation
    pub treasury_id: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            high_risk_threshold: DEFAULT_HIGH_RISK_THRESHOLD,
            treasury_id: "treasury".to_string(),
        }
    }
}

/// Priced but not yet purchased coverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyQuote {
    pub product_id: ProductId,
    pub coverage_type: CoverageType,
    pub coverage_amount: Amount,
    pub premium: Amount,
    /// Quantized rate the premium is computed from
    pub premium_rate: Decimal,
    pub max_payout: Amount,
    pub duration_days: u16,
    pub actuarial: ActuarialResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub policy_id: Uuid,
    pub premium_paid: Amount,
    pub coverage_amount: Amount,
    pub start_time: i64,
    pub end_time: i64,
    pub quote: PolicyQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReceipt {
    pub policy_id: Uuid,
    pub refund_amount: Amount,
    pub treasury_fee: Amount,
    /// Withheld in the pool
    pub cancellation_fee: Amount,
}

/// Policy with its status in an atomic cell
///
/// `gate` is held by claim submission across its open check and insert, and
/// by every status transition, so no claim is accepted once the policy closes.
#[derive(Debug)]
pub(crate) struct PolicyRecord {
    policy: Policy,
    status: AtomicU8,
    gate: Mutex<()>,
}

impl PolicyRecord {
    fn new(policy: Policy) -> Self {
        let status = AtomicU8::new(policy.status.as_u8());
        Self {
            policy,
            status,
            gate: Mutex::new(()),
        }
    }

    pub(crate) fn status(&self) -> PolicyStatus {
        // an unknown byte reads as closed
        PolicyStatus::from_u8(self.status.load(Ordering::Acquire)).unwrap_or(PolicyStatus::Cancelled)
    }

    pub(crate) fn snapshot(&self) -> Policy {
        let mut policy = self.policy.clone();
        policy.status = self.status();
        policy
    }

    fn ensure_open(&self, now: i64) -> std::result::Result<(), PolicyStateError> {
        self.status().ensure_open(self.policy.id, self.policy.end_time, now)
    }

    /// Active -> `to`, failing with the reason the policy is closed
    fn transition(&self, to: PolicyStatus) -> std::result::Result<(), PolicyStateError> {
        let _gate = self.gate.lock();
        self.status
            .compare_exchange(
                PolicyStatus::Active.as_u8(),
                to.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|raw| {
                let reason = match PolicyStatus::from_u8(raw) {
                    Some(PolicyStatus::Claimed) => PolicyStateReason::AlreadyClaimed,
                    _ => PolicyStateReason::AlreadyCancelled,
                };
                PolicyStateError::new(self.policy.id, reason)
            })
    }
}

#[derive(Debug, Default)]
struct CancellationTotals {
    refunds: AtomicU64,
    treasury_fees: AtomicU64,
    cancellation_fees: AtomicU64,
}

/// Products, policies and the purchase / cancel lifecycle
pub struct PolicyLedger {
    calculator: PremiumCalculator,
    settings: LedgerSettings,
    risk_source: Arc<dyn RiskDataSource>,
    pool: Arc<dyn PoolFunds>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,

    products: DashMap<ProductId, InsuranceProduct>,
    next_product_id: AtomicU32,
    policies: DashMap<Uuid, Arc<PolicyRecord>>,
    paused: AtomicBool,
    totals: CancellationTotals,
}

impl PolicyLedger {
    pub fn new(
        calculator: PremiumCalculator,
        settings: LedgerSettings,
        risk_source: Arc<dyn RiskDataSource>,
        pool: Arc<dyn PoolFunds>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            calculator,
            settings,
            risk_source,
            pool,
            events,
            clock,
            products: DashMap::new(),
            next_product_id: AtomicU32::new(0),
            policies: DashMap::new(),
            paused: AtomicBool::new(false),
            totals: CancellationTotals::default(),
        }
    }

    /// Build from configuration, creating the startup catalogue
    pub fn from_config(
        config: &EngineConfig,
        risk_source: Arc<dyn RiskDataSource>,
        pool: Arc<dyn PoolFunds>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let calculator = PremiumCalculator::new(config.tariff.clone())?;
        let ledger = Self::new(calculator, config.ledger.clone(), risk_source, pool, events, clock);
        for spec in config.products.startup_catalogue() {
            ledger.create_product(spec)?;
        }
        Ok(ledger)
    }

    pub fn calculator(&self) -> &PremiumCalculator {
        &self.calculator
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub(crate) fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }

    pub fn pool_available(&self) -> Amount {
        self.pool.available()
    }

    // ============ Admin ============

    /// Register a product; ids are assigned sequentially from 0
    pub fn create_product(&self, spec: ProductSpec) -> Result<ProductId> {
        spec.validate()?;
        let id = self.next_product_id.fetch_add(1, Ordering::SeqCst);
        let product = InsuranceProduct::from_spec(id, spec, self.now());
        info!(
            product_id = id,
            name = %product.name,
            coverage_type = %product.coverage_type,
            "Product created"
        );
        self.products.insert(id, product);
        Ok(id)
    }

    pub fn set_product_active(&self, product_id: ProductId, active: bool) -> Result<()> {
        let mut product = self
            .products
            .get_mut(&product_id)
            .ok_or(InputError::ProductNotFound(product_id))?;
        product.is_active = active;
        info!(product_id, active, "Product status updated");
        Ok(())
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
        warn!(paused, "Protocol pause flag changed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn product(&self, product_id: ProductId) -> Option<InsuranceProduct> {
        self.products.get(&product_id).map(|p| p.clone())
    }

    /// All products ordered by id
    pub fn products(&self) -> Vec<InsuranceProduct> {
        let mut products: Vec<_> = self.products.iter().map(|p| p.clone()).collect();
        products.sort_by_key(|p| p.id);
        products
    }

    // ============ Pricing ============

    /// Price coverage without buying it
    pub fn quote(&self, product_id: ProductId, coverage_amount: Amount) -> Result<PolicyQuote> {
        let product = self.purchasable_product(product_id)?;
        product.check_coverage(coverage_amount)?;
        self.price(&product, coverage_amount)
    }

    fn purchasable_product(&self, product_id: ProductId) -> Result<InsuranceProduct> {
        let product = self
            .product(product_id)
            .ok_or(InputError::ProductNotFound(product_id))?;
        if !product.is_active {
            return Err(InputError::ProductInactive(product_id).into());
        }
        Ok(product)
    }

    fn price(&self, product: &InsuranceProduct, coverage_amount: Amount) -> Result<PolicyQuote> {
        let snapshot = self.risk_source.snapshot(product.id, product.coverage_type)?;
        let actuarial = self.calculator.calculate(
            product.coverage_type,
            &snapshot.factors,
            snapshot.stage,
            snapshot.is_launch_phase,
        )?;

        let premium_rate = actuarial.quantized_rate()?;
        let premium = apply_rate(coverage_amount, premium_rate)?;
        if premium == 0 {
            return Err(InputError::ZeroPremium {
                coverage: coverage_amount,
            }
            .into());
        }

        Ok(PolicyQuote {
            product_id: product.id,
            coverage_type: product.coverage_type,
            coverage_amount,
            premium,
            premium_rate,
            max_payout: product.max_payout(coverage_amount),
            duration_days: product.duration_days,
            actuarial,
        })
    }

    // ============ Lifecycle ============

    /// Buy coverage; the premium is taken from the holder before the policy exists
    #[instrument(skip(self))]
    pub fn purchase(&self, product_id: ProductId, holder_id: &str, coverage_amount: Amount) -> Result<PurchaseReceipt> {
        if self.is_paused() {
            return Err(InputError::ProtocolPaused.into());
        }
        let product = self.purchasable_product(product_id)?;
        product.check_coverage(coverage_amount)?;

        let quote = self.price(&product, coverage_amount)?;

        self.pool.collect_premium(holder_id, quote.premium)?;

        let start_time = self.now();
        let end_time = start_time.saturating_add(product.duration_secs());
        let policy = Policy {
            id: Uuid::now_v7(),
            product_id,
            holder_id: holder_id.to_string(),
            coverage_type: product.coverage_type,
            coverage_amount,
            premium_paid: quote.premium,
            premium_rate: quote.premium_rate,
            coverage_rate_bps: product.coverage_rate_bps,
            start_time,
            end_time,
            status: PolicyStatus::Active,
        };
        let policy_id = policy.id;
        self.policies.insert(policy_id, Arc::new(PolicyRecord::new(policy)));

        if let Some(mut product) = self.products.get_mut(&product_id) {
            product.total_policies += 1;
            product.total_coverage = product.total_coverage.saturating_add(coverage_amount);
        }

        let risk_score = quote.actuarial.risk_score;
        if risk_score >= self.settings.high_risk_threshold {
            self.events.emit(InsuranceEvent::HighRiskScore {
                product_id,
                coverage_type: product.coverage_type,
                holder_id: holder_id.to_string(),
                risk_score,
                threshold: self.settings.high_risk_threshold,
            });
        }
        self.events.emit(InsuranceEvent::PolicyPurchased {
            policy_id,
            product_id,
            holder_id: holder_id.to_string(),
            coverage_amount,
            premium_paid: quote.premium,
            end_time,
        });

        info!(
            %policy_id,
            premium = quote.premium,
            rate = %quote.premium_rate,
            risk_score,
            "Policy purchased"
        );

        Ok(PurchaseReceipt {
            policy_id,
            premium_paid: quote.premium,
            coverage_amount,
            start_time,
            end_time,
            quote,
        })
    }

    /// Cancel before term for a partial refund
    ///
    /// Both fees are taken from the original premium: 100 pays back 67,
    /// sends 3 to the treasury and leaves 30 in the pool.
    #[instrument(skip(self))]
    pub fn cancel(&self, policy_id: Uuid, requester_id: &str) -> Result<CancellationReceipt> {
        let record = self.record(policy_id)?;
        if record.policy.holder_id != requester_id {
            return Err(InputError::NotPolicyHolder {
                policy_id,
                requester: requester_id.to_string(),
            }
            .into());
        }

        let now = self.now();
        record.ensure_open(now).map_err(|err| self.closed(err, now))?;

        let tariff = self.calculator.tariff();
        let premium = record.policy.premium_paid;
        let cancellation_fee = apply_bps(premium, tariff.cancellation_fee_bps());
        let treasury_fee = apply_bps(premium, tariff.treasury_fee_bps());
        let refund_amount = premium.saturating_sub(cancellation_fee).saturating_sub(treasury_fee);
        let outflow = refund_amount + treasury_fee;

        if outflow > 0 {
            self.pool.reserve(outflow)?;
        }
        if let Err(err) = record.transition(PolicyStatus::Cancelled) {
            self.release_reserved(outflow);
            return Err(err.into());
        }
        self.pool
            .disburse_reserved(&[
                (record.policy.holder_id.as_str(), refund_amount),
                (self.settings.treasury_id.as_str(), treasury_fee),
            ])
            .map_err(|err| {
                error!(%policy_id, error = %err, "Refund disbursement failed after cancellation");
                err
            })?;

        self.totals.refunds.fetch_add(refund_amount, Ordering::Relaxed);
        self.totals.treasury_fees.fetch_add(treasury_fee, Ordering::Relaxed);
        self.totals.cancellation_fees.fetch_add(cancellation_fee, Ordering::Relaxed);

        self.events.emit(InsuranceEvent::PolicyCancelled {
            policy_id,
            holder_id: record.policy.holder_id.clone(),
            refund_amount,
            treasury_fee,
            cancellation_fee,
        });
        info!(%policy_id, refund_amount, treasury_fee, cancellation_fee, "Policy cancelled");

        Ok(CancellationReceipt {
            policy_id,
            refund_amount,
            treasury_fee,
            cancellation_fee,
        })
    }

    /// Reserve, transition to Claimed and pay `payout` to `recipient`
    ///
    /// Expiry is not checked: a claim filed within term may be approved later.
    pub(crate) fn pay_claim(&self, policy_id: Uuid, recipient: &str, payout: Amount) -> Result<()> {
        let record = self.record(policy_id)?;
        let reason = match record.status() {
            PolicyStatus::Active => None,
            PolicyStatus::Cancelled => Some(PolicyStateReason::AlreadyCancelled),
            PolicyStatus::Claimed => Some(PolicyStateReason::AlreadyClaimed),
        };
        if let Some(reason) = reason {
            return Err(PolicyStateError::new(policy_id, reason).into());
        }

        self.pool.reserve(payout)?;
        if let Err(err) = record.transition(PolicyStatus::Claimed) {
            self.release_reserved(payout);
            return Err(err.into());
        }
        self.pool.disburse_reserved(&[(recipient, payout)]).map_err(|err| {
            error!(%policy_id, error = %err, "Payout disbursement failed after claim transition");
            err
        })?;
        Ok(())
    }

    /// Map a closed-policy error, announcing expiry when observed
    pub(crate) fn closed(&self, err: PolicyStateError, now: i64) -> CowGuardError {
        if err.reason == PolicyStateReason::Expired {
            self.events.emit(InsuranceEvent::PolicyExpired {
                policy_id: err.policy_id,
                observed_at: now,
            });
        }
        err.into()
    }

    /// Run `f` on a policy that is open at `now`, holding off transitions until it returns
    ///
    /// `f` must not call back into the ledger.
    pub(crate) fn with_open_policy<T>(
        &self,
        policy_id: Uuid,
        now: i64,
        f: impl FnOnce(&Policy) -> Result<T>,
    ) -> Result<T> {
        let record = self.record(policy_id)?;
        let outcome = {
            let _gate = record.gate.lock();
            record.ensure_open(now).map(|()| f(&record.policy))
        };
        outcome.map_err(|err| self.closed(err, now))?
    }

    fn release_reserved(&self, amount: Amount) {
        if amount == 0 {
            return;
        }
        if let Err(err) = self.pool.release(amount) {
            error!(amount, error = %err, "Failed to release reserved pool funds");
        }
    }

    // ============ Queries ============

    pub(crate) fn record(&self, policy_id: Uuid) -> Result<Arc<PolicyRecord>> {
        self.policies
            .get(&policy_id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| InputError::PolicyNotFound(policy_id).into())
    }

    pub fn get_policy(&self, policy_id: Uuid) -> Result<Policy> {
        Ok(self.record(policy_id)?.snapshot())
    }

    /// Snapshot of every policy, oldest first
    pub fn policies(&self) -> Vec<Policy> {
        let mut policies: Vec<_> = self.policies.iter().map(|r| r.snapshot()).collect();
        policies.sort_by_key(|p| (p.start_time, p.id));
        policies
    }

    pub fn policies_for_holder(&self, holder_id: &str) -> Vec<Policy> {
        self.policies()
            .into_iter()
            .filter(|p| p.holder_id == holder_id)
            .collect()
    }

    /// (refunds, treasury fees, cancellation fees) paid so far
    pub fn cancellation_totals(&self) -> (Amount, Amount, Amount) {
        (
            self.totals.refunds.load(Ordering::Relaxed),
            self.totals.treasury_fees.load(Ordering::Relaxed),
            self.totals.cancellation_fees.load(Ordering::Relaxed),
        )
    }
}

impl std::fmt::Debug for PolicyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyLedger")
            .field("products", &self.products.len())
            .field("policies", &self.policies.len())
            .field("paused", &self.is_paused())
            .finish()
    }
}
