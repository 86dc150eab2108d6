//! Pool funds
//!
//! Premiums flow from holders into the protocol pool. Refunds and payouts are
//! reserved in the pool first, then either disbursed or released, so a lost
//! status race never leaves money half moved.

use cowguard_common::{Amount, PoolAccount, PoolError};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Owner id of the protocol pool account
pub const POOL_ACCOUNT: &str = "pool";

/// Money movements the ledger needs
pub trait PoolFunds: Send + Sync {
    /// Move a premium from the holder into the pool
    fn collect_premium(&self, holder_id: &str, amount: Amount) -> Result<(), PoolError>;

    /// Earmark pool funds for an outflow
    fn reserve(&self, amount: Amount) -> Result<(), PoolError>;

    /// Return earmarked funds to the pool
    fn release(&self, amount: Amount) -> Result<(), PoolError>;

    /// Pay earmarked funds out; all or nothing across `payments`
    fn disburse_reserved(&self, payments: &[(&str, Amount)]) -> Result<(), PoolError>;

    /// Unreserved pool balance
    fn available(&self) -> Amount;
}

struct Accounts {
    pool: PoolAccount,
    participants: HashMap<String, PoolAccount>,
}

/// Single-process pool keeping every balance behind one lock
pub struct InMemoryPool {
    accounts: Mutex<Accounts>,
}

impl InMemoryPool {
    pub fn new() -> Self {
        Self::with_capital(0)
    }

    /// Pool seeded with underwriting capital
    pub fn with_capital(capital: Amount) -> Self {
        Self {
            accounts: Mutex::new(Accounts {
                pool: PoolAccount::with_balance(POOL_ACCOUNT, capital),
                participants: HashMap::new(),
            }),
        }
    }

    /// Credit a participant (holder or treasury) balance
    pub fn deposit(&self, owner: &str, amount: Amount) -> Result<(), PoolError> {
        let mut accounts = self.accounts.lock();
        accounts
            .participants
            .entry(owner.to_string())
            .or_insert_with(|| PoolAccount::new(owner))
            .credit(amount)
    }

    /// Add underwriting capital to the pool
    pub fn fund(&self, amount: Amount) -> Result<(), PoolError> {
        self.accounts.lock().pool.credit(amount)
    }

    /// Available balance of a participant, 0 when unknown
    pub fn balance_of(&self, owner: &str) -> Amount {
        self.accounts
            .lock()
            .participants
            .get(owner)
            .map(|a| a.available)
            .unwrap_or(0)
    }

    pub fn pool_account(&self) -> PoolAccount {
        self.accounts.lock().pool.clone()
    }
}

impl Default for InMemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolFunds for InMemoryPool {
    fn collect_premium(&self, holder_id: &str, amount: Amount) -> Result<(), PoolError> {
        let mut guard = self.accounts.lock();
        let Accounts { pool, participants } = &mut *guard;

        let available = participants.get(holder_id).map(|a| a.available).unwrap_or(0);
        if available < amount {
            return Err(PoolError::InsufficientHolderBalance {
                holder: holder_id.to_string(),
                required: amount,
                available,
            });
        }
        pool.available.checked_add(amount).ok_or(PoolError::Overflow)?;

        if let Some(holder) = participants.get_mut(holder_id) {
            holder.debit(amount)?;
        }
        pool.credit(amount)?;
        debug!(holder_id, amount, "Premium collected");
        Ok(())
    }

    fn reserve(&self, amount: Amount) -> Result<(), PoolError> {
        self.accounts.lock().pool.reserve(amount)
    }

    fn release(&self, amount: Amount) -> Result<(), PoolError> {
        self.accounts.lock().pool.release(amount)
    }

    fn disburse_reserved(&self, payments: &[(&str, Amount)]) -> Result<(), PoolError> {
        let mut guard = self.accounts.lock();
        let Accounts { pool, participants } = &mut *guard;

        let total = payments
            .iter()
            .try_fold(0u64, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or(PoolError::Overflow)?;
        if pool.reserved < total {
            return Err(PoolError::InsufficientReserved {
                required: total,
                reserved: pool.reserved,
            });
        }

        for (recipient, amount) in payments.iter().filter(|(_, amount)| *amount > 0) {
            let account = participants
                .entry(recipient.to_string())
                .or_insert_with(|| PoolAccount::new(*recipient));
            pool.transfer_reserved(*amount, account)?;
            debug!(recipient, amount, "Disbursed from pool");
        }
        Ok(())
    }

    fn available(&self) -> Amount {
        self.accounts.lock().pool.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_premium() {
        let pool = InMemoryPool::new();
        pool.deposit("alice", 500).unwrap();

        pool.collect_premium("alice", 200).unwrap();
        assert_eq!(pool.balance_of("alice"), 300);
        assert_eq!(pool.available(), 200);
    }

    #[test]
    fn test_holder_cannot_pay() {
        let pool = InMemoryPool::new();
        pool.deposit("alice", 50).unwrap();

        let err = pool.collect_premium("alice", 200).unwrap_err();
        assert!(matches!(err, PoolError::InsufficientHolderBalance { available: 50, .. }));
        assert!(matches!(
            pool.collect_premium("bob", 1),
            Err(PoolError::InsufficientHolderBalance { available: 0, .. })
        ));
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_reserve_disburse() {
        let pool = InMemoryPool::with_capital(1_000);
        pool.reserve(100).unwrap();
        assert_eq!(pool.available(), 900);

        pool.disburse_reserved(&[("alice", 67), ("treasury", 3), ("nobody", 0)])
            .unwrap();
        assert_eq!(pool.balance_of("alice"), 67);
        assert_eq!(pool.balance_of("treasury"), 3);

        let account = pool.pool_account();
        assert_eq!(account.reserved, 30);
        pool.release(30).unwrap();
        assert_eq!(pool.available(), 930);
    }

    #[test]
    fn test_disburse_is_all_or_nothing() {
        let pool = InMemoryPool::with_capital(1_000);
        pool.reserve(50).unwrap();

        let err = pool.disburse_reserved(&[("alice", 40), ("bob", 40)]).unwrap_err();
        assert!(matches!(err, PoolError::InsufficientReserved { required: 80, reserved: 50 }));
        assert_eq!(pool.balance_of("alice"), 0);
        assert_eq!(pool.pool_account().reserved, 50);
    }

    #[test]
    fn test_reserve_exhausted() {
        let pool = InMemoryPool::with_capital(10);
        assert!(matches!(
            pool.reserve(11),
            Err(PoolError::InsufficientFunds { required: 11, available: 10 })
        ));
    }
}
