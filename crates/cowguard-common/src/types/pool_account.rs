//! Pool account - fixed-point balance with reserve/settle escrow
//!
//! Used for the protocol pool, the treasury and holder balances.
//! Key characteristics:
//! - Tracks available vs reserved balance
//! - Payouts and refunds are reserved first, then settled or released
//! - Version counter bumps on every mutation

use serde::{Deserialize, Serialize};

use crate::error::PoolError;
use crate::money::Amount;

/// Balance held by one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAccount {
    pub owner: String,

    /// Spendable balance
    pub available: Amount,

    /// Earmarked for an in-flight payout or refund
    pub reserved: Amount,

    /// Bumped on every mutation
    pub version: u64,

    /// Unix milliseconds of the last mutation
    pub updated_at: i64,
}

impl PoolAccount {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            available: 0,
            reserved: 0,
            version: 0,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_balance(owner: impl Into<String>, balance: Amount) -> Self {
        let mut account = Self::new(owner);
        account.available = balance;
        account
    }

    /// Available + reserved
    #[inline]
    pub fn total(&self) -> Amount {
        self.available.saturating_add(self.reserved)
    }

    pub fn credit(&mut self, amount: Amount) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(PoolError::InvalidAmount);
        }
        self.available = self
            .available
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        self.touch();
        Ok(())
    }

    pub fn debit(&mut self, amount: Amount) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(PoolError::InvalidAmount);
        }
        if self.available < amount {
            return Err(PoolError::InsufficientFunds {
                required: amount,
                available: self.available,
            });
        }
        self.available -= amount;
        self.touch();
        Ok(())
    }

    /// Move funds from available to reserved
    pub fn reserve(&mut self, amount: Amount) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(PoolError::InvalidAmount);
        }
        if self.available < amount {
            return Err(PoolError::InsufficientFunds {
                required: amount,
                available: self.available,
            });
        }
        self.available -= amount;
        self.reserved += amount;
        self.touch();
        Ok(())
    }

    /// Return reserved funds to available
    pub fn release(&mut self, amount: Amount) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(PoolError::InvalidAmount);
        }
        if self.reserved < amount {
            return Err(PoolError::InsufficientReserved {
                required: amount,
                reserved: self.reserved,
            });
        }
        self.reserved -= amount;
        self.available += amount;
        self.touch();
        Ok(())
    }

    /// Pay reserved funds out to `recipient`
    pub fn transfer_reserved(
        &mut self,
        amount: Amount,
        recipient: &mut PoolAccount,
    ) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(PoolError::InvalidAmount);
        }
        if self.reserved < amount {
            return Err(PoolError::InsufficientReserved {
                required: amount,
                reserved: self.reserved,
            });
        }
        let credited = recipient
            .available
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;

        self.reserved -= amount;
        recipient.available = credited;

        self.touch();
        recipient.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

impl std::fmt::Display for PoolAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PoolAccount({}: available={}, reserved={})",
            self.owner, self.available, self.reserved
        )
    }
}
