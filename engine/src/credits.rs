//! Two-phase optimistic credit mutation.
//!
//! A credit purchase debits locally before the server confirms: the amount
//! is placed on hold, then either confirmed (debited) once numbers are
//! committed, or released (reverted) on a business rejection. The revert is
//! a first-class operation, not an ad-hoc balance write.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub type HoldId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditLedger {
    balance: u64,
    holds: BTreeMap<HoldId, u64>,
    next_hold_id: HoldId,
}

impl CreditLedger {
    pub fn new(balance: u64) -> Self {
        CreditLedger {
            balance,
            holds: BTreeMap::new(),
            next_hold_id: 0,
        }
    }

    /// Confirmed balance, ignoring live holds.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn held(&self) -> u64 {
        self.holds.values().sum()
    }

    /// Balance net of live holds — what a new purchase may spend.
    pub fn available(&self) -> u64 {
        self.balance.saturating_sub(self.held())
    }

    pub fn place_hold(&mut self, amount: u64) -> Result<HoldId, EngineError> {
        let available = self.available();
        if amount > available {
            return Err(EngineError::InsufficientCredits {
                needed: amount,
                available,
            });
        }
        let id = self.next_hold_id;
        self.next_hold_id += 1;
        self.holds.insert(id, amount);
        Ok(id)
    }

    /// Debit the held amount. Unknown ids are ignored (already settled).
    pub fn confirm(&mut self, hold: HoldId) {
        if let Some(amount) = self.holds.remove(&hold) {
            self.balance = self.balance.saturating_sub(amount);
        }
    }

    /// Revert a hold without debiting; returns the released amount.
    pub fn release(&mut self, hold: HoldId) -> u64 {
        self.holds.remove(&hold).unwrap_or(0)
    }
}
