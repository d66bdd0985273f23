use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Claimable balances per staker.
///
/// Settlements only ever add to an entry; the only way a balance goes down
/// is [`RewardsLedger::claim`], which empties it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardsLedger {
    balances: HashMap<String, Decimal>,
}

impl RewardsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to a staker's balance. Non-positive amounts are ignored.
    pub fn credit(&mut self, staker: &str, amount: Decimal) {
        if amount <= Decimal::ZERO {
            return;
        }
        *self
            .balances
            .entry(staker.to_string())
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Credit every payout of a settlement.
    pub fn apply(&mut self, payouts: &BTreeMap<String, Decimal>) {
        for (staker, amount) in payouts {
            self.credit(staker, *amount);
        }
    }

    pub fn balance(&self, staker: &str) -> Decimal {
        self.balances.get(staker).copied().unwrap_or(Decimal::ZERO)
    }

    /// Zero a staker's balance and return what it held.
    pub fn claim(&mut self, staker: &str) -> Decimal {
        self.balances.remove(staker).unwrap_or(Decimal::ZERO)
    }
}
