use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Market, MarketStatus, NewMarket, Side};
use crate::settlement::{SettlementError, UnitScale};

pub const MIN_QUESTION_LEN: usize = 10;
pub const MAX_QUESTION_LEN: usize = 200;
/// Upper bound for `min_lock_secs` (ten years).
pub const MAX_LOCK_SECS: i64 = 10 * 365 * 24 * 3600;

/// Market lifecycle violation.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("market {0} not found")]
    NotFound(i64),

    #[error("market {0} is already settled")]
    AlreadySettled(i64),

    #[error("market {id} stopped accepting stakes at {unlock_time}")]
    StakingClosed {
        id: i64,
        unlock_time: DateTime<Utc>,
    },

    #[error("stake {amount} is below the minimum of {min}")]
    BelowMinimum { amount: Decimal, min: Decimal },

    #[error("question must be {min}-{max} characters, got {len}")]
    InvalidQuestion { len: usize, min: usize, max: usize },

    #[error("unlock time must be at least {min_secs}s in the future")]
    UnlockTooSoon { min_secs: i64 },

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Creation and staking limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRules {
    /// Smallest accepted stake (default 100 XLM).
    pub min_stake: Decimal,
    /// Minimum distance between creation and unlock (default 1 hour).
    pub min_lock_secs: i64,
    pub unit_scale: UnitScale,
}

impl Default for MarketRules {
    fn default() -> Self {
        Self {
            min_stake: Decimal::from(100),
            min_lock_secs: 3600,
            unit_scale: UnitScale::default(),
        }
    }
}

impl MarketRules {
    /// `min_lock_secs` as a duration, clamped to `0..=MAX_LOCK_SECS`.
    pub fn min_lock(&self) -> Duration {
        Duration::seconds(self.min_lock_secs.clamp(0, MAX_LOCK_SECS))
    }

    /// Validate a creation request and normalize its question.
    pub fn check_new_market(
        &self,
        new: &NewMarket,
        now: DateTime<Utc>,
    ) -> Result<NewMarket, MarketError> {
        let question = new.question.trim();
        let len = question.chars().count();
        if !(MIN_QUESTION_LEN..=MAX_QUESTION_LEN).contains(&len) {
            return Err(MarketError::InvalidQuestion {
                len,
                min: MIN_QUESTION_LEN,
                max: MAX_QUESTION_LEN,
            });
        }

        if new.unlock_time < now + self.min_lock() {
            return Err(MarketError::UnlockTooSoon {
                min_secs: self.min_lock_secs,
            });
        }

        Ok(NewMarket {
            question: question.to_string(),
            category: new.category.trim().to_lowercase(),
            ..new.clone()
        })
    }

    /// Check that `market` accepts a stake of `amount` from `staker` at `now`.
    pub fn check_stake(
        &self,
        market: &Market,
        staker: &str,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), MarketError> {
        if !market.is_open() {
            return Err(MarketError::AlreadySettled(market.id));
        }
        if market.is_unlocked(now) {
            return Err(MarketError::StakingClosed {
                id: market.id,
                unlock_time: market.unlock_time,
            });
        }
        // sign and precision first, so a negative amount reports as invalid
        self.unit_scale
            .to_minor_units(amount)
            .map_err(|reason| SettlementError::InvalidStake {
                staker: staker.to_string(),
                reason,
            })?;
        if amount < self.min_stake {
            return Err(MarketError::BelowMinimum {
                amount,
                min: self.min_stake,
            });
        }
        Ok(())
    }
}

/// Only open markets can be settled.
pub fn check_settleable(market: &Market) -> Result<(), MarketError> {
    match market.status {
        MarketStatus::Open => Ok(()),
        MarketStatus::Resolved => Err(MarketError::AlreadySettled(market.id)),
    }
}

/// Apply the terminal `Open -> Resolved` transition.
pub fn mark_resolved(
    market: &mut Market,
    winning_side: Side,
    now: DateTime<Utc>,
) -> Result<(), MarketError> {
    check_settleable(market)?;
    market.status = MarketStatus::Resolved;
    market.winning_side = Some(winning_side);
    market.resolved_at = Some(now);
    Ok(())
}
