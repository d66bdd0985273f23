use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// An amount committed by a participant to one side of a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stake {
    pub staker: String,
    pub side: Side,
    pub amount: Decimal,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub staked_at: DateTime<Utc>,
}

impl Stake {
    pub fn new(staker: impl Into<String>, side: Side, amount: Decimal) -> Self {
        Self {
            staker: staker.into(),
            side,
            amount,
            staked_at: Utc::now(),
        }
    }
}
