pub mod amount;
pub mod engine;
pub mod ledger;

pub use amount::{AmountError, UnitScale};
pub use engine::{Distribution, Settlement, SettlementEngine};
pub use ledger::RewardsLedger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Side;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("invalid stake from {staker}: {reason}")]
    InvalidStake { staker: String, reason: AmountError },

    #[error("outcome {0} is not a yes/no value")]
    InvalidOutcome(String),

    #[error("stake pool exceeds the representable range")]
    PoolOverflow,
}

/// Resolve a client-supplied outcome into a side.
///
/// Accepts booleans, `0`/`1` and the strings understood by
/// [`Side::from_api_str`]. Anything else is `InvalidOutcome`.
pub fn parse_outcome(value: &Value) -> Result<Side, SettlementError> {
    let side = match value {
        Value::Bool(b) => Some(Side::from(*b)),
        Value::String(s) => Side::from_api_str(s),
        Value::Number(n) => match n.as_u64() {
            Some(1) => Some(Side::Yes),
            Some(0) => Some(Side::No),
            _ => None,
        },
        _ => None,
    };
    side.ok_or_else(|| SettlementError::InvalidOutcome(value.to_string()))
}

/// A settlement applied to a market, as returned to API clients and
/// broadcast to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub settlement_id: Uuid,
    pub market_id: i64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub settled_at: DateTime<Utc>,
    #[serde(flatten)]
    pub settlement: Settlement,
}

impl SettlementReport {
    pub fn new(market_id: i64, settlement: Settlement) -> Self {
        Self {
            settlement_id: Uuid::new_v4(),
            market_id,
            settled_at: Utc::now(),
            settlement,
        }
    }
}
