use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Side;

/// Lifecycle status. `Open -> Resolved` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Resolved,
}

impl MarketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketStatus::Open => "open",
            MarketStatus::Resolved => "resolved",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(MarketStatus::Open),
            "resolved" => Some(MarketStatus::Resolved),
            _ => None,
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single yes/no prediction with its two stake pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: i64,
    /// Creator identity; receives the whole pool when nobody backed the winner.
    pub creator: String,
    pub question: String,
    pub category: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub unlock_time: DateTime<Utc>,
    pub status: MarketStatus,
    pub winning_side: Option<Side>,
    pub yes_pool: Decimal,
    pub no_pool: Decimal,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Market {
    pub fn is_open(&self) -> bool {
        self.status == MarketStatus::Open
    }

    pub fn total_pool(&self) -> Decimal {
        self.yes_pool + self.no_pool
    }

    pub fn is_unlocked(&self, now: DateTime<Utc>) -> bool {
        now >= self.unlock_time
    }

    /// Add a stake amount to the pool of `side`.
    pub fn add_to_pool(&mut self, side: Side, amount: Decimal) {
        match side {
            Side::Yes => self.yes_pool += amount,
            Side::No => self.no_pool += amount,
        }
    }
}

/// Input for creating a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMarket {
    pub creator: String,
    pub question: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub unlock_time: DateTime<Utc>,
}

fn default_category() -> String {
    "other".into()
}

/// Aggregate counters over all markets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub total_markets: i64,
    pub open_markets: i64,
    pub resolved_markets: i64,
    pub total_volume: Decimal,
}

impl MarketStats {
    pub fn from_markets<'a>(markets: impl IntoIterator<Item = &'a Market>) -> Self {
        let mut stats = MarketStats::default();
        for market in markets {
            stats.total_markets += 1;
            match market.status {
                MarketStatus::Open => stats.open_markets += 1,
                MarketStatus::Resolved => stats.resolved_markets += 1,
            }
            stats.total_volume += market.total_pool();
        }
        stats
    }
}
