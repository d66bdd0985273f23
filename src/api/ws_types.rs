use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Market, Side};
use crate::settlement::SettlementReport;

/// Messages broadcast to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "market_created")]
    MarketCreated(Market),

    #[serde(rename = "stake_placed")]
    StakePlaced(StakePlacedData),

    #[serde(rename = "market_unlocked")]
    MarketUnlocked(Market),

    #[serde(rename = "market_resolved")]
    MarketResolved(SettlementReport),

    #[serde(rename = "rewards_claimed")]
    RewardsClaimed(RewardsClaimedData),
}

#[derive(Debug, Clone, Serialize)]
pub struct StakePlacedData {
    pub market_id: i64,
    pub staker: String,
    pub side: Side,
    pub amount: Decimal,
    pub yes_pool: Decimal,
    pub no_pool: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewardsClaimedData {
    pub staker: String,
    pub amount: Decimal,
}
