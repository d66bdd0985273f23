pub mod fixtures;
pub mod legacy;
pub mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::db::{market_repo, reward_repo, settlement_repo, stake_repo};
use crate::market::{MarketError, MarketRules};
use crate::models::{Market, MarketStats, NewMarket, Side, Stake};
use crate::settlement::{SettlementEngine, SettlementReport};

/// Market, stake and rewards persistence.
///
/// Both backends expose the same operations; mock/demo data is loaded into
/// either one through [`fixtures`], so there is a single read path.
#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Postgres(PgPool),
}

impl Store {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Postgres(_) => "postgres",
        }
    }

    /// Store connectivity, for the health endpoint.
    pub async fn ping(&self) -> bool {
        match self {
            Store::Memory(_) => true,
            Store::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.is_ok(),
        }
    }

    /// Validate and insert a new market.
    pub async fn create_market(
        &self,
        new: &NewMarket,
        rules: &MarketRules,
    ) -> Result<Market, MarketError> {
        let now = Utc::now();
        let new = rules.check_new_market(new, now)?;
        match self {
            Store::Memory(mem) => Ok(mem.create_market(new, now).await),
            Store::Postgres(pool) => Ok(market_repo::insert_market(pool, &new).await?),
        }
    }

    /// Validate and insert a new market together with the creator's first
    /// stake. Either both are stored or neither is.
    pub async fn create_market_with_stake(
        &self,
        new: &NewMarket,
        stake: Stake,
        rules: &MarketRules,
    ) -> Result<Market, MarketError> {
        let now = Utc::now();
        let new = rules.check_new_market(new, now)?;
        match self {
            Store::Memory(mem) => mem.create_market_with_stake(new, stake, rules, now).await,
            Store::Postgres(pool) => {
                stake_repo::create_market_with_stake(pool, &new, &stake, rules).await
            }
        }
    }

    /// Insert a market with its stakes as-is (no creation checks).
    pub async fn restore_market(
        &self,
        mut market: Market,
        stakes: Vec<Stake>,
    ) -> Result<Market, MarketError> {
        match self {
            Store::Memory(mem) => Ok(mem.restore_market(market, stakes).await),
            Store::Postgres(pool) => {
                // pools are rebuilt from the stakes below
                market.yes_pool = Decimal::ZERO;
                market.no_pool = Decimal::ZERO;

                let mut tx = pool.begin().await.map_err(anyhow::Error::from)?;
                let mut restored = market_repo::insert_restored_market(&mut tx, &market).await?;
                for stake in &stakes {
                    stake_repo::insert_stake(&mut tx, restored.id, stake).await?;
                    restored =
                        market_repo::add_to_pool(&mut tx, restored.id, stake.side, stake.amount)
                            .await?;
                }
                tx.commit().await.map_err(anyhow::Error::from)?;
                Ok(restored)
            }
        }
    }

    pub async fn get_market(&self, id: i64) -> Result<Market, MarketError> {
        let market = match self {
            Store::Memory(mem) => mem.get_market(id).await,
            Store::Postgres(pool) => market_repo::get_market(pool, id).await?,
        };
        market.ok_or(MarketError::NotFound(id))
    }

    pub async fn list_markets(&self) -> Result<Vec<Market>, MarketError> {
        match self {
            Store::Memory(mem) => Ok(mem.list_markets().await),
            Store::Postgres(pool) => Ok(market_repo::list_markets(pool).await?),
        }
    }

    pub async fn unlocked_open_markets(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Market>, MarketError> {
        match self {
            Store::Memory(mem) => Ok(mem.unlocked_open_markets(now).await),
            Store::Postgres(pool) => Ok(market_repo::get_unlocked_open_markets(pool, now).await?),
        }
    }

    pub async fn stakes_for_market(&self, id: i64) -> Result<Vec<Stake>, MarketError> {
        // surface NotFound rather than an empty list for unknown ids
        self.get_market(id).await?;
        match self {
            Store::Memory(mem) => Ok(mem.stakes_for_market(id).await),
            Store::Postgres(pool) => Ok(stake_repo::get_stakes_for_market(pool, id).await?),
        }
    }

    pub async fn place_stake(
        &self,
        market_id: i64,
        stake: Stake,
        rules: &MarketRules,
    ) -> Result<Market, MarketError> {
        match self {
            Store::Memory(mem) => mem.place_stake(market_id, stake, rules).await,
            Store::Postgres(pool) => stake_repo::place_stake(pool, market_id, &stake, rules).await,
        }
    }

    /// Resolve `market_id` to `winning_side` and credit the payouts.
    /// Rejected with `AlreadySettled` if the market is not open.
    pub async fn settle_market(
        &self,
        market_id: i64,
        winning_side: Side,
        engine: &SettlementEngine,
    ) -> Result<SettlementReport, MarketError> {
        match self {
            Store::Memory(mem) => mem.settle_market(market_id, winning_side, engine).await,
            Store::Postgres(pool) => {
                settlement_repo::settle_market(pool, market_id, winning_side, engine).await
            }
        }
    }

    pub async fn reward_balance(&self, staker: &str) -> Result<Decimal, MarketError> {
        match self {
            Store::Memory(mem) => Ok(mem.reward_balance(staker).await),
            Store::Postgres(pool) => Ok(reward_repo::get_balance(pool, staker).await?),
        }
    }

    pub async fn credit_rewards(
        &self,
        payouts: &BTreeMap<String, Decimal>,
    ) -> Result<(), MarketError> {
        match self {
            Store::Memory(mem) => {
                mem.credit_rewards(payouts).await;
                Ok(())
            }
            Store::Postgres(pool) => {
                let mut tx = pool.begin().await.map_err(anyhow::Error::from)?;
                reward_repo::credit_payouts(&mut tx, payouts).await?;
                tx.commit().await.map_err(anyhow::Error::from)?;
                Ok(())
            }
        }
    }

    pub async fn claim_rewards(&self, staker: &str) -> Result<Decimal, MarketError> {
        match self {
            Store::Memory(mem) => Ok(mem.claim_rewards(staker).await),
            Store::Postgres(pool) => Ok(reward_repo::claim(pool, staker).await?),
        }
    }

    pub async fn stats(&self) -> Result<MarketStats, MarketError> {
        match self {
            Store::Memory(mem) => Ok(mem.stats().await),
            Store::Postgres(pool) => Ok(market_repo::get_stats(pool).await?),
        }
    }
}
