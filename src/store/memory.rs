use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::market::{lifecycle, MarketError, MarketRules};
use crate::models::{Market, MarketStats, MarketStatus, NewMarket, Side, Stake};
use crate::settlement::{RewardsLedger, SettlementEngine, SettlementReport};

/// Process-local store used for demo mode and tests.
///
/// Markets, stake lists and the rewards ledger sit behind one mutex, so every
/// operation (stake placement, settlement, claim) is a single critical
/// section against all three.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    last_id: i64,
    markets: BTreeMap<i64, Market>,
    stakes: HashMap<i64, Vec<Stake>>,
    ledger: RewardsLedger,
}

impl MemoryInner {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

fn open_market(id: i64, new: NewMarket, now: DateTime<Utc>) -> Market {
    Market {
        id,
        creator: new.creator,
        question: new.question,
        category: new.category,
        unlock_time: new.unlock_time,
        status: MarketStatus::Open,
        winning_side: None,
        yes_pool: Decimal::ZERO,
        no_pool: Decimal::ZERO,
        created_at: now,
        resolved_at: None,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already validated market.
    pub async fn create_market(&self, new: NewMarket, now: DateTime<Utc>) -> Market {
        let mut inner = self.inner.lock().await;
        let market = open_market(inner.next_id(), new, now);
        inner.markets.insert(market.id, market.clone());
        market
    }

    /// Insert an already validated market together with its creator's first
    /// stake. When the stake is rejected no market is created.
    pub async fn create_market_with_stake(
        &self,
        new: NewMarket,
        stake: Stake,
        rules: &MarketRules,
        now: DateTime<Utc>,
    ) -> Result<Market, MarketError> {
        let mut inner = self.inner.lock().await;
        let mut market = open_market(inner.last_id + 1, new, now);
        rules.check_stake(&market, &stake.staker, stake.amount, stake.staked_at)?;

        inner.last_id = market.id;
        market.add_to_pool(stake.side, stake.amount);
        inner.markets.insert(market.id, market.clone());
        inner.stakes.insert(market.id, vec![stake]);
        Ok(market)
    }

    /// Insert a market carried over from elsewhere under a fresh id. Pools are
    /// recomputed from `stakes`.
    pub async fn restore_market(&self, mut market: Market, stakes: Vec<Stake>) -> Market {
        let mut inner = self.inner.lock().await;
        market.id = inner.next_id();
        market.yes_pool = Decimal::ZERO;
        market.no_pool = Decimal::ZERO;
        for stake in &stakes {
            market.add_to_pool(stake.side, stake.amount);
        }
        inner.markets.insert(market.id, market.clone());
        if !stakes.is_empty() {
            inner.stakes.insert(market.id, stakes);
        }
        market
    }

    pub async fn get_market(&self, id: i64) -> Option<Market> {
        self.inner.lock().await.markets.get(&id).cloned()
    }

    /// Newest first.
    pub async fn list_markets(&self) -> Vec<Market> {
        let inner = self.inner.lock().await;
        inner.markets.values().rev().cloned().collect()
    }

    pub async fn unlocked_open_markets(&self, now: DateTime<Utc>) -> Vec<Market> {
        let inner = self.inner.lock().await;
        let mut markets: Vec<Market> = inner
            .markets
            .values()
            .filter(|m| m.is_open() && m.is_unlocked(now))
            .cloned()
            .collect();
        markets.sort_by_key(|m| m.unlock_time);
        markets
    }

    pub async fn stakes_for_market(&self, id: i64) -> Vec<Stake> {
        let inner = self.inner.lock().await;
        inner.stakes.get(&id).cloned().unwrap_or_default()
    }

    pub async fn place_stake(
        &self,
        market_id: i64,
        stake: Stake,
        rules: &MarketRules,
    ) -> Result<Market, MarketError> {
        let mut inner = self.inner.lock().await;

        let market = inner
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::NotFound(market_id))?;
        rules.check_stake(market, &stake.staker, stake.amount, stake.staked_at)?;
        market.add_to_pool(stake.side, stake.amount);
        let market = market.clone();

        inner.stakes.entry(market_id).or_default().push(stake);
        Ok(market)
    }

    /// Resolve, compute payouts, credit the ledger and drop the stake list,
    /// all under the store lock. On error nothing is changed.
    pub async fn settle_market(
        &self,
        market_id: i64,
        winning_side: Side,
        engine: &SettlementEngine,
    ) -> Result<SettlementReport, MarketError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let market = inner
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::NotFound(market_id))?;
        lifecycle::check_settleable(market)?;

        let stakes = inner.stakes.get(&market_id).map(Vec::as_slice).unwrap_or(&[]);
        let settlement = engine.settle(stakes, winning_side, &market.creator)?;

        lifecycle::mark_resolved(market, winning_side, Utc::now())?;
        inner.ledger.apply(&settlement.payouts);
        inner.stakes.remove(&market_id);

        Ok(SettlementReport::new(market_id, settlement))
    }

    pub async fn reward_balance(&self, staker: &str) -> Decimal {
        self.inner.lock().await.ledger.balance(staker)
    }

    pub async fn credit_rewards(&self, payouts: &BTreeMap<String, Decimal>) {
        self.inner.lock().await.ledger.apply(payouts);
    }

    pub async fn claim_rewards(&self, staker: &str) -> Decimal {
        self.inner.lock().await.ledger.claim(staker)
    }

    pub async fn stats(&self) -> MarketStats {
        let inner = self.inner.lock().await;
        MarketStats::from_markets(inner.markets.values())
    }
}
