//! PostgreSQL store tests. Run with a database available:
//! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`
mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use timelock_settlement::market::{MarketError, MarketRules};
use timelock_settlement::models::{MarketStatus, NewMarket, Side, Stake};
use timelock_settlement::settlement::{Distribution, SettlementEngine};
use timelock_settlement::store::Store;

fn new_market(question: &str) -> NewMarket {
    NewMarket {
        creator: "GCREATOR".into(),
        question: question.into(),
        category: "other".into(),
        unlock_time: Utc::now() + Duration::hours(6),
    }
}

#[tokio::test]
#[ignore]
async fn test_pg_settlement_flow() {
    let pool = common::setup_test_db().await;
    let store = Store::Postgres(pool);
    let rules = MarketRules::default();
    let engine = SettlementEngine::default();

    let market = store.create_market(&new_market("Will Postgres settle this?"), &rules).await.unwrap();
    for (staker, side, amount) in [("A", Side::Yes, 100), ("B", Side::Yes, 300), ("C", Side::No, 200)] {
        store
            .place_stake(market.id, Stake::new(staker, side, Decimal::from(amount)), &rules)
            .await
            .unwrap();
    }

    let loaded = store.get_market(market.id).await.unwrap();
    assert_eq!(loaded.yes_pool, Decimal::from(400));
    assert_eq!(loaded.no_pool, Decimal::from(200));

    let report = store.settle_market(market.id, Side::Yes, &engine).await.unwrap();
    assert_eq!(report.settlement.distribution, Distribution::Proportional);
    assert_eq!(report.settlement.payouts["A"], Decimal::from(150));
    assert_eq!(report.settlement.payouts["B"], Decimal::from(450));

    let resolved = store.get_market(market.id).await.unwrap();
    assert_eq!(resolved.status, MarketStatus::Resolved);
    assert_eq!(resolved.winning_side, Some(Side::Yes));
    assert!(store.stakes_for_market(market.id).await.unwrap().is_empty());

    let err = store.settle_market(market.id, Side::No, &engine).await.unwrap_err();
    assert!(matches!(err, MarketError::AlreadySettled(_)));
    assert_eq!(store.reward_balance("B").await.unwrap(), Decimal::from(450));

    assert_eq!(store.claim_rewards("B").await.unwrap(), Decimal::from(450));
    assert_eq!(store.reward_balance("B").await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
#[ignore]
async fn test_pg_concurrent_credits() {
    let pool = common::setup_test_db().await;
    let store = Store::Postgres(pool);
    let rules = MarketRules::default();
    let engine = SettlementEngine::default();

    let mut ids = Vec::new();
    for i in 0..4 {
        let market = store
            .create_market(&new_market(&format!("Concurrent Postgres market {i}")), &rules)
            .await
            .unwrap();
        store
            .place_stake(market.id, Stake::new("shared", Side::Yes, Decimal::from(100)), &rules)
            .await
            .unwrap();
        ids.push(market.id);
    }

    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let store = store.clone();
            tokio::spawn(async move { store.settle_market(id, Side::Yes, &engine).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.reward_balance("shared").await.unwrap(), Decimal::from(400));
}
