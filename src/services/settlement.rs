use metrics::{counter, gauge, histogram};
use tokio::sync::broadcast;

use crate::api::ws_types::WsMessage;
use crate::market::MarketError;
use crate::models::Side;
use crate::settlement::{SettlementEngine, SettlementReport};
use crate::store::Store;

/// Resolve a market to `winning_side`, credit its payouts and notify
/// subscribers. Settlement runs at most once per market: a second call gets
/// `AlreadySettled` and leaves the ledger as it was.
pub async fn resolve_and_settle(
    store: &Store,
    engine: &SettlementEngine,
    ws_tx: &broadcast::Sender<WsMessage>,
    market_id: i64,
    winning_side: Side,
) -> Result<SettlementReport, MarketError> {
    let report = match store.settle_market(market_id, winning_side, engine).await {
        Ok(report) => report,
        Err(e) => {
            counter!("settlement_failures_total").increment(1);
            tracing::warn!(error = %e, market_id, outcome = %winning_side, "Settlement rejected");
            return Err(e);
        }
    };

    let settlement = &report.settlement;
    counter!("markets_settled_total").increment(1);
    gauge!("open_markets").decrement(1.0);
    histogram!("settlement_payout_count").record(settlement.payouts.len() as f64);

    tracing::info!(
        market_id,
        settlement_id = %report.settlement_id,
        outcome = %winning_side,
        distribution = ?settlement.distribution,
        total_pool = %settlement.total_pool,
        winner_pool = %settlement.winner_pool,
        recipients = settlement.payouts.len(),
        "Market settled"
    );

    // no subscribers is not an error
    let _ = ws_tx.send(WsMessage::MarketResolved(report.clone()));

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketRules;
    use crate::models::{NewMarket, Stake};
    use crate::settlement::Distribution;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_resolve_broadcasts_report() {
        let store = Store::Memory(MemoryStore::new());
        let rules = MarketRules::default();
        let (ws_tx, mut ws_rx) = broadcast::channel(8);

        let market = store
            .create_market(
                &NewMarket {
                    creator: "GCREATOR".into(),
                    question: "Will anyone back the winner?".into(),
                    category: "other".into(),
                    unlock_time: Utc::now() + Duration::hours(2),
                },
                &rules,
            )
            .await
            .unwrap();
        store
            .place_stake(market.id, Stake::new("A", Side::No, Decimal::from(500)), &rules)
            .await
            .unwrap();

        let report = resolve_and_settle(&store, &SettlementEngine::default(), &ws_tx, market.id, Side::Yes)
            .await
            .unwrap();
        assert_eq!(report.settlement.distribution, Distribution::Fallback);
        assert_eq!(report.settlement.payouts["GCREATOR"], Decimal::from(500));

        match ws_rx.recv().await.unwrap() {
            WsMessage::MarketResolved(sent) => assert_eq!(sent.settlement_id, report.settlement_id),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
