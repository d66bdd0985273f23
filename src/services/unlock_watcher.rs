use std::collections::HashSet;

use chrono::Utc;
use metrics::gauge;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration};

use crate::api::ws_types::WsMessage;
use crate::store::Store;

/// Periodically announce open markets whose unlock time has passed, so the
/// front-end can switch them to "ready to resolve". Each market is announced
/// once per process.
pub async fn run_unlock_watcher(
    store: Store,
    ws_tx: broadcast::Sender<WsMessage>,
    interval_secs: u64,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs));
    let mut announced: HashSet<i64> = HashSet::new();

    loop {
        ticker.tick().await;
        check_unlocked(&store, &ws_tx, &mut announced).await;
    }
}

/// One watcher pass. Returns how many markets were newly announced.
pub async fn check_unlocked(
    store: &Store,
    ws_tx: &broadcast::Sender<WsMessage>,
    announced: &mut HashSet<i64>,
) -> usize {
    match store.stats().await {
        Ok(stats) => gauge!("open_markets").set(stats.open_markets as f64),
        Err(e) => tracing::warn!(error = %e, "Unlock watcher: failed to read market stats"),
    }

    let unlocked = match store.unlocked_open_markets(Utc::now()).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "Unlock watcher: failed to fetch unlocked markets");
            return 0;
        }
    };

    let mut count = 0;
    for market in unlocked {
        if !announced.insert(market.id) {
            continue;
        }
        tracing::info!(
            market_id = market.id,
            unlock_time = %market.unlock_time,
            total_pool = %market.total_pool(),
            "Market unlocked, ready to resolve"
        );
        let _ = ws_tx.send(WsMessage::MarketUnlocked(market));
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Market, MarketStatus};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    fn market(unlock_offset_hours: i64) -> Market {
        let now = Utc::now();
        Market {
            id: 0,
            creator: "GCREATOR".into(),
            question: "Has the unlock time passed?".into(),
            category: "other".into(),
            unlock_time: now + chrono::Duration::hours(unlock_offset_hours),
            status: MarketStatus::Open,
            winning_side: None,
            yes_pool: Decimal::ZERO,
            no_pool: Decimal::ZERO,
            created_at: now,
            resolved_at: None,
        }
    }

    #[tokio::test]
    async fn test_announces_each_unlocked_market_once() {
        let store = Store::Memory(MemoryStore::new());
        store.restore_market(market(-1), vec![]).await.unwrap();
        store.restore_market(market(5), vec![]).await.unwrap();

        let (ws_tx, mut ws_rx) = broadcast::channel(8);
        let mut announced = HashSet::new();

        assert_eq!(check_unlocked(&store, &ws_tx, &mut announced).await, 1);
        assert!(matches!(ws_rx.recv().await.unwrap(), WsMessage::MarketUnlocked(_)));

        assert_eq!(check_unlocked(&store, &ws_tx, &mut announced).await, 0);
    }
}
