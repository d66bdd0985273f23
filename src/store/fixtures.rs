use chrono::{Duration, Utc};

use crate::market::{MarketError, MarketRules};
use crate::models::{Market, NewMarket, Side, Stake};

use super::Store;

struct DemoMarket {
    creator: &'static str,
    question: &'static str,
    category: &'static str,
    unlock_in_hours: i64,
    creator_side: Side,
}

const DEMO_CREATOR_A: &str = "GC42P553VMNAS6SIRGJDIFTHF2B6NVZ5C7OOXFV5WTXGLV3FRC4CAGNB";
const DEMO_CREATOR_B: &str = "GCTNWYVQVR6KHQARNDFPNKUB24N4PAGCZ3MOB3FYRE66GOE3TG52PRIJ";

const DEMO_MARKETS: &[DemoMarket] = &[
    DemoMarket {
        creator: DEMO_CREATOR_A,
        question: "Will Bitcoin hit $100k by year end?",
        category: "finance",
        unlock_in_hours: 24,
        creator_side: Side::Yes,
    },
    DemoMarket {
        creator: DEMO_CREATOR_A,
        question: "Will Ethereum reach $5000 USD in 2025?",
        category: "finance",
        unlock_in_hours: 72,
        creator_side: Side::No,
    },
    DemoMarket {
        creator: DEMO_CREATOR_B,
        question: "Will a new Stellar protocol upgrade ship this quarter?",
        category: "technology",
        unlock_in_hours: 24 * 7,
        creator_side: Side::Yes,
    },
    DemoMarket {
        creator: DEMO_CREATOR_B,
        question: "Will the home team win the championship final?",
        category: "sports",
        unlock_in_hours: 24 * 14,
        creator_side: Side::No,
    },
];

/// Load the demo markets through the regular create/stake path. Each creator
/// backs their own market with the minimum stake, as the creation flow does.
pub async fn seed_demo_markets(
    store: &Store,
    rules: &MarketRules,
) -> Result<Vec<Market>, MarketError> {
    let now = Utc::now();
    let mut seeded = Vec::with_capacity(DEMO_MARKETS.len());

    for demo in DEMO_MARKETS {
        let unlock_in = Duration::hours(demo.unlock_in_hours).max(rules.min_lock() + Duration::seconds(60));
        let new = NewMarket {
            creator: demo.creator.to_string(),
            question: demo.question.to_string(),
            category: demo.category.to_string(),
            unlock_time: now + unlock_in,
        };
        let stake = Stake::new(demo.creator, demo.creator_side, rules.min_stake);
        seeded.push(store.create_market_with_stake(&new, stake, rules).await?);
    }

    tracing::info!(count = seeded.len(), backend = store.backend_name(), "Seeded demo markets");
    Ok(seeded)
}
