//! Import of the browser demo's local storage.
//!
//! The demo front-end kept its state in three local-storage keys:
//! `localPredictions` (array), `localStakes` (`{ predictionId: [{ user,
//! choice, amount }] }`) and `localRewards` (`{ address: amount }`), with
//! amounts as floats. A snapshot is a JSON object holding those three keys.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::MarketError;
use crate::models::{Market, MarketStatus, Side, Stake};
use crate::settlement::{SettlementError, UnitScale};

use super::Store;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacySnapshot {
    #[serde(rename = "localPredictions", default)]
    pub predictions: Vec<LegacyPrediction>,
    #[serde(rename = "localStakes", default)]
    pub stakes: HashMap<String, Vec<LegacyStake>>,
    #[serde(rename = "localRewards", default)]
    pub rewards: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyPrediction {
    pub id: i64,
    pub question: String,
    pub creator: String,
    /// Unix seconds.
    pub unlock_time: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub winner: Option<bool>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyStake {
    pub user: String,
    pub choice: bool,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub markets: usize,
    pub stakes: usize,
    pub skipped_stakes: usize,
    pub rewarded_stakers: usize,
}

pub fn parse_snapshot(json: &str) -> anyhow::Result<LegacySnapshot> {
    Ok(serde_json::from_str(json)?)
}

pub async fn load_snapshot(path: impl AsRef<Path>) -> anyhow::Result<LegacySnapshot> {
    let raw = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_snapshot(&raw)
}

/// Write a snapshot into `store`. Prediction ids are reassigned; pools are
/// rebuilt from the imported stakes. Stakes of resolved predictions were
/// already paid out by the demo and are skipped, as are stakes whose
/// prediction is missing from the snapshot.
///
/// Every amount is validated before anything is written, so a bad amount
/// aborts the import with `InvalidStake` and leaves the store untouched.
pub async fn import_snapshot(
    store: &Store,
    snapshot: &LegacySnapshot,
    scale: UnitScale,
) -> Result<ImportSummary, MarketError> {
    let mut summary = ImportSummary::default();
    let mut prepared: Vec<(Market, Vec<Stake>)> = Vec::with_capacity(snapshot.predictions.len());

    for pred in &snapshot.predictions {
        let market = convert_prediction(pred)?;
        let raw_stakes = snapshot
            .stakes
            .get(&pred.id.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let stakes = if market.is_open() {
            convert_stakes(raw_stakes, scale)?
        } else {
            summary.skipped_stakes += raw_stakes.len();
            Vec::new()
        };
        prepared.push((market, stakes));
    }

    let known: Vec<String> = snapshot.predictions.iter().map(|p| p.id.to_string()).collect();
    for (pred_id, stakes) in &snapshot.stakes {
        if !known.contains(pred_id) {
            tracing::warn!(prediction_id = %pred_id, count = stakes.len(), "Skipping stakes for unknown prediction");
            summary.skipped_stakes += stakes.len();
        }
    }

    let mut rewards = BTreeMap::new();
    for (staker, amount) in &snapshot.rewards {
        let amount = scale
            .from_f64(*amount)
            .map_err(|reason| SettlementError::InvalidStake {
                staker: staker.clone(),
                reason,
            })?;
        if amount > Decimal::ZERO {
            rewards.insert(staker.clone(), amount);
        }
    }

    for (market, stakes) in prepared {
        summary.stakes += stakes.len();
        let restored = store.restore_market(market, stakes).await?;
        tracing::debug!(market_id = restored.id, status = %restored.status, "Restored legacy prediction");
        summary.markets += 1;
    }

    summary.rewarded_stakers = rewards.len();
    store.credit_rewards(&rewards).await?;

    tracing::info!(
        markets = summary.markets,
        stakes = summary.stakes,
        skipped_stakes = summary.skipped_stakes,
        rewarded_stakers = summary.rewarded_stakers,
        "Legacy snapshot imported"
    );
    Ok(summary)
}

fn convert_prediction(pred: &LegacyPrediction) -> Result<Market, MarketError> {
    let unlock_time = DateTime::<Utc>::from_timestamp(pred.unlock_time, 0).ok_or_else(|| {
        anyhow::anyhow!("prediction {} has invalid unlock_time {}", pred.id, pred.unlock_time)
    })?;

    let status = match pred.status.as_deref() {
        None => MarketStatus::Open,
        Some(s) => MarketStatus::from_db_str(s).ok_or_else(|| {
            anyhow::anyhow!("prediction {} has unknown status {:?}", pred.id, s)
        })?,
    };

    let winning_side = match status {
        MarketStatus::Open => None,
        MarketStatus::Resolved => Some(Side::from(pred.winner.ok_or_else(|| {
            anyhow::anyhow!("prediction {} is resolved without a winner", pred.id)
        })?)),
    };

    let now = Utc::now();
    Ok(Market {
        id: pred.id,
        creator: pred.creator.clone(),
        question: pred.question.trim().to_string(),
        category: pred
            .category
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .unwrap_or_else(|| "other".into()),
        unlock_time,
        status,
        winning_side,
        yes_pool: Decimal::ZERO,
        no_pool: Decimal::ZERO,
        created_at: now,
        resolved_at: winning_side.map(|_| now),
    })
}

fn convert_stakes(raw: &[LegacyStake], scale: UnitScale) -> Result<Vec<Stake>, SettlementError> {
    raw.iter()
        .map(|s| {
            let amount = scale
                .from_f64(s.amount)
                .map_err(|reason| SettlementError::InvalidStake {
                    staker: s.user.clone(),
                    reason,
                })?;
            Ok(Stake::new(s.user.clone(), Side::from(s.choice), amount))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::AmountError;
    use crate::store::MemoryStore;

    const SNAPSHOT: &str = r#"{
        "localPredictions": [
            { "id": 1700000001, "question": "Will it rain tomorrow in Lagos?", "creator": "GCREATOR",
              "unlock_time": 4102444800, "status": "Open", "winner": null, "isLocal": true },
            { "id": 1700000002, "question": "Did the launch happen on time?", "creator": "GCREATOR",
              "unlock_time": 1700003600, "status": "Resolved", "winner": true, "isLocal": true }
        ],
        "localStakes": {
            "1700000001": [
                { "user": "GALICE", "choice": true, "amount": 150.5 },
                { "user": "GBOB", "choice": false, "amount": 100 }
            ],
            "999": [ { "user": "GGHOST", "choice": true, "amount": 100 } ]
        },
        "localRewards": { "GALICE": 133.33333333333334, "GBOB": 0 }
    }"#;

    #[tokio::test]
    async fn test_import_snapshot() {
        let store = Store::Memory(MemoryStore::new());
        let snapshot = parse_snapshot(SNAPSHOT).unwrap();

        let summary = import_snapshot(&store, &snapshot, UnitScale::default())
            .await
            .unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                markets: 2,
                stakes: 2,
                skipped_stakes: 1,
                rewarded_stakers: 1,
            }
        );

        let markets = store.list_markets().await.unwrap();
        let open = markets.iter().find(|m| m.is_open()).unwrap();
        assert_eq!(open.yes_pool, Decimal::new(1505, 1));
        assert_eq!(open.no_pool, Decimal::from(100));

        let resolved = markets.iter().find(|m| !m.is_open()).unwrap();
        assert_eq!(resolved.winning_side, Some(Side::Yes));

        assert_eq!(
            store.reward_balance("GALICE").await.unwrap(),
            Decimal::new(1_333_333_333, 7)
        );
    }

    #[tokio::test]
    async fn test_import_rejects_negative_amount() {
        let store = Store::Memory(MemoryStore::new());
        let snapshot = parse_snapshot(
            r#"{
                "localPredictions": [
                    { "id": 1, "question": "Will the import fail?", "creator": "GC", "unlock_time": 4102444800 }
                ],
                "localStakes": { "1": [ { "user": "GNEG", "choice": true, "amount": -5 } ] }
            }"#,
        )
        .unwrap();

        let err = import_snapshot(&store, &snapshot, UnitScale::default())
            .await
            .unwrap_err();
        match err {
            MarketError::Settlement(SettlementError::InvalidStake { staker, reason }) => {
                assert_eq!(staker, "GNEG");
                assert_eq!(reason, AmountError::Negative);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.list_markets().await.unwrap().is_empty());
    }
}
