use chrono::Utc;
use sqlx::{PgConnection, PgPool};

use crate::db::{market_repo, reward_repo, stake_repo};
use crate::market::{lifecycle, MarketError};
use crate::models::Side;
use crate::settlement::{Distribution, SettlementEngine, SettlementReport};

/// Resolve a market and apply its payouts in a single transaction.
///
/// Order inside the transaction: lock market row, check it is open, snapshot
/// stakes, compute payouts, mark resolved, credit the ledger, drop the stakes,
/// record the settlement. Any error rolls the whole thing back.
pub async fn settle_market(
    pool: &PgPool,
    market_id: i64,
    winning_side: Side,
    engine: &SettlementEngine,
) -> Result<SettlementReport, MarketError> {
    let mut tx = pool.begin().await.map_err(anyhow::Error::from)?;

    let mut market = market_repo::lock_market(&mut tx, market_id)
        .await?
        .ok_or(MarketError::NotFound(market_id))?;
    lifecycle::check_settleable(&market)?;

    let stakes = stake_repo::get_stakes_in(&mut tx, market_id).await?;
    let settlement = engine.settle(&stakes, winning_side, &market.creator)?;

    lifecycle::mark_resolved(&mut market, winning_side, Utc::now())?;
    market_repo::mark_resolved(&mut tx, &market).await?;
    reward_repo::credit_payouts(&mut tx, &settlement.payouts).await?;
    stake_repo::delete_stakes_for_market(&mut tx, market_id).await?;

    let report = SettlementReport::new(market_id, settlement);
    insert_settlement(&mut tx, &report).await?;

    tx.commit().await.map_err(anyhow::Error::from)?;
    Ok(report)
}

async fn insert_settlement(conn: &mut PgConnection, report: &SettlementReport) -> anyhow::Result<()> {
    let distribution = match report.settlement.distribution {
        Distribution::Empty => "empty",
        Distribution::Proportional => "proportional",
        Distribution::Fallback => "fallback",
    };

    sqlx::query(
        r#"
        INSERT INTO settlements
            (id, market_id, winning_side, distribution, total_pool, winner_pool, settled_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(report.settlement_id)
    .bind(report.market_id)
    .bind(report.settlement.winning_side.is_yes())
    .bind(distribution)
    .bind(report.settlement.total_pool)
    .bind(report.settlement.winner_pool)
    .bind(report.settled_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
