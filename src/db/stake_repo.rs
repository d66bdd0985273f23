use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::db::market_repo;
use crate::market::{MarketError, MarketRules};
use crate::models::{Market, NewMarket, Side, Stake};

/// Database row for the stakes table.
#[derive(Debug, sqlx::FromRow)]
struct StakeRow {
    staker: String,
    choice: bool,
    amount: Decimal,
    staked_at: DateTime<Utc>,
}

impl From<StakeRow> for Stake {
    fn from(row: StakeRow) -> Self {
        Stake {
            staker: row.staker,
            side: Side::from(row.choice),
            amount: row.amount,
            staked_at: row.staked_at,
        }
    }
}

pub async fn get_stakes_for_market(pool: &PgPool, market_id: i64) -> anyhow::Result<Vec<Stake>> {
    let mut conn = pool.acquire().await?;
    get_stakes_in(&mut conn, market_id).await
}

pub(crate) async fn get_stakes_in(
    conn: &mut PgConnection,
    market_id: i64,
) -> anyhow::Result<Vec<Stake>> {
    let rows = sqlx::query_as::<_, StakeRow>(
        "SELECT staker, choice, amount, staked_at FROM stakes WHERE market_id = $1 ORDER BY id",
    )
    .bind(market_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Stake::from).collect())
}

pub(crate) async fn insert_stake(
    conn: &mut PgConnection,
    market_id: i64,
    stake: &Stake,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stakes (market_id, staker, choice, amount, staked_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(market_id)
    .bind(&stake.staker)
    .bind(stake.side.is_yes())
    .bind(stake.amount)
    .bind(stake.staked_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Record a stake and grow the market's pool in one transaction.
///
/// The market row stays locked from the status check to the commit, so a
/// concurrent settlement cannot slip in between.
pub async fn place_stake(
    pool: &PgPool,
    market_id: i64,
    stake: &Stake,
    rules: &MarketRules,
) -> Result<Market, MarketError> {
    let mut tx = pool.begin().await.map_err(anyhow::Error::from)?;

    let market = market_repo::lock_market(&mut tx, market_id)
        .await?
        .ok_or(MarketError::NotFound(market_id))?;
    rules.check_stake(&market, &stake.staker, stake.amount, stake.staked_at)?;

    insert_stake(&mut tx, market_id, stake).await?;
    let market = market_repo::add_to_pool(&mut tx, market_id, stake.side, stake.amount).await?;

    tx.commit().await.map_err(anyhow::Error::from)?;
    Ok(market)
}

/// Create a market and its creator's first stake in one transaction.
/// A rejected stake rolls the market back.
pub async fn create_market_with_stake(
    pool: &PgPool,
    new: &NewMarket,
    stake: &Stake,
    rules: &MarketRules,
) -> Result<Market, MarketError> {
    let mut tx = pool.begin().await.map_err(anyhow::Error::from)?;

    let market = market_repo::insert_market_in(&mut tx, new).await?;
    rules.check_stake(&market, &stake.staker, stake.amount, stake.staked_at)?;

    insert_stake(&mut tx, market.id, stake).await?;
    let market = market_repo::add_to_pool(&mut tx, market.id, stake.side, stake.amount).await?;

    tx.commit().await.map_err(anyhow::Error::from)?;
    Ok(market)
}

pub(crate) async fn delete_stakes_for_market(
    conn: &mut PgConnection,
    market_id: i64,
) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM stakes WHERE market_id = $1")
        .bind(market_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
