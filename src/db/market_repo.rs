use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::models::{Market, MarketStats, MarketStatus, NewMarket, Side};

/// Database row for the markets table.
#[derive(Debug, sqlx::FromRow)]
struct MarketRow {
    id: i64,
    creator: String,
    question: String,
    category: String,
    unlock_time: DateTime<Utc>,
    status: String,
    winning_side: Option<bool>,
    yes_pool: Decimal,
    no_pool: Decimal,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<MarketRow> for Market {
    type Error = anyhow::Error;

    fn try_from(row: MarketRow) -> Result<Self, Self::Error> {
        let status = MarketStatus::from_db_str(&row.status)
            .ok_or_else(|| anyhow::anyhow!("market {} has unknown status {:?}", row.id, row.status))?;

        Ok(Market {
            id: row.id,
            creator: row.creator,
            question: row.question,
            category: row.category,
            unlock_time: row.unlock_time,
            status,
            winning_side: row.winning_side.map(Side::from),
            yes_pool: row.yes_pool,
            no_pool: row.no_pool,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

/// Insert a freshly validated market.
pub async fn insert_market(pool: &PgPool, new: &NewMarket) -> anyhow::Result<Market> {
    let mut conn = pool.acquire().await?;
    insert_market_in(&mut conn, new).await
}

/// Same as [`insert_market`], on a connection or open transaction.
pub async fn insert_market_in(conn: &mut PgConnection, new: &NewMarket) -> anyhow::Result<Market> {
    let row = sqlx::query_as::<_, MarketRow>(
        r#"
        INSERT INTO markets (creator, question, category, unlock_time)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&new.creator)
    .bind(&new.question)
    .bind(&new.category)
    .bind(new.unlock_time)
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

/// Insert a market carried over from another store, keeping its status,
/// outcome and timestamps. The id is reassigned.
pub async fn insert_restored_market(
    conn: &mut PgConnection,
    market: &Market,
) -> anyhow::Result<Market> {
    let row = sqlx::query_as::<_, MarketRow>(
        r#"
        INSERT INTO markets
            (creator, question, category, unlock_time, status, winning_side,
             yes_pool, no_pool, created_at, resolved_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(&market.creator)
    .bind(&market.question)
    .bind(&market.category)
    .bind(market.unlock_time)
    .bind(market.status.as_str())
    .bind(market.winning_side.map(Side::is_yes))
    .bind(market.yes_pool)
    .bind(market.no_pool)
    .bind(market.created_at)
    .bind(market.resolved_at)
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

pub async fn get_market(pool: &PgPool, id: i64) -> anyhow::Result<Option<Market>> {
    let row = sqlx::query_as::<_, MarketRow>("SELECT * FROM markets WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Market::try_from).transpose()
}

/// Fetch a market and hold a row lock on it until the transaction ends.
pub async fn lock_market(conn: &mut PgConnection, id: i64) -> anyhow::Result<Option<Market>> {
    let row = sqlx::query_as::<_, MarketRow>("SELECT * FROM markets WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(Market::try_from).transpose()
}

pub async fn list_markets(pool: &PgPool) -> anyhow::Result<Vec<Market>> {
    let rows = sqlx::query_as::<_, MarketRow>("SELECT * FROM markets ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Market::try_from).collect()
}

/// Open markets whose unlock time has passed.
pub async fn get_unlocked_open_markets(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<Market>> {
    let rows = sqlx::query_as::<_, MarketRow>(
        "SELECT * FROM markets WHERE status = 'open' AND unlock_time <= $1 ORDER BY unlock_time",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Market::try_from).collect()
}

pub async fn get_stats(pool: &PgPool) -> anyhow::Result<MarketStats> {
    let row: (i64, i64, i64, Option<Decimal>) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE status = 'open'),
            COUNT(*) FILTER (WHERE status = 'resolved'),
            SUM(yes_pool + no_pool)
        FROM markets
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(MarketStats {
        total_markets: row.0,
        open_markets: row.1,
        resolved_markets: row.2,
        total_volume: row.3.unwrap_or(Decimal::ZERO),
    })
}

/// Add to one side's pool.
pub async fn add_to_pool(
    conn: &mut PgConnection,
    id: i64,
    side: Side,
    amount: Decimal,
) -> anyhow::Result<Market> {
    let sql = match side {
        Side::Yes => "UPDATE markets SET yes_pool = yes_pool + $2 WHERE id = $1 RETURNING *",
        Side::No => "UPDATE markets SET no_pool = no_pool + $2 WHERE id = $1 RETURNING *",
    };
    let row = sqlx::query_as::<_, MarketRow>(sql)
        .bind(id)
        .bind(amount)
        .fetch_one(&mut *conn)
        .await?;

    row.try_into()
}

/// Persist the `Open -> Resolved` transition.
pub async fn mark_resolved(conn: &mut PgConnection, market: &Market) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE markets
        SET status = $2, winning_side = $3, resolved_at = $4
        WHERE id = $1 AND status = 'open'
        "#,
    )
    .bind(market.id)
    .bind(market.status.as_str())
    .bind(market.winning_side.map(Side::is_yes))
    .bind(market.resolved_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
