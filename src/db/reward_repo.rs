use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

/// Claimable balance for a staker (zero when there is no row).
pub async fn get_balance(pool: &PgPool, staker: &str) -> anyhow::Result<Decimal> {
    let row: Option<(Decimal,)> = sqlx::query_as("SELECT balance FROM rewards WHERE staker = $1")
        .bind(staker)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.0).unwrap_or(Decimal::ZERO))
}

/// Add every payout to the ledger. Each row is incremented in place, so
/// concurrent settlements crediting the same staker do not lose updates.
pub async fn credit_payouts(
    conn: &mut PgConnection,
    payouts: &BTreeMap<String, Decimal>,
) -> anyhow::Result<()> {
    for (staker, amount) in payouts {
        if *amount <= Decimal::ZERO {
            continue;
        }
        sqlx::query(
            r#"
            INSERT INTO rewards (staker, balance, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (staker) DO UPDATE
                SET balance = rewards.balance + EXCLUDED.balance, updated_at = NOW()
            "#,
        )
        .bind(staker)
        .bind(amount)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Zero a staker's balance and return what it held.
pub async fn claim(pool: &PgPool, staker: &str) -> anyhow::Result<Decimal> {
    // DELETE ... RETURNING reads and clears the row atomically
    let row: Option<(Decimal,)> =
        sqlx::query_as("DELETE FROM rewards WHERE staker = $1 RETURNING balance")
            .bind(staker)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|r| r.0).unwrap_or(Decimal::ZERO))
}
