use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WatchlistItem {
    pub id: Uuid,
    pub stock_id: Uuid,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub price_change_24h: f64,
    pub created_at: DateTime<Utc>,
}

/// Returns false when the (user, equity) pair already exists.
pub async fn add(pool: &sqlx::PgPool, user_id: Uuid, stock_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "INSERT INTO watchlist_entries (user_id, stock_id) \
         VALUES ($1, $2) \
         ON CONFLICT (user_id, stock_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(stock_id)
    .execute(pool)
    .await
    .context("insert watchlist entry failed")?;

    Ok(res.rows_affected() > 0)
}

pub async fn remove(pool: &sqlx::PgPool, user_id: Uuid, stock_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM watchlist_entries WHERE user_id = $1 AND stock_id = $2")
        .bind(user_id)
        .bind(stock_id)
        .execute(pool)
        .await
        .context("delete watchlist entry failed")?;

    Ok(res.rows_affected() > 0)
}

pub async fn list_for_user(
    pool: &sqlx::PgPool,
    user_id: Uuid,
) -> anyhow::Result<Vec<WatchlistItem>> {
    sqlx::query_as::<_, WatchlistItem>(
        "SELECT w.id, w.stock_id, e.symbol, e.name, e.current_price, e.price_change_24h, w.created_at \
         FROM watchlist_entries w \
         JOIN equities e ON e.id = w.stock_id \
         WHERE w.user_id = $1 \
         ORDER BY w.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("list watchlist failed")
}
