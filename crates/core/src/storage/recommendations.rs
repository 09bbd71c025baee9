use crate::domain::recommendation::{ActiveRecommendation, NewRecommendation};
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Wholesale replacement of the recommendation store: delete everything, then
/// insert one row per scored equity, in a single transaction.
pub async fn replace_all(
    pool: &sqlx::PgPool,
    recs: &[NewRecommendation],
) -> anyhow::Result<u64> {
    anyhow::ensure!(!recs.is_empty(), "recommendations must be non-empty");

    let mut tx = pool.begin().await.context("begin transaction failed")?;

    sqlx::query("DELETE FROM recommendations")
        .execute(&mut *tx)
        .await
        .context("delete recommendations failed")?;

    let mut qb = sqlx::QueryBuilder::new(
        "INSERT INTO recommendations (id, stock_id, recommendation_type, confidence_score, target_price, reasoning, created_at, expires_at) ",
    );
    qb.push_values(recs, |mut b, rec| {
        b.push_bind(Uuid::new_v4())
            .push_bind(rec.stock_id)
            .push_bind(rec.recommendation_type)
            .push_bind(rec.confidence_score)
            .push_bind(rec.target_price)
            .push_bind(rec.reasoning.as_str())
            .push_bind(rec.created_at)
            .push_bind(rec.expires_at);
    });

    let res = qb
        .build()
        .persistent(false)
        .execute(&mut *tx)
        .await
        .context("bulk insert recommendations failed")?;

    tx.commit().await.context("commit transaction failed")?;
    Ok(res.rows_affected())
}

/// Only unexpired rows are served; expiry is a soft delete by time, not a
/// scheduled purge.
pub async fn list_active(pool: &sqlx::PgPool) -> anyhow::Result<Vec<ActiveRecommendation>> {
    sqlx::query_as::<_, ActiveRecommendation>(
        "SELECT r.id, r.stock_id, e.symbol, e.name, r.recommendation_type, \
                r.confidence_score, r.target_price, r.reasoning, r.created_at, r.expires_at \
         FROM recommendations r \
         JOIN equities e ON e.id = r.stock_id \
         WHERE r.expires_at > now() \
         ORDER BY r.confidence_score DESC, e.symbol ASC",
    )
    .fetch_all(pool)
    .await
    .context("list active recommendations failed")
}

/// Audit row for every generation run, success or failure.
pub async fn record_run(
    pool: &sqlx::PgPool,
    scorer: &str,
    status: &str,
    error: Option<&str>,
    item_count: u32,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let generated_at: DateTime<Utc> = Utc::now();

    sqlx::query(
        "INSERT INTO scoring_runs (id, generated_at, scorer, status, error, item_count) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .persistent(false)
    .bind(id)
    .bind(generated_at)
    .bind(scorer)
    .bind(status)
    .bind(error)
    .bind(item_count as i32)
    .execute(pool)
    .await
    .context("insert scoring_runs failed")?;

    Ok(id)
}
