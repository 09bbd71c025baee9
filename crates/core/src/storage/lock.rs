use anyhow::Context;
use sqlx::pool::PoolConnection;
use sqlx::Postgres;

// Advisory locks are scoped to the Postgres session. Used as a best-effort
// guard against concurrent bulk-replace runs of the same operation.
const LOCK_NAMESPACE: i64 = 0x5354_4F43_4B57; // "STOCKW" as hex-ish namespace.

fn lock_key_for_op(op: &str) -> i64 {
    let mut h: i64 = 0;
    for b in op.bytes() {
        h = h.wrapping_mul(31).wrapping_add(b as i64);
    }
    LOCK_NAMESPACE ^ h
}

/// Holds an acquired advisory lock. The lock lives on the session of the
/// dedicated connection checked out at acquire time, so releasing must run
/// on that same connection; the guard enforces this by owning it. Unlocking
/// through the pool at large would land on an arbitrary session and no-op,
/// leaving the lock held by an idle pooled connection forever.
pub struct OpLock {
    conn: Option<PoolConnection<Postgres>>,
    key: i64,
}

/// Returns None when another session already holds the lock for `op`.
pub async fn try_acquire_op_lock(
    pool: &sqlx::PgPool,
    op: &str,
) -> anyhow::Result<Option<OpLock>> {
    let key = lock_key_for_op(op);
    let mut conn = pool
        .acquire()
        .await
        .context("checkout connection for advisory lock failed")?;

    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to acquire advisory lock (op={op}, key={key})"))?;

    if acquired.0 {
        Ok(Some(OpLock {
            conn: Some(conn),
            key,
        }))
    } else {
        Ok(None)
    }
}

impl OpLock {
    pub async fn release(mut self) -> anyhow::Result<()> {
        let key = self.key;
        if let Some(mut conn) = self.conn.take() {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .persistent(false)
                .bind(key)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("failed to release advisory lock (key={key})"))?;
        }
        Ok(())
    }
}

impl Drop for OpLock {
    fn drop(&mut self) {
        // A guard dropped without release() must not return a still-locked
        // connection to the pool; detaching closes the session, which makes
        // the server free the lock.
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}
