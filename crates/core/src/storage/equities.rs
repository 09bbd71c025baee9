use crate::domain::equity::{Equity, NewEquity};
use crate::scoring::BatchPick;
use anyhow::Context;

/// Wholesale catalog replacement inside one transaction, so readers never
/// observe the empty intermediate state and the FK cascade clears stale
/// recommendations atomically with the equities they reference.
pub async fn replace_all(pool: &sqlx::PgPool, items: &[NewEquity]) -> anyhow::Result<u64> {
    anyhow::ensure!(!items.is_empty(), "items must be non-empty");

    // Duplicate symbols within one upload collapse to the last occurrence;
    // a multi-row insert must not touch the same unique key twice.
    let items = dedupe_by_symbol(items);

    let mut tx = pool.begin().await.context("begin transaction failed")?;

    sqlx::query("DELETE FROM equities")
        .execute(&mut *tx)
        .await
        .context("delete equities failed")?;

    let mut qb = sqlx::QueryBuilder::new(
        "INSERT INTO equities (symbol, name, sector, current_price, price_change_24h, volume, market_cap, last_updated) ",
    );
    qb.push_values(&items, |mut b, item| {
        b.push_bind(item.symbol.trim())
            .push_bind(item.name.trim())
            .push_bind(item.sector.trim())
            .push_bind(item.current_price)
            .push_bind(item.price_change_24h)
            .push_bind(item.volume)
            .push_bind(item.market_cap)
            .push_bind(chrono::Utc::now());
    });

    let res = qb
        .build()
        .persistent(false)
        .execute(&mut *tx)
        .await
        .context("bulk insert equities failed")?;

    tx.commit().await.context("commit transaction failed")?;
    Ok(res.rows_affected())
}

fn dedupe_by_symbol(items: &[NewEquity]) -> Vec<NewEquity> {
    let mut index: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    let mut out: Vec<NewEquity> = Vec::with_capacity(items.len());
    for item in items {
        match index.get(item.symbol.as_str()) {
            Some(&i) => out[i] = item.clone(),
            None => {
                index.insert(item.symbol.as_str(), out.len());
                out.push(item.clone());
            }
        }
    }
    out
}

pub async fn list(pool: &sqlx::PgPool) -> anyhow::Result<Vec<Equity>> {
    sqlx::query_as::<_, Equity>(
        "SELECT id, symbol, name, sector, current_price, price_change_24h, volume, market_cap, last_updated \
         FROM equities \
         ORDER BY symbol ASC",
    )
    .fetch_all(pool)
    .await
    .context("list equities failed")
}

pub async fn select_batch(
    pool: &sqlx::PgPool,
    pick: BatchPick,
    limit: usize,
) -> anyhow::Result<Vec<Equity>> {
    anyhow::ensure!(limit >= 1, "batch limit must be >= 1");

    let order = match pick {
        BatchPick::First => "symbol ASC",
        BatchPick::Random => "random()",
        BatchPick::TopMarketCap => "market_cap DESC, symbol ASC",
    };

    let sql = format!(
        "SELECT id, symbol, name, sector, current_price, price_change_24h, volume, market_cap, last_updated \
         FROM equities \
         ORDER BY {order} \
         LIMIT $1"
    );

    sqlx::query_as::<_, Equity>(&sql)
        .persistent(false)
        .bind(limit as i64)
        .fetch_all(pool)
        .await
        .context("select scoring batch failed")
}

pub async fn by_symbols(pool: &sqlx::PgPool, symbols: &[&str]) -> anyhow::Result<Vec<Equity>> {
    let symbols: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
    sqlx::query_as::<_, Equity>(
        "SELECT id, symbol, name, sector, current_price, price_change_24h, volume, market_cap, last_updated \
         FROM equities \
         WHERE symbol = ANY($1) \
         ORDER BY symbol ASC",
    )
    .bind(&symbols)
    .fetch_all(pool)
    .await
    .context("fetch equities by symbol failed")
}

pub async fn find_by_symbol(
    pool: &sqlx::PgPool,
    symbol: &str,
) -> anyhow::Result<Option<Equity>> {
    sqlx::query_as::<_, Equity>(
        "SELECT id, symbol, name, sector, current_price, price_change_24h, volume, market_cap, last_updated \
         FROM equities \
         WHERE symbol = $1",
    )
    .bind(symbol.trim().to_uppercase())
    .fetch_optional(pool)
    .await
    .context("fetch equity by symbol failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_last_occurrence_in_first_position() {
        let mut a = NewEquity::new("AAPL", "Apple");
        a.current_price = 100.0;
        let b = NewEquity::new("MSFT", "Microsoft");
        let mut a2 = NewEquity::new("AAPL", "Apple Inc.");
        a2.current_price = 175.0;

        let out = dedupe_by_symbol(&[a, b, a2]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].symbol, "AAPL");
        assert_eq!(out[0].name, "Apple Inc.");
        assert_eq!(out[0].current_price, 175.0);
        assert_eq!(out[1].symbol, "MSFT");
    }
}
