use crate::domain::equity::Equity;
use crate::domain::recommendation::NewRecommendation;
use crate::ingest::{catalog, csv};
use crate::scoring::{heuristic::HeuristicScorer, Scorer, ScoringOptions};
use crate::storage;
use serde::Serialize;
use std::collections::HashMap;

/// The shape every externally invocable action reports back: a success flag,
/// a human-readable message, and an affected-row count.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub count: u64,
}

impl ActionOutcome {
    fn ok(message: impl Into<String>, count: u64) -> Self {
        Self {
            success: true,
            message: message.into(),
            count,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            count: 0,
        }
    }
}

/// Replaces the equity catalog with the fixed reference list, then re-scores
/// the featured subset with the heuristic scorer.
pub async fn import_catalog(pool: &sqlx::PgPool) -> anyhow::Result<ActionOutcome> {
    let items = catalog::fixed_catalog();
    let count = storage::equities::replace_all(pool, &items).await?;
    tracing::info!(count, "equity catalog replaced from fixed list");

    let featured = storage::equities::by_symbols(pool, &catalog::FEATURED_SYMBOLS).await?;
    let scored = score_and_store(pool, &HeuristicScorer, &featured).await?;

    Ok(ActionOutcome::ok(
        format!("Imported {count} stocks and scored {scored} featured symbols"),
        count,
    ))
}

/// Parses uploaded delimited text and, when it yields at least one valid row,
/// wholesale-replaces the equity catalog. An upload with zero valid rows is
/// rejected without touching the store.
pub async fn ingest_csv(pool: &sqlx::PgPool, text: &str) -> anyhow::Result<ActionOutcome> {
    let rows = csv::parse_equities(text);
    if rows.is_empty() {
        tracing::warn!("CSV upload contained no valid data rows");
        return Ok(ActionOutcome::rejected(
            "No valid data rows found in the uploaded file",
        ));
    }

    let count = storage::equities::replace_all(pool, &rows).await?;
    tracing::info!(count, "equity catalog replaced from CSV upload");
    Ok(ActionOutcome::ok(format!("Imported {count} stocks"), count))
}

/// Scores a batch selected from the stored catalog and wholesale-replaces the
/// recommendation store. An empty catalog is a rejection, not an error.
pub async fn generate_recommendations(
    pool: &sqlx::PgPool,
    scorer: &dyn Scorer,
    options: &ScoringOptions,
) -> anyhow::Result<ActionOutcome> {
    let batch = storage::equities::select_batch(pool, options.pick, options.limit).await?;
    if batch.is_empty() {
        return Ok(ActionOutcome::rejected(
            "No stocks available to analyze; import data first",
        ));
    }

    let count = score_and_store(pool, scorer, &batch).await?;
    Ok(ActionOutcome::ok(
        format!("Generated {count} recommendations"),
        count,
    ))
}

/// The single score-clamp-persist path shared by both scorer strategies and
/// by the catalog importer's featured re-score.
async fn score_and_store(
    pool: &sqlx::PgPool,
    scorer: &dyn Scorer,
    batch: &[Equity],
) -> anyhow::Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }

    let advices = match scorer.score_batch(batch).await {
        Ok(advices) => advices,
        Err(err) => {
            if let Err(audit_err) = storage::recommendations::record_run(
                pool,
                scorer.name(),
                "error",
                Some(&format!("{err:#}")),
                0,
            )
            .await
            {
                tracing::warn!(error = %audit_err, "failed to record scoring run audit row");
            }
            return Err(err);
        }
    };

    let ids_by_symbol: HashMap<&str, uuid::Uuid> = batch
        .iter()
        .map(|e| (e.symbol.as_str(), e.id))
        .collect();

    let created_at = chrono::Utc::now();
    let mut recs = Vec::with_capacity(advices.len());
    for advice in advices {
        let Some(&stock_id) = ids_by_symbol.get(advice.symbol.as_str()) else {
            tracing::warn!(symbol = %advice.symbol, "advice for unknown symbol dropped");
            continue;
        };
        recs.push(NewRecommendation::from_advice(stock_id, advice, created_at));
    }

    if recs.is_empty() {
        if let Err(audit_err) = storage::recommendations::record_run(
            pool,
            scorer.name(),
            "error",
            Some("scorer produced no persistable advice"),
            0,
        )
        .await
        {
            tracing::warn!(error = %audit_err, "failed to record scoring run audit row");
        }
        anyhow::bail!("scorer produced no persistable advice");
    }

    let written = storage::recommendations::replace_all(pool, &recs).await?;
    storage::recommendations::record_run(pool, scorer.name(), "success", None, written as u32)
        .await?;

    tracing::info!(written, scorer = scorer.name(), "recommendation store replaced");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_flat_fields() {
        let out = ActionOutcome::ok("Imported 15 stocks", 15);
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["count"], 15);
        assert_eq!(v["message"], "Imported 15 stocks");
    }

    #[test]
    fn rejection_carries_zero_count() {
        let out = ActionOutcome::rejected("no valid data");
        assert!(!out.success);
        assert_eq!(out.count, 0);
    }
}
