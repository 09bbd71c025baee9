use crate::domain::recommendation::{Advice, RecommendationType};
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The JSON array shape the model is asked to emit, one entry per analyzed
/// equity. Deserialization already rejects unknown recommendation types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAdviceItem {
    pub symbol: String,
    pub recommendation_type: RecommendationType,
    pub confidence_score: f64,
    pub target_price: f64,
    pub reasoning: String,
}

/// Strict validation of model output against the input batch: any entry with
/// a symbol outside the batch, a duplicate symbol, a non-finite number, or
/// empty reasoning rejects the whole response. Batch symbols the model did
/// not cover are allowed; callers fill them from the fallback scorer.
pub fn validate_llm_advices(
    items: Vec<LlmAdviceItem>,
    batch_symbols: &BTreeSet<String>,
) -> anyhow::Result<Vec<Advice>> {
    ensure!(!items.is_empty(), "LLM output contains no advice entries");

    let mut seen = BTreeSet::<String>::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let symbol = item.symbol.trim().to_string();
        ensure!(!symbol.is_empty(), "advice symbol must be non-empty");
        ensure!(
            batch_symbols.contains(&symbol),
            "advice symbol {symbol} is not in the input batch"
        );
        ensure!(seen.insert(symbol.clone()), "duplicate advice symbol: {symbol}");

        ensure!(
            item.confidence_score.is_finite(),
            "confidence_score for {symbol} is not a finite number"
        );
        ensure!(
            item.target_price.is_finite(),
            "target_price for {symbol} is not a finite number"
        );

        let reasoning = item.reasoning.trim().to_string();
        ensure!(!reasoning.is_empty(), "reasoning for {symbol} must be non-empty");

        out.push(Advice {
            symbol,
            recommendation_type: item.recommendation_type,
            confidence_score: item.confidence_score,
            target_price: item.target_price,
            reasoning,
        });
    }

    Ok(out)
}
