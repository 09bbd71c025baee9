use crate::domain::contract::validate_llm_advices;
use crate::domain::equity::Equity;
use crate::domain::recommendation::Advice;
use crate::llm::error::{LlmDiagnosticsError, STAGE_PARSE, STAGE_VALIDATE};
use crate::llm::{json, CompletionClient};
use crate::scoring::{heuristic::HeuristicScorer, Scorer};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};

/// Delegates scoring to a text-completion endpoint. Any failure along the way
/// (HTTP, extraction, parsing, strict validation) falls back to the heuristic
/// scorer for the whole batch; symbols a valid response did not cover are
/// heuristic-filled individually.
pub struct LlmScorer {
    client: Box<dyn CompletionClient>,
}

impl LlmScorer {
    pub fn new(client: Box<dyn CompletionClient>) -> Self {
        Self { client }
    }

    fn system_prompt() -> String {
        [
            "You are a stock analysis engine.",
            "Return ONLY a JSON array. Do not wrap it in markdown. No extra keys, no prose.",
            "Each element must be:",
            "{",
            "  \"symbol\": \"AAPL\",",
            "  \"recommendation_type\": \"buy\",",
            "  \"confidence_score\": 0.0,",
            "  \"target_price\": 0.0,",
            "  \"reasoning\": \"one or two sentences\"",
            "}",
            "Rules:",
            "- recommendation_type must be one of: buy, sell, hold, watch",
            "- confidence_score must be in [0, 1]",
            "- target_price must be >= 0",
            "- use only the provided symbols, at most one entry per symbol",
        ]
        .join("\n")
    }

    fn user_prompt(equities: &[Equity]) -> String {
        let candidates: Vec<_> = equities
            .iter()
            .map(|e| {
                json!({
                    "symbol": e.symbol,
                    "name": e.name,
                    "sector": e.sector,
                    "current_price": e.current_price,
                    "price_change_24h": e.price_change_24h,
                    "volume": e.volume,
                    "market_cap": e.market_cap,
                })
            })
            .collect();

        format!(
            "Task: produce a buy/sell/hold/watch recommendation for every stock below.\n\nStocks JSON:\n{}",
            serde_json::Value::Array(candidates)
        )
    }

    async fn score_via_llm(&self, equities: &[Equity]) -> anyhow::Result<Vec<Advice>> {
        let text = self
            .client
            .complete(&Self::system_prompt(), &Self::user_prompt(equities))
            .await?;

        let items = json::parse_advices(&text).map_err(|err| {
            anyhow::Error::from(LlmDiagnosticsError {
                provider: self.client.provider(),
                stage: STAGE_PARSE,
                detail: format!("{err:#}"),
                raw_output: Some(text.clone()),
            })
        })?;

        let batch_symbols: BTreeSet<String> =
            equities.iter().map(|e| e.symbol.clone()).collect();
        validate_llm_advices(items, &batch_symbols).map_err(|err| {
            LlmDiagnosticsError {
                provider: self.client.provider(),
                stage: STAGE_VALIDATE,
                detail: format!("{err:#}"),
                raw_output: Some(text),
            }
            .into()
        })
    }
}

#[async_trait::async_trait]
impl Scorer for LlmScorer {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn score_batch(&self, equities: &[Equity]) -> anyhow::Result<Vec<Advice>> {
        match self.score_via_llm(equities).await {
            Ok(advices) => {
                let mut by_symbol: HashMap<String, Advice> = advices
                    .into_iter()
                    .map(|a| (a.symbol.clone(), a))
                    .collect();

                // Heuristic-fill any batch symbols the model skipped, keeping
                // batch order in the output.
                let mut rng = rand::thread_rng();
                let mut out = Vec::with_capacity(equities.len());
                for equity in equities {
                    match by_symbol.remove(&equity.symbol) {
                        Some(advice) => out.push(advice),
                        None => {
                            tracing::warn!(
                                symbol = %equity.symbol,
                                "LLM response skipped symbol; using heuristic advice"
                            );
                            out.push(HeuristicScorer::score_one(equity, &mut rng));
                        }
                    }
                }
                Ok(out)
            }
            Err(err) => {
                let stage = err
                    .downcast_ref::<LlmDiagnosticsError>()
                    .map(|d| d.stage)
                    .unwrap_or("unknown");
                tracing::warn!(
                    stage,
                    error = %err,
                    "LLM scoring failed; falling back to heuristic scorer"
                );
                HeuristicScorer.score_batch(equities).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::RecommendationType;
    use crate::llm::Provider;
    use chrono::Utc;
    use uuid::Uuid;

    struct CannedClient {
        response: anyhow::Result<String>,
    }

    #[async_trait::async_trait]
    impl CompletionClient for CannedClient {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            match &self.response {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(anyhow::anyhow!("{e:#}")),
            }
        }
    }

    fn equity(symbol: &str, change: f64) -> Equity {
        Equity {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            name: format!("{symbol} Corp"),
            sector: "Technology".to_string(),
            current_price: 100.0,
            price_change_24h: change,
            volume: 1_000_000,
            market_cap: 1_000_000_000,
            last_updated: Utc::now(),
        }
    }

    fn advice_json(symbol: &str) -> serde_json::Value {
        json!({
            "symbol": symbol,
            "recommendation_type": "buy",
            "confidence_score": 0.8,
            "target_price": 120.0,
            "reasoning": "model says so"
        })
    }

    #[tokio::test]
    async fn valid_response_is_used_as_is() {
        let scorer = LlmScorer::new(Box::new(CannedClient {
            response: Ok(json!([advice_json("AAPL"), advice_json("MSFT")]).to_string()),
        }));
        let batch = vec![equity("AAPL", 1.0), equity("MSFT", 1.0)];
        let out = scorer.score_batch(&batch).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].recommendation_type, RecommendationType::Buy);
        assert_eq!(out[0].reasoning, "model says so");
    }

    #[tokio::test]
    async fn skipped_symbols_are_heuristic_filled_in_batch_order() {
        let scorer = LlmScorer::new(Box::new(CannedClient {
            response: Ok(json!([advice_json("MSFT")]).to_string()),
        }));
        let batch = vec![equity("AAPL", 3.5), equity("MSFT", 1.0)];
        let out = scorer.score_batch(&batch).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].symbol, "AAPL");
        assert_ne!(out[0].reasoning, "model says so");
        assert_eq!(out[1].reasoning, "model says so");
    }

    #[tokio::test]
    async fn unknown_symbol_rejects_the_response_and_falls_back() {
        let scorer = LlmScorer::new(Box::new(CannedClient {
            response: Ok(json!([advice_json("TSLA")]).to_string()),
        }));
        let batch = vec![equity("AAPL", 3.5)];
        let out = scorer.score_batch(&batch).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].symbol, "AAPL");
        assert_ne!(out[0].reasoning, "model says so");
    }

    #[tokio::test]
    async fn http_failure_falls_back_to_heuristic() {
        let scorer = LlmScorer::new(Box::new(CannedClient {
            response: Err(anyhow::anyhow!("status=429")),
        }));
        let batch = vec![equity("AAPL", 0.5), equity("MSFT", -3.0)];
        let out = scorer.score_batch(&batch).await.unwrap();
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn prose_only_response_falls_back_to_heuristic() {
        let scorer = LlmScorer::new(Box::new(CannedClient {
            response: Ok("I'm sorry, I can't help with that.".to_string()),
        }));
        let batch = vec![equity("AAPL", 0.5)];
        let out = scorer.score_batch(&batch).await.unwrap();
        assert_eq!(out.len(), 1);
    }
}
