use crate::domain::equity::Equity;
use crate::domain::recommendation::{Advice, RecommendationType};
use crate::scoring::Scorer;
use rand::Rng;

/// Deterministic-shape, randomized-parameter scoring over the 24h percent
/// price change. The shape (branch thresholds, base values, jitter ranges)
/// is fixed; only the draws vary between runs.
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn score_one(equity: &Equity, rng: &mut impl Rng) -> Advice {
        let change = equity.price_change_24h;

        let (recommendation_type, confidence, multiplier, reasoning): (_, f64, f64, _) = if change > 2.0 {
            let t = if rng.gen_bool(0.7) {
                RecommendationType::Buy
            } else {
                RecommendationType::Watch
            };
            (
                t,
                0.75 + rng.gen_range(0.0..0.2),
                1.05 + rng.gen_range(0.0..0.15),
                format!(
                    "{} gained {change:.2}% over the last 24h; momentum supports accumulation.",
                    equity.symbol
                ),
            )
        } else if change < -2.0 {
            let t = if rng.gen_bool(0.5) {
                RecommendationType::Buy
            } else {
                RecommendationType::Watch
            };
            (
                t,
                0.65 + rng.gen_range(0.0..0.25),
                1.10 + rng.gen_range(0.0..0.20),
                format!(
                    "{} dropped {change:.2}% over the last 24h; the pullback may be a value entry.",
                    equity.symbol
                ),
            )
        } else {
            let t = if rng.gen_bool(0.4) {
                RecommendationType::Hold
            } else {
                RecommendationType::Watch
            };
            (
                t,
                0.60 + rng.gen_range(0.0..0.30),
                1.02 + rng.gen_range(0.0..0.08),
                format!(
                    "{} moved {change:.2}% over the last 24h; no strong directional signal.",
                    equity.symbol
                ),
            )
        };

        Advice {
            symbol: equity.symbol.clone(),
            recommendation_type,
            confidence_score: confidence.min(1.0),
            target_price: equity.current_price * multiplier,
            reasoning,
        }
    }
}

#[async_trait::async_trait]
impl Scorer for HeuristicScorer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn score_batch(&self, equities: &[Equity]) -> anyhow::Result<Vec<Advice>> {
        let mut rng = rand::thread_rng();
        Ok(equities
            .iter()
            .map(|e| Self::score_one(e, &mut rng))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn equity(change: f64, price: f64) -> Equity {
        Equity {
            id: Uuid::new_v4(),
            symbol: "TEST".to_string(),
            name: "Test Corp".to_string(),
            sector: "Technology".to_string(),
            current_price: price,
            price_change_24h: change,
            volume: 1_000_000,
            market_cap: 1_000_000_000,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn strong_gainers_get_buy_or_watch_with_high_confidence() {
        let e = equity(3.5, 100.0);
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let advice = HeuristicScorer::score_one(&e, &mut rng);
            assert!(matches!(
                advice.recommendation_type,
                RecommendationType::Buy | RecommendationType::Watch
            ));
            assert!(advice.confidence_score >= 0.75 && advice.confidence_score <= 0.95);
            assert!(advice.target_price >= 105.0 && advice.target_price <= 120.0);
            assert!(advice.reasoning.contains("3.50%"));
        }
    }

    #[test]
    fn sharp_decliners_get_buy_or_watch_with_recovery_targets() {
        let e = equity(-4.2, 50.0);
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let advice = HeuristicScorer::score_one(&e, &mut rng);
            assert!(matches!(
                advice.recommendation_type,
                RecommendationType::Buy | RecommendationType::Watch
            ));
            assert!(advice.confidence_score >= 0.65 && advice.confidence_score <= 0.90);
            assert!(advice.target_price >= 55.0 && advice.target_price <= 65.0);
        }
    }

    #[test]
    fn flat_movers_get_hold_or_watch() {
        let e = equity(0.3, 200.0);
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let advice = HeuristicScorer::score_one(&e, &mut rng);
            assert!(matches!(
                advice.recommendation_type,
                RecommendationType::Hold | RecommendationType::Watch
            ));
            assert!(advice.confidence_score >= 0.60 && advice.confidence_score <= 0.90);
            assert!(advice.target_price >= 204.0 && advice.target_price <= 220.0);
        }
    }

    #[test]
    fn confidence_never_exceeds_one() {
        let e = equity(5.0, 10.0);
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let advice = HeuristicScorer::score_one(&e, &mut rng);
            assert!(advice.confidence_score <= 1.0);
        }
    }

    #[tokio::test]
    async fn scores_one_advice_per_equity() {
        let batch = vec![equity(3.0, 100.0), equity(-3.0, 50.0), equity(0.0, 10.0)];
        let advices = HeuristicScorer.score_batch(&batch).await.unwrap();
        assert_eq!(advices.len(), 3);
    }
}
