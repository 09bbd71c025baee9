pub mod heuristic;
pub mod llm;

use crate::config::Settings;
use crate::domain::equity::Equity;
use crate::domain::recommendation::Advice;
use anyhow::bail;

/// How the scoring batch is selected from the stored catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPick {
    First,
    Random,
    TopMarketCap,
}

impl BatchPick {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(Self::First),
            "random" => Ok(Self::Random),
            "top_market_cap" | "topmarketcap" => Ok(Self::TopMarketCap),
            other => bail!("unknown batch pick: {other} (expected first|random|top_market_cap)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoringOptions {
    /// Maximum number of equities scored per run.
    pub limit: usize,
    pub pick: BatchPick,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            pick: BatchPick::TopMarketCap,
        }
    }
}

impl ScoringOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("SCORE_BATCH_LIMIT") {
            if let Ok(n) = s.parse::<usize>() {
                if n >= 1 {
                    out.limit = n;
                }
            }
        }

        if let Ok(s) = std::env::var("SCORE_BATCH_PICK") {
            if let Ok(pick) = BatchPick::parse(&s) {
                out.pick = pick;
            }
        }

        out
    }
}

/// One polymorphic scoring capability with two implementations. Clamping and
/// persistence happen once, downstream in ops, regardless of implementation.
#[async_trait::async_trait]
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score_batch(&self, equities: &[Equity]) -> anyhow::Result<Vec<Advice>>;
}

pub fn scorer_from_settings(settings: &Settings) -> anyhow::Result<Box<dyn Scorer>> {
    match settings.scorer.as_deref().map(str::trim) {
        None | Some("") | Some("heuristic") => Ok(Box::new(heuristic::HeuristicScorer)),
        Some("llm") => {
            let client = crate::llm::anthropic::AnthropicClient::from_settings(settings)?;
            Ok(Box::new(llm::LlmScorer::new(Box::new(client))))
        }
        Some(other) => bail!("unknown SCORER value: {other} (expected heuristic|llm)"),
    }
}
