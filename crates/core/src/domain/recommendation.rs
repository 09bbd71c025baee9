use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recommendations expire a fixed week after creation; the read path only
/// returns rows whose expiry is still in the future.
pub const EXPIRY_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "recommendation_type", rename_all = "lowercase")]
pub enum RecommendationType {
    Buy,
    Sell,
    Hold,
    Watch,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Hold => "hold",
            Self::Watch => "watch",
        }
    }
}

/// Raw scorer output, addressed by symbol. Values are clamped once, here,
/// regardless of which scorer produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub symbol: String,
    pub recommendation_type: RecommendationType,
    pub confidence_score: f64,
    pub target_price: f64,
    pub reasoning: String,
}

impl Advice {
    /// Confidence is forced into [0, 1] and the target price to >= 0. This is
    /// the only validation applied to numeric scorer output before persistence.
    pub fn clamped(mut self) -> Self {
        self.confidence_score = self.confidence_score.clamp(0.0, 1.0);
        self.target_price = self.target_price.max(0.0);
        self
    }
}

/// An advice resolved to a stored equity and stamped for insertion.
#[derive(Debug, Clone, Serialize)]
pub struct NewRecommendation {
    pub stock_id: Uuid,
    pub recommendation_type: RecommendationType,
    pub confidence_score: f64,
    pub target_price: f64,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewRecommendation {
    pub fn from_advice(stock_id: Uuid, advice: Advice, created_at: DateTime<Utc>) -> Self {
        let advice = advice.clamped();
        Self {
            stock_id,
            recommendation_type: advice.recommendation_type,
            confidence_score: advice.confidence_score,
            target_price: advice.target_price,
            reasoning: advice.reasoning,
            created_at,
            expires_at: created_at + Duration::days(EXPIRY_DAYS),
        }
    }
}

/// A recommendation joined with its equity, as served to readers.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActiveRecommendation {
    pub id: Uuid,
    pub stock_id: Uuid,
    pub symbol: String,
    pub name: String,
    pub recommendation_type: RecommendationType,
    pub confidence_score: f64,
    pub target_price: f64,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn advice(confidence: f64, target: f64) -> Advice {
        Advice {
            symbol: "AAPL".to_string(),
            recommendation_type: RecommendationType::Buy,
            confidence_score: confidence,
            target_price: target,
            reasoning: "test".to_string(),
        }
    }

    #[test]
    fn clamps_confidence_into_unit_interval() {
        assert_eq!(advice(-0.3, 10.0).clamped().confidence_score, 0.0);
        assert_eq!(advice(1.4, 10.0).clamped().confidence_score, 1.0);
        assert_eq!(advice(0.82, 10.0).clamped().confidence_score, 0.82);
    }

    #[test]
    fn clamps_target_price_to_non_negative() {
        assert_eq!(advice(0.5, -50.0).clamped().target_price, 0.0);
        assert_eq!(advice(0.5, 187.25).clamped().target_price, 187.25);
    }

    #[test]
    fn expiry_is_seven_days_after_creation() {
        let created = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let rec = NewRecommendation::from_advice(Uuid::new_v4(), advice(0.8, 100.0), created);
        assert_eq!(rec.created_at, created);
        assert_eq!(rec.expires_at, created + Duration::days(7));
    }

    #[test]
    fn recommendation_type_serde_is_lowercase() {
        let json = serde_json::to_string(&RecommendationType::Watch).unwrap();
        assert_eq!(json, "\"watch\"");
        let parsed: RecommendationType = serde_json::from_str("\"buy\"").unwrap();
        assert_eq!(parsed, RecommendationType::Buy);
    }
}
