use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored equity row. The catalog is wholesale-replaced by imports, so ids
/// do not persist across import runs.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Equity {
    pub id: Uuid,
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub current_price: f64,
    pub price_change_24h: f64,
    pub volume: i64,
    pub market_cap: i64,
    pub last_updated: DateTime<Utc>,
}

/// An equity candidate ready for bulk insert (CSV ingest or catalog import).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEquity {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub current_price: f64,
    pub price_change_24h: f64,
    pub volume: i64,
    pub market_cap: i64,
}

impl NewEquity {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            sector: "Unknown".to_string(),
            current_price: 0.0,
            price_change_24h: 0.0,
            volume: 0,
            market_cap: 0,
        }
    }
}
