use crate::currency::CurrencyPair;
use crate::models::AssetType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest ticker for one pair on one venue. Replaced as a whole on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerSnapshot {
    /// The exchange this ticker is from
    pub exchange: String,
    pub pair: CurrencyPair,
    pub asset_type: AssetType,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    /// 24h high
    pub high: f64,
    /// 24h low
    pub low: f64,
    /// 24h volume in the first currency of the pair
    pub volume: f64,
    /// Timestamp when this ticker was recorded
    pub timestamp: DateTime<Utc>,
}

impl TickerSnapshot {
    pub fn new(exchange: impl Into<String>, pair: CurrencyPair, asset_type: AssetType) -> Self {
        Self {
            exchange: exchange.into(),
            pair,
            asset_type,
            bid: 0.0,
            ask: 0.0,
            last: 0.0,
            high: 0.0,
            low: 0.0,
            volume: 0.0,
            timestamp: Utc::now(),
        }
    }
}
