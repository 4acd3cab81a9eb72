use crate::currency::CurrencyPair;
use crate::models::AssetType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub amount: f64,
}

impl PriceLevel {
    pub fn new(price: f64, amount: f64) -> Self {
        Self { price, amount }
    }
}

/// Order book for one pair on one venue. Replaced as a whole on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    pub exchange: String,
    pub pair: CurrencyPair,
    pub asset_type: AssetType,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub timestamp: DateTime<Utc>,
}

impl OrderbookSnapshot {
    pub fn new(exchange: impl Into<String>, pair: CurrencyPair, asset_type: AssetType) -> Self {
        Self {
            exchange: exchange.into(),
            pair,
            asset_type,
            bids: Vec::new(),
            asks: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Orders bids from highest price and asks from lowest.
    pub fn sort(&mut self) {
        self.bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        self.asks.sort_by(|a, b| a.price.total_cmp(&b.price));
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.iter().copied().max_by(|a, b| a.price.total_cmp(&b.price))
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.iter().copied().min_by(|a, b| a.price.total_cmp(&b.price))
    }
}
