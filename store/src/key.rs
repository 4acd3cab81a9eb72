use common::currency::CurrencyPair;
use common::models::AssetType;
use std::fmt;

/// Identifies one cached snapshot: venue, pair and asset type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarketKey {
    /// Lowercased venue name
    pub exchange: String,
    /// Canonical `FIRST-SECOND` form of the pair
    pub pair: String,
    pub asset_type: AssetType,
}

impl MarketKey {
    pub fn new(exchange: &str, pair: &CurrencyPair, asset_type: AssetType) -> Self {
        Self {
            exchange: exchange.to_ascii_lowercase(),
            pair: pair.canonical(),
            asset_type,
        }
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.exchange, self.pair, self.asset_type)
    }
}
