use crate::{MarketKey, StoreError};
use common::models::{OrderbookSnapshot, PriceLevel, TickerSnapshot};

/// A market data value that can be held by a [`crate::SnapshotStore`].
pub trait Snapshot: Send + Sync + 'static {
    fn key(&self) -> MarketKey;

    /// Checks the snapshot before it replaces the cached value.
    fn validate(&self) -> Result<(), StoreError>;
}

impl Snapshot for TickerSnapshot {
    fn key(&self) -> MarketKey {
        MarketKey::new(&self.exchange, &self.pair, self.asset_type)
    }

    fn validate(&self) -> Result<(), StoreError> {
        let fields = [
            ("bid", self.bid),
            ("ask", self.ask),
            ("last", self.last),
            ("high", self.high),
            ("low", self.low),
            ("volume", self.volume),
        ];
        match fields.iter().find(|(_, value)| !value.is_finite()) {
            Some((field, _)) => Err(StoreError::NonFiniteValue {
                key: self.key().to_string(),
                field: *field,
            }),
            None => Ok(()),
        }
    }
}

impl Snapshot for OrderbookSnapshot {
    fn key(&self) -> MarketKey {
        MarketKey::new(&self.exchange, &self.pair, self.asset_type)
    }

    fn validate(&self) -> Result<(), StoreError> {
        check_side(&self.key(), "bid", &self.bids)?;
        check_side(&self.key(), "ask", &self.asks)
    }
}

fn check_side(key: &MarketKey, side: &'static str, levels: &[PriceLevel]) -> Result<(), StoreError> {
    for (i, level) in levels.iter().enumerate() {
        if !level.price.is_finite() || !level.amount.is_finite() {
            return Err(StoreError::NonFiniteValue {
                key: key.to_string(),
                field: side,
            });
        }
        if levels[..i].iter().any(|seen| seen.price == level.price) {
            return Err(StoreError::DuplicatePriceLevel {
                key: key.to_string(),
                side,
                price: level.price,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::currency::CurrencyPair;
    use common::models::AssetType;

    #[test]
    fn duplicate_levels_are_rejected() {
        let mut book = OrderbookSnapshot::new("itbit", CurrencyPair::new("XBT", "USD"), AssetType::Spot);
        book.bids = vec![PriceLevel::new(100.0, 1.0), PriceLevel::new(99.0, 2.0)];
        book.asks = vec![PriceLevel::new(101.0, 1.0), PriceLevel::new(101.0, 3.0)];
        assert!(matches!(
            book.validate(),
            Err(StoreError::DuplicatePriceLevel { side: "ask", .. })
        ));

        book.asks.pop();
        assert!(book.validate().is_ok());
    }

    #[test]
    fn nan_ticker_is_rejected() {
        let mut ticker = TickerSnapshot::new("binance", CurrencyPair::new("BTC", "USDT"), AssetType::Spot);
        ticker.last = f64::NAN;
        assert!(matches!(
            ticker.validate(),
            Err(StoreError::NonFiniteValue { field: "last", .. })
        ));
    }
}
