use crate::base::ExchangeBase;
use async_trait::async_trait;
use common::config::ExchangeConfig;
use common::currency::CurrencyPair;
use common::models::{
    AccountInfo, AssetType, OrderDetail, OrderSide, OrderType, OrderbookSnapshot, TickerSnapshot,
};
use common::{Error, Result};
use std::sync::Arc;
use store::MarketKey;
use tracing::warn;

/// Capability set every venue adapter satisfies.
///
/// Adapters implement the venue-specific pieces (`set_defaults`, `run`,
/// `update_ticker`, `update_orderbook`); everything else is provided on top
/// of the adapter's [`ExchangeBase`]. Trading operations default to
/// `NotImplemented` so callers can feature-detect per venue.
#[async_trait]
pub trait Exchange: Send + Sync {
    fn base(&self) -> &ExchangeBase;

    /// Resets the descriptor to the venue's built-in defaults.
    fn set_defaults(&self);

    fn setup(&self, config: &ExchangeConfig) -> Result<()> {
        self.base().setup(config)
    }

    /// Startup phase: symbol discovery and pair reconciliation.
    async fn run(&self) -> Result<()>;

    fn name(&self) -> String {
        self.base().name()
    }

    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.base().set_enabled(enabled)
    }

    fn enabled_currencies(&self) -> Vec<CurrencyPair> {
        self.base().enabled_currencies()
    }

    fn available_currencies(&self) -> Vec<CurrencyPair> {
        self.base().available_currencies()
    }

    fn set_currency_pair_format(&self) -> Result<()> {
        self.base().set_currency_pair_format()
    }

    fn set_asset_types(&self) -> Result<()> {
        self.base().set_asset_types()
    }

    fn set_auto_pair_defaults(&self) -> Result<()> {
        self.base().set_auto_pair_defaults()
    }

    fn update_currencies(&self, symbols: &[String], is_enabled_list: bool, force: bool) -> Result<()> {
        self.base().update_currencies(symbols, is_enabled_list, force)
    }

    /// Fetches a ticker from the venue and writes it to the cache.
    async fn update_ticker(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<TickerSnapshot>>;

    /// Cached ticker, refreshed from the venue on a miss.
    async fn ticker_price(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<TickerSnapshot>> {
        let key = MarketKey::new(&self.name(), pair, asset_type);
        self.base()
            .tickers()
            .get_or_refresh(&key, || self.update_ticker(pair, asset_type))
            .await
    }

    /// Refreshes tickers for every enabled pair.
    ///
    /// Per-pair failures are logged and skipped; only a disabled venue stops
    /// the sweep.
    async fn update_tickers(&self, asset_type: AssetType) -> Result<()> {
        for pair in self.enabled_currencies() {
            match self.update_ticker(&pair, asset_type).await {
                Ok(_) => {}
                Err(e @ Error::ExchangeDisabled(_)) => return Err(e),
                Err(e) => warn!("{} failed to update ticker {}: {}", self.name(), pair, e),
            }
        }
        Ok(())
    }

    /// Fetches an orderbook from the venue and writes it to the cache.
    async fn update_orderbook(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<OrderbookSnapshot>>;

    /// Cached orderbook, refreshed from the venue on a miss.
    async fn orderbook(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<OrderbookSnapshot>> {
        let key = MarketKey::new(&self.name(), pair, asset_type);
        self.base()
            .orderbooks()
            .get_or_refresh(&key, || self.update_orderbook(pair, asset_type))
            .await
    }

    async fn account_info(&self) -> Result<AccountInfo> {
        Err(Error::NotImplemented("account info"))
    }

    async fn submit_order(
        &self,
        _pair: &CurrencyPair,
        _side: OrderSide,
        _order_type: OrderType,
        _amount: f64,
        _price: f64,
        _client_id: &str,
    ) -> Result<String> {
        Err(Error::NotImplemented("order submission"))
    }

    async fn modify_order(&self, _order_id: &str, _price: f64, _amount: f64) -> Result<String> {
        Err(Error::NotImplemented("order modification"))
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Err(Error::NotImplemented("order cancellation"))
    }

    async fn cancel_all_orders(&self) -> Result<()> {
        Err(Error::NotImplemented("bulk order cancellation"))
    }

    async fn order_info(&self, _order_id: &str) -> Result<OrderDetail> {
        Err(Error::NotImplemented("order info"))
    }

    async fn deposit_address(&self, _currency: &str) -> Result<String> {
        Err(Error::NotImplemented("deposit address"))
    }

    async fn withdraw(&self, _currency: &str, _address: &str, _amount: f64) -> Result<String> {
        Err(Error::NotImplemented("withdrawal"))
    }
}
