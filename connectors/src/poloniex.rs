use crate::decode;
use crate::request::{FormHmacSigner, Nonce, RateLimit, Requester};
use crate::{AdapterContext, Descriptor, Exchange, ExchangeBase};
use async_trait::async_trait;
use common::currency::{CurrencyPair, CurrencyPairFormatConfig};
use common::models::{
    AccountCurrencyInfo, AccountInfo, AssetType, OrderbookSnapshot, TickerSnapshot,
};
use common::{Error, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

const POLONIEX_API_URL: &str = "https://poloniex.com";
const POLONIEX_WEBSOCKET_URL: &str = "wss://api2.poloniex.com";
const POLONIEX_ORDERBOOK_DEPTH: u32 = 50;
/// Pair notation left over from an older symbol list
const POLONIEX_STALE_PAIR: &str = "BTC_USDT";

pub struct Poloniex {
    base: ExchangeBase,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoloniexTicker {
    last: String,
    lowest_ask: String,
    highest_bid: String,
    #[serde(rename = "high24hr")]
    high_24hr: String,
    #[serde(rename = "low24hr")]
    low_24hr: String,
    quote_volume: String,
}

#[derive(Debug, Deserialize)]
struct PoloniexOrderbook {
    bids: Vec<Vec<Value>>,
    asks: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoloniexBalance {
    available: String,
    on_orders: String,
}

impl Poloniex {
    pub fn new(context: &AdapterContext) -> Self {
        let requester =
            Requester::new("Poloniex", POLONIEX_API_URL, Arc::clone(&context.transport))
                .with_rate_limits(
                    RateLimit::new(6, Duration::from_secs(1)),
                    RateLimit::new(6, Duration::from_secs(1)),
                )
                .with_nonce(Nonce::millis())
                .with_signer(FormHmacSigner);
        Self {
            base: ExchangeBase::new(context, requester),
        }
    }

    async fn all_tickers(&self) -> Result<BTreeMap<String, PoloniexTicker>> {
        self.base
            .requester()
            .send_public("/public?command=returnTicker")
            .await
    }

    fn ticker_snapshot(
        &self,
        pair: &CurrencyPair,
        asset_type: AssetType,
        ticker: &PoloniexTicker,
    ) -> Result<TickerSnapshot> {
        let mut snapshot = TickerSnapshot::new(self.name(), pair.clone(), asset_type);
        snapshot.last = decode::parse_str(&ticker.last)?;
        snapshot.ask = decode::parse_str(&ticker.lowest_ask)?;
        snapshot.bid = decode::parse_str(&ticker.highest_bid)?;
        snapshot.high = decode::parse_str(&ticker.high_24hr)?;
        snapshot.low = decode::parse_str(&ticker.low_24hr)?;
        snapshot.volume = decode::parse_str(&ticker.quote_volume)?;
        Ok(snapshot)
    }
}

#[async_trait]
impl Exchange for Poloniex {
    fn base(&self) -> &ExchangeBase {
        &self.base
    }

    fn set_defaults(&self) {
        self.base.apply_defaults(Descriptor {
            name: "Poloniex".to_string(),
            request_format: CurrencyPairFormatConfig::new("_", true),
            config_format: CurrencyPairFormatConfig::new("_", true),
            supports_auto_pair_updating: true,
            supports_rest_ticker_batching: true,
            ..Default::default()
        });
    }

    async fn run(&self) -> Result<()> {
        self.base.log_run_diagnostics(POLONIEX_WEBSOCKET_URL);

        let tickers = self.all_tickers().await.map_err(|e| {
            error!("{} failed to get available symbols: {}", self.name(), e);
            e
        })?;
        let symbols: Vec<String> = tickers.into_keys().collect();

        let force = self
            .base
            .descriptor()
            .available_pairs
            .iter()
            .any(|pair| pair == POLONIEX_STALE_PAIR);
        if force {
            warn!(
                "{} contains invalid pair, forcing upgrade of available currencies",
                self.name()
            );
        }
        self.base.update_currencies(&symbols, false, force)
    }

    async fn update_ticker(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<TickerSnapshot>> {
        let symbol = self.base.format_exchange_currency(pair);
        let tickers = self.all_tickers().await?;
        let ticker = tickers
            .get(&symbol)
            .ok_or_else(|| Error::NotFound(format!("{} ticker {}", self.name(), symbol)))?;
        self.base
            .publish_ticker(self.ticker_snapshot(pair, asset_type, ticker)?)
    }

    async fn update_tickers(&self, asset_type: AssetType) -> Result<()> {
        let tickers = self.all_tickers().await?;
        for pair in self.enabled_currencies() {
            let symbol = self.base.format_exchange_currency(&pair);
            match tickers.get(&symbol) {
                Some(ticker) => {
                    self.base
                        .publish_ticker(self.ticker_snapshot(&pair, asset_type, ticker)?)?;
                }
                None => warn!("{} returned no ticker for {}", self.name(), symbol),
            }
        }
        Ok(())
    }

    async fn update_orderbook(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<OrderbookSnapshot>> {
        let symbol = self.base.format_exchange_currency(pair);
        let book: PoloniexOrderbook = self
            .base
            .requester()
            .send_public(&format!(
                "/public?command=returnOrderBook&currencyPair={}&depth={}",
                symbol, POLONIEX_ORDERBOOK_DEPTH
            ))
            .await?;

        let mut orderbook = OrderbookSnapshot::new(self.name(), pair.clone(), asset_type);
        orderbook.bids = decode::levels(&book.bids)?;
        orderbook.asks = decode::levels(&book.asks)?;
        self.base.publish_orderbook(orderbook)
    }

    async fn account_info(&self) -> Result<AccountInfo> {
        let balances: BTreeMap<String, PoloniexBalance> = self
            .base
            .requester()
            .send_signed(
                Method::POST,
                "/tradingApi",
                vec![("command".to_string(), "returnCompleteBalances".to_string())],
            )
            .await?;

        let mut currencies = Vec::with_capacity(balances.len());
        for (currency, balance) in &balances {
            let available = decode::parse_str(&balance.available)?;
            let on_orders = decode::parse_str(&balance.on_orders)?;
            currencies.push(AccountCurrencyInfo {
                currency: currency.clone(),
                total: available + on_orders,
                hold: on_orders,
            });
        }
        Ok(AccountInfo {
            exchange: self.name(),
            currencies,
        })
    }
}
