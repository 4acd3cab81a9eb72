use crate::decode;
use crate::request::{QueryHmacSigner, RateLimit, Requester};
use crate::{AdapterContext, Descriptor, Exchange, ExchangeBase};
use async_trait::async_trait;
use common::currency::{CurrencyPair, CurrencyPairFormatConfig};
use common::models::{
    AccountCurrencyInfo, AccountInfo, AssetType, OrderbookSnapshot, TickerSnapshot,
};
use common::Result;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const BINANCE_API_URL: &str = "https://api.binance.com";
const BINANCE_WEBSOCKET_URL: &str = "wss://stream.binance.com:9443/ws";
const BINANCE_ORDERBOOK_LIMIT: u32 = 1000;

pub struct Binance {
    base: ExchangeBase,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    status: String,
    base_asset: String,
    quote_asset: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Binance24hTicker {
    symbol: String,
    bid_price: String,
    ask_price: String,
    last_price: String,
    high_price: String,
    low_price: String,
    volume: String,
}

#[derive(Debug, Deserialize)]
struct BinanceDepth {
    bids: Vec<Vec<Value>>,
    asks: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct BinanceAccount {
    balances: Vec<BinanceBalance>,
}

#[derive(Debug, Deserialize)]
struct BinanceBalance {
    asset: String,
    free: String,
    locked: String,
}

impl Binance {
    pub fn new(context: &AdapterContext) -> Self {
        let requester = Requester::new("Binance", BINANCE_API_URL, Arc::clone(&context.transport))
            .with_rate_limits(
                RateLimit::new(20, Duration::from_secs(1)),
                RateLimit::new(10, Duration::from_secs(1)),
            )
            .with_signer(QueryHmacSigner::default());
        Self {
            base: ExchangeBase::new(context, requester),
        }
    }

    /// Tradable symbols in the config format
    async fn exchange_symbols(&self) -> Result<Vec<String>> {
        let info: ExchangeInfo = self
            .base
            .requester()
            .send_public("/api/v3/exchangeInfo")
            .await?;
        let format = self.base.config_format();
        Ok(info
            .symbols
            .iter()
            .filter(|symbol| symbol.status == "TRADING")
            .map(|symbol| format.format(&CurrencyPair::new(&symbol.base_asset, &symbol.quote_asset)))
            .collect())
    }

    fn ticker_snapshot(
        &self,
        pair: &CurrencyPair,
        asset_type: AssetType,
        ticker: &Binance24hTicker,
    ) -> Result<TickerSnapshot> {
        let mut snapshot = TickerSnapshot::new(self.name(), pair.clone(), asset_type);
        snapshot.bid = decode::parse_str(&ticker.bid_price)?;
        snapshot.ask = decode::parse_str(&ticker.ask_price)?;
        snapshot.last = decode::parse_str(&ticker.last_price)?;
        snapshot.high = decode::parse_str(&ticker.high_price)?;
        snapshot.low = decode::parse_str(&ticker.low_price)?;
        snapshot.volume = decode::parse_str(&ticker.volume)?;
        Ok(snapshot)
    }
}

#[async_trait]
impl Exchange for Binance {
    fn base(&self) -> &ExchangeBase {
        &self.base
    }

    fn set_defaults(&self) {
        self.base.apply_defaults(Descriptor {
            name: "Binance".to_string(),
            request_format: CurrencyPairFormatConfig::new("", true),
            config_format: CurrencyPairFormatConfig::new("-", true),
            supports_auto_pair_updating: true,
            supports_rest_ticker_batching: true,
            ..Default::default()
        });
    }

    async fn run(&self) -> Result<()> {
        self.base.log_run_diagnostics(BINANCE_WEBSOCKET_URL);

        let symbols = self.exchange_symbols().await.map_err(|e| {
            error!("{} failed to get exchange info: {}", self.name(), e);
            e
        })?;

        let descriptor = self.base.descriptor();
        let delimited = |pairs: &[String]| pairs.iter().any(|pair| pair.contains('-'));
        if !delimited(&descriptor.enabled_pairs) || !delimited(&descriptor.available_pairs) {
            return self.base.force_upgrade(&symbols, &["BTC-USDT"]);
        }
        self.base.update_currencies(&symbols, false, false)
    }

    async fn update_ticker(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<TickerSnapshot>> {
        let symbol = self.base.format_exchange_currency(pair);
        debug!("Fetching 24hr ticker from Binance for {}", symbol);
        let ticker: Binance24hTicker = self
            .base
            .requester()
            .send_public(&format!("/api/v3/ticker/24hr?symbol={}", symbol))
            .await?;
        self.base
            .publish_ticker(self.ticker_snapshot(pair, asset_type, &ticker)?)
    }

    /// One request for every symbol, then a cache write per enabled pair.
    async fn update_tickers(&self, asset_type: AssetType) -> Result<()> {
        let tickers: Vec<Binance24hTicker> = self
            .base
            .requester()
            .send_public("/api/v3/ticker/24hr")
            .await?;

        for pair in self.enabled_currencies() {
            let symbol = self.base.format_exchange_currency(&pair);
            match tickers.iter().find(|ticker| ticker.symbol == symbol) {
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
        let depth: BinanceDepth = self
            .base
            .requester()
            .send_public(&format!(
                "/api/v3/depth?symbol={}&limit={}",
                symbol, BINANCE_ORDERBOOK_LIMIT
            ))
            .await?;

        let mut orderbook = OrderbookSnapshot::new(self.name(), pair.clone(), asset_type);
        orderbook.bids = decode::levels(&depth.bids)?;
        orderbook.asks = decode::levels(&depth.asks)?;
        self.base.publish_orderbook(orderbook)
    }

    async fn account_info(&self) -> Result<AccountInfo> {
        let account: BinanceAccount = self
            .base
            .requester()
            .send_signed(Method::GET, "/api/v3/account", Vec::new())
            .await?;

        let mut currencies = Vec::with_capacity(account.balances.len());
        for balance in &account.balances {
            let free = decode::parse_str(&balance.free)?;
            let locked = decode::parse_str(&balance.locked)?;
            currencies.push(AccountCurrencyInfo {
                currency: balance.asset.clone(),
                total: free + locked,
                hold: locked,
            });
        }
        Ok(AccountInfo {
            exchange: self.name(),
            currencies,
        })
    }
}
