use crate::decode;
use crate::request::{PrehashSigner, RateLimit, Requester};
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
use tracing::{debug, error};

const COINBASE_API_URL: &str = "https://api.exchange.coinbase.com";
const COINBASE_WEBSOCKET_URL: &str = "wss://ws-feed.exchange.coinbase.com";

pub struct Coinbase {
    base: ExchangeBase,
}

#[derive(Debug, Deserialize)]
struct CoinbaseProduct {
    base_currency: String,
    quote_currency: String,
    #[serde(default)]
    trading_disabled: bool,
}

#[derive(Debug, Deserialize)]
struct CoinbaseTicker {
    price: String,
    bid: String,
    ask: String,
    volume: String,
}

#[derive(Debug, Deserialize)]
struct CoinbaseStats {
    high: String,
    low: String,
}

#[derive(Debug, Deserialize)]
struct CoinbaseBook {
    bids: Vec<Vec<Value>>,
    asks: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseAccount {
    currency: String,
    balance: String,
    hold: String,
}

impl Coinbase {
    pub fn new(context: &AdapterContext) -> Self {
        let requester =
            Requester::new("Coinbase", COINBASE_API_URL, Arc::clone(&context.transport))
                .with_rate_limits(
                    RateLimit::new(10, Duration::from_secs(1)),
                    RateLimit::new(15, Duration::from_secs(1)),
                )
                .with_signer(PrehashSigner);
        Self {
            base: ExchangeBase::new(context, requester),
        }
    }

    async fn products(&self) -> Result<Vec<String>> {
        let products: Vec<CoinbaseProduct> =
            self.base.requester().send_public("/products").await?;
        let format = self.base.config_format();
        Ok(products
            .iter()
            .filter(|product| !product.trading_disabled)
            .map(|product| {
                format.format(&CurrencyPair::new(&product.base_currency, &product.quote_currency))
            })
            .collect())
    }
}

#[async_trait]
impl Exchange for Coinbase {
    fn base(&self) -> &ExchangeBase {
        &self.base
    }

    fn set_defaults(&self) {
        self.base.apply_defaults(Descriptor {
            name: "Coinbase".to_string(),
            api_secret_base64: true,
            request_format: CurrencyPairFormatConfig::new("-", true),
            config_format: CurrencyPairFormatConfig::new("-", true),
            supports_auto_pair_updating: true,
            ..Default::default()
        });
    }

    async fn run(&self) -> Result<()> {
        self.base.log_run_diagnostics(COINBASE_WEBSOCKET_URL);

        let symbols = self.products().await.map_err(|e| {
            error!("{} failed to get available products: {}", self.name(), e);
            e
        })?;
        self.base.update_currencies(&symbols, false, false)
    }

    async fn update_ticker(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<TickerSnapshot>> {
        let product = self.base.format_exchange_currency(pair);
        debug!("Fetching ticker from Coinbase for {}", product);

        let ticker: CoinbaseTicker = self
            .base
            .requester()
            .send_public(&format!("/products/{}/ticker", product))
            .await?;
        let stats: CoinbaseStats = self
            .base
            .requester()
            .send_public(&format!("/products/{}/stats", product))
            .await?;

        let mut snapshot = TickerSnapshot::new(self.name(), pair.clone(), asset_type);
        snapshot.last = decode::parse_str(&ticker.price)?;
        snapshot.bid = decode::parse_str(&ticker.bid)?;
        snapshot.ask = decode::parse_str(&ticker.ask)?;
        snapshot.volume = decode::parse_str(&ticker.volume)?;
        snapshot.high = decode::parse_str(&stats.high)?;
        snapshot.low = decode::parse_str(&stats.low)?;
        self.base.publish_ticker(snapshot)
    }

    async fn update_orderbook(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<OrderbookSnapshot>> {
        let product = self.base.format_exchange_currency(pair);
        let book: CoinbaseBook = self
            .base
            .requester()
            .send_public(&format!("/products/{}/book?level=2", product))
            .await?;

        let mut orderbook = OrderbookSnapshot::new(self.name(), pair.clone(), asset_type);
        orderbook.bids = decode::levels(&book.bids)?;
        orderbook.asks = decode::levels(&book.asks)?;
        self.base.publish_orderbook(orderbook)
    }

    async fn account_info(&self) -> Result<AccountInfo> {
        let accounts: Vec<CoinbaseAccount> = self
            .base
            .requester()
            .send_signed(Method::GET, "/accounts", Vec::new())
            .await?;

        let mut currencies = Vec::with_capacity(accounts.len());
        for account in &accounts {
            currencies.push(AccountCurrencyInfo {
                currency: account.currency.clone(),
                total: decode::parse_str(&account.balance)?,
                hold: decode::parse_str(&account.hold)?,
            });
        }
        Ok(AccountInfo {
            exchange: self.name(),
            currencies,
        })
    }
}
