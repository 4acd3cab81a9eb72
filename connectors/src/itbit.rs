use crate::decode;
use crate::request::{JsonDigestSigner, RateLimit, Requester};
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

const ITBIT_API_URL: &str = "https://api.itbit.com/v1";

/// itBit has no symbol listing endpoint, so its pairs come from configuration.
pub struct ItBit {
    base: ExchangeBase,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItBitTicker {
    bid: String,
    ask: String,
    last_price: String,
    #[serde(rename = "high24h")]
    high_24h: String,
    #[serde(rename = "low24h")]
    low_24h: String,
    #[serde(rename = "volume24h")]
    volume_24h: String,
}

#[derive(Debug, Deserialize)]
struct ItBitOrderbook {
    bids: Vec<Vec<Value>>,
    asks: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ItBitWallet {
    balances: Vec<ItBitBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItBitBalance {
    currency: String,
    available_balance: String,
    total_balance: String,
}

impl ItBit {
    pub fn new(context: &AdapterContext) -> Self {
        let requester = Requester::new("ITBIT", ITBIT_API_URL, Arc::clone(&context.transport))
            .with_rate_limits(
                RateLimit::new(10, Duration::from_secs(1)),
                RateLimit::new(10, Duration::from_secs(1)),
            )
            .with_signer(JsonDigestSigner);
        Self {
            base: ExchangeBase::new(context, requester),
        }
    }
}

#[async_trait]
impl Exchange for ItBit {
    fn base(&self) -> &ExchangeBase {
        &self.base
    }

    fn set_defaults(&self) {
        self.base.apply_defaults(Descriptor {
            name: "ITBIT".to_string(),
            request_format: CurrencyPairFormatConfig::new("", true),
            config_format: CurrencyPairFormatConfig::new("", true),
            ..Default::default()
        });
    }

    async fn run(&self) -> Result<()> {
        self.base.log_run_diagnostics("none");
        Ok(())
    }

    async fn update_ticker(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<TickerSnapshot>> {
        let market = self.base.format_exchange_currency(pair);
        let ticker: ItBitTicker = self
            .base
            .requester()
            .send_public(&format!("/markets/{}/ticker", market))
            .await?;

        let mut snapshot = TickerSnapshot::new(self.name(), pair.clone(), asset_type);
        snapshot.bid = decode::parse_str(&ticker.bid)?;
        snapshot.ask = decode::parse_str(&ticker.ask)?;
        snapshot.last = decode::parse_str(&ticker.last_price)?;
        snapshot.high = decode::parse_str(&ticker.high_24h)?;
        snapshot.low = decode::parse_str(&ticker.low_24h)?;
        snapshot.volume = decode::parse_str(&ticker.volume_24h)?;
        self.base.publish_ticker(snapshot)
    }

    async fn update_orderbook(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<OrderbookSnapshot>> {
        let market = self.base.format_exchange_currency(pair);
        let book: ItBitOrderbook = self
            .base
            .requester()
            .send_public(&format!("/markets/{}/order_book", market))
            .await?;

        let mut orderbook = OrderbookSnapshot::new(self.name(), pair.clone(), asset_type);
        orderbook.bids = decode::levels(&book.bids)?;
        orderbook.asks = decode::levels(&book.asks)?;
        self.base.publish_orderbook(orderbook)
    }

    /// Sums balances across every wallet owned by the configured user.
    async fn account_info(&self) -> Result<AccountInfo> {
        let user_id = self.base.requester().client_id();
        let wallets: Vec<ItBitWallet> = self
            .base
            .requester()
            .send_signed(Method::GET, "/wallets", vec![("userId".to_string(), user_id)])
            .await?;

        let mut currencies: Vec<AccountCurrencyInfo> = Vec::new();
        for balance in wallets.iter().flat_map(|wallet| wallet.balances.iter()) {
            let total = decode::parse_str(&balance.total_balance)?;
            let available = decode::parse_str(&balance.available_balance)?;
            match currencies
                .iter_mut()
                .find(|info| info.currency == balance.currency)
            {
                Some(info) => {
                    info.total += total;
                    info.hold += total - available;
                }
                None => currencies.push(AccountCurrencyInfo {
                    currency: balance.currency.clone(),
                    total,
                    hold: total - available,
                }),
            }
        }
        Ok(AccountInfo {
            exchange: self.name(),
            currencies,
        })
    }
}
