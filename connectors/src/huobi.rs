use crate::decode;
use crate::request::{CanonicalQuerySigner, RateLimit, Requester};
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
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

const HUOBI_API_URL: &str = "https://api.huobi.pro";
const HUOBI_WEBSOCKET_URL: &str = "wss://api.huobi.pro/ws";
/// Fiat currency no longer listed by the venue
const HUOBI_RETIRED_FIAT: &str = "CNY";

pub struct Huobi {
    base: ExchangeBase,
}

#[derive(Debug, Deserialize)]
struct HuobiResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct HuobiTickResponse<T> {
    tick: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HuobiSymbol {
    base_currency: String,
    quote_currency: String,
}

#[derive(Debug, Deserialize)]
struct HuobiMergedTick {
    close: f64,
    high: f64,
    low: f64,
    vol: f64,
    bid: Vec<f64>,
    ask: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct HuobiDepth {
    bids: Vec<Vec<Value>>,
    asks: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct HuobiAccount {
    id: u64,
    #[serde(rename = "type")]
    account_type: String,
}

#[derive(Debug, Deserialize)]
struct HuobiBalances {
    list: Vec<HuobiBalance>,
}

#[derive(Debug, Deserialize)]
struct HuobiBalance {
    currency: String,
    #[serde(rename = "type")]
    balance_type: String,
    balance: String,
}

impl Huobi {
    pub fn new(context: &AdapterContext) -> Self {
        let requester = Requester::new("Huobi", HUOBI_API_URL, Arc::clone(&context.transport))
            .with_rate_limits(
                RateLimit::new(10, Duration::from_secs(1)),
                RateLimit::new(10, Duration::from_secs(1)),
            )
            .with_signer(CanonicalQuerySigner)
            .with_probe(huobi_error);
        Self {
            base: ExchangeBase::new(context, requester),
        }
    }

    async fn symbols(&self) -> Result<Vec<String>> {
        let response: HuobiResponse<Vec<HuobiSymbol>> = self
            .base
            .requester()
            .send_public("/v1/common/symbols")
            .await?;
        let format = self.base.config_format();
        Ok(response
            .data
            .iter()
            .map(|symbol| format.format(&CurrencyPair::new(&symbol.base_currency, &symbol.quote_currency)))
            .collect())
    }

    async fn spot_account_id(&self) -> Result<u64> {
        let response: HuobiResponse<Vec<HuobiAccount>> = self
            .base
            .requester()
            .send_signed(Method::GET, "/v1/account/accounts", Vec::new())
            .await?;
        response
            .data
            .iter()
            .find(|account| account.account_type == "spot")
            .map(|account| account.id)
            .ok_or_else(|| Error::NotFound(format!("{} spot account", self.name())))
    }
}

/// Huobi reports failures as `{"status": "error", "err-code": .., "err-msg": ..}`.
fn huobi_error(body: &Value) -> Option<String> {
    if body.get("status").and_then(Value::as_str) != Some("error") {
        return None;
    }
    let code = body.get("err-code").and_then(Value::as_str).unwrap_or("unknown");
    let message = body.get("err-msg").and_then(Value::as_str).unwrap_or("unspecified error");
    Some(format!("{} ({})", message, code))
}

fn side_price(levels: &[f64], side: &str) -> Result<f64> {
    levels
        .first()
        .copied()
        .ok_or_else(|| Error::DecodeFailed(format!("empty {} in merged ticker", side)))
}

#[async_trait]
impl Exchange for Huobi {
    fn base(&self) -> &ExchangeBase {
        &self.base
    }

    fn set_defaults(&self) {
        self.base.apply_defaults(Descriptor {
            name: "Huobi".to_string(),
            request_format: CurrencyPairFormatConfig::new("", false),
            config_format: CurrencyPairFormatConfig::new("-", false),
            supports_auto_pair_updating: true,
            ..Default::default()
        });
    }

    async fn run(&self) -> Result<()> {
        self.base.log_run_diagnostics(HUOBI_WEBSOCKET_URL);

        let symbols = self.symbols().await.map_err(|e| {
            error!("{} failed to get available symbols: {}", self.name(), e);
            e
        })?;

        let descriptor = self.base.descriptor();
        let has_retired_fiat = |pairs: &[String]| {
            pairs
                .iter()
                .any(|pair| pair.to_ascii_uppercase().contains(HUOBI_RETIRED_FIAT))
        };
        let force = has_retired_fiat(&descriptor.enabled_pairs)
            || has_retired_fiat(&descriptor.available_pairs);

        self.base.substitute_base_currency(HUOBI_RETIRED_FIAT, "USD")?;

        if force {
            return self.base.force_upgrade(&symbols, &["btc-usdt"]);
        }
        self.base.update_currencies(&symbols, false, false)
    }

    async fn update_ticker(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<TickerSnapshot>> {
        let symbol = self.base.format_exchange_currency(pair);
        let response: HuobiTickResponse<HuobiMergedTick> = self
            .base
            .requester()
            .send_public(&format!("/market/detail/merged?symbol={}", symbol))
            .await?;
        let tick = response.tick;

        let mut snapshot = TickerSnapshot::new(self.name(), pair.clone(), asset_type);
        snapshot.last = tick.close;
        snapshot.high = tick.high;
        snapshot.low = tick.low;
        snapshot.volume = tick.vol;
        snapshot.bid = side_price(&tick.bid, "bid")?;
        snapshot.ask = side_price(&tick.ask, "ask")?;
        self.base.publish_ticker(snapshot)
    }

    async fn update_orderbook(&self, pair: &CurrencyPair, asset_type: AssetType) -> Result<Arc<OrderbookSnapshot>> {
        let symbol = self.base.format_exchange_currency(pair);
        let response: HuobiTickResponse<HuobiDepth> = self
            .base
            .requester()
            .send_public(&format!("/market/depth?symbol={}&type=step0", symbol))
            .await?;

        let mut orderbook = OrderbookSnapshot::new(self.name(), pair.clone(), asset_type);
        orderbook.bids = decode::levels(&response.tick.bids)?;
        orderbook.asks = decode::levels(&response.tick.asks)?;
        self.base.publish_orderbook(orderbook)
    }

    async fn account_info(&self) -> Result<AccountInfo> {
        let account_id = self.spot_account_id().await?;
        let response: HuobiResponse<HuobiBalances> = self
            .base
            .requester()
            .send_signed(
                Method::GET,
                &format!("/v1/account/accounts/{}/balance", account_id),
                Vec::new(),
            )
            .await?;

        let mut currencies: Vec<AccountCurrencyInfo> = Vec::new();
        for balance in &response.data.list {
            let amount = decode::parse_str(&balance.balance)?;
            let currency = balance.currency.to_ascii_uppercase();
            let index = match currencies.iter().position(|info| info.currency == currency) {
                Some(index) => index,
                None => {
                    currencies.push(AccountCurrencyInfo {
                        currency,
                        ..Default::default()
                    });
                    currencies.len() - 1
                }
            };
            currencies[index].total += amount;
            if balance.balance_type == "frozen" {
                currencies[index].hold += amount;
            }
        }
        Ok(AccountInfo {
            exchange: self.name(),
            currencies,
        })
    }
}
