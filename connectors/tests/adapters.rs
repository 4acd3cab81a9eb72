use async_trait::async_trait;
use common::config::{Config, ExchangeConfig, SharedConfig};
use common::currency::CurrencyPair;
use common::models::AssetType;
use common::{Error, Result};
use connectors::request::{HttpRequest, HttpResponse, Transport};
use connectors::{AdapterContext, AdapterRegistry, Exchange};
use parking_lot::Mutex;
use std::sync::Arc;
use store::{MarketKey, OrderbookStore, TickerStore};

/// Serves canned bodies by URL fragment and records every requested URL.
#[derive(Default)]
struct RouteTransport {
    routes: Vec<(&'static str, u16, &'static str)>,
    requested: Mutex<Vec<String>>,
}

impl RouteTransport {
    fn new(routes: Vec<(&'static str, u16, &'static str)>) -> Self {
        Self {
            routes,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl Transport for RouteTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requested.lock().push(request.url.clone());
        self.routes
            .iter()
            .find(|(fragment, _, _)| request.url.contains(fragment))
            .map(|(_, status, body)| HttpResponse {
                status: *status,
                body: body.to_string(),
            })
            .ok_or_else(|| Error::RequestFailed(format!("no route for {}", request.url)))
    }
}

struct Harness {
    exchange: Arc<dyn Exchange>,
    config: SharedConfig,
    tickers: Arc<TickerStore>,
    transport: Arc<RouteTransport>,
}

fn harness(name: &str, config: ExchangeConfig, transport: RouteTransport) -> Harness {
    let shared = SharedConfig::new(Config {
        exchanges: vec![config.clone()],
        ..Default::default()
    });
    let transport = Arc::new(transport);
    let context = AdapterContext {
        config: shared.clone(),
        tickers: Arc::new(TickerStore::new()),
        orderbooks: Arc::new(OrderbookStore::new()),
        transport: Arc::clone(&transport) as Arc<dyn Transport>,
    };
    let exchange = AdapterRegistry::with_builtin().create(name, &context).unwrap();
    exchange.set_defaults();
    exchange.setup(&config).unwrap();
    Harness {
        exchange,
        config: shared,
        tickers: Arc::clone(&context.tickers),
        transport,
    }
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const BINANCE_EXCHANGE_INFO: &str = r#"{"symbols":[
    {"symbol":"BTCUSDT","status":"TRADING","baseAsset":"BTC","quoteAsset":"USDT"},
    {"symbol":"ETHBTC","status":"TRADING","baseAsset":"ETH","quoteAsset":"BTC"},
    {"symbol":"XRPBTC","status":"BREAK","baseAsset":"XRP","quoteAsset":"BTC"}
]}"#;

const BINANCE_TICKER: &str = r#"{"symbol":"BTCUSDT","bidPrice":"100.10","askPrice":"100.20",
    "lastPrice":"100.15","highPrice":"105","lowPrice":"95","volume":"1234.5"}"#;

#[test]
fn registry_knows_builtin_venues() {
    let registry = AdapterRegistry::with_builtin();
    for name in ["Binance", "coinbase", "POLONIEX", "itbit", "huobi"] {
        assert!(registry.contains(name), "{}", name);
    }
    assert!(!registry.contains("bitstamp"));
}

#[tokio::test]
async fn binance_upgrades_undelimited_pairs() {
    let config = ExchangeConfig {
        enabled: true,
        available_pairs: list(&["BTCUSDT", "ETHBTC"]),
        enabled_pairs: list(&["BTCUSDT"]),
        ..ExchangeConfig::new("Binance")
    };
    let h = harness(
        "binance",
        config,
        RouteTransport::new(vec![("/api/v3/exchangeInfo", 200, BINANCE_EXCHANGE_INFO)]),
    );

    h.exchange.run().await.unwrap();

    let persisted = h.config.exchange("Binance").unwrap();
    assert_eq!(persisted.enabled_pairs, list(&["BTC-USDT"]));
    assert_eq!(persisted.available_pairs, list(&["BTC-USDT", "ETH-BTC"]));
    assert_ne!(persisted.pairs_last_updated, 0);
    assert_eq!(
        h.exchange.enabled_currencies(),
        vec![CurrencyPair::new("BTC", "USDT")]
    );
}

#[tokio::test]
async fn binance_merges_new_symbols_without_force() {
    let config = ExchangeConfig {
        enabled: true,
        available_pairs: list(&["BTC-USDT", "LTC-BTC"]),
        enabled_pairs: list(&["LTC-BTC"]),
        ..ExchangeConfig::new("Binance")
    };
    let h = harness(
        "binance",
        config,
        RouteTransport::new(vec![("/api/v3/exchangeInfo", 200, BINANCE_EXCHANGE_INFO)]),
    );

    h.exchange.run().await.unwrap();

    let persisted = h.config.exchange("Binance").unwrap();
    assert_eq!(persisted.available_pairs, list(&["BTC-USDT", "LTC-BTC", "ETH-BTC"]));
    assert_eq!(persisted.enabled_pairs, list(&["LTC-BTC"]));
}

#[tokio::test]
async fn binance_ticker_is_cached_after_first_fetch() {
    let config = ExchangeConfig {
        enabled: true,
        available_pairs: list(&["BTC-USDT"]),
        enabled_pairs: list(&["BTC-USDT"]),
        ..ExchangeConfig::new("Binance")
    };
    let h = harness(
        "binance",
        config,
        RouteTransport::new(vec![("/api/v3/ticker/24hr", 200, BINANCE_TICKER)]),
    );

    let pair = CurrencyPair::new("BTC", "USDT");
    let ticker = h.exchange.ticker_price(&pair, AssetType::Spot).await.unwrap();
    assert_eq!(ticker.bid, 100.10);
    assert_eq!(ticker.volume, 1234.5);
    assert_eq!(ticker.exchange, "Binance");

    h.exchange.ticker_price(&pair, AssetType::Spot).await.unwrap();
    let requested = h.transport.requested();
    assert_eq!(requested.len(), 1);
    assert!(requested[0].ends_with("/api/v3/ticker/24hr?symbol=BTCUSDT"));

    let key = MarketKey::new("binance", &pair, AssetType::Spot);
    assert!(h.tickers.get(&key).is_some());
}

#[tokio::test]
async fn binance_batches_ticker_updates() {
    let config = ExchangeConfig {
        enabled: true,
        available_pairs: list(&["BTC-USDT", "ETH-BTC"]),
        enabled_pairs: list(&["BTC-USDT", "ETH-BTC"]),
        ..ExchangeConfig::new("Binance")
    };
    let h = harness(
        "binance",
        config,
        RouteTransport::new(vec![(
            "/api/v3/ticker/24hr",
            200,
            r#"[{"symbol":"BTCUSDT","bidPrice":"1","askPrice":"2","lastPrice":"1.5","highPrice":"3","lowPrice":"1","volume":"10"},
                {"symbol":"ETHBTC","bidPrice":"0.05","askPrice":"0.06","lastPrice":"0.055","highPrice":"0.07","lowPrice":"0.04","volume":"20"},
                {"symbol":"XRPBTC","bidPrice":"0.1","askPrice":"0.2","lastPrice":"0.15","highPrice":"0.3","lowPrice":"0.1","volume":"30"}]"#,
        )]),
    );

    h.exchange.update_tickers(AssetType::Spot).await.unwrap();
    assert_eq!(h.transport.requested().len(), 1);
    assert_eq!(h.tickers.len(), 2);
}

#[tokio::test]
async fn binance_error_body_is_venue_rejection() {
    let config = ExchangeConfig {
        enabled: true,
        available_pairs: list(&["BTC-USDT"]),
        enabled_pairs: list(&["BTC-USDT"]),
        ..ExchangeConfig::new("Binance")
    };
    let h = harness(
        "binance",
        config,
        RouteTransport::new(vec![(
            "/api/v3/depth",
            400,
            r#"{"code":-1121,"msg":"Invalid symbol."}"#,
        )]),
    );

    let result = h
        .exchange
        .update_orderbook(&CurrencyPair::new("BTC", "USDT"), AssetType::Spot)
        .await;
    match result {
        Err(Error::VenueRejected(msg)) => assert!(msg.contains("Invalid symbol")),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn signed_call_without_credentials_never_hits_the_network() {
    let config = ExchangeConfig {
        enabled: true,
        api_key: "key".into(),
        api_secret: "secret".into(),
        ..ExchangeConfig::new("Binance")
    };
    let h = harness("binance", config, RouteTransport::default());

    assert!(matches!(
        h.exchange.account_info().await,
        Err(Error::AuthNotConfigured(_))
    ));
    assert!(h.transport.requested().is_empty());
}

#[tokio::test]
async fn trading_defaults_to_not_implemented() {
    let config = ExchangeConfig {
        enabled: true,
        ..ExchangeConfig::new("ITBIT")
    };
    let h = harness("itbit", config, RouteTransport::default());

    assert!(matches!(
        h.exchange.cancel_order("42").await,
        Err(Error::NotImplemented(_))
    ));
    assert!(matches!(
        h.exchange.withdraw("BTC", "addr", 1.0).await,
        Err(Error::NotImplemented(_))
    ));
}

#[tokio::test]
async fn huobi_replaces_retired_fiat() {
    let config = ExchangeConfig {
        enabled: true,
        base_currencies: list(&["CNY", "USD"]),
        available_pairs: list(&["btc-cny", "ltc-cny"]),
        enabled_pairs: list(&["btc-cny"]),
        ..ExchangeConfig::new("Huobi")
    };
    let h = harness(
        "huobi",
        config,
        RouteTransport::new(vec![(
            "/v1/common/symbols",
            200,
            r#"{"status":"ok","data":[
                {"base-currency":"btc","quote-currency":"usdt"},
                {"base-currency":"eth","quote-currency":"btc"}
            ]}"#,
        )]),
    );

    h.exchange.run().await.unwrap();

    let persisted = h.config.exchange("Huobi").unwrap();
    assert_eq!(persisted.base_currencies, list(&["USD"]));
    assert_eq!(persisted.enabled_pairs, list(&["btc-usdt"]));
    assert_eq!(persisted.available_pairs, list(&["btc-usdt", "eth-btc"]));
}

#[tokio::test]
async fn poloniex_forces_update_on_stale_pair() {
    let config = ExchangeConfig {
        enabled: true,
        available_pairs: list(&["BTC_USDT", "BTC_LTC"]),
        enabled_pairs: list(&["BTC_LTC"]),
        ..ExchangeConfig::new("Poloniex")
    };
    let h = harness(
        "poloniex",
        config,
        RouteTransport::new(vec![(
            "returnTicker",
            200,
            r#"{"USDT_BTC":{"last":"100","lowestAsk":"101","highestBid":"99","high24hr":"110","low24hr":"90","baseVolume":"5","quoteVolume":"0.05"},
                "BTC_LTC":{"last":"0.01","lowestAsk":"0.011","highestBid":"0.009","high24hr":"0.02","low24hr":"0.005","baseVolume":"1","quoteVolume":"100"}}"#,
        )]),
    );

    h.exchange.run().await.unwrap();

    let persisted = h.config.exchange("Poloniex").unwrap();
    assert_eq!(persisted.available_pairs, list(&["BTC_LTC", "USDT_BTC"]));
    assert_eq!(persisted.enabled_pairs, list(&["BTC_LTC"]));
}

#[tokio::test]
async fn huobi_error_status_is_venue_rejection() {
    let config = ExchangeConfig {
        enabled: true,
        available_pairs: list(&["btc-usdt"]),
        enabled_pairs: list(&["btc-usdt"]),
        ..ExchangeConfig::new("Huobi")
    };
    let h = harness(
        "huobi",
        config,
        RouteTransport::new(vec![(
            "/market/detail/merged",
            200,
            r#"{"status":"error","err-code":"invalid-parameter","err-msg":"invalid symbol"}"#,
        )]),
    );

    let result = h
        .exchange
        .update_ticker(&CurrencyPair::new("BTC", "USDT"), AssetType::Spot)
        .await;
    match result {
        Err(e @ Error::VenueRejected(_)) => {
            assert!(e.is_venue_rejection());
            assert!(e.to_string().contains("invalid symbol (invalid-parameter)"));
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
    assert!(h.tickers.is_empty());
}
