use crate::registry::AdapterContext;
use crate::request::{Credentials, Requester};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use common::config::{ExchangeConfig, SharedConfig};
use common::currency::{diff_pairs, normalise_list, CurrencyPair, CurrencyPairFormatConfig};
use common::models::{AssetType, OrderbookSnapshot, TickerSnapshot};
use common::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use store::{OrderbookStore, Snapshot, TickerStore};
use tracing::{error, info, warn};

/// Per-venue capability state
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub name: String,
    pub enabled: bool,
    pub verbose: bool,
    pub websocket: bool,
    pub authenticated_api_support: bool,
    /// Secret is base64 in the configuration and decoded before signing
    pub api_secret_base64: bool,
    pub polling_delay: Duration,
    pub http_timeout: Duration,
    pub base_currencies: Vec<String>,
    /// Pair symbols in the config format
    pub available_pairs: Vec<String>,
    /// Pair symbols in the config format, always a subset of `available_pairs`
    pub enabled_pairs: Vec<String>,
    pub asset_types: Vec<AssetType>,
    pub request_format: CurrencyPairFormatConfig,
    pub config_format: CurrencyPairFormatConfig,
    pub pairs_last_updated: i64,
    pub supports_auto_pair_updating: bool,
    pub supports_rest_ticker_batching: bool,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: false,
            verbose: false,
            websocket: false,
            authenticated_api_support: false,
            api_secret_base64: false,
            polling_delay: Duration::from_secs(common::config::DEFAULT_POLLING_DELAY_SECS),
            http_timeout: Duration::from_secs(common::config::DEFAULT_HTTP_TIMEOUT_SECS),
            base_currencies: Vec::new(),
            available_pairs: Vec::new(),
            enabled_pairs: Vec::new(),
            asset_types: vec![AssetType::Spot],
            request_format: CurrencyPairFormatConfig::default(),
            config_format: CurrencyPairFormatConfig::new("-", true),
            pairs_last_updated: 0,
            supports_auto_pair_updating: false,
            supports_rest_ticker_batching: false,
        }
    }
}

/// State and behaviour shared by every venue adapter.
///
/// Adapters own one of these and delegate the common capability methods to
/// it. The descriptor lock also gates cache writes, so flipping `enabled`
/// off stops any later publish from landing.
pub struct ExchangeBase {
    descriptor: RwLock<Descriptor>,
    config: SharedConfig,
    requester: Requester,
    tickers: Arc<TickerStore>,
    orderbooks: Arc<OrderbookStore>,
}

impl ExchangeBase {
    pub fn new(context: &AdapterContext, requester: Requester) -> Self {
        Self {
            descriptor: RwLock::new(Descriptor::default()),
            config: context.config.clone(),
            requester,
            tickers: Arc::clone(&context.tickers),
            orderbooks: Arc::clone(&context.orderbooks),
        }
    }

    pub fn apply_defaults(&self, defaults: Descriptor) {
        self.requester.set_authenticated(defaults.authenticated_api_support);
        self.requester.set_verbose(defaults.verbose);
        *self.descriptor.write() = defaults;
    }

    pub fn descriptor(&self) -> Descriptor {
        self.descriptor.read().clone()
    }

    pub fn name(&self) -> String {
        self.descriptor.read().name.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.descriptor.read().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.descriptor.write().enabled = enabled;
    }

    pub fn config_format(&self) -> CurrencyPairFormatConfig {
        self.descriptor.read().config_format.clone()
    }

    pub fn asset_types(&self) -> Vec<AssetType> {
        self.descriptor.read().asset_types.clone()
    }

    pub fn is_verbose(&self) -> bool {
        self.descriptor.read().verbose
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn tickers(&self) -> &TickerStore {
        &self.tickers
    }

    pub fn orderbooks(&self) -> &OrderbookStore {
        &self.orderbooks
    }

    /// Applies the venue's persisted configuration.
    pub fn setup(&self, config: &ExchangeConfig) -> Result<()> {
        if !config.enabled {
            self.set_enabled(false);
            return Ok(());
        }

        let base64_secret = {
            let mut descriptor = self.descriptor.write();
            descriptor.enabled = true;
            descriptor.verbose = config.verbose;
            descriptor.websocket = config.websocket;
            descriptor.authenticated_api_support = config.authenticated_api_support;
            descriptor.polling_delay = config.polling_delay();
            descriptor.http_timeout = config.http_timeout();
            descriptor.base_currencies = config.base_currencies.clone();
            descriptor.api_secret_base64
        };
        self.requester.set_verbose(config.verbose);
        self.requester.set_timeout(config.http_timeout());
        self.requester.set_authenticated(config.authenticated_api_support);
        self.set_api_keys(&config.api_key, &config.api_secret, &config.client_id, base64_secret);

        self.set_currency_pair_format()?;
        self.set_asset_types()?;
        self.set_auto_pair_defaults()?;

        let mut descriptor = self.descriptor.write();
        let format = descriptor.config_format.clone();
        descriptor.available_pairs = normalise_list(&format, &config.available_pairs);
        descriptor.enabled_pairs = normalise_list(&format, &config.enabled_pairs);
        Ok(())
    }

    /// Stores credentials when authenticated support is on; otherwise a no-op.
    ///
    /// A base64 secret that fails to decode switches authenticated support off.
    pub fn set_api_keys(&self, api_key: &str, api_secret: &str, client_id: &str, base64_secret: bool) {
        let mut descriptor = self.descriptor.write();
        if !descriptor.authenticated_api_support {
            return;
        }

        let secret = if base64_secret {
            match BASE64.decode(api_secret) {
                Ok(secret) => secret,
                Err(e) => {
                    error!(
                        "{} unable to base64 decode API secret: {}. Authenticated API support disabled",
                        descriptor.name, e
                    );
                    descriptor.authenticated_api_support = false;
                    self.requester.set_authenticated(false);
                    return;
                }
            }
        } else {
            api_secret.as_bytes().to_vec()
        };

        self.requester.set_credentials(Credentials {
            api_key: api_key.to_string(),
            api_secret: secret,
            client_id: client_id.to_string(),
        });
    }

    /// Loads both pair formats from the configuration, seeding it with the
    /// venue defaults where a format is absent.
    pub fn set_currency_pair_format(&self) -> Result<()> {
        let name = self.name();
        let config = self.config.exchange(&name)?;
        let mut descriptor = self.descriptor.write();

        let seed_request = match config.request_currency_pair_format {
            Some(format) => {
                descriptor.request_format = format;
                None
            }
            None => Some(descriptor.request_format.clone()),
        };
        let seed_config = match config.config_currency_pair_format {
            Some(format) => {
                descriptor.config_format = format;
                None
            }
            None => Some(descriptor.config_format.clone()),
        };

        if seed_request.is_some() || seed_config.is_some() {
            self.config.modify_exchange(&name, |cfg| {
                if let Some(format) = seed_request {
                    cfg.request_currency_pair_format = Some(format);
                }
                if let Some(format) = seed_config {
                    cfg.config_currency_pair_format = Some(format);
                }
            })?;
        }
        Ok(())
    }

    pub fn set_asset_types(&self) -> Result<()> {
        let name = self.name();
        let config = self.config.exchange(&name)?;
        let mut descriptor = self.descriptor.write();

        if config.asset_types.is_empty() {
            let defaults = descriptor.asset_types.clone();
            self.config
                .modify_exchange(&name, |cfg| cfg.asset_types = defaults)?;
        } else {
            descriptor.asset_types = config.asset_types;
        }
        Ok(())
    }

    pub fn set_auto_pair_defaults(&self) -> Result<()> {
        let name = self.name();
        let config = self.config.exchange(&name)?;
        let mut descriptor = self.descriptor.write();

        if config.supports_auto_pair_updates != descriptor.supports_auto_pair_updating {
            let supported = descriptor.supports_auto_pair_updating;
            self.config
                .modify_exchange(&name, |cfg| cfg.supports_auto_pair_updates = supported)?;
        }
        if config.pairs_last_updated != 0 {
            descriptor.pairs_last_updated = config.pairs_last_updated;
        }
        Ok(())
    }

    /// Reconciles the venue's reported symbols with the persisted lists.
    ///
    /// With `is_enabled_list` the symbols target the enabled list (replaced
    /// when forced, merged otherwise); any enabled symbol missing from the
    /// available list is added to it. Otherwise the available list is diffed
    /// and stale enabled entries are pruned.
    pub fn update_currencies(&self, symbols: &[String], is_enabled_list: bool, force: bool) -> Result<()> {
        self.update_pair_lists(symbols, is_enabled_list, force, &[])
    }

    /// Forced reset used when the persisted notation no longer matches the
    /// venue: the enabled list becomes `seed`, the available list becomes
    /// `venue_symbols`.
    pub fn force_upgrade(&self, venue_symbols: &[String], seed: &[&str]) -> Result<()> {
        warn!(
            "{} available and enabled pairs reset due to config upgrade, please enable the ones you would like again",
            self.name()
        );
        let seed: Vec<String> = seed.iter().map(|s| s.to_string()).collect();
        self.update_pair_lists(&seed, true, true, &[])?;
        self.update_pair_lists(venue_symbols, false, true, &seed)
    }

    fn update_pair_lists(
        &self,
        symbols: &[String],
        is_enabled_list: bool,
        force: bool,
        seed: &[String],
    ) -> Result<()> {
        let mut descriptor = self.descriptor.write();
        let name = descriptor.name.clone();
        let format = descriptor.config_format.clone();

        let symbols = normalise_list(&format, symbols);
        if symbols.is_empty() {
            return Err(Error::ConfigError(format!("{} reported no currency pairs", name)));
        }
        let available = normalise_list(&format, &descriptor.available_pairs);
        let enabled = normalise_list(&format, &descriptor.enabled_pairs);

        let (new_available, new_enabled) = if is_enabled_list {
            let new_enabled = if force {
                symbols
            } else {
                let mut merged = enabled.clone();
                merged.extend(symbols.into_iter().filter(|s| !enabled.contains(s)));
                merged
            };
            let mut new_available = available.clone();
            for symbol in &new_enabled {
                if !new_available.contains(symbol) {
                    new_available.push(symbol.clone());
                }
            }
            (new_available, new_enabled)
        } else {
            let seed = normalise_list(&format, seed);
            let diff = diff_pairs(&available, &enabled, &symbols, force, &seed);
            if !diff.added.is_empty() {
                info!("{} new currency pairs: {:?}", name, diff.added);
            }
            if !diff.removed.is_empty() {
                info!("{} removed currency pairs: {:?}", name, diff.removed);
            }
            if !diff.pruned.is_empty() {
                warn!("{} disabled pairs no longer offered: {:?}", name, diff.pruned);
            }
            if diff.reset {
                warn!("{} enabled pairs reset to {:?}", name, diff.enabled);
            }
            (diff.available, diff.enabled)
        };

        let changed = new_available != available || new_enabled != enabled;
        if !changed && !force {
            return Ok(());
        }

        let stamp = Utc::now().timestamp();
        self.config.modify_exchange(&name, |cfg| {
            if is_enabled_list {
                info!("{} updating enabled pairs ({} entries)", name, new_enabled.len());
            } else {
                info!("{} updating available pairs ({} entries)", name, new_available.len());
            }
            cfg.available_pairs = new_available.clone();
            cfg.enabled_pairs = new_enabled.clone();
            cfg.pairs_last_updated = stamp;
        })?;

        descriptor.available_pairs = new_available;
        descriptor.enabled_pairs = new_enabled;
        descriptor.pairs_last_updated = stamp;
        Ok(())
    }

    /// Replaces one list with `pairs` written in the config format.
    pub fn set_currencies(&self, pairs: &[CurrencyPair], enabled: bool) -> Result<()> {
        let format = self.descriptor.read().config_format.clone();
        let symbols: Vec<String> = pairs.iter().map(|pair| format.format(pair)).collect();
        self.update_currencies(&symbols, enabled, true)
    }

    pub fn enabled_currencies(&self) -> Vec<CurrencyPair> {
        let descriptor = self.descriptor.read();
        parse_pairs(&descriptor.name, &descriptor.config_format, &descriptor.enabled_pairs)
    }

    pub fn available_currencies(&self) -> Vec<CurrencyPair> {
        let descriptor = self.descriptor.read();
        parse_pairs(&descriptor.name, &descriptor.config_format, &descriptor.available_pairs)
    }

    pub fn supports_currency(&self, pair: &CurrencyPair, enabled_only: bool) -> bool {
        let pairs = if enabled_only {
            self.enabled_currencies()
        } else {
            self.available_currencies()
        };
        pairs.contains(pair)
    }

    /// Wire form of `pair` for this venue.
    pub fn format_exchange_currency(&self, pair: &CurrencyPair) -> String {
        self.descriptor.read().request_format.format(pair)
    }

    /// Wire forms of `pairs` joined by the request separator.
    pub fn format_exchange_currencies(&self, pairs: &[CurrencyPair]) -> Result<String> {
        if pairs.is_empty() {
            return Err(Error::ConfigError(format!("{} has no pairs to format", self.name())));
        }
        Ok(self.descriptor.read().request_format.format_many(pairs))
    }

    /// Swaps an unsupported base currency and persists the new list.
    ///
    /// Returns whether anything was replaced.
    pub fn substitute_base_currency(&self, from: &str, to: &str) -> Result<bool> {
        let mut descriptor = self.descriptor.write();
        if !descriptor.base_currencies.iter().any(|c| c.eq_ignore_ascii_case(from)) {
            return Ok(false);
        }

        let mut replaced: Vec<String> = Vec::with_capacity(descriptor.base_currencies.len());
        for currency in &descriptor.base_currencies {
            let currency = if currency.eq_ignore_ascii_case(from) {
                to.to_ascii_uppercase()
            } else {
                currency.clone()
            };
            if !replaced.contains(&currency) {
                replaced.push(currency);
            }
        }
        info!("{} base currency {} replaced by {}", descriptor.name, from, to);
        descriptor.base_currencies = replaced.clone();
        self.config
            .modify_exchange(&descriptor.name, |cfg| cfg.base_currencies = replaced)?;
        Ok(true)
    }

    pub fn last_pairs_update_time(&self) -> i64 {
        self.descriptor.read().pairs_last_updated
    }

    pub fn supports_auto_pair_updates(&self) -> bool {
        self.descriptor.read().supports_auto_pair_updating
    }

    pub fn supports_rest_ticker_batch_updates(&self) -> bool {
        self.descriptor.read().supports_rest_ticker_batching
    }

    /// Writes a ticker to the cache unless the venue has been disabled.
    pub fn publish_ticker(&self, ticker: TickerSnapshot) -> Result<Arc<TickerSnapshot>> {
        let descriptor = self.descriptor.read();
        if !descriptor.enabled {
            return Err(Error::ExchangeDisabled(descriptor.name.clone()));
        }
        self.tickers.put(ticker.key(), ticker)
    }

    /// Writes an orderbook to the cache unless the venue has been disabled.
    pub fn publish_orderbook(&self, mut orderbook: OrderbookSnapshot) -> Result<Arc<OrderbookSnapshot>> {
        let descriptor = self.descriptor.read();
        if !descriptor.enabled {
            return Err(Error::ExchangeDisabled(descriptor.name.clone()));
        }
        orderbook.sort();
        self.orderbooks.put(orderbook.key(), orderbook)
    }

    /// Logs the bootstrap diagnostics printed by `run` in verbose mode.
    pub fn log_run_diagnostics(&self, websocket_url: &str) {
        let descriptor = self.descriptor.read();
        if !descriptor.verbose {
            return;
        }
        info!(
            "{} Websocket: {} (url: {})",
            descriptor.name,
            if descriptor.websocket { "Enabled" } else { "Disabled" },
            websocket_url
        );
        info!("{} polling delay: {}s", descriptor.name, descriptor.polling_delay.as_secs());
        info!(
            "{} {} currencies enabled: {:?}",
            descriptor.name,
            descriptor.enabled_pairs.len(),
            descriptor.enabled_pairs
        );
    }
}

fn parse_pairs(name: &str, format: &CurrencyPairFormatConfig, symbols: &[String]) -> Vec<CurrencyPair> {
    symbols
        .iter()
        .filter_map(|symbol| match format.parse(symbol) {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!("{} skipping pair {}: {}", name, symbol, e);
                None
            }
        })
        .collect()
}
