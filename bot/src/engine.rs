use crate::supervisor::{self, VenueTask};
use common::config::SharedConfig;
use common::currency::CurrencyPair;
use common::models::{AssetType, OrderbookSnapshot, TickerSnapshot};
use common::{Error, Result};
use connectors::request::Transport;
use connectors::{AdapterContext, AdapterRegistry, Exchange};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use store::{OrderbookStore, TickerStore};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

struct LoadedVenue {
    exchange: Arc<dyn Exchange>,
    task: VenueTask,
}

/// Status of a loaded venue as reported to external readers
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeStatus {
    pub name: String,
    pub enabled: bool,
    pub authenticated_api_support: bool,
    pub verbose: bool,
    pub websocket: bool,
    pub polling_delay_secs: u64,
    pub asset_types: Vec<AssetType>,
    pub enabled_pairs: Vec<String>,
    pub available_pair_count: usize,
    pub pairs_last_updated: i64,
}

/// Exchange registry and lifecycle orchestrator.
///
/// Owns the set of loaded venues and their polling tasks. The caches and
/// the configuration handle are created once and shared with every adapter.
pub struct Engine {
    registry: AdapterRegistry,
    context: AdapterContext,
    venues: RwLock<BTreeMap<String, LoadedVenue>>,
}

impl Engine {
    pub fn new(registry: AdapterRegistry, config: SharedConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            context: AdapterContext {
                config,
                tickers: Arc::new(TickerStore::new()),
                orderbooks: Arc::new(OrderbookStore::new()),
                transport,
            },
            venues: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &SharedConfig {
        &self.context.config
    }

    pub fn tickers(&self) -> &TickerStore {
        &self.context.tickers
    }

    pub fn orderbooks(&self) -> &OrderbookStore {
        &self.context.orderbooks
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.venues.read().contains_key(&name.to_ascii_lowercase())
    }

    pub fn loaded_count(&self) -> usize {
        self.venues.read().len()
    }

    pub fn exchange(&self, name: &str) -> Result<Arc<dyn Exchange>> {
        self.venues
            .read()
            .get(&name.to_ascii_lowercase())
            .map(|venue| Arc::clone(&venue.exchange))
            .ok_or_else(|| Error::NotFound(format!("exchange {}", name)))
    }

    /// Loads, configures and starts polling one venue.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load(&self, name: &str) -> Result<()> {
        self.start_venue(name).map(|_| ())
    }

    fn start_venue(&self, name: &str) -> Result<oneshot::Receiver<()>> {
        let key = name.to_ascii_lowercase();
        let mut venues = self.venues.write();
        if venues.contains_key(&key) {
            return Err(Error::AlreadyLoaded(name.to_string()));
        }

        let exchange = self.registry.create(name, &self.context)?;
        exchange.set_defaults();

        let mut config = self.context.config.exchange(name)?;
        config.enabled = true;
        self.context
            .config
            .modify_exchange(name, |cfg| cfg.enabled = true)?;
        exchange.setup(&config)?;

        let (task, ready) = supervisor::start(Arc::clone(&exchange));
        venues.insert(key, LoadedVenue { exchange, task });
        info!("{} exchange loaded", name);
        Ok(ready)
    }

    /// Stops a venue and persists it as disabled.
    ///
    /// Once this returns the venue's cache entries are gone and no further
    /// writes from its task can land.
    pub fn unload(&self, name: &str) -> Result<()> {
        let venue = {
            let mut venues = self.venues.write();
            if venues.is_empty() {
                return Err(Error::NoneLoaded);
            }
            venues
                .remove(&name.to_ascii_lowercase())
                .ok_or_else(|| Error::NotFound(format!("exchange {}", name)))?
        };

        venue.exchange.set_enabled(false);
        venue.task.cancel();
        self.context.tickers.remove_exchange(name);
        self.context.orderbooks.remove_exchange(name);

        if let Err(e) = self
            .context
            .config
            .modify_exchange(name, |cfg| cfg.enabled = false)
        {
            warn!("{} unloaded but not persisted: {}", name, e);
        }
        info!("{} exchange unloaded", name);
        Ok(())
    }

    /// Re-applies the persisted configuration to a loaded venue.
    ///
    /// The polling task keeps running; it is restarted only if it has died.
    pub fn reload(&self, name: &str) -> Result<()> {
        let exchange = self.exchange(name)?;
        let config = self.context.config.exchange(name)?;
        exchange.setup(&config)?;

        if let Some(venue) = self.venues.write().get_mut(&name.to_ascii_lowercase()) {
            if venue.task.is_finished() {
                warn!("{} polling task had stopped, restarting it", name);
                let (task, _ready) = supervisor::start(Arc::clone(&venue.exchange));
                venue.task = task;
            }
        }
        info!("{} exchange reloaded", name);
        Ok(())
    }

    /// Brings the loaded set in line with the configuration.
    ///
    /// Returns after every newly started venue has finished its startup
    /// phase. Fails with `NoneLoaded` if nothing is loaded afterwards.
    pub async fn load_all(&self) -> Result<usize> {
        let config = self.context.config.snapshot();
        let mut pending = Vec::new();

        for exchange in &config.exchanges {
            if self.is_loaded(&exchange.name) {
                if let Err(e) = self.reload(&exchange.name) {
                    error!("{} failed to reload: {}", exchange.name, e);
                }
                if !exchange.enabled {
                    if let Err(e) = self.unload(&exchange.name) {
                        error!("{} failed to unload: {}", exchange.name, e);
                    }
                }
                continue;
            }

            if !exchange.enabled {
                info!("{}: Exchange support: Disabled", exchange.name);
                continue;
            }
            info!(
                "{}: Exchange support: Enabled (Authenticated API support: {} - Verbose mode: {})",
                exchange.name, exchange.authenticated_api_support, exchange.verbose
            );

            match self.start_venue(&exchange.name) {
                Ok(ready) => pending.push((exchange.name.clone(), ready)),
                Err(e) => error!("{} failed to load: {}", exchange.name, e),
            }
        }

        let started = join_all(pending.into_iter().map(|(name, ready)| async move {
            if ready.await.is_err() {
                warn!("{} task ended before finishing startup", name);
            }
        }))
        .await
        .len();

        let loaded = self.loaded_count();
        info!("{} exchanges started, {} loaded", started, loaded);
        if loaded == 0 {
            return Err(Error::NoneLoaded);
        }
        Ok(loaded)
    }

    pub async fn get_ticker(
        &self,
        name: &str,
        pair: &CurrencyPair,
        asset_type: AssetType,
    ) -> Result<Arc<TickerSnapshot>> {
        self.exchange(name)?.ticker_price(pair, asset_type).await
    }

    pub async fn get_orderbook(
        &self,
        name: &str,
        pair: &CurrencyPair,
        asset_type: AssetType,
    ) -> Result<Arc<OrderbookSnapshot>> {
        self.exchange(name)?.orderbook(pair, asset_type).await
    }

    pub fn statuses(&self) -> Vec<ExchangeStatus> {
        self.venues
            .read()
            .values()
            .map(|venue| {
                let descriptor = venue.exchange.base().descriptor();
                ExchangeStatus {
                    name: descriptor.name,
                    enabled: descriptor.enabled,
                    authenticated_api_support: descriptor.authenticated_api_support,
                    verbose: descriptor.verbose,
                    websocket: descriptor.websocket,
                    polling_delay_secs: descriptor.polling_delay.as_secs(),
                    asset_types: descriptor.asset_types,
                    available_pair_count: descriptor.available_pairs.len(),
                    enabled_pairs: descriptor.enabled_pairs,
                    pairs_last_updated: descriptor.pairs_last_updated,
                }
            })
            .collect()
    }

    /// Cancels every venue task and waits up to `timeout` for each to exit.
    pub async fn shutdown(&self, timeout: Duration) {
        let venues: Vec<(String, LoadedVenue)> = {
            let mut venues = self.venues.write();
            std::mem::take(&mut *venues).into_iter().collect()
        };

        join_all(venues.into_iter().map(|(name, venue)| async move {
            venue.exchange.set_enabled(false);
            venue.task.stop(timeout).await;
            info!("{} stopped", name);
        }))
        .await;
    }
}
