use crate::binance::Binance;
use crate::coinbase::Coinbase;
use crate::huobi::Huobi;
use crate::itbit::ItBit;
use crate::poloniex::Poloniex;
use crate::request::Transport;
use crate::Exchange;
use common::config::SharedConfig;
use common::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use store::{OrderbookStore, TickerStore};

/// Shared collaborators handed to every adapter at construction.
#[derive(Clone)]
pub struct AdapterContext {
    pub config: SharedConfig,
    pub tickers: Arc<TickerStore>,
    pub orderbooks: Arc<OrderbookStore>,
    pub transport: Arc<dyn Transport>,
}

/// Builds an adapter, or `None` if construction failed.
pub type AdapterFactory = Arc<dyn Fn(&AdapterContext) -> Option<Arc<dyn Exchange>> + Send + Sync>;

/// Maps venue names to adapter factories.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every adapter shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("binance", |ctx| Some(Arc::new(Binance::new(ctx)) as Arc<dyn Exchange>));
        registry.register("coinbase", |ctx| Some(Arc::new(Coinbase::new(ctx)) as Arc<dyn Exchange>));
        registry.register("poloniex", |ctx| Some(Arc::new(Poloniex::new(ctx)) as Arc<dyn Exchange>));
        registry.register("itbit", |ctx| Some(Arc::new(ItBit::new(ctx)) as Arc<dyn Exchange>));
        registry.register("huobi", |ctx| Some(Arc::new(Huobi::new(ctx)) as Arc<dyn Exchange>));
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&AdapterContext) -> Option<Arc<dyn Exchange>> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_ascii_lowercase(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn create(&self, name: &str, context: &AdapterContext) -> Result<Arc<dyn Exchange>> {
        let factory = self
            .factories
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::UnknownVenue(name.to_string()))?;
        factory(context).ok_or_else(|| Error::LoadFailed(name.to_string()))
    }
}
