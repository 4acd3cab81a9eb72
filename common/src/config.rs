use crate::currency::CurrencyPairFormatConfig;
use crate::models::AssetType;
use crate::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_POLLING_DELAY_SECS: u64 = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Top level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub name: String,
    pub global_http_timeout_secs: u64,
    pub webserver: WebserverConfig,
    pub exchanges: Vec<ExchangeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "pricefeeder".to_string(),
            global_http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            webserver: WebserverConfig::default(),
            exchanges: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebserverConfig {
    pub enabled: bool,
    pub listen_address: String,
}

impl Default for WebserverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: "0.0.0.0:9050".to_string(),
        }
    }
}

/// Per-exchange configuration record.
///
/// Pair lists are written in the exchange's config pair format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub name: String,
    pub enabled: bool,
    pub verbose: bool,
    pub websocket: bool,
    pub authenticated_api_support: bool,
    pub api_key: String,
    pub api_secret: String,
    pub client_id: String,
    pub base_currencies: Vec<String>,
    pub available_pairs: Vec<String>,
    pub enabled_pairs: Vec<String>,
    pub request_currency_pair_format: Option<CurrencyPairFormatConfig>,
    pub config_currency_pair_format: Option<CurrencyPairFormatConfig>,
    pub asset_types: Vec<AssetType>,
    pub rest_polling_delay_secs: u64,
    pub http_timeout_secs: u64,
    pub supports_auto_pair_updates: bool,
    pub pairs_last_updated: i64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: false,
            verbose: false,
            websocket: false,
            authenticated_api_support: false,
            api_key: String::new(),
            api_secret: String::new(),
            client_id: String::new(),
            base_currencies: Vec::new(),
            available_pairs: Vec::new(),
            enabled_pairs: Vec::new(),
            request_currency_pair_format: None,
            config_currency_pair_format: None,
            asset_types: Vec::new(),
            rest_polling_delay_secs: DEFAULT_POLLING_DELAY_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            supports_auto_pair_updates: false,
            pairs_last_updated: 0,
        }
    }
}

impl ExchangeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn polling_delay(&self) -> Duration {
        Duration::from_secs(self.rest_polling_delay_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        if self.http_timeout_secs == 0 {
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.http_timeout_secs)
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)
            .map_err(|e| Error::ConfigError(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let raw = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("failed to encode config: {}", e)))?;
        std::fs::write(path, raw).map_err(|e| {
            Error::ConfigError(format!("failed to write {}: {}", path.display(), e))
        })
    }

    /// Rejects unnamed and duplicate exchange entries.
    pub fn validate(&self) -> Result<()> {
        for (i, exchange) in self.exchanges.iter().enumerate() {
            if exchange.name.trim().is_empty() {
                return Err(Error::ConfigError(format!("exchange #{} has no name", i)));
            }
            let duplicate = self.exchanges[..i]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&exchange.name));
            if duplicate {
                return Err(Error::ConfigError(format!(
                    "exchange {} is configured more than once",
                    exchange.name
                )));
            }
        }
        Ok(())
    }

    pub fn exchange(&self, name: &str) -> Option<&ExchangeConfig> {
        self.exchanges
            .iter()
            .find(|exchange| exchange.name.eq_ignore_ascii_case(name))
    }

    pub fn count_enabled(&self) -> usize {
        self.exchanges.iter().filter(|exchange| exchange.enabled).count()
    }
}

/// Shared handle to the configuration record.
///
/// Adapters read their entry at setup and write back pair lists, the enabled
/// flag and base currencies through this handle.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<Config>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn exchange(&self, name: &str) -> Result<ExchangeConfig> {
        self.inner
            .read()
            .exchange(name)
            .cloned()
            .ok_or_else(|| Error::MissingConfig(name.to_string()))
    }

    pub fn update_exchange(&self, updated: ExchangeConfig) -> Result<()> {
        let mut config = self.inner.write();
        match config
            .exchanges
            .iter_mut()
            .find(|exchange| exchange.name.eq_ignore_ascii_case(&updated.name))
        {
            Some(entry) => {
                *entry = updated;
                Ok(())
            }
            None => Err(Error::MissingConfig(updated.name)),
        }
    }

    /// Applies `f` to the named entry under the write lock.
    pub fn modify_exchange<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut ExchangeConfig),
    {
        let mut config = self.inner.write();
        let entry = config
            .exchanges
            .iter_mut()
            .find(|exchange| exchange.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::MissingConfig(name.to_string()))?;
        f(entry);
        Ok(())
    }

    pub fn snapshot(&self) -> Config {
        self.inner.read().clone()
    }

    pub fn count_enabled(&self) -> usize {
        self.inner.read().count_enabled()
    }

    pub fn global_http_timeout(&self) -> Duration {
        Duration::from_secs(self.inner.read().global_http_timeout_secs.max(1))
    }
}
