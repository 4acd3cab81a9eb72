use std::path::PathBuf;

/// Process settings read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Configuration file loaded at startup and written back on shutdown
    pub config_path: PathBuf,
    /// Skip writing the configuration back on shutdown
    pub dry_run: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("pricefeeder.toml"),
            dry_run: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config_path = std::env::var("PRICEFEEDER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pricefeeder.toml"));
        let dry_run = std::env::var("PRICEFEEDER_DRY_RUN")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            config_path,
            dry_run,
        }
    }
}
