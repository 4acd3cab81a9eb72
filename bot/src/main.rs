use bot::config::AppConfig;
use bot::{handler, Engine};
use common::config::{Config, SharedConfig};
use connectors::request::ReqwestTransport;
use connectors::AdapterRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app_config = AppConfig::from_env();
    info!("Loading config file {}", app_config.config_path.display());
    let config = Config::load(&app_config.config_path)?;
    info!("Bot '{}' started", config.name);

    let shared = SharedConfig::new(config);
    let transport = ReqwestTransport::with_timeout(shared.global_http_timeout())?;
    info!("Global HTTP timeout set to {:?}", shared.global_http_timeout());
    let engine = Arc::new(Engine::new(
        AdapterRegistry::with_builtin(),
        shared.clone(),
        Arc::new(transport),
    ));

    if let Err(e) = engine.load_all().await {
        error!("Failed to setup exchanges: {}", e);
        return Err(e.into());
    }

    let webserver = shared.snapshot().webserver;
    if webserver.enabled {
        let addr: SocketAddr = webserver.listen_address.parse()?;
        let app = handler::router(Arc::clone(&engine));
        info!("Listening on {}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::Server::bind(&addr).serve(app.into_make_service()).await {
                error!("Webserver stopped: {}", e);
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    engine.shutdown(Duration::from_secs(5)).await;

    if app_config.dry_run {
        info!("Dry run, configuration not saved");
    } else {
        shared.snapshot().save(&app_config.config_path)?;
        info!("Configuration saved to {}", app_config.config_path.display());
    }
    Ok(())
}
