use common::models::AssetType;
use common::{Error, Result};
use connectors::Exchange;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Handle to one venue's polling task.
pub struct VenueTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl VenueTask {
    /// Asks the task to stop before its next request or sleep.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the task and waits up to `timeout` for it to exit.
    pub async fn stop(self, timeout: Duration) {
        self.cancel();
        if tokio::time::timeout(timeout, self.handle).await.is_err() {
            warn!("Venue task did not stop within {:?}", timeout);
        }
    }
}

/// Spawns the polling task for `exchange`.
///
/// The returned receiver fires once the startup phase (`run`) has finished,
/// whether or not it succeeded.
pub fn start(exchange: Arc<dyn Exchange>) -> (VenueTask, oneshot::Receiver<()>) {
    let (cancel, cancelled) = watch::channel(false);
    let (ready_tx, ready_rx) = oneshot::channel();
    let handle = tokio::spawn(poll(exchange, cancelled, ready_tx));
    (VenueTask { cancel, handle }, ready_rx)
}

async fn poll(exchange: Arc<dyn Exchange>, mut cancelled: watch::Receiver<bool>, ready: oneshot::Sender<()>) {
    let name = exchange.name();

    tokio::select! {
        _ = cancelled.changed() => {
            debug!("{} cancelled during startup", name);
            let _ = ready.send(());
            return;
        }
        result = exchange.run() => {
            if let Err(e) = result {
                error!("{} startup failed: {}", name, e);
            }
        }
    }
    let _ = ready.send(());

    loop {
        if *cancelled.borrow() {
            break;
        }

        if exchange.is_enabled() {
            tokio::select! {
                _ = cancelled.changed() => break,
                result = refresh(exchange.as_ref()) => {
                    if let Err(e) = result {
                        warn!("{} refresh failed: {}", name, e);
                    }
                }
            }
        } else {
            debug!("{} disabled, skipping refresh", name);
        }

        let delay = exchange.base().descriptor().polling_delay;
        tokio::select! {
            _ = cancelled.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    debug!("{} polling stopped", name);
}

/// One refresh cycle: tickers then orderbooks for every asset type.
///
/// Venues that batch ticker requests get one `update_tickers` call per
/// asset type; the rest are refreshed pair by pair.
pub async fn refresh(exchange: &dyn Exchange) -> Result<()> {
    let asset_types = exchange.base().asset_types();
    for asset_type in asset_types {
        refresh_asset(exchange, asset_type).await?;
    }
    Ok(())
}

async fn refresh_asset(exchange: &dyn Exchange, asset_type: AssetType) -> Result<()> {
    if exchange.base().supports_rest_ticker_batch_updates() {
        match exchange.update_tickers(asset_type).await {
            Ok(()) => {}
            Err(e @ Error::ExchangeDisabled(_)) => return Err(e),
            Err(e) => log_failure(exchange, "tickers", &e),
        }
    } else {
        for pair in exchange.enabled_currencies() {
            match exchange.update_ticker(&pair, asset_type).await {
                Ok(_) => {}
                Err(e @ Error::ExchangeDisabled(_)) => return Err(e),
                Err(e) => log_failure(exchange, &format!("ticker {}", pair), &e),
            }
        }
    }

    for pair in exchange.enabled_currencies() {
        match exchange.update_orderbook(&pair, asset_type).await {
            Ok(_) => {}
            Err(e @ Error::ExchangeDisabled(_)) => return Err(e),
            Err(e) => log_failure(exchange, &format!("orderbook {}", pair), &e),
        }
    }
    Ok(())
}

fn log_failure(exchange: &dyn Exchange, what: &str, err: &Error) {
    if err.is_venue_rejection() {
        warn!("{} rejected {} request: {}", exchange.name(), what, err);
    } else {
        error!("{} failed to update {}: {}", exchange.name(), what, err);
    }
}
