use crate::{MarketKey, Snapshot, StoreError};
use common::Result;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Concurrency-safe snapshot cache keyed by [`MarketKey`].
///
/// Values are stored behind `Arc` and replaced wholesale, so a reader either
/// sees the previous snapshot or the new one, never a mix. Writers to
/// different keys land on different shards and do not block each other.
pub struct SnapshotStore<T> {
    entries: DashMap<MarketKey, Arc<T>>,
}

impl<T: Snapshot> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Snapshot> SnapshotStore<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &MarketKey) -> Option<Arc<T>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Validates `snapshot` and replaces whatever was cached under `key`.
    pub fn put(&self, key: MarketKey, snapshot: T) -> Result<Arc<T>> {
        let actual = snapshot.key();
        if actual != key {
            return Err(StoreError::KeyMismatch {
                expected: key.to_string(),
                actual: actual.to_string(),
            }
            .into());
        }
        snapshot.validate()?;

        let snapshot = Arc::new(snapshot);
        self.entries.insert(key, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Returns the cached snapshot, or runs `refresh` on a miss.
    ///
    /// `refresh` is expected to fetch from the venue and [`put`](Self::put)
    /// the result itself; its error is returned as is and nothing stale is
    /// substituted.
    pub async fn get_or_refresh<F, Fut>(&self, key: &MarketKey, refresh: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>>>,
    {
        if let Some(snapshot) = self.get(key) {
            return Ok(snapshot);
        }
        debug!("Cache miss for {}, refreshing", key);
        refresh().await
    }

    pub fn remove(&self, key: &MarketKey) -> Option<Arc<T>> {
        self.entries.remove(key).map(|(_, snapshot)| snapshot)
    }

    /// Drops every snapshot belonging to `exchange`.
    pub fn remove_exchange(&self, exchange: &str) -> usize {
        let exchange = exchange.to_ascii_lowercase();
        let mut removed = 0;
        self.entries.retain(|key, _| {
            let keep = key.exchange != exchange;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn keys_for_exchange(&self, exchange: &str) -> Vec<MarketKey> {
        let exchange = exchange.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|entry| entry.key().exchange == exchange)
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TickerStore;
    use common::currency::CurrencyPair;
    use common::models::{AssetType, TickerSnapshot};
    use common::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ticker(exchange: &str, last: f64) -> TickerSnapshot {
        let mut ticker = TickerSnapshot::new(exchange, CurrencyPair::new("BTC", "USD"), AssetType::Spot);
        ticker.last = last;
        ticker
    }

    #[test]
    fn put_replaces_wholesale() {
        let store = TickerStore::new();
        let key = ticker("coinbase", 1.0).key();
        store.put(key.clone(), ticker("coinbase", 1.0)).unwrap();
        let first = store.get(&key).unwrap();
        store.put(key.clone(), ticker("Coinbase", 2.0)).unwrap();

        assert_eq!(first.last, 1.0);
        assert_eq!(store.get(&key).unwrap().last, 2.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn put_rejects_mismatched_key() {
        let store = TickerStore::new();
        let key = ticker("coinbase", 1.0).key();
        let err = store.put(key, ticker("binance", 1.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn get_or_refresh_only_refreshes_on_miss() {
        let store = TickerStore::new();
        let key = ticker("coinbase", 1.0).key();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let snapshot = store
                .get_or_refresh(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    store.put(key.clone(), ticker("coinbase", 42.0))
                })
                .await
                .unwrap();
            assert_eq!(snapshot.last, 42.0);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_refresh_returns_error() {
        let store = TickerStore::new();
        let key = ticker("coinbase", 1.0).key();
        let result = store
            .get_or_refresh(&key, || async { Err(Error::RequestFailed("down".into())) })
            .await;
        assert!(matches!(result, Err(Error::RequestFailed(_))));
        assert!(store.get(&key).is_none());
    }

    #[test]
    fn remove_exchange_only_drops_that_venue() {
        let store = TickerStore::new();
        for venue in ["coinbase", "binance"] {
            let snapshot = ticker(venue, 1.0);
            store.put(snapshot.key(), snapshot).unwrap();
        }
        assert_eq!(store.remove_exchange("COINBASE"), 1);
        assert!(store.keys_for_exchange("coinbase").is_empty());
        assert_eq!(store.keys_for_exchange("binance").len(), 1);
    }

    #[test]
    fn remove_exchange_counts_while_other_venues_write() {
        let store = Arc::new(TickerStore::new());
        for i in 0..50 {
            let mut snapshot = ticker("unloaded", 1.0);
            snapshot.pair = CurrencyPair::new(format!("C{}", i), "USD");
            store.put(snapshot.key(), snapshot).unwrap();
        }

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let mut snapshot = ticker(&format!("venue{}", w), 1.0);
                        snapshot.pair = CurrencyPair::new(format!("C{}", i), "USD");
                        store.put(snapshot.key(), snapshot).unwrap();
                    }
                })
            })
            .collect();

        assert_eq!(store.remove_exchange("unloaded"), 50);
        for writer in writers {
            writer.join().unwrap();
        }
        assert!(store.keys_for_exchange("unloaded").is_empty());
        assert_eq!(store.len(), 2000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_never_tear() {
        let store = Arc::new(TickerStore::new());
        let key = ticker("coinbase", 0.0).key();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    let mut snapshot = ticker("coinbase", i as f64);
                    snapshot.bid = i as f64;
                    store.put(key.clone(), snapshot).unwrap();
                    let seen = store.get(&key).unwrap();
                    assert_eq!(seen.bid, seen.last);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
