mod error;
mod key;
mod snapshot;
mod snapshot_store;

pub use error::StoreError;
pub use key::MarketKey;
pub use snapshot::Snapshot;
pub use snapshot_store::SnapshotStore;

use common::models::{OrderbookSnapshot, TickerSnapshot};

pub type TickerStore = SnapshotStore<TickerSnapshot>;
pub type OrderbookStore = SnapshotStore<OrderbookSnapshot>;
