use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-venue signed request counter.
///
/// The first value is seeded from the wall clock; every later value is the
/// previous one plus one. Allocation is a single atomic update, so concurrent
/// callers never observe the same value. Not persisted across restarts.
#[derive(Debug, Default)]
pub struct Nonce {
    value: AtomicU64,
    millis: bool,
}

impl Nonce {
    /// Seeds from unix seconds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds from unix milliseconds.
    pub fn millis() -> Self {
        Self {
            value: AtomicU64::new(0),
            millis: true,
        }
    }

    pub fn next(&self) -> u64 {
        let seed = self.seed();
        let previous = self
            .value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(if current == 0 { seed } else { current + 1 })
            });
        match previous {
            Ok(0) | Err(0) => seed,
            Ok(current) | Err(current) => current + 1,
        }
    }

    /// Last issued value, zero if none yet.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    fn seed(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let seed = if self.millis {
            now.as_millis() as u64
        } else {
            now.as_secs()
        };
        seed.max(1)
    }
}
