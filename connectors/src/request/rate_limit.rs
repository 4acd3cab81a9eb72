use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Token bucket for one venue and auth class.
///
/// Holds up to `capacity` tokens, refilled at `capacity` per `period`.
/// A capacity of zero disables limiting.
#[derive(Debug)]
pub struct RateLimit {
    capacity: u32,
    period: Duration,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl RateLimit {
    pub fn new(capacity: u32, period: Duration) -> Self {
        Self {
            capacity,
            period,
            bucket: Mutex::new(Bucket {
                tokens: capacity as f64,
                refilled_at: Instant::now(),
            }),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0, Duration::from_secs(1))
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Waits until a slot is available and takes it.
    pub async fn acquire(&self) {
        if self.capacity == 0 || self.period.is_zero() {
            return;
        }
        loop {
            let wait = match self.try_take() {
                None => return,
                Some(wait) => wait,
            };
            sleep(wait).await;
        }
    }

    /// Takes a token, or returns how long until one is available.
    fn try_take(&self) -> Option<Duration> {
        let capacity = self.capacity as f64;
        let per_token = self.period.as_secs_f64() / capacity;

        let mut bucket = self.bucket.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed / per_token).min(capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            None
        } else {
            Some(Duration::from_secs_f64((1.0 - bucket.tokens) * per_token))
        }
    }
}
