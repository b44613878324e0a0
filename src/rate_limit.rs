use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, instrument};

/// Token bucket shared by every call a client makes
///
/// NCBI allows 3 requests per second per caller, 10 with an API key
/// (see [`ClientConfig::effective_rate_limit`](crate::ClientConfig::effective_rate_limit)).
/// Clones share one bucket.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    per_second: f64,
    refilled_at: Instant,
}

impl TokenBucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let earned = now.duration_since(self.refilled_at).as_secs_f64() * self.per_second;
        self.tokens = (self.tokens + earned).min(self.capacity);
        self.refilled_at = now;
    }

    /// Take a token, or say how long until one is available
    fn take(&mut self) -> Result<(), Duration> {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / self.per_second))
        }
    }
}

impl RateLimiter {
    /// Allow `per_second` calls per second, starting with a full bucket
    ///
    /// Non-positive or non-finite rates fall back to one call per second.
    pub fn new(per_second: f64) -> Self {
        let per_second = if per_second.is_finite() && per_second > 0.0 {
            per_second
        } else {
            1.0
        };
        let capacity = per_second.max(1.0);
        Self {
            bucket: Arc::new(Mutex::new(TokenBucket {
                tokens: capacity,
                capacity,
                per_second,
                refilled_at: Instant::now(),
            })),
        }
    }

    /// Wait until a call may be sent
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        loop {
            let taken = self.bucket.lock().await.take();
            match taken {
                Ok(()) => return,
                Err(wait) => {
                    debug!(wait_ms = wait.as_millis(), "Waiting for rate limit token");
                    sleep(wait).await;
                }
            }
        }
    }

    #[cfg(test)]
    async fn tokens(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill();
        bucket.tokens
    }

    #[cfg(test)]
    async fn per_second(&self) -> f64 {
        self.bucket.lock().await.per_second
    }
}
