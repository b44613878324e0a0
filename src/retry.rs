//! Retry policy for the HTTP Fetch Adapter
//!
//! The paging and selection layers never retry. Only the HTTP adapter
//! re-sends a request, and only for transient transport failures
//! (timeouts, connection errors, HTTP 429 and 5xx), which is how NCBI
//! signals that a client should slow down.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

/// Classification of errors into transient and permanent ones
pub trait RetryableError {
    /// Whether sending the same request again may succeed
    fn is_retryable(&self) -> bool;

    /// Short human-readable reason, used in logs
    fn retry_reason(&self) -> &str;
}

/// Retry configuration for HTTP requests
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry; doubles on each following retry
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Create the default retry configuration (3 retries, 500ms initial delay)
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Configuration that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::new()
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        let factor = u64::try_from(self.initial_delay.as_millis() / 2).unwrap_or(u64::MAX);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_delay)
            .map(jitter)
            .take(self.max_retries)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `operation`, retrying transient failures according to `config`
///
/// `context` names the operation in log messages.
pub async fn with_retry<F, Fut, T, E>(operation: F, config: &RetryConfig, context: &str) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + Display,
{
    let result = RetryIf::start(config.strategy(), operation, |err: &E| {
        let retry = err.is_retryable();
        if retry {
            warn!(context, reason = err.retry_reason(), error = %err, "Retrying request");
        }
        retry
    })
    .await;

    if let Err(err) = &result {
        debug!(context, error = %err, "Request failed without further retries");
    }

    result
}
