//! Client configuration
//!
//! A `ClientConfig` is built once, usually at process start, and handed to
//! [`EntrezClient`](crate::EntrezClient). It is never mutated afterwards;
//! per-call overrides are expressed by passing the parameter explicitly.

use std::time::Duration;

use crate::params::QueryParameters;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryConfig;

/// Default base URL of the E-utilities
pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Default page size for paginated retrieval
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Configuration for [`EntrezClient`](crate::EntrezClient)
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// NCBI API key, raises the rate limit to 10 requests/second
    pub api_key: Option<String>,
    /// Contact email sent with every request
    pub email: Option<String>,
    /// Application name sent as the `tool` parameter
    pub tool: Option<String>,
    /// Requests per second; derived from the API key when unset
    pub rate_limit: Option<f64>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Base URL override (tests point this at a mock server)
    pub base_url: Option<String>,
    /// User-Agent override
    pub user_agent: Option<String>,
    /// Number of records requested per page
    pub batch_size: usize,
    /// Retry policy of the HTTP adapter
    pub retry_config: RetryConfig,
}

impl ClientConfig {
    /// Create a configuration with NCBI defaults and no credentials
    ///
    /// # Example
    ///
    /// ```
    /// use entrez_client::ClientConfig;
    ///
    /// let config = ClientConfig::new()
    ///     .with_email("researcher@university.edu")
    ///     .with_api_key("your_api_key_here");
    /// assert_eq!(config.effective_rate_limit(), 10.0);
    /// ```
    pub fn new() -> Self {
        Self {
            api_key: None,
            email: None,
            tool: None,
            rate_limit: None,
            timeout: Duration::from_secs(30),
            base_url: None,
            user_agent: None,
            batch_size: DEFAULT_BATCH_SIZE,
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_tool<S: Into<String>>(mut self, tool: S) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: f64) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the page size; zero is raised to one
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Requests per second actually enforced
    pub fn effective_rate_limit(&self) -> f64 {
        self.rate_limit.unwrap_or(if self.api_key.is_some() {
            10.0
        } else {
            3.0
        })
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("entrez-client/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn create_rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.effective_rate_limit())
    }

    /// Identification parameters (`api_key`, `email`, `tool`) that are configured
    pub fn build_api_params(&self) -> QueryParameters {
        let mut params = QueryParameters::new();
        if let Some(api_key) = self.api_key.as_deref().filter(|v| !v.is_empty()) {
            params.insert("api_key", api_key);
        }
        if let Some(email) = self.email.as_deref().filter(|v| !v.is_empty()) {
            params.insert("email", email);
        }
        if let Some(tool) = self.tool.as_deref().filter(|v| !v.is_empty()) {
            params.insert("tool", tool);
        }
        params
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
