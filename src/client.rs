use std::fmt;
use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{EntrezError, Result};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::paging::{self, Lines};
use crate::params::QueryParameters;
use crate::request::{self, Request};

/// Client for the NCBI E-utilities
///
/// Combines a [`ClientConfig`] with a [`Fetcher`]. Cloning is cheap and clones
/// share the fetcher (and therefore its rate limiter).
#[derive(Clone)]
pub struct EntrezClient {
    config: ClientConfig,
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
}

impl fmt::Debug for EntrezClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntrezClient")
            .field("config", &self.config)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl EntrezClient {
    /// Create a client with default configuration
    ///
    /// Uses default NCBI rate limiting (3 requests/second) and no API key.
    ///
    /// # Example
    ///
    /// ```
    /// use entrez_client::EntrezClient;
    ///
    /// let client = EntrezClient::new()?;
    /// # Ok::<(), entrez_client::EntrezError>(())
    /// ```
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::new())
    }

    /// Create a client that talks HTTP according to `config`
    ///
    /// # Example
    ///
    /// ```
    /// use entrez_client::{ClientConfig, EntrezClient};
    ///
    /// let config = ClientConfig::new()
    ///     .with_api_key("your_api_key_here")
    ///     .with_email("researcher@university.edu");
    ///
    /// let client = EntrezClient::with_config(config)?;
    /// # Ok::<(), entrez_client::EntrezError>(())
    /// ```
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config).map_err(|err| EntrezError::fetch(None, err))?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create a client that sends its calls through `fetcher`
    pub fn with_fetcher(config: ClientConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let base_url = config.effective_base_url().to_string();
        Self {
            config,
            fetcher,
            base_url,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validate `params` for `tool_name` and add the identification parameters
    pub fn build(&self, tool_name: &str, params: QueryParameters) -> Result<Request> {
        request::build(tool_name, params, &self.config)
    }

    /// Run one call exactly as given, without paging
    #[instrument(skip(self, params), fields(tool = %tool_name))]
    pub async fn query(&self, tool_name: &str, params: QueryParameters) -> Result<Lines> {
        let request = self.build(tool_name, params)?;
        let url = request.url(&self.base_url);
        debug!(%url, query = %request.query_string(), "Single call");

        let lines = self
            .fetcher
            .fetch(&url, &request.params)
            .await
            .map_err(|err| EntrezError::fetch(None, err))?;
        Ok(lines.map_err(|err| EntrezError::fetch(None, err)).boxed())
    }

    /// Lazily stream every line of a query, paging with the configured batch size
    ///
    /// Validation errors are returned immediately. No call is made until the
    /// first line is pulled.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use entrez_client::{EntrezClient, QueryParameters};
    /// use futures_util::TryStreamExt;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = EntrezClient::new()?;
    ///     let mut lines = client.paginated_query(
    ///         "fetch",
    ///         QueryParameters::from([("db", "snp"), ("id", "3000")]),
    ///     )?;
    ///     while let Some(line) = lines.try_next().await? {
    ///         println!("{line}");
    ///     }
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self, params), fields(tool = %tool_name))]
    pub fn paginated_query(&self, tool_name: &str, params: QueryParameters) -> Result<Lines> {
        self.paginated_query_with_batch(tool_name, params, self.config.batch_size)
    }

    /// [`paginated_query`](Self::paginated_query) with an explicit page size
    pub fn paginated_query_with_batch(
        &self,
        tool_name: &str,
        params: QueryParameters,
        batch_size: usize,
    ) -> Result<Lines> {
        let request = self.build(tool_name, params)?;
        self.paginate(request, batch_size)
    }

    pub(crate) fn paginate(&self, request: Request, batch_size: usize) -> Result<Lines> {
        paging::paginated_query(Arc::clone(&self.fetcher), &self.base_url, request, batch_size)
    }

    pub(crate) fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }
}
