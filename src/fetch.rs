//! Fetch Adapter boundary
//!
//! The core only needs `fetch(url, params) -> lazy lines`. [`HttpFetcher`]
//! is the reqwest implementation used in production; tests and embedders
//! can plug in any other [`Fetcher`].

use std::io;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use tokio_util::bytes::Bytes;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tokio_util::io::StreamReader;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::params::QueryParameters;
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryConfig, with_retry};

/// Longest line accepted from a response body, in bytes
pub const MAX_LINE_LENGTH: usize = 64 * 1024 * 1024;

/// Lazily produced lines of one HTTP response body
pub type LineStream = BoxStream<'static, Result<String, TransportError>>;

/// Performs one E-utility call
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send `params` to `url` and return the body as a line stream
    ///
    /// Fails on network errors and on non-success HTTP statuses. Errors
    /// while reading the body are reported through the stream.
    async fn fetch(&self, url: &str, params: &QueryParameters) -> Result<LineStream, TransportError>;
}

/// reqwest-based [`Fetcher`] honouring NCBI rate limits
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    rate_limiter: RateLimiter,
    retry_config: RetryConfig,
}

impl HttpFetcher {
    /// Create a fetcher with the timeout, user agent, rate limit and retry
    /// policy of `config`
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(config.effective_user_agent())
            .timeout(config.timeout)
            .build()?;

        Ok(Self::with_client(client, config))
    }

    /// Use a preconfigured reqwest client
    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            rate_limiter: config.create_rate_limiter(),
            retry_config: config.retry_config.clone(),
        }
    }

    async fn send(&self, url: &str, params: &QueryParameters) -> Result<Response, TransportError> {
        self.rate_limiter.acquire().await;
        debug!(url, "Making POST request");

        let response = self.client.post(url).form(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "API request failed");
            return Err(TransportError::ApiError {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown error").to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, params), fields(url = %url))]
    async fn fetch(&self, url: &str, params: &QueryParameters) -> Result<LineStream, TransportError> {
        let response = with_retry(
            || self.send(url, params),
            &self.retry_config,
            "E-utility request",
        )
        .await?;

        Ok(response_lines(response))
    }
}

/// Split a response body into lines without buffering the whole body
fn response_lines(response: Response) -> LineStream {
    body_lines(response.bytes_stream().map_err(io::Error::other), MAX_LINE_LENGTH)
}

/// A line longer than `max_length` bytes ends the stream with an error
fn body_lines<S>(body: S, max_length: usize) -> LineStream
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    let codec = AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), max_length);

    FramedRead::new(StreamReader::new(body), codec)
        .map_ok(|line| decode_line(&line))
        .map_err(|err| TransportError::BodyError(err.to_string()))
        .boxed()
}

/// One line without its `\r`; invalid UTF-8 becomes U+FFFD
fn decode_line(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Stream over lines already held in memory
pub fn lines_from_text(text: &str) -> LineStream {
    let lines: Vec<Result<String, TransportError>> =
        text.lines().map(|line| Ok(line.to_string())).collect();
    futures_util::stream::iter(lines).boxed()
}
