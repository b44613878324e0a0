use std::result;

use thiserror::Error;

use crate::paging::PageWindow;
use crate::retry::RetryableError;
use crate::tools::Tool;

/// Error types for E-utility operations
#[derive(Error, Debug)]
pub enum EntrezError {
    /// Tool name is not one of the nine E-utilities
    #[error("Unknown E-utility `{name}`; valid tools are: {valid}")]
    UnknownTool { name: String, valid: String },

    /// One or more required parameters are absent
    #[error("Missing required parameter(s) for `{tool}`: {}", .missing.join(", "))]
    MissingParameter { tool: Tool, missing: Vec<String> },

    /// A parameter has a value the client needs to interpret and cannot
    #[error("Invalid value for parameter `{name}`: {value:?}")]
    InvalidParameter { name: String, value: String },

    /// Tool cannot create or consume a history selection
    #[error("Tool `{tool}` cannot be used with a history selection: {reason}")]
    IncompatibleTool { tool: Tool, reason: String },

    /// Selection used against a database other than its own
    #[error("Selection belongs to database `{selection_db}` but `{requested_db}` was requested")]
    DatabaseMismatch {
        selection_db: String,
        requested_db: String,
    },

    /// Response of a selecting call lacks the history fields
    #[error("Could not read selection from `{tool}` response: {reason}")]
    SelectionParseError { tool: Tool, reason: String },

    /// Network or HTTP failure, optionally tied to the page being fetched
    #[error("Fetch failed{}: {source}", describe_window(.window))]
    FetchError {
        window: Option<PageWindow>,
        #[source]
        source: TransportError,
    },

    /// Malformed XML input
    #[error("XML parsing error at line {line} (byte {position}): {message}")]
    XmlParseError {
        position: u64,
        line: usize,
        message: String,
    },
}

fn describe_window(window: &Option<PageWindow>) -> String {
    match window {
        Some(w) => format!(" for window retstart={} retmax={}", w.start, w.size),
        None => String::new(),
    }
}

impl EntrezError {
    /// Wrap a transport failure that happened while fetching `window`
    pub(crate) fn fetch(window: Option<PageWindow>, source: TransportError) -> Self {
        EntrezError::FetchError { window, source }
    }
}

/// Failures of the Fetch Adapter (HTTP layer)
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Response body could not be read as lines of text
    #[error("Response body error: {0}")]
    BodyError(String),
}

pub type Result<T> = result::Result<T, EntrezError>;

impl RetryableError for TransportError {
    fn is_retryable(&self) -> bool {
        match self {
            TransportError::RequestError(err) => {
                if err.is_timeout() || err.is_connect() {
                    return true;
                }

                if let Some(status) = err.status() {
                    return status.is_server_error() || status.as_u16() == 429;
                }

                !err.is_builder() && !err.is_redirect() && !err.is_decode()
            }

            TransportError::ApiError { status, .. } => {
                (*status >= 500 && *status < 600) || *status == 429
            }

            // Body errors happen mid-stream, after lines were handed out
            TransportError::BodyError(_) => false,
        }
    }

    fn retry_reason(&self) -> &str {
        match self {
            TransportError::RequestError(err) if err.is_timeout() => "Request timeout",
            TransportError::RequestError(err) if err.is_connect() => "Connection error",
            TransportError::RequestError(_) => "Network error",
            TransportError::ApiError { status, .. } => match status {
                429 => "Rate limit exceeded",
                500..=599 => "Server error",
                _ => "Client error",
            },
            TransportError::BodyError(_) => "Invalid response body",
        }
    }
}
