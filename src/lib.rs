//! # Entrez Client
//!
//! A thin async client for the NCBI Entrez E-utilities
//! (`einfo`, `esearch`, `epost`, `esummary`, `efetch`, `elink`, `egquery`,
//! `espell` and `ecitmatch`).
//!
//! ## Features
//!
//! - **Request building**: parameters are checked against each tool's schema
//!   and the configured email/API key are added automatically
//! - **Lazy paging**: large result sets are retrieved in windows, one page at
//!   a time, as the returned line stream is consumed
//! - **History server**: `select` stores a result set on the server and
//!   `apply` runs further tools on it without re-sending identifiers
//! - **Generic XML tree**: responses can be parsed into a navigable [`Node`]
//!   and dumped as JSON
//!
//! ## Quick Start
//!
//! ### Fetching records
//!
//! ```no_run
//! use entrez_client::{ClientConfig, EntrezClient, QueryParameters};
//! use futures_util::TryStreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EntrezClient::with_config(ClientConfig::new().with_email("me@example.org"))?;
//!
//!     let mut lines = client.paginated_query(
//!         "fetch",
//!         QueryParameters::from([("db", "snp"), ("id", "3000")]),
//!     )?;
//!     while let Some(line) = lines.try_next().await? {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Searching, then summarizing the hits
//!
//! ```no_run
//! use entrez_client::{EntrezClient, QueryParameters, xml};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EntrezClient::new()?;
//!
//!     let lines = client
//!         .on_search("U49845[accn] OR AF339445[accn]", "nucleotide", "summary", QueryParameters::new(), None)
//!         .await?;
//!     let tree = xml::collect_lines(lines).await?;
//!     println!("{}", tree.to_json_pretty()?);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod history;
pub mod paging;
pub mod params;
pub mod rate_limit;
pub mod request;
pub mod retry;
pub mod tools;
pub mod xml;

// Re-export main types for convenience
pub use client::EntrezClient;
pub use config::ClientConfig;
pub use error::{EntrezError, Result, TransportError};
pub use fetch::{Fetcher, HttpFetcher, LineStream};
pub use history::Selection;
pub use paging::{Lines, PageWindow};
pub use params::QueryParameters;
pub use request::Request;
pub use retry::RetryConfig;
pub use tools::{Tool, ToolSpec};
pub use xml::Node;
