//! Request Builder: validated parameter sets for one tool

use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{EntrezError, Result};
use crate::params::QueryParameters;
use crate::tools::Tool;

/// A validated call to one E-utility
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub tool: Tool,
    pub params: QueryParameters,
}

impl Request {
    /// Endpoint URL of the tool below `base_url`
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.tool.spec().endpoint
        )
    }

    /// Percent-encoded parameters in sorted order
    pub fn query_string(&self) -> String {
        self.params.encode()
    }
}

/// Validate `params` against the schema of `tool_name`
///
/// `email`, `api_key` and `tool` are added from `config` unless the caller
/// supplied them. Parameters outside the tool's schema are passed through.
///
/// # Example
///
/// ```
/// use entrez_client::{ClientConfig, QueryParameters, request::build};
///
/// let config = ClientConfig::new().with_email("me@example.org");
/// let request = build("fetch", QueryParameters::from([("db", "snp"), ("id", "3000")]), &config)?;
///
/// assert_eq!(request.query_string(), "db=snp&email=me%40example.org&id=3000");
/// # Ok::<(), entrez_client::EntrezError>(())
/// ```
pub fn build(tool_name: &str, params: QueryParameters, config: &ClientConfig) -> Result<Request> {
    let tool: Tool = tool_name.parse()?;
    build_for(tool, params, config)
}

/// [`build`] for an already resolved [`Tool`]
pub fn build_for(tool: Tool, mut params: QueryParameters, config: &ClientConfig) -> Result<Request> {
    let missing: Vec<String> = tool
        .spec()
        .required
        .iter()
        .filter(|name| params.get(name).is_none_or(|v| v.trim().is_empty()))
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        let mut missing = missing;
        missing.sort();
        return Err(EntrezError::MissingParameter { tool, missing });
    }

    for name in params.names().filter(|name| !tool.knows_param(name)) {
        debug!(tool = %tool, param = name, "Passing through parameter outside the tool schema");
    }

    for (name, value) in config.build_api_params() {
        params.insert_default(&name, value);
    }

    Ok(Request { tool, params })
}
