//! History server operations (select, apply, on_search)
//!
//! A [`Selection`] references a result set stored on the NCBI history
//! server. Later calls send its `WebEnv` and `query_key` instead of the
//! identifiers themselves.

use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::client::EntrezClient;
use crate::error::{EntrezError, Result};
use crate::paging::{Lines, history_count_params, numeric_param};
use crate::params::QueryParameters;
use crate::request::build_for;
use crate::tools::Tool;
use crate::xml::first_element_text;

/// Result set stored on the history server
///
/// Only valid for the database it was created in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub webenv: String,
    pub query_key: u32,
    pub db: String,
    /// Number of records in the result set
    pub count: u64,
}

/// History fields read from a selecting call
#[derive(Debug, PartialEq, Eq)]
struct SelectionFields {
    webenv: String,
    query_key: u32,
    count: Option<u64>,
}

fn read_selection(tool: Tool, body: &str) -> Result<SelectionFields> {
    let parse_error = |reason: String| EntrezError::SelectionParseError { tool, reason };

    if let Some(message) = first_element_text(body, "ERROR") {
        return Err(parse_error(format!("server reported: {}", message.trim())));
    }

    let webenv = first_element_text(body, "WebEnv")
        .map(str::trim)
        .filter(|webenv| !webenv.is_empty())
        .ok_or_else(|| parse_error("response has no <WebEnv>".to_string()))?;

    let query_key = first_element_text(body, "QueryKey")
        .ok_or_else(|| parse_error("response has no <QueryKey>".to_string()))?;
    let query_key = query_key
        .trim()
        .parse::<u32>()
        .map_err(|_| parse_error(format!("<QueryKey> is not a number: {query_key:?}")))?;

    let count = first_element_text(body, "Count").and_then(|count| count.trim().parse().ok());

    Ok(SelectionFields {
        webenv: webenv.to_string(),
        query_key,
        count,
    })
}

fn check_db(params: &QueryParameters, name: &str, selection: &Selection) -> Result<()> {
    match params.get(name) {
        Some(requested) if requested != selection.db => Err(EntrezError::DatabaseMismatch {
            selection_db: selection.db.clone(),
            requested_db: requested.to_string(),
        }),
        _ => Ok(()),
    }
}

fn require_accepts_selection(tool: Tool) -> Result<()> {
    if tool.accepts_selection() {
        Ok(())
    } else {
        Err(EntrezError::IncompatibleTool {
            tool,
            reason: "it does not accept WebEnv/query_key".to_string(),
        })
    }
}

impl EntrezClient {
    /// Store the result of a `search`, `post` or `link` call on the history server
    ///
    /// `db` is the database the selection lives in (the target database for
    /// `link`). `search` is sent with `usehistory=y`, `link` with
    /// `cmd=neighbor_history` unless another command is given.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use entrez_client::{EntrezClient, QueryParameters};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = EntrezClient::new()?;
    ///     let selection = client
    ///         .select("search", "nucleotide", QueryParameters::from([("term", "U49845[accn]")]))
    ///         .await?;
    ///     println!("{} records, query_key {}", selection.count, selection.query_key);
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self, params), fields(tool = %tool_name, db = %db))]
    pub async fn select(&self, tool_name: &str, db: &str, params: QueryParameters) -> Result<Selection> {
        self.select_with_history(tool_name, db, params, None).await
    }

    /// Like [`select`](Self::select), but operating on an earlier selection
    ///
    /// The call carries the previous `WebEnv` and `query_key`, so the new
    /// result set lives in the same history environment. For `link` the
    /// source database defaults to the previous selection's database.
    #[instrument(skip(self, params, previous), fields(tool = %tool_name, db = %db, query_key = previous.query_key))]
    pub async fn select_within(
        &self,
        tool_name: &str,
        db: &str,
        params: QueryParameters,
        previous: &Selection,
    ) -> Result<Selection> {
        self.select_with_history(tool_name, db, params, Some(previous)).await
    }

    async fn select_with_history(
        &self,
        tool_name: &str,
        db: &str,
        mut params: QueryParameters,
        previous: Option<&Selection>,
    ) -> Result<Selection> {
        let tool: Tool = tool_name.parse()?;
        if !tool.creates_selection() {
            return Err(EntrezError::IncompatibleTool {
                tool,
                reason: "only search, post and link can create a selection".to_string(),
            });
        }

        params.insert("db", db);
        if let Some(previous) = previous {
            params.insert("WebEnv", &previous.webenv);
            params.insert("query_key", previous.query_key);
            if tool == Tool::Link {
                params.insert_default("dbfrom", &previous.db);
            }
        }
        match tool {
            Tool::Search => {
                params.insert("usehistory", "y");
            }
            Tool::Link => params.insert_default("cmd", "neighbor_history"),
            _ => {}
        }

        let request = build_for(tool, params, self.config())?;
        let body = self.fetch_body(&request.url(self.base_url()), &request.params).await?;
        let fields = read_selection(tool, &body)?;

        let count = match (fields.count, tool) {
            (Some(count), _) => count,
            (None, Tool::Post) => request.params.ids().map_or(0, |ids| ids.len() as u64),
            (None, _) => self.count_selection(tool, db, &fields.webenv, fields.query_key).await?,
        };

        let selection = Selection {
            webenv: fields.webenv,
            query_key: fields.query_key,
            db: db.to_string(),
            count,
        };
        info!(
            query_key = selection.query_key,
            count = selection.count,
            "Selection stored on history server"
        );
        Ok(selection)
    }

    /// Number of records behind a `WebEnv`/`query_key` pair, via `esearch`
    async fn count_selection(&self, tool: Tool, db: &str, webenv: &str, query_key: u32) -> Result<u64> {
        let request = build_for(Tool::Search, history_count_params(db, webenv, query_key), self.config())?;
        let body = self.fetch_body(&request.url(self.base_url()), &request.params).await?;

        first_element_text(&body, "Count")
            .and_then(|count| count.trim().parse().ok())
            .ok_or_else(|| EntrezError::SelectionParseError {
                tool,
                reason: "count lookup returned no <Count>".to_string(),
            })
    }

    async fn fetch_body(&self, url: &str, params: &QueryParameters) -> Result<String> {
        debug!(url, query = %params.encode(), "Selecting call");
        let lines: Vec<String> = self
            .fetcher()
            .fetch(url, params)
            .await
            .map_err(|err| EntrezError::fetch(None, err))?
            .try_collect()
            .await
            .map_err(|err| EntrezError::fetch(None, err))?;
        Ok(lines.join("\n"))
    }

    /// Lazily stream the output of `tool_name` over a selection
    ///
    /// Paged tools (`search`, `summary`, `fetch`) retrieve `min(retmax,
    /// count)` records in windows of the configured batch size; `link` is a
    /// single call. `db` (or `dbfrom` for `link`) is taken from the selection
    /// and any `id` parameter is dropped. Errors that can be detected without
    /// the network are returned immediately.
    #[instrument(
        skip(self, selection, params),
        fields(tool = %tool_name, db = %selection.db, query_key = selection.query_key)
    )]
    pub fn apply(
        &self,
        tool_name: &str,
        selection: &Selection,
        mut params: QueryParameters,
        retmax: Option<u64>,
    ) -> Result<Lines> {
        let tool: Tool = tool_name.parse()?;
        require_accepts_selection(tool)?;

        if tool == Tool::Link {
            check_db(&params, "dbfrom", selection)?;
            params.insert("dbfrom", &selection.db);
            params.insert_default("db", &selection.db);
        } else {
            check_db(&params, "db", selection)?;
            params.insert("db", &selection.db);
        }

        params.remove("id");
        params.insert("WebEnv", &selection.webenv);
        params.insert("query_key", selection.query_key);

        if tool.is_paged() {
            let retstart = numeric_param(&params, "retstart")?.unwrap_or(0);
            let limit = match retmax {
                Some(retmax) => Some(retmax),
                None => numeric_param(&params, "retmax")?,
            };
            let available = selection.count.saturating_sub(retstart);
            params.insert("retmax", limit.map_or(available, |limit| limit.min(available)));
        }

        let request = build_for(tool, params, self.config())?;
        self.paginate(request, self.config().batch_size)
    }

    /// Search `db` for `term`, then apply `tool_name` to the hits
    ///
    /// For `link`, the target database is `params["db"]` (defaults to `db`).
    #[instrument(skip(self, params), fields(term = %term, db = %db, tool = %tool_name))]
    pub async fn on_search(
        &self,
        term: &str,
        db: &str,
        tool_name: &str,
        params: QueryParameters,
        retmax: Option<u64>,
    ) -> Result<Lines> {
        let tool: Tool = tool_name.parse()?;
        require_accepts_selection(tool)?;

        let selection = self
            .select("search", db, QueryParameters::from([("term", term)]))
            .await?;
        self.apply(tool_name, &selection, params, retmax)
    }
}
