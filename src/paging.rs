//! Paginated Query Engine
//!
//! Turns one logical query into a single lazy line stream spanning as many
//! E-utility calls as needed. Pages are fetched one at a time, only when the
//! consumer pulls past the last line of the previous page.

use std::sync::Arc;

use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EntrezError, Result, TransportError};
use crate::fetch::{Fetcher, LineStream};
use crate::params::QueryParameters;
use crate::request::Request;
use crate::tools::{IDENTIFICATION_PARAMS, Tool};
use crate::xml::first_element_text;

/// Lazily produced output lines of a (possibly multi-page) query
pub type Lines = BoxStream<'static, Result<String>>;

/// One batch of a paginated query: `size` records starting at `start`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageWindow {
    pub start: u64,
    pub size: u64,
}

impl PageWindow {
    /// Offset just past the last record of the window
    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// Windows `[s, s+B), [s+B, s+2B), ...` covering `total` records from `s`
///
/// The last window is clamped to the records that remain.
///
/// ```
/// use entrez_client::paging::{PagePlan, PageWindow};
///
/// let windows: Vec<PageWindow> = PagePlan::new(0, 1050, 500).collect();
/// assert_eq!(windows.len(), 3);
/// assert_eq!(windows[2], PageWindow { start: 1000, size: 50 });
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PagePlan {
    next: u64,
    end: u64,
    batch_size: u64,
}

impl PagePlan {
    pub fn new(start: u64, total: u64, batch_size: u64) -> Self {
        Self {
            next: start,
            end: start.saturating_add(total),
            batch_size: batch_size.max(1),
        }
    }
}

impl Iterator for PagePlan {
    type Item = PageWindow;

    fn next(&mut self) -> Option<PageWindow> {
        if self.next >= self.end {
            return None;
        }
        let size = self.batch_size.min(self.end - self.next);
        let window = PageWindow {
            start: self.next,
            size,
        };
        self.next += size;
        Some(window)
    }
}

/// Call answering how many records a query covers
struct CountProbe {
    url: String,
    params: QueryParameters,
}

impl CountProbe {
    /// The search itself with `rettype=count`
    fn search(url: &str, params: &QueryParameters) -> Self {
        let mut params = params.clone();
        params.insert("rettype", "count");
        params.insert("retmode", "xml");
        params.remove("retstart");
        params.remove("retmax");
        Self {
            url: url.to_string(),
            params,
        }
    }

    /// An `esearch` for `#<query_key>` when `params` point at a history selection
    fn history(base_url: &str, params: &QueryParameters) -> Option<Self> {
        let webenv = params.get("WebEnv")?;
        let query_key = params.get("query_key")?;
        let db = params.get("db")?;

        let mut count_params = history_count_params(db, webenv, query_key);
        for name in IDENTIFICATION_PARAMS {
            if let Some(value) = params.get(name) {
                count_params.insert(name, value);
            }
        }
        Some(Self {
            url: Request {
                tool: Tool::Search,
                params: QueryParameters::new(),
            }
            .url(base_url),
            params: count_params,
        })
    }
}

/// `esearch` parameters counting the records of a history selection
pub(crate) fn history_count_params(db: &str, webenv: &str, query_key: impl ToString) -> QueryParameters {
    QueryParameters::new()
        .with("db", db)
        .with("term", format!("#{}", query_key.to_string()))
        .with("WebEnv", webenv)
        .with("retmax", 0)
        .with("retmode", "xml")
}

/// Everything needed to issue the calls of one query
struct Pager {
    fetcher: Arc<dyn Fetcher>,
    url: String,
    request: Request,
    /// Explicit id list, when windows slice ids instead of offsets
    ids: Option<Vec<String>>,
    batch_size: u64,
}

impl Pager {
    fn plan(&self, start: u64, total: u64) -> Option<PagePlan> {
        // Nothing to page through: a single call returns the (empty) document
        (total > 0).then(|| PagePlan::new(start, total, self.batch_size))
    }

    fn params_for(&self, window: PageWindow) -> QueryParameters {
        let mut params = self.request.params.clone();
        match &self.ids {
            Some(ids) => {
                let from = window.start as usize;
                let to = window.end() as usize;
                if from > 0 || to < ids.len() {
                    params.insert("id", ids[from..to].join(","));
                }
            }
            None => {
                params.insert("retstart", window.start);
                params.insert("retmax", window.size);
            }
        }
        params
    }

    async fn open(&self, window: Option<PageWindow>) -> Result<LineStream> {
        let params = match window {
            Some(window) => self.params_for(window),
            None => self.request.params.clone(),
        };
        debug!(
            tool = %self.request.tool,
            ?window,
            query = %params.encode(),
            "Fetching page"
        );
        self.fetcher
            .fetch(&self.url, &params)
            .await
            .map_err(|err| EntrezError::fetch(window, err))
    }

    /// Run `probe` and read the `<Count>` it returns
    async fn probe_count(&self, probe: &CountProbe) -> Result<u64> {
        debug!(url = %probe.url, query = %probe.params.encode(), "Counting records");
        let lines = self
            .fetcher
            .fetch(&probe.url, &probe.params)
            .await
            .map_err(|err| EntrezError::fetch(None, err))?;
        let body: Vec<String> = lines
            .try_collect()
            .await
            .map_err(|err| EntrezError::fetch(None, err))?;
        let body = body.join("\n");

        let count = first_element_text(&body, "Count")
            .and_then(|count| count.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                EntrezError::fetch(
                    None,
                    TransportError::BodyError(format!(
                        "count probe returned no <Count>: {}",
                        body.chars().take(200).collect::<String>()
                    )),
                )
            })?;

        info!(tool = %self.request.tool, count, "Count probe finished");
        Ok(count)
    }
}

enum PageState {
    /// Total unknown; run the count probe on first pull
    Probe {
        pager: Pager,
        probe: CountProbe,
        start: u64,
    },
    /// Next fetch not issued yet; `plan == None` means one unwindowed call
    Pending {
        pager: Pager,
        plan: Option<PagePlan>,
    },
    /// Handing out the lines of the current page
    Streaming {
        pager: Pager,
        plan: Option<PagePlan>,
        window: Option<PageWindow>,
        lines: LineStream,
        seen: u64,
    },
    Done,
}

async fn next_line(mut state: PageState) -> Option<(Result<String>, PageState)> {
    loop {
        state = match state {
            PageState::Done => return None,

            PageState::Probe {
                pager,
                probe,
                start,
            } => match pager.probe_count(&probe).await {
                Ok(count) => {
                    let plan = pager.plan(start, count.saturating_sub(start));
                    PageState::Pending { pager, plan }
                }
                Err(err) => return Some((Err(err), PageState::Done)),
            },

            PageState::Pending { pager, mut plan } => {
                let window = match plan.as_mut() {
                    Some(plan) => Some(plan.next()?),
                    None => None,
                };
                match pager.open(window).await {
                    Ok(lines) => PageState::Streaming {
                        pager,
                        plan,
                        window,
                        lines,
                        seen: 0,
                    },
                    Err(err) => return Some((Err(err), PageState::Done)),
                }
            }

            PageState::Streaming {
                pager,
                plan,
                window,
                mut lines,
                seen,
            } => match lines.next().await {
                Some(Ok(line)) => {
                    return Some((
                        Ok(line),
                        PageState::Streaming {
                            pager,
                            plan,
                            window,
                            lines,
                            seen: seen + 1,
                        },
                    ));
                }
                Some(Err(err)) => {
                    return Some((Err(EntrezError::fetch(window, err)), PageState::Done));
                }
                None => match (plan, window) {
                    (Some(_), Some(window)) if pager.ids.is_none() && seen < window.size => {
                        debug!(?window, lines = seen, "Short page, stopping");
                        PageState::Done
                    }
                    (Some(plan), Some(_)) => PageState::Pending {
                        pager,
                        plan: Some(plan),
                    },
                    _ => PageState::Done,
                },
            },
        }
    }
}

pub(crate) fn numeric_param(params: &QueryParameters, name: &str) -> Result<Option<u64>> {
    params
        .get(name)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| EntrezError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                })
        })
        .transpose()
}

/// Stream every line of `request`, split into windows of `batch_size`
///
/// The total is taken from an explicit `retmax`, else from the length of an
/// explicit `id` list, else from a count probe: `rettype=count` for `search`,
/// an `esearch` for `#<query_key>` for `summary` and `fetch` over a history
/// selection. Any other request is a single call. Parameter errors are returned immediately; no
/// call is made before the first line is pulled.
pub fn paginated_query(
    fetcher: Arc<dyn Fetcher>,
    base_url: &str,
    request: Request,
    batch_size: usize,
) -> Result<Lines> {
    let url = request.url(base_url);
    let tool = request.tool;
    let mut pager = Pager {
        fetcher,
        url,
        request,
        ids: None,
        batch_size: batch_size.max(1) as u64,
    };

    let state = if !tool.is_paged() {
        PageState::Pending { pager, plan: None }
    } else {
        let retmax = numeric_param(&pager.request.params, "retmax")?;
        let retstart = numeric_param(&pager.request.params, "retstart")?.unwrap_or(0);
        let ids: Option<Vec<String>> = pager
            .request
            .params
            .ids()
            .filter(|ids| !ids.is_empty())
            .map(|ids| ids.into_iter().map(str::to_string).collect());

        match (retmax, ids) {
            (Some(retmax), _) => {
                let plan = pager.plan(retstart, retmax);
                PageState::Pending { pager, plan }
            }
            (None, Some(ids)) => {
                let plan = pager.plan(0, ids.len() as u64);
                pager.ids = Some(ids);
                PageState::Pending { pager, plan }
            }
            (None, None) if tool == Tool::Search => PageState::Probe {
                probe: CountProbe::search(&pager.url, &pager.request.params),
                pager,
                start: retstart,
            },
            (None, None) => match CountProbe::history(base_url, &pager.request.params) {
                Some(probe) => PageState::Probe {
                    pager,
                    probe,
                    start: retstart,
                },
                None => PageState::Pending { pager, plan: None },
            },
        }
    };

    Ok(stream::unfold(state, next_line).boxed())
}
