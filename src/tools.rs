//! The nine E-utilities and the parameters each one understands
//!
//! Parameter names follow the E-utilities reference
//! (<https://www.ncbi.nlm.nih.gov/books/NBK25499/>), including its mixed
//! casing (`WebEnv` next to `query_key`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EntrezError;

/// Parameters every tool accepts, used by NCBI to identify the caller
pub const IDENTIFICATION_PARAMS: [&str; 3] = ["email", "api_key", "tool"];

/// One of the nine E-utilities
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Info,
    Search,
    Post,
    Summary,
    Fetch,
    Link,
    GQuery,
    Spell,
    CitMatch,
}

/// Static description of a tool: endpoint and parameter schema
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolSpec {
    pub tool: Tool,
    pub name: &'static str,
    pub endpoint: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

const INFO: ToolSpec = ToolSpec {
    tool: Tool::Info,
    name: "info",
    endpoint: "einfo.fcgi",
    required: &[],
    optional: &["db", "version", "retmode"],
};

const SEARCH: ToolSpec = ToolSpec {
    tool: Tool::Search,
    name: "search",
    endpoint: "esearch.fcgi",
    required: &["db", "term"],
    optional: &[
        "usehistory",
        "WebEnv",
        "query_key",
        "retstart",
        "retmax",
        "rettype",
        "retmode",
        "sort",
        "field",
        "idtype",
        "datetype",
        "reldate",
        "mindate",
        "maxdate",
    ],
};

const POST: ToolSpec = ToolSpec {
    tool: Tool::Post,
    name: "post",
    endpoint: "epost.fcgi",
    required: &["db", "id"],
    optional: &["WebEnv"],
};

const SUMMARY: ToolSpec = ToolSpec {
    tool: Tool::Summary,
    name: "summary",
    endpoint: "esummary.fcgi",
    required: &["db"],
    optional: &[
        "id",
        "query_key",
        "WebEnv",
        "retstart",
        "retmax",
        "rettype",
        "retmode",
        "version",
    ],
};

const FETCH: ToolSpec = ToolSpec {
    tool: Tool::Fetch,
    name: "fetch",
    endpoint: "efetch.fcgi",
    required: &["db"],
    optional: &[
        "id",
        "query_key",
        "WebEnv",
        "retstart",
        "retmax",
        "rettype",
        "retmode",
        "strand",
        "seq_start",
        "seq_stop",
        "complexity",
    ],
};

const LINK: ToolSpec = ToolSpec {
    tool: Tool::Link,
    name: "link",
    endpoint: "elink.fcgi",
    required: &["db", "dbfrom", "cmd"],
    optional: &[
        "id",
        "query_key",
        "WebEnv",
        "retmode",
        "idtype",
        "linkname",
        "term",
        "holding",
        "datetype",
        "reldate",
        "mindate",
        "maxdate",
    ],
};

const GQUERY: ToolSpec = ToolSpec {
    tool: Tool::GQuery,
    name: "gquery",
    endpoint: "egquery.fcgi",
    required: &["term"],
    optional: &[],
};

const SPELL: ToolSpec = ToolSpec {
    tool: Tool::Spell,
    name: "spell",
    endpoint: "espell.fcgi",
    required: &["db", "term"],
    optional: &[],
};

const CITMATCH: ToolSpec = ToolSpec {
    tool: Tool::CitMatch,
    name: "citmatch",
    endpoint: "ecitmatch.cgi",
    required: &["db", "bdata"],
    optional: &["rettype", "retmode"],
};

impl Tool {
    /// All tools, in the order the E-utilities documentation lists them
    pub const ALL: [Tool; 9] = [
        Tool::Info,
        Tool::Search,
        Tool::Post,
        Tool::Summary,
        Tool::Fetch,
        Tool::Link,
        Tool::GQuery,
        Tool::Spell,
        Tool::CitMatch,
    ];

    pub fn spec(self) -> &'static ToolSpec {
        match self {
            Tool::Info => &INFO,
            Tool::Search => &SEARCH,
            Tool::Post => &POST,
            Tool::Summary => &SUMMARY,
            Tool::Fetch => &FETCH,
            Tool::Link => &LINK,
            Tool::GQuery => &GQUERY,
            Tool::Spell => &SPELL,
            Tool::CitMatch => &CITMATCH,
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Whether the tool can operate on a history selection (`WebEnv` + `query_key`)
    pub fn accepts_selection(self) -> bool {
        let spec = self.spec();
        spec.optional.contains(&"WebEnv") && spec.optional.contains(&"query_key")
    }

    /// Whether the tool understands `retstart`/`retmax` paging
    pub fn is_paged(self) -> bool {
        let spec = self.spec();
        spec.optional.contains(&"retstart") && spec.optional.contains(&"retmax")
    }

    /// Whether the tool can store its result on the history server
    pub fn creates_selection(self) -> bool {
        matches!(self, Tool::Search | Tool::Post | Tool::Link)
    }

    /// Whether `param` belongs to the tool's schema (including identification params)
    pub fn knows_param(self, param: &str) -> bool {
        let spec = self.spec();
        spec.required.contains(&param)
            || spec.optional.contains(&param)
            || IDENTIFICATION_PARAMS.contains(&param)
    }

    fn valid_names() -> String {
        Tool::ALL
            .iter()
            .map(|tool| tool.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = EntrezError;

    /// Accepts both short (`search`) and prefixed (`esearch`) names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let short = lowered.strip_prefix('e').unwrap_or(&lowered);

        Tool::ALL
            .into_iter()
            .find(|tool| tool.name() == lowered || tool.name() == short)
            .ok_or_else(|| EntrezError::UnknownTool {
                name: s.to_string(),
                valid: Tool::valid_names(),
            })
    }
}
