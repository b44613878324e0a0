//! XML Object Parser
//!
//! Converts E-utility XML output into a generic [`Node`] tree that can be
//! browsed, queried by path or dumped as JSON. The shape of the tree is part
//! of the public contract:
//!
//! - the document becomes `{root_tag: content}`; several top-level elements
//!   (concatenated pages) become a sequence of such mappings
//! - attributes become entries prefixed with `@`
//! - a leaf without attributes is a scalar holding its raw text
//! - a leaf with attributes is a mapping of the attributes plus `#text`
//! - children with distinct tags become one entry per tag
//! - two or more children sharing one tag become a sequence of
//!   `{tag: content}` (under `#children` when the element has attributes)
//! - otherwise repeated tags are collected under `<tag>-group`, in order of
//!   first appearance
//! - non-blank text between child elements is kept, trimmed, as `#text`
//!
//! `#` cannot start an XML name, so these entries never clash with child
//! elements such as `<text>`.

mod node;
mod parser;
mod writer;

use futures_util::TryStreamExt;

pub use node::{Mapping, Node};
pub use parser::{parse, parse_lines};
pub use writer::to_xml;

/// Key of the text entry in mappings with attributes or child elements
pub const TEXT_KEY: &str = "#text";

/// Key of the repeated children of an element that also has attributes
pub const CHILDREN_KEY: &str = "#children";

use crate::error::Result;
use crate::paging::Lines;

/// Drain a line stream and parse the complete document
pub async fn collect_lines(lines: Lines) -> Result<Node> {
    let lines: Vec<String> = lines.try_collect().await?;
    parse_lines(&lines)
}

/// Text between the first `<tag>` and the following `</tag>`
pub(crate) fn first_element_text<'a>(content: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = content.find(&open)? + open.len();
    let end = content[start..].find(&close)? + start;
    Some(&content[start..end])
}
