use quick_xml::escape::escape;

use super::node::{Mapping, Node};
use super::{CHILDREN_KEY, TEXT_KEY};

/// Write `node` back as XML
///
/// Inverse of [`parse`](super::parse): parsing the output again yields an
/// equal tree. Nodes that did not come from the parser are written on a best
/// effort basis (sequence items that are not `{tag: content}` become
/// `<item>` elements).
pub fn to_xml(node: &Node) -> String {
    let mut out = String::new();
    write_document(node, &mut out);
    out
}

impl Node {
    pub fn to_xml(&self) -> String {
        to_xml(self)
    }
}

fn write_document(node: &Node, out: &mut String) {
    match node {
        Node::Scalar(text) => out.push_str(&escape(text.as_str())),
        Node::Sequence(items) => {
            for item in items {
                write_document(item, out);
                out.push('\n');
            }
        }
        Node::Mapping(mapping) => {
            for (tag, content) in mapping.iter() {
                write_element(tag, content, out);
            }
        }
    }
}

fn write_items(items: &[Node], out: &mut String) {
    for item in items {
        match item.as_mapping().filter(|m| m.len() == 1) {
            Some(entry) => write_children(entry, out),
            None => write_element("item", item, out),
        }
    }
}

fn write_children(mapping: &Mapping, out: &mut String) {
    for (key, value) in mapping.iter() {
        if key.starts_with('@') {
            continue;
        }
        match (key, value) {
            (TEXT_KEY, Node::Scalar(text)) => out.push_str(&escape(text.as_str())),
            (CHILDREN_KEY, Node::Sequence(items)) => write_items(items, out),
            (key, Node::Sequence(items)) if key.ends_with("-group") => write_items(items, out),
            (tag, content) => write_element(tag, content, out),
        }
    }
}

fn write_element(tag: &str, content: &Node, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    if let Node::Mapping(mapping) = content {
        for (key, value) in mapping.iter() {
            if let (Some(name), Some(value)) = (key.strip_prefix('@'), value.as_str()) {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape(value));
                out.push('"');
            }
        }
    }
    out.push('>');

    match content {
        Node::Scalar(text) => out.push_str(&escape(text.as_str())),
        Node::Sequence(items) => write_items(items, out),
        Node::Mapping(mapping) => write_children(mapping, out),
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}
