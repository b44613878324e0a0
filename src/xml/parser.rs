use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::node::{Mapping, Node};
use super::{CHILDREN_KEY, TEXT_KEY};
use crate::error::{EntrezError, Result};

/// Element as read from the document, before shaping into a [`Node`]
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

fn make_reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().expand_empty_elements = true;
    reader
}

fn parse_error(xml: &str, position: u64, message: impl Into<String>) -> EntrezError {
    let end = (position as usize).min(xml.len());
    let line = xml.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1;
    EntrezError::XmlParseError {
        position,
        line,
        message: message.into(),
    }
}

fn start_element(xml: &str, reader: &Reader<&[u8]>, e: &BytesStart) -> Result<Element> {
    let mut element = Element {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        ..Element::default()
    };
    for attr in e.attributes() {
        let attr = attr
            .map_err(|err| parse_error(xml, reader.buffer_position() as u64, err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| parse_error(xml, reader.buffer_position() as u64, err.to_string()))?;
        element.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(element)
}

fn read_elements(xml: &str) -> Result<Vec<Element>> {
    let mut reader = make_reader(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut roots = Vec::new();

    loop {
        let text = match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(start_element(xml, &reader, &e)?);
                continue;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    parse_error(xml, reader.buffer_position() as u64, "unexpected closing tag")
                })?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => roots.push(element),
                }
                continue;
            }
            Ok(Event::Text(e)) => e
                .unescape()
                .map_err(|err| parse_error(xml, reader.buffer_position() as u64, err.to_string()))?
                .into_owned(),
            Ok(Event::CData(e)) => String::from_utf8_lossy(&e).into_owned(),
            Ok(Event::Eof) => break,
            Ok(_) => continue,
            Err(err) => {
                return Err(parse_error(xml, reader.error_position() as u64, err.to_string()));
            }
        };

        match stack.last_mut() {
            Some(element) => element.text.push_str(&text),
            None if text.trim().is_empty() => {}
            None => {
                return Err(parse_error(
                    xml,
                    reader.buffer_position() as u64,
                    "text outside of the root element",
                ));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(parse_error(
            xml,
            xml.len() as u64,
            format!("unclosed element <{}>", open.name),
        ));
    }
    if roots.is_empty() {
        return Err(parse_error(xml, xml.len() as u64, "no root element"));
    }

    Ok(roots)
}

fn shape(element: Element) -> Node {
    let mut mapping: Mapping = element
        .attributes
        .into_iter()
        .map(|(key, value)| (format!("@{key}"), Node::Scalar(value)))
        .collect();

    if element.children.is_empty() {
        if mapping.is_empty() {
            return Node::Scalar(element.text);
        }
        mapping.insert(TEXT_KEY, Node::Scalar(element.text));
        return Node::Mapping(mapping);
    }

    let mixed_text = element.text.trim().to_string();
    let all_same = element.children.len() > 1
        && element
            .children
            .iter()
            .all(|child| child.name == element.children[0].name);

    if all_same {
        let items = element
            .children
            .into_iter()
            .map(|child| {
                let name = child.name.clone();
                Node::entry(name, shape(child))
            })
            .collect();
        if mapping.is_empty() && mixed_text.is_empty() {
            return Node::Sequence(items);
        }
        mapping.insert(CHILDREN_KEY, Node::Sequence(items));
    } else {
        // Group by tag, in order of first appearance
        let mut groups: Vec<(String, Vec<Node>)> = Vec::new();
        for child in element.children {
            let name = child.name.clone();
            let node = shape(child);
            match groups.iter_mut().find(|(tag, _)| *tag == name) {
                Some((_, nodes)) => nodes.push(node),
                None => groups.push((name, vec![node])),
            }
        }
        for (tag, mut nodes) in groups {
            if nodes.len() == 1 {
                if let Some(node) = nodes.pop() {
                    mapping.insert(tag, node);
                }
            } else {
                let items = nodes
                    .into_iter()
                    .map(|node| Node::entry(tag.clone(), node))
                    .collect();
                mapping.insert(format!("{tag}-group"), Node::Sequence(items));
            }
        }
    }

    if !mixed_text.is_empty() {
        mapping.insert(TEXT_KEY, Node::Scalar(mixed_text));
    }
    Node::Mapping(mapping)
}

/// Parse an XML document into a [`Node`] tree
pub fn parse(xml: &str) -> Result<Node> {
    let mut roots: Vec<Node> = read_elements(xml)?
        .into_iter()
        .map(|root| {
            let name = root.name.clone();
            Node::entry(name, shape(root))
        })
        .collect();

    match roots.len() {
        1 => Ok(roots.remove(0)),
        _ => Ok(Node::Sequence(roots)),
    }
}

/// Parse a document given as separate lines
pub fn parse_lines<I, S>(lines: I) -> Result<Node>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut xml = String::new();
    for line in lines {
        xml.push_str(line.as_ref());
        xml.push('\n');
    }
    parse(&xml)
}
