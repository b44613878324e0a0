use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Generic tree built from an E-utility XML response
///
/// See the [module documentation](crate::xml) for how elements map to
/// variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Scalar(String),
    Sequence(Vec<Node>),
    Mapping(Mapping),
}

/// Ordered collection of uniquely keyed nodes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mapping(Vec<(String, Node)>);

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry at the end, or replace the value of an existing key in place
    pub fn insert(&mut self, key: impl Into<String>, value: Node) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

impl Node {
    pub fn scalar(text: impl Into<String>) -> Self {
        Node::Scalar(text.into())
    }

    /// Single-entry mapping `{key: value}`
    pub fn entry(key: impl Into<String>, value: Node) -> Self {
        let mut mapping = Mapping::new();
        mapping.insert(key, value);
        Node::Mapping(mapping)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// Child of a mapping by key
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping()?.get(key)
    }

    /// Item of a sequence by position
    pub fn at(&self, index: usize) -> Option<&Node> {
        self.as_sequence()?.get(index)
    }

    /// Follow a space separated path of keys and sequence indices
    ///
    /// ```
    /// use entrez_client::xml::parse;
    ///
    /// let tree = parse("<r><Item>a</Item><Item>b</Item></r>").unwrap();
    /// assert_eq!(tree.select("r 1 Item").and_then(|n| n.as_str()), Some("b"));
    /// ```
    pub fn select(&self, path: &str) -> Option<&Node> {
        path.split_whitespace().try_fold(self, |node, step| match node {
            Node::Sequence(items) => items.get(step.parse::<usize>().ok()?),
            Node::Mapping(mapping) => mapping.get(step),
            Node::Scalar(_) => None,
        })
    }

    /// Names usable as the next path step: mapping keys or sequence indices
    pub fn keys(&self) -> Vec<String> {
        match self {
            Node::Scalar(_) => Vec::new(),
            Node::Sequence(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            Node::Mapping(mapping) => mapping.keys().map(str::to_string).collect(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Node::Scalar(_))
    }

    /// Pretty JSON with mapping entries in document order
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Scalar(text) => serializer.serialize_str(text),
            Node::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Mapping(mapping) => mapping.serialize(serializer),
        }
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
