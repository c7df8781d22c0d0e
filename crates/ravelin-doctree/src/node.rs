//! The universal document tree shared by the XML and YAML codecs.
//!
//! A [`Node`] is a scalar, an insertion-ordered mapping, or a sequence.
//! Mappings may hold duplicate keys while a tree is under construction
//! (the XML codec relies on this before sibling disambiguation), and keys
//! are nodes themselves so YAML documents round-trip without loss.
//!
//! Nodes are plain owned values. Cloning a node clones the whole subtree,
//! which is exactly what the resolver wants: a resolved reference target is
//! always inserted as its own copy, so two call sites can never alias.

/// Mapping key prefix marking an XML attribute (`.name: value`).
pub const ATTRIBUTE_PREFIX: char = '.';

/// Mapping key holding an element's character data, or a hoisted child
/// collection that must be spliced back into the parent element.
pub const TEXT_KEY: &str = "-Data";

/// Mapping key prefix meaning "emit this value into the parent element
/// instead of nesting it under a tag". [`TEXT_KEY`] is one such key.
pub const SPLICE_PREFIX: char = '-';

/// Mapping key introducing a reference to another document location.
pub const REF_KEY: &str = "$ref";

/// A tagged document tree value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Scalar(String),
    Mapping(Vec<(Node, Node)>),
    Sequence(Vec<Node>),
}

impl Node {
    pub fn scalar(value: impl Into<String>) -> Self {
        Node::Scalar(value.into())
    }

    pub fn mapping(entries: Vec<(Node, Node)>) -> Self {
        Node::Mapping(entries)
    }

    pub fn sequence(items: Vec<Node>) -> Self {
        Node::Sequence(items)
    }

    /// A one-entry mapping `{$ref: target}`, the shape the resolver consumes.
    pub fn new_ref(target: impl Into<String>) -> Self {
        Node::Mapping(vec![(Node::scalar(REF_KEY), Node::Scalar(target.into()))])
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(Node, Node)]> {
        match self {
            Node::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// First value stored under a scalar key, if this is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k.as_scalar() == Some(key))
            .map(|(_, v)| v)
    }

    /// Whether this node is a mapping carrying a `$ref` key.
    pub fn is_ref(&self) -> bool {
        self.get(REF_KEY).is_some()
    }

    /// The `$ref` target string, if this node is a reference with a scalar target.
    pub fn ref_target(&self) -> Option<&str> {
        self.get(REF_KEY)?.as_scalar()
    }
}
