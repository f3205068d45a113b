//! Ordered node tree
//!
//! Provides [`Node`], the editable representation of a YAML document. Mapping
//! keys keep insertion order so a load → mutate → save cycle only moves what
//! was actually touched.

use indexmap::IndexMap;

/// Ordered mapping of string keys to child nodes
pub type Mapping = IndexMap<String, Node>;

/// Resolved type of a scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarTag {
    /// String scalar
    Str,
    /// Boolean scalar (`true` / `false`)
    Bool,
    /// Integer scalar
    Int,
    /// Floating point scalar
    Float,
    /// Explicit or implicit null
    Null,
}

/// Shape of a node, used when descending or auto-creating paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Leaf value
    Scalar,
    /// Key → node map
    Mapping,
    /// Ordered list
    Sequence,
}

impl NodeKind {
    /// Empty node of this kind
    #[must_use]
    pub fn empty_node(self) -> Node {
        match self {
            Self::Scalar => Node::string(""),
            Self::Mapping => Node::Mapping(Mapping::new()),
            Self::Sequence => Node::Sequence(Vec::new()),
        }
    }

    /// Lowercase name for diagnostics
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Mapping => "mapping",
            Self::Sequence => "sequence",
        }
    }
}

/// A single node in a configuration document
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Leaf value with its textual form and resolved tag
    Scalar {
        /// Canonical text of the value
        value: String,
        /// Resolved type
        tag: ScalarTag,
    },
    /// Ordered mapping
    Mapping(Mapping),
    /// Ordered sequence
    Sequence(Vec<Node>),
}

impl Node {
    /// String scalar
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Scalar {
            value: value.into(),
            tag: ScalarTag::Str,
        }
    }

    /// Boolean scalar
    #[inline]
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::Scalar {
            value: value.to_string(),
            tag: ScalarTag::Bool,
        }
    }

    /// Null scalar
    #[inline]
    #[must_use]
    pub fn null() -> Self {
        Self::Scalar {
            value: "null".to_string(),
            tag: ScalarTag::Null,
        }
    }

    /// Empty mapping
    #[inline]
    #[must_use]
    pub fn mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    /// Shape of this node
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Scalar { .. } => NodeKind::Scalar,
            Self::Mapping(_) => NodeKind::Mapping,
            Self::Sequence(_) => NodeKind::Sequence,
        }
    }

    /// Whether this node carries no information.
    ///
    /// Empty strings, nulls and empty containers count as empty. Booleans and
    /// numbers never do.
    #[must_use]
    pub fn is_empty_value(&self) -> bool {
        match self {
            Self::Scalar { value, tag } => match tag {
                ScalarTag::Null => true,
                ScalarTag::Str => value.is_empty(),
                _ => false,
            },
            Self::Mapping(map) => map.is_empty(),
            Self::Sequence(items) => items.is_empty(),
        }
    }

    /// Whether this is a null scalar
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar { tag: ScalarTag::Null, .. })
    }

    /// Scalar text, if this is a non-null scalar
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar { tag: ScalarTag::Null, .. } => None,
            Self::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Borrow as mapping
    #[inline]
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Mutably borrow as mapping
    #[inline]
    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow as sequence
    #[inline]
    #[must_use]
    pub fn as_sequence(&self) -> Option<&Vec<Node>> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Mutably borrow as sequence
    #[inline]
    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Child of a mapping node by key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Mutable child of a mapping node by key
    #[inline]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.as_mapping_mut().and_then(|map| map.get_mut(key))
    }

    /// Text of a scalar child, if present and non-null
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Node::as_str)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::bool(value)
    }
}

impl From<Mapping> for Node {
    fn from(map: Mapping) -> Self {
        Self::Mapping(map)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Self::Sequence(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values() {
        assert!(Node::string("").is_empty_value());
        assert!(Node::null().is_empty_value());
        assert!(Node::mapping().is_empty_value());
        assert!(Node::Sequence(Vec::new()).is_empty_value());
        assert!(!Node::bool(false).is_empty_value());
        assert!(!Node::string("x").is_empty_value());
    }

    #[test]
    fn kind_and_accessors() {
        let mut map = Mapping::new();
        map.insert("name".to_string(), Node::string("dev"));
        map.insert("gone".to_string(), Node::null());
        let node = Node::Mapping(map);

        assert_eq!(node.kind(), NodeKind::Mapping);
        assert_eq!(node.get_str("name"), Some("dev"));
        assert_eq!(node.get_str("gone"), None);
        assert!(node.get("missing").is_none());
        assert!(node.as_sequence().is_none());
    }

    #[test]
    fn empty_node_per_kind() {
        assert_eq!(NodeKind::Mapping.empty_node(), Node::mapping());
        assert_eq!(NodeKind::Sequence.empty_node(), Node::Sequence(Vec::new()));
        assert_eq!(NodeKind::Scalar.empty_node(), Node::string(""));
    }
}
