//! Configuration documents
//!
//! A [`Document`] is the in-memory tree for one YAML file, rooted at a
//! single mapping. Comments of a parsed file are kept beside the tree and
//! written back next to the entries they annotate.

use serde_yaml::Value;

use crate::codec::from_value;
use crate::comments::Comments;
use crate::emit::emit;
use crate::error::NodeError;
use crate::hash::ContentHash;
use crate::node::{Mapping, Node, NodeKind, ScalarTag};
use crate::path::Key;

/// In-memory tree of one YAML file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    root: Mapping,
    comments: Comments,
}

impl Document {
    /// Create an empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML text
    ///
    /// # Errors
    /// Returns error if the text is not valid YAML or its root is not a mapping
    #[inline]
    pub fn parse(text: &str) -> Result<Self, NodeError> {
        Self::parse_from(text, "<memory>")
    }

    /// Parse YAML text, labelling errors with `source`
    ///
    /// Empty or whitespace-only input yields an empty document.
    ///
    /// # Errors
    /// Returns error if the text is not valid YAML or its root is not a mapping
    pub fn parse_from(text: &str, source: &str) -> Result<Self, NodeError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value =
            serde_yaml::from_str(text).map_err(|e| NodeError::syntax(source, e.to_string()))?;
        match from_value(value, source)? {
            Node::Mapping(root) => {
                let comments = Comments::capture(text, &root);
                Ok(Self { root, comments })
            }
            Node::Scalar { tag: ScalarTag::Null, .. } => Ok(Self::new()),
            other => Err(NodeError::RootNotMapping {
                path: source.to_string(),
                found: other.kind().as_str(),
            }),
        }
    }

    /// Wrap an existing mapping
    #[inline]
    #[must_use]
    pub fn from_mapping(root: Mapping) -> Self {
        Self {
            root,
            comments: Comments::default(),
        }
    }

    /// Serialize with 4-space block indentation. Comments follow the entry
    /// they were attached to; those of removed entries are dropped.
    #[inline]
    #[must_use]
    pub fn to_yaml(&self) -> String {
        emit(&self.root, &self.comments)
    }

    /// Digest of the serialized form
    #[inline]
    #[must_use]
    pub fn digest(&self) -> ContentHash {
        ContentHash::compute(self.to_yaml().as_bytes())
    }

    /// Root mapping
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Mutable root mapping
    #[inline]
    pub fn root_mut(&mut self) -> &mut Mapping {
        &mut self.root
    }

    /// Whether the root has no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Top-level child by key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.root.get(key)
    }

    /// Set a top-level key; an existing key keeps its position
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, node: Node) -> Option<Node> {
        self.root.insert(key.into(), node)
    }

    /// Remove a top-level key, preserving the order of the rest
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        self.root.shift_remove(key)
    }

    /// Descend along `keys` without creating anything.
    ///
    /// Returns `None` when a segment is missing, is `null`, or holds a node of
    /// a different kind than declared.
    #[must_use]
    pub fn find(&self, keys: &[Key]) -> Option<&Node> {
        let (last, parents) = keys.split_last()?;
        let mut map = &self.root;
        for key in parents {
            map = map.get(&key.name)?.as_mapping()?;
        }
        let node = map.get(&last.name)?;
        (node.kind() == last.kind && !node.is_null()).then_some(node)
    }

    /// Mutable variant of [`find`](Self::find)
    pub fn find_mut(&mut self, keys: &[Key]) -> Option<&mut Node> {
        let (last, parents) = keys.split_last()?;
        let mut map = &mut self.root;
        for key in parents {
            map = map.get_mut(&key.name)?.as_mapping_mut()?;
        }
        let node = map.get_mut(&last.name)?;
        (node.kind() == last.kind && !node.is_null()).then_some(node)
    }

    /// Descend along `keys`, creating every missing segment as its declared
    /// kind. A `null` placeholder counts as missing.
    ///
    /// # Errors
    /// Returns [`NodeError::KindMismatch`] if an existing segment holds a node
    /// of another kind, or [`NodeError::EmptyPath`] if `keys` is empty
    pub fn find_or_create(&mut self, keys: &[Key]) -> Result<&mut Node, NodeError> {
        descend_create(&mut self.root, keys)
    }
}

fn descend_create<'a>(map: &'a mut Mapping, keys: &[Key]) -> Result<&'a mut Node, NodeError> {
    let (key, rest) = keys.split_first().ok_or(NodeError::EmptyPath)?;
    let slot = map
        .entry(key.name.clone())
        .or_insert_with(|| key.kind.empty_node());
    if slot.is_null() {
        *slot = key.kind.empty_node();
    }
    if slot.kind() != key.kind {
        return Err(NodeError::kind_mismatch(&key.name, key.kind, slot.kind()));
    }
    if rest.is_empty() {
        return Ok(slot);
    }
    match slot {
        Node::Mapping(child) => descend_create(child, rest),
        other => Err(NodeError::kind_mismatch(
            &key.name,
            NodeKind::Mapping,
            other.kind(),
        )),
    }
}
