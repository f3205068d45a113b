//! Paths for addressing within documents
//!
//! Provides [`KeyPath`], the dotted field path used by patch strategies and
//! identity rules, and [`Key`], one typed step of a [`find`](crate::Document::find)
//! descent.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::node::NodeKind;

/// Dotted path of mapping keys from the document root
///
/// Sequence items do not add a segment, so every server shares the path
/// `servers` and every server endpoint the path
/// `servers.managementClusterOpts.endpoint`.
///
/// # Examples
/// - `["contexts", "clusterOpts", "endpoint"]` → `contexts.clusterOpts.endpoint`
/// - `["clientOptions", "cli", "discoverySources"]` → `clientOptions.cli.discoverySources`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Empty path (document root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is the root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }
}

impl Display for KeyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for KeyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment(s.to_string()))
                } else if seg.chars().any(char::is_whitespace) {
                    Err(PathError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl From<&[&str]> for KeyPath {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| (*s).to_string()).collect())
    }
}

/// One step of a typed descent: the key to follow and the kind of node
/// expected (and created) there
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Mapping key
    pub name: String,
    /// Expected kind of the child
    pub kind: NodeKind,
}

impl Key {
    /// Key expected to hold a mapping
    #[inline]
    #[must_use]
    pub fn mapping(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Mapping,
        }
    }

    /// Key expected to hold a sequence
    #[inline]
    #[must_use]
    pub fn sequence(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Sequence,
        }
    }

    /// Key expected to hold a scalar
    #[inline]
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Scalar,
        }
    }
}

/// Errors related to key paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path '{0}' contains empty segment")]
    EmptySegment(String),

    /// Invalid segment characters
    #[error("invalid segment: '{0}' (must not contain whitespace)")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_child_and_display() {
        let path = KeyPath::root().child("contexts").child("clusterOpts");
        assert_eq!(path.to_string(), "contexts.clusterOpts");
        assert_eq!(path.last(), Some("clusterOpts"));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn path_parse_allows_dashes() {
        let path: KeyPath = "clientOptions.features.global.dual-stack-ipv4-primary"
            .parse()
            .unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.last(), Some("dual-stack-ipv4-primary"));
    }

    #[test]
    fn path_parse_rejects_empty_segment() {
        assert!(matches!(
            "servers..name".parse::<KeyPath>(),
            Err(PathError::EmptySegment(_))
        ));
        assert!("".parse::<KeyPath>().unwrap().is_empty());
    }

    #[test]
    fn path_prefix() {
        let parent: KeyPath = "servers".parse().unwrap();
        let child: KeyPath = "servers.discoverySources".parse().unwrap();
        assert!(parent.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
    }
}
