//! Error types for the node store

use std::path::PathBuf;

use crate::node::NodeKind;

/// Errors raised while loading, editing or saving documents
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Source text is not valid YAML
    #[error("syntax error in {path}: {message}")]
    Syntax { path: String, message: String },

    /// Document root is not a mapping
    #[error("document root in {path} must be a mapping, found {found}")]
    RootNotMapping { path: String, found: &'static str },

    /// Mapping key that cannot be represented as a string
    #[error("unsupported non-scalar mapping key in {path}")]
    UnsupportedKey { path: String },

    /// Descent found a node of the wrong shape
    #[error("key '{key}' holds a {found}, expected a {expected}")]
    KindMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Descent requested with no keys
    #[error("empty key path")]
    EmptyPath,

    /// Typed value could not be encoded into a node
    #[error("encode error: {0}")]
    Encode(String),

    /// Node could not be decoded into the requested type
    #[error("decode error: {0}")]
    Decode(String),

    /// IO error during read or write
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl NodeError {
    /// Create syntax error for a source label
    pub fn syntax(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn kind_mismatch(key: &str, expected: NodeKind, found: NodeKind) -> Self {
        Self::KindMismatch {
            key: key.to_string(),
            expected: expected.as_str(),
            found: found.as_str(),
        }
    }

    /// Whether the error came from malformed input rather than the filesystem
    #[inline]
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. } | Self::RootNotMapping { .. } | Self::UnsupportedKey { .. }
        )
    }
}
