//! Error types at the store boundary
//!
//! Every lower-layer error is folded into [`ConfigError`] so callers match
//! on one enum. `NotFound` is expected control flow for getters and deletes.

use std::path::PathBuf;
use std::time::Duration;

use stanza_lock::LockError;
use stanza_merge::MergeError;
use stanza_node::NodeError;

/// Store result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors returned by [`crate::ConfigStore`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Requested entity or stanza is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// A config file is malformed
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// A config lock was not obtained in time
    #[error("timed out after {waited:?} waiting for lock {path}")]
    LockTimeout { path: PathBuf, waited: Duration },

    /// Input rejected before any mutation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Filesystem failure
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error only signals absence
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<NodeError> for ConfigError {
    fn from(err: NodeError) -> Self {
        let message = err.to_string();
        match err {
            NodeError::Syntax { path, message } => Self::Parse { path, message },
            NodeError::RootNotMapping { path, .. } | NodeError::UnsupportedKey { path } => {
                Self::Parse { path, message }
            }
            NodeError::Io { path, source } => Self::Io { path, source },
            _ => Self::Validation(message),
        }
    }
}

impl From<LockError> for ConfigError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { path, waited } => Self::LockTimeout { path, waited },
            LockError::Io { path, source } => Self::Io { path, source },
        }
    }
}

impl From<MergeError> for ConfigError {
    fn from(err: MergeError) -> Self {
        Self::Validation(err.to_string())
    }
}
