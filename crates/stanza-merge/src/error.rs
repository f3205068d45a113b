//! Error types for the merge engine

use stanza_node::PathError;

/// Errors raised while merging or upserting
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Candidate element carries no identity under its sequence's rule
    #[error("element at '{path}' has no identity (missing kind or name)")]
    MissingIdentity { path: String },

    /// Upsert requested on a sequence with no registered identity rule
    #[error("no identity rule registered for '{path}'")]
    NoIdentityRule { path: String },

    /// Unknown patch strategy value
    #[error("invalid patch strategy '{value}' for '{path}', expected 'replace' or 'merge'")]
    InvalidStrategy { path: String, value: String },

    /// Malformed dotted path in a strategy table
    #[error("invalid patch strategy path: {0}")]
    InvalidPath(#[from] PathError),
}

/// Result type alias for merge operations
pub type MergeResult<T> = Result<T, MergeError>;
