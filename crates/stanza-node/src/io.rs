//! Loading and saving documents on disk

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::document::Document;
use crate::error::NodeError;
use crate::hash::ContentHash;

/// A document together with the digest of the bytes it was read from
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Parsed document (empty if the file was absent)
    pub document: Document,
    /// Digest of the raw file bytes, `None` if the file did not exist
    pub digest: Option<ContentHash>,
}

impl Snapshot {
    /// Whether the file existed when read
    #[inline]
    #[must_use]
    pub fn existed(&self) -> bool {
        self.digest.is_some()
    }

    /// Whether serializing `document` would produce different bytes than
    /// the ones this snapshot was read from
    #[must_use]
    pub fn differs_from(&self, document: &Document) -> bool {
        self.digest != Some(document.digest())
    }
}

/// Read a document from `path`
///
/// A missing, empty or whitespace-only file yields an empty document.
///
/// # Errors
/// Returns error on IO failure other than not-found, or on malformed YAML
pub fn load(path: &Path) -> Result<Document, NodeError> {
    load_snapshot(path).map(|snapshot| snapshot.document)
}

/// Read a document and remember the digest of its bytes
///
/// # Errors
/// Returns error on IO failure other than not-found, or on malformed YAML
pub fn load_snapshot(path: &Path) -> Result<Snapshot, NodeError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file absent, using empty document");
            return Ok(Snapshot::default());
        }
        Err(e) => return Err(NodeError::io(path, e)),
    };
    let document = Document::parse_from(&text, &path.display().to_string())?;
    Ok(Snapshot {
        document,
        digest: Some(ContentHash::compute(text.as_bytes())),
    })
}

/// Serialize `document` and replace the file at `path`
///
/// # Errors
/// Returns error if the parent directory cannot be created or the file
/// cannot be written
pub fn save(document: &Document, path: &Path) -> Result<ContentHash, NodeError> {
    let yaml = document.to_yaml();
    write_atomic(path, yaml.as_bytes())?;
    Ok(ContentHash::compute(yaml.as_bytes()))
}

/// Write `bytes` to a temporary sibling of `path` and rename it into place,
/// so readers see either the old or the new file, never a partial one.
///
/// # Errors
/// Returns error if any filesystem step fails
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), NodeError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| NodeError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| NodeError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| NodeError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| NodeError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| NodeError::io(path, e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "wrote config file");
    Ok(())
}
