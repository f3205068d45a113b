//! Legacy config directory
//!
//! Older clients read `<legacy dir>/config.yaml`. While that directory
//! exists, every main-file write is mirrored into it. Mirroring is best
//! effort: failures are logged and never fail the write that triggered them.

use std::fs;
use std::path::Path;

use stanza_node::write_atomic;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ConfigError, ConfigResult};
use crate::paths::ConfigPaths;
use crate::ConfigStore;

const MAIN_FILE: &str = "config.yaml";

/// Write `bytes` to the legacy config file if the legacy directory exists
pub(crate) fn mirror(bytes: &[u8], legacy_dir: &Path) {
    if !legacy_dir.is_dir() {
        return;
    }
    let target = legacy_dir.join(MAIN_FILE);
    match write_atomic(&target, bytes) {
        Ok(()) => debug!(target = %target.display(), "mirrored config to legacy directory"),
        Err(e) => warn!(
            target = %target.display(),
            error = %e,
            "failed to mirror config to legacy directory"
        ),
    }
}

/// Copy the legacy directory tree into the local directory.
///
/// Does nothing unless the legacy directory exists and the local one does
/// not. Returns whether anything was copied.
///
/// # Errors
/// Returns [`ConfigError::Io`] if walking or copying fails
pub fn copy_legacy_config_dir(paths: &ConfigPaths) -> ConfigResult<bool> {
    let (from, to) = (&paths.legacy_dir, &paths.local_dir);
    if !from.is_dir() || to.exists() {
        return Ok(false);
    }

    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from.as_path()).to_path_buf();
            ConfigError::io(path, e.into())
        })?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| ConfigError::io(&dest, e))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &dest).map_err(|e| ConfigError::io(&dest, e))?;
        }
    }

    info!(from = %from.display(), to = %to.display(), "copied legacy config directory");
    warn!(
        legacy = %from.display(),
        "the legacy config directory is deprecated; the local directory is used from now on"
    );
    Ok(true)
}

impl ConfigStore {
    /// Copy the legacy directory into the local directory if the latter is
    /// missing; see [`copy_legacy_config_dir`]
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if copying fails
    pub fn copy_legacy_config_dir(&self) -> ConfigResult<bool> {
        copy_legacy_config_dir(self.paths())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_only_into_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy");
        mirror(b"current: a\n", &legacy);
        assert!(!legacy.exists());

        fs::create_dir(&legacy).unwrap();
        mirror(b"current: a\n", &legacy);
        assert_eq!(fs::read_to_string(legacy.join("config.yaml")).unwrap(), "current: a\n");
    }

    #[test]
    fn mirror_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy");
        fs::create_dir_all(legacy.join("config.yaml")).unwrap();
        // target path is a directory, so the rename fails
        mirror(b"current: a\n", &legacy);
        assert!(legacy.join("config.yaml").is_dir());
    }

    #[test]
    fn copies_tree_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = ConfigPaths::in_dir(dir.path().join("local"));
        paths.legacy_dir = dir.path().join("old");
        fs::create_dir_all(paths.legacy_dir.join("plugins/cache")).unwrap();
        fs::write(paths.legacy_dir.join("config.yaml"), "kind: ClientConfig\n").unwrap();
        fs::write(paths.legacy_dir.join("plugins/cache/index"), "x").unwrap();

        assert!(copy_legacy_config_dir(&paths).unwrap());
        assert!(paths.local_dir.join("config.yaml").is_file());
        assert!(paths.local_dir.join("plugins/cache/index").is_file());

        assert!(!copy_legacy_config_dir(&paths).unwrap());
    }
}
