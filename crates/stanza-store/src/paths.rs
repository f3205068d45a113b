//! Config file locations
//!
//! Resolved from environment overrides with home-relative defaults. The
//! lookup is injectable so tests never touch the process environment.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Main config override
pub const ENV_CONFIG: &str = "STANZA_CONFIG";
/// Next-gen config override
pub const ENV_CONFIG_NEXT_GEN: &str = "STANZA_CONFIG_NEXT_GEN";
/// Metadata override
pub const ENV_CONFIG_METADATA: &str = "STANZA_CONFIG_METADATA";
/// Local state directory override
pub const ENV_LOCAL_DIR: &str = "STANZA_LOCAL_DIR";
/// Legacy mirror directory override
pub const ENV_LEGACY_DIR: &str = "STANZA_LEGACY_DIR";

const MAIN_FILE: &str = "config.yaml";
const NEXT_GEN_FILE: &str = "config-ng.yaml";
const METADATA_FILE: &str = "config-metadata.yaml";

/// Where every config file lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Main (legacy single-file) config
    pub main: PathBuf,
    /// Next-gen config holding the new-schema keys
    pub next_gen: PathBuf,
    /// Config metadata
    pub metadata: PathBuf,
    /// Local state directory
    pub local_dir: PathBuf,
    /// Legacy directory the main file is mirrored into
    pub legacy_dir: PathBuf,
}

impl ConfigPaths {
    /// Resolve from the process environment and the user's home directory
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no home directory can be found
    /// and the directories are not overridden
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), dirs::home_dir())
    }

    /// Resolve through `lookup`, falling back to defaults under `home`.
    /// Empty values count as unset.
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if a default is needed and `home`
    /// is `None`
    pub fn from_lookup<F>(lookup: F, home: Option<PathBuf>) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        let home_join = |rel: &str| {
            home.as_ref()
                .map(|h| h.join(rel))
                .ok_or_else(|| ConfigError::not_found("home directory"))
        };

        let local_dir = match var(ENV_LOCAL_DIR) {
            Some(dir) => dir,
            None => home_join(".config/stanza")?,
        };
        let legacy_dir = match var(ENV_LEGACY_DIR) {
            Some(dir) => dir,
            None => home_join(".stanza")?,
        };

        let paths = Self {
            main: var(ENV_CONFIG).unwrap_or_else(|| local_dir.join(MAIN_FILE)),
            next_gen: var(ENV_CONFIG_NEXT_GEN).unwrap_or_else(|| local_dir.join(NEXT_GEN_FILE)),
            metadata: var(ENV_CONFIG_METADATA).unwrap_or_else(|| local_dir.join(METADATA_FILE)),
            local_dir,
            legacy_dir,
        };
        debug!(main = %paths.main.display(), next_gen = %paths.next_gen.display(), "resolved config paths");
        Ok(paths)
    }

    /// Default file names under `dir`; the legacy directory is `dir/legacy`
    /// and is not created
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            main: dir.join(MAIN_FILE),
            next_gen: dir.join(NEXT_GEN_FILE),
            metadata: dir.join(METADATA_FILE),
            local_dir: dir.to_path_buf(),
            legacy_dir: dir.join("legacy"),
        }
    }

    /// Mirror target for the main file
    #[inline]
    #[must_use]
    pub fn legacy_config(&self) -> PathBuf {
        self.legacy_dir.join(MAIN_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_under_home() {
        let paths = ConfigPaths::from_lookup(lookup(&[]), Some(PathBuf::from("/home/u"))).unwrap();
        assert_eq!(paths.main, PathBuf::from("/home/u/.config/stanza/config.yaml"));
        assert_eq!(paths.next_gen, PathBuf::from("/home/u/.config/stanza/config-ng.yaml"));
        assert_eq!(
            paths.metadata,
            PathBuf::from("/home/u/.config/stanza/config-metadata.yaml")
        );
        assert_eq!(paths.legacy_config(), PathBuf::from("/home/u/.stanza/config.yaml"));
    }

    #[test]
    fn overrides_win_and_empty_is_unset() {
        let paths = ConfigPaths::from_lookup(
            lookup(&[
                (ENV_LOCAL_DIR, "/state"),
                (ENV_CONFIG, "/etc/main.yaml"),
                (ENV_CONFIG_NEXT_GEN, ""),
            ]),
            Some(PathBuf::from("/home/u")),
        )
        .unwrap();
        assert_eq!(paths.main, PathBuf::from("/etc/main.yaml"));
        assert_eq!(paths.next_gen, PathBuf::from("/state/config-ng.yaml"));
        assert_eq!(paths.local_dir, PathBuf::from("/state"));
    }

    #[test]
    fn missing_home_is_not_found() {
        let err = ConfigPaths::from_lookup(lookup(&[]), None).unwrap_err();
        assert!(err.is_not_found());

        let paths = ConfigPaths::from_lookup(
            lookup(&[(ENV_LOCAL_DIR, "/a"), (ENV_LEGACY_DIR, "/b")]),
            None,
        )
        .unwrap();
        assert_eq!(paths.legacy_dir, PathBuf::from("/b"));
    }
}
