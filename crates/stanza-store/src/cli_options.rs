//! Scalar CLI options under `clientOptions.cli`

use stanza_node::Key;

use crate::access::{scalar, set_scalar};
use crate::error::ConfigResult;
use crate::types::{EditionSelector, VersionSelectorLevel};
use crate::ConfigStore;

const EDITION: &str = "edition";
const BOM_REPO: &str = "bomRepo";
const COMPATIBILITY_FILE_PATH: &str = "compatibilityFilePath";
const UNSTABLE_VERSION_SELECTOR: &str = "unstableVersionSelector";

fn cli_key() -> [Key; 2] {
    [Key::mapping("clientOptions"), Key::mapping("cli")]
}

impl ConfigStore {
    fn get_cli_option(&self, key: &str) -> ConfigResult<String> {
        let doc = self.read()?;
        let [options, cli] = cli_key();
        scalar(&doc, &[options, cli, Key::scalar(key)]).map(str::to_string)
    }

    fn set_cli_option(&self, key: &str, value: &str) -> ConfigResult<bool> {
        self.update(|doc, _| set_scalar(doc, &cli_key(), key, value))
    }

    /// Configured edition
    ///
    /// # Errors
    /// Returns `NotFound` if unset, or `Validation` if the stored value is
    /// not a known edition
    pub fn get_edition(&self) -> ConfigResult<EditionSelector> {
        self.get_cli_option(EDITION)?.parse()
    }

    /// Set the edition; must be `tkg` or `tce`
    ///
    /// # Errors
    /// Returns `Validation` for any other value, before touching any file
    pub fn set_edition(&self, edition: &str) -> ConfigResult<bool> {
        let edition: EditionSelector = edition.parse()?;
        self.set_cli_option(EDITION, edition.as_str())
    }

    /// BOM image repository
    ///
    /// # Errors
    /// Returns `NotFound` if unset
    pub fn get_bom_repo(&self) -> ConfigResult<String> {
        self.get_cli_option(BOM_REPO)
    }

    /// Set the BOM image repository
    ///
    /// # Errors
    /// Returns any load or write error
    pub fn set_bom_repo(&self, repo: &str) -> ConfigResult<bool> {
        self.set_cli_option(BOM_REPO, repo)
    }

    /// Compatibility file location
    ///
    /// # Errors
    /// Returns `NotFound` if unset
    pub fn get_compatibility_file_path(&self) -> ConfigResult<String> {
        self.get_cli_option(COMPATIBILITY_FILE_PATH)
    }

    /// Set the compatibility file location
    ///
    /// # Errors
    /// Returns any load or write error
    pub fn set_compatibility_file_path(&self, path: &str) -> ConfigResult<bool> {
        self.set_cli_option(COMPATIBILITY_FILE_PATH, path)
    }

    /// Which pre-release plugin versions are offered
    ///
    /// # Errors
    /// Returns `NotFound` if unset, or `Validation` if the stored value is
    /// not a known level
    pub fn get_unstable_version_selector(&self) -> ConfigResult<VersionSelectorLevel> {
        self.get_cli_option(UNSTABLE_VERSION_SELECTOR)?.parse()
    }

    /// Set the unstable version selector; must be `all`, `alpha`,
    /// `experimental` or `none`
    ///
    /// # Errors
    /// Returns `Validation` for any other value, before touching any file
    pub fn set_unstable_version_selector(&self, level: &str) -> ConfigResult<bool> {
        let level: VersionSelectorLevel = level.parse()?;
        self.set_cli_option(UNSTABLE_VERSION_SELECTOR, level.as_str())
    }
}
