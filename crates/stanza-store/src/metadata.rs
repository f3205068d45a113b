//! Metadata accessors
//!
//! The metadata file is locked on its own and never together with the
//! client config files.

use std::collections::BTreeMap;

use stanza_merge::{PatchStrategy, PatchStrategyTable};
use stanza_node::{Key, KeyPath};
use tracing::info;

use crate::access::{mapping, remove_key, scalar, set_scalar, string_map};
use crate::error::{ConfigError, ConfigResult};
use crate::store::{CONFIG_METADATA, PATCH_STRATEGY, SETTINGS};
use crate::ConfigStore;

fn settings_key() -> [Key; 2] {
    [Key::mapping(CONFIG_METADATA), Key::mapping(SETTINGS)]
}

fn patch_strategy_key() -> [Key; 2] {
    [Key::mapping(CONFIG_METADATA), Key::mapping(PATCH_STRATEGY)]
}

impl ConfigStore {
    /// All metadata settings
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no settings exist
    pub fn get_metadata_settings(&self) -> ConfigResult<BTreeMap<String, String>> {
        let doc = self.read_metadata()?;
        mapping(&doc, &settings_key()).map(string_map)
    }

    /// One metadata setting
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if the setting is absent
    pub fn get_metadata_setting(&self, key: &str) -> ConfigResult<String> {
        let doc = self.read_metadata()?;
        let [metadata, settings] = settings_key();
        scalar(&doc, &[metadata, settings, Key::scalar(key)]).map(str::to_string)
    }

    /// Whether a setting is `true` (case-insensitive); absent means off
    ///
    /// # Errors
    /// Returns error if the metadata file cannot be read
    pub fn is_metadata_setting_enabled(&self, key: &str) -> ConfigResult<bool> {
        match self.get_metadata_setting(key) {
            Ok(value) => Ok(value.trim().eq_ignore_ascii_case("true")),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Set a metadata setting
    ///
    /// # Errors
    /// Returns any load or write error
    pub fn set_metadata_setting(&self, key: &str, value: &str) -> ConfigResult<bool> {
        let dirty = self.update_metadata(|doc| set_scalar(doc, &settings_key(), key, value))?;
        if dirty {
            info!(%key, %value, "metadata setting saved");
        }
        Ok(dirty)
    }

    /// Remove a metadata setting
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if the setting is absent
    pub fn delete_metadata_setting(&self, key: &str) -> ConfigResult<()> {
        self.update_metadata(|doc| remove_key(doc, &settings_key(), key).map(|_| true))
            .map(|_| ())
    }

    /// Validated patch strategy table
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if an entry is malformed
    pub fn get_patch_strategies(&self) -> ConfigResult<PatchStrategyTable> {
        Ok(self.metadata_view()?.strategies)
    }

    /// Set the patch strategy of a dotted field path
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if the path is malformed or the
    /// value is not `replace` or `merge`
    pub fn set_patch_strategy(&self, path: &str, value: &str) -> ConfigResult<bool> {
        let key: KeyPath = path
            .parse()
            .map_err(|e| ConfigError::Validation(format!("{e}")))?;
        let strategy: PatchStrategy = value.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "invalid patch strategy '{value}' for '{key}', expected 'replace' or 'merge'"
            ))
        })?;
        self.update_metadata(|doc| {
            set_scalar(doc, &patch_strategy_key(), &key.to_string(), strategy.as_str())
        })
    }

    /// Remove the patch strategy of a dotted field path
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no strategy is set for `path`
    pub fn delete_patch_strategy(&self, path: &str) -> ConfigResult<()> {
        self.update_metadata(|doc| remove_key(doc, &patch_strategy_key(), path).map(|_| true))
            .map(|_| ())
    }
}
