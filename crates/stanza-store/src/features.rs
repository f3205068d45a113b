//! Feature flag accessors
//!
//! Flags live at `clientOptions.features.<plugin>.<flag>` as string-encoded
//! booleans. Hand-edited files may hold unquoted booleans; reads go
//! through the node tree, so both forms read the same.

use stanza_node::Key;

use crate::access::{mapping, remove_key, scalar, set_scalar, string_map};
use crate::error::ConfigResult;
use crate::types::{parse_flag, FeatureMap};
use crate::ConfigStore;

fn features_key() -> [Key; 2] {
    [Key::mapping("clientOptions"), Key::mapping("features")]
}

fn plugin_key(plugin: &str) -> [Key; 3] {
    let [options, features] = features_key();
    [options, features, Key::mapping(plugin)]
}

impl ConfigStore {
    /// Raw value of a feature flag
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`](crate::ConfigError::NotFound) if the
    /// flag is not set
    pub fn get_feature(&self, plugin: &str, flag: &str) -> ConfigResult<String> {
        let doc = self.read()?;
        let [options, features, plugin] = plugin_key(plugin);
        scalar(&doc, &[options, features, plugin, Key::scalar(flag)]).map(str::to_string)
    }

    /// Whether a feature flag is set to true; an unset flag is off
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`](crate::ConfigError::Validation) if
    /// the value is not a boolean
    pub fn is_feature_activated(&self, plugin: &str, flag: &str) -> ConfigResult<bool> {
        match self.get_feature(plugin, flag) {
            Ok(value) => parse_flag(plugin, flag, &value),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Every feature flag, by plugin
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`](crate::ConfigError::NotFound) if no
    /// features are configured
    pub fn get_all_features(&self) -> ConfigResult<FeatureMap> {
        let doc = self.read()?;
        let features = mapping(&doc, &features_key())?;
        Ok(features
            .iter()
            .filter_map(|(plugin, flags)| {
                flags.as_mapping().map(|flags| (plugin.clone(), string_map(flags)))
            })
            .collect())
    }

    /// Set a feature flag
    ///
    /// # Errors
    /// Returns any load or write error
    pub fn set_feature(&self, plugin: &str, flag: &str, value: &str) -> ConfigResult<bool> {
        self.update(|doc, _| set_scalar(doc, &plugin_key(plugin), flag, value))
    }

    /// Remove a feature flag
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`](crate::ConfigError::NotFound) if the
    /// flag is not set
    pub fn delete_feature(&self, plugin: &str, flag: &str) -> ConfigResult<()> {
        self.update(|doc, _| remove_key(doc, &plugin_key(plugin), flag).map(|_| true))
            .map(|_| ())
    }
}
