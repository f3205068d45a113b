//! Environment override accessors (`clientOptions.env`)

use std::collections::BTreeMap;

use stanza_node::Key;

use crate::access::{remove_key, scalar, set_scalar, string_map};
use crate::error::ConfigResult;
use crate::ConfigStore;

fn env_key() -> [Key; 2] {
    [Key::mapping("clientOptions"), Key::mapping("env")]
}

impl ConfigStore {
    /// Value of one env override
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`](crate::ConfigError::NotFound) if the
    /// variable is not set
    pub fn get_env(&self, key: &str) -> ConfigResult<String> {
        let doc = self.read()?;
        let [options, env] = env_key();
        scalar(&doc, &[options, env, Key::scalar(key)]).map(str::to_string)
    }

    /// All env overrides; empty if none
    ///
    /// # Errors
    /// Returns error if the config cannot be read
    pub fn get_env_configurations(&self) -> ConfigResult<BTreeMap<String, String>> {
        let doc = self.read()?;
        Ok(doc
            .find(&env_key())
            .and_then(|node| node.as_mapping())
            .map(string_map)
            .unwrap_or_default())
    }

    /// Set an env override
    ///
    /// # Errors
    /// Returns any load or write error
    pub fn set_env(&self, key: &str, value: &str) -> ConfigResult<bool> {
        self.update(|doc, _| set_scalar(doc, &env_key(), key, value))
    }

    /// Remove an env override
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`](crate::ConfigError::NotFound) if the
    /// variable is not set
    pub fn delete_env(&self, key: &str) -> ConfigResult<()> {
        self.update(|doc, _| remove_key(doc, &env_key(), key).map(|_| true))
            .map(|_| ())
    }
}
