//! Plugin repository accessors

use stanza_merge::{remove_by_name, IdentityRule};
use stanza_node::{to_node, Key};

use crate::access::{decode, find_named, sequence, upsert_at};
use crate::error::{ConfigError, ConfigResult};
use crate::types::{PluginRepository, REPOSITORY_KINDS};
use crate::ConfigStore;

fn repositories_key() -> [Key; 3] {
    [
        Key::mapping("clientOptions"),
        Key::mapping("cli"),
        Key::sequence("repositories"),
    ]
}

impl ConfigStore {
    /// Configured plugin repositories
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if none are configured
    pub fn get_cli_repositories(&self) -> ConfigResult<Vec<PluginRepository>> {
        let doc = self.read()?;
        sequence(&doc, &repositories_key())?.iter().map(decode).collect()
    }

    /// Plugin repository by name
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such repository exists
    pub fn get_cli_repository(&self, name: &str) -> ConfigResult<PluginRepository> {
        let doc = self.read()?;
        find_named(sequence(&doc, &repositories_key())?, name)
            .ok_or_else(|| ConfigError::not_found(format!("repository '{name}'")))
            .and_then(decode)
    }

    /// Add or update a plugin repository
    ///
    /// # Errors
    /// Returns any load, merge or write error
    pub fn set_cli_repository(&self, repository: &PluginRepository) -> ConfigResult<bool> {
        let candidate = to_node(repository)?;
        self.update(|doc, ctx| upsert_at(doc, &repositories_key(), candidate, ctx))
    }

    /// Remove the plugin repository named `name`
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such repository exists
    pub fn delete_cli_repository(&self, name: &str) -> ConfigResult<()> {
        let rule = IdentityRule::variant(&REPOSITORY_KINDS);
        self.update(|doc, _| {
            doc.find_mut(&repositories_key())
                .and_then(|node| node.as_sequence_mut())
                .and_then(|items| remove_by_name(items, name, &rule))
                .map(|_| true)
                .ok_or_else(|| ConfigError::not_found(format!("repository '{name}'")))
        })
        .map(|_| ())
    }
}
