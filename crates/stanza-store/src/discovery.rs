//! Discovery source accessors
//!
//! CLI-level sources live under `clientOptions.cli.discoverySources`.
//! Sources of a single server are read through
//! [`ConfigStore::get_discovery_sources`], which adds the server's implied
//! default source.

use stanza_merge::{remove_by_name, IdentityRule};
use stanza_node::{to_node, Key};
use tracing::info;

use crate::access::{decode, find_named, sequence, upsert_at};
use crate::error::{ConfigError, ConfigResult};
use crate::servers::server_in;
use crate::types::{
    DiscoverySource, KubernetesDiscovery, PluginDiscovery, RestDiscovery, Server,
    DISCOVERY_KINDS,
};
use crate::ConfigStore;

/// Base path of the plugin API on global servers
const GLOBAL_PLUGIN_BASE_PATH: &str = "v1alpha1/system/binaries/plugins";

fn cli_sources_key() -> [Key; 3] {
    [
        Key::mapping("clientOptions"),
        Key::mapping("cli"),
        Key::sequence("discoverySources"),
    ]
}

/// The default source a server implies, if any
fn default_source(server: &Server) -> Option<PluginDiscovery> {
    let name = format!("default-{}", server.name);
    if server.is_management_cluster() {
        let opts = server.management_cluster_opts.clone().unwrap_or_default();
        return Some(
            DiscoverySource::Kubernetes(KubernetesDiscovery {
                name,
                path: opts.path,
                context: opts.context,
                version: String::new(),
            })
            .into(),
        );
    }
    if server.is_global() {
        let endpoint = server
            .global_opts
            .as_ref()
            .map(|opts| https_endpoint(&opts.endpoint))
            .unwrap_or_default();
        return Some(
            DiscoverySource::Rest(RestDiscovery {
                name,
                endpoint,
                base_path: GLOBAL_PLUGIN_BASE_PATH.to_string(),
            })
            .into(),
        );
    }
    None
}

/// `https://<host>` for an endpoint written as `host:port` or a URL
fn https_endpoint(endpoint: &str) -> String {
    let without_scheme = endpoint.split_once("://").map_or(endpoint, |(_, rest)| rest);
    let host = without_scheme
        .split(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or(without_scheme);
    if host.is_empty() {
        return String::new();
    }
    format!("https://{host}")
}

impl ConfigStore {
    /// CLI-level discovery sources
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if none are configured
    pub fn get_cli_discovery_sources(&self) -> ConfigResult<Vec<PluginDiscovery>> {
        let doc = self.read()?;
        sequence(&doc, &cli_sources_key())?.iter().map(decode).collect()
    }

    /// CLI-level discovery source by name
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such source exists
    pub fn get_cli_discovery_source(&self, name: &str) -> ConfigResult<PluginDiscovery> {
        let doc = self.read()?;
        let items = sequence(&doc, &cli_sources_key())?;
        find_named(items, name)
            .ok_or_else(|| ConfigError::not_found(format!("discovery source '{name}'")))
            .and_then(decode)
    }

    /// Upsert several CLI-level discovery sources in one write
    ///
    /// # Errors
    /// Returns any load, merge or write error
    pub fn set_cli_discovery_sources(&self, sources: &[PluginDiscovery]) -> ConfigResult<bool> {
        let candidates = sources.iter().map(to_node).collect::<Result<Vec<_>, _>>()?;
        self.update(|doc, ctx| {
            let mut dirty = false;
            for candidate in candidates {
                dirty |= upsert_at(doc, &cli_sources_key(), candidate, ctx)?;
            }
            Ok(dirty)
        })
    }

    /// Upsert one CLI-level discovery source
    ///
    /// # Errors
    /// Returns any load, merge or write error
    pub fn set_cli_discovery_source(&self, source: &PluginDiscovery) -> ConfigResult<bool> {
        let candidate = to_node(source)?;
        let dirty = self.update(|doc, ctx| upsert_at(doc, &cli_sources_key(), candidate, ctx))?;
        if dirty {
            info!(kind = source.kind(), name = source.name(), "discovery source saved");
        }
        Ok(dirty)
    }

    /// Remove the CLI-level discovery source named `name`, whatever its kind
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such source exists
    pub fn delete_cli_discovery_source(&self, name: &str) -> ConfigResult<()> {
        let rule = IdentityRule::variant(&DISCOVERY_KINDS);
        self.update(|doc, _| {
            doc.find_mut(&cli_sources_key())
                .and_then(|node| node.as_sequence_mut())
                .and_then(|items| remove_by_name(items, name, &rule))
                .map(|_| true)
                .ok_or_else(|| ConfigError::not_found(format!("discovery source '{name}'")))
        })
        .map(|_| ())
    }

    /// Discovery sources of server `name`, followed by its implied default
    /// source unless one of that name is already listed
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such server exists
    pub fn get_discovery_sources(&self, name: &str) -> ConfigResult<Vec<PluginDiscovery>> {
        let server = server_in(&self.read()?, name)?;
        let mut sources = server.discovery_sources.clone();
        if let Some(default) = default_source(&server) {
            if !sources.iter().any(|s| s.name() == default.name()) {
                sources.push(default);
            }
        }
        Ok(sources)
    }
}
