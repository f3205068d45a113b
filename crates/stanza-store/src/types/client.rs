//! Whole-file views: client config and config metadata

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::discovery::{PluginDiscovery, PluginRepository};
use super::target::{Context, ContextType, Server};
use crate::error::{ConfigError, ConfigResult};

/// Reserved plugin namespace for CLI-wide feature flags
pub const GLOBAL_FEATURES: &str = "global";

/// Plugin → flag → string-encoded value
pub type FeatureMap = BTreeMap<String, BTreeMap<String, String>>;

/// Typed snapshot of the combined client config.
///
/// This is a read view: unknown keys are dropped when decoding into it, so
/// it is never written back. Mutations go through the store accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Schema version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    /// Document kind
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Legacy server entries
    #[serde(rename = "servers", default, skip_serializing_if = "Vec::is_empty")]
    pub known_servers: Vec<Server>,
    /// Name of the current server
    #[serde(rename = "current", default, skip_serializing_if = "String::is_empty")]
    pub current_server: String,
    /// Context entries
    #[serde(rename = "contexts", default, skip_serializing_if = "Vec::is_empty")]
    pub known_contexts: Vec<Context>,
    /// Current context name per kind
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub current_context: BTreeMap<ContextType, String>,
    /// CLI, feature and env options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_options: Option<ClientOptions>,
}

impl ClientConfig {
    /// Server by name
    #[must_use]
    pub fn server(&self, name: &str) -> Option<&Server> {
        self.known_servers.iter().find(|s| s.name == name)
    }

    /// Whether a server named `name` exists
    #[inline]
    #[must_use]
    pub fn has_server(&self, name: &str) -> bool {
        self.server(name).is_some()
    }

    /// Context by name
    #[must_use]
    pub fn context(&self, name: &str) -> Option<&Context> {
        self.known_contexts.iter().find(|c| c.name == name)
    }

    /// Whether a context named `name` exists
    #[inline]
    #[must_use]
    pub fn has_context(&self, name: &str) -> bool {
        self.context(name).is_some()
    }

    /// Current server, if set and present
    #[must_use]
    pub fn current_server(&self) -> Option<&Server> {
        self.server(&self.current_server)
    }

    /// Current context of a kind, if set and present
    #[must_use]
    pub fn current_context(&self, context_type: &ContextType) -> Option<&Context> {
        self.current_context
            .get(context_type)
            .filter(|name| !name.is_empty())
            .and_then(|name| self.context(name))
    }

    /// Current context per kind
    #[must_use]
    pub fn all_current_contexts(&self) -> BTreeMap<ContextType, &Context> {
        self.current_context
            .keys()
            .filter_map(|t| self.current_context(t).map(|c| (t.clone(), c)))
            .collect()
    }

    /// Whether feature `flag` of `plugin` is set to a true value.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if the value is not a boolean
    pub fn is_feature_activated(&self, plugin: &str, flag: &str) -> ConfigResult<bool> {
        let value = self
            .client_options
            .as_ref()
            .and_then(|o| o.features.get(plugin))
            .and_then(|f| f.get(flag))
            .map_or("", String::as_str);
        parse_flag(plugin, flag, value)
    }

    /// Env overrides, empty if none
    #[must_use]
    pub fn env_configurations(&self) -> BTreeMap<String, String> {
        self.client_options
            .as_ref()
            .map(|o| o.env.clone())
            .unwrap_or_default()
    }

    /// CLI options, if any
    #[must_use]
    pub fn cli(&self) -> Option<&CliOptions> {
        self.client_options.as_ref().and_then(|o| o.cli.as_ref())
    }
}

/// Parse a string-encoded feature flag; empty means off
pub(crate) fn parse_flag(plugin: &str, flag: &str, value: &str) -> ConfigResult<bool> {
    if value.is_empty() {
        return Ok(false);
    }
    value.trim().to_ascii_lowercase().parse::<bool>().map_err(|_| {
        ConfigError::Validation(format!(
            "feature '{plugin}.{flag}' has non-boolean value '{value}'"
        ))
    })
}

/// Client-wide options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    /// CLI behaviour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli: Option<CliOptions>,
    /// Feature flags
    #[serde(
        default,
        deserialize_with = "lenient::nested_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub features: FeatureMap,
    /// Environment overrides
    #[serde(
        default,
        deserialize_with = "lenient::map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub env: BTreeMap<String, String>,
}

/// CLI behaviour options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliOptions {
    /// Plugin repositories
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<PluginRepository>,
    /// CLI-level discovery sources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discovery_sources: Vec<PluginDiscovery>,
    /// Raw unstable version selector
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unstable_version_selector: String,
    /// Raw edition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub edition: String,
    /// BOM image repository
    #[serde(rename = "bomRepo", default, skip_serializing_if = "String::is_empty")]
    pub bom_repo: String,
    /// Compatibility file location
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub compatibility_file_path: String,
}

/// Product edition the CLI runs as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditionSelector {
    /// Standard edition
    Standard,
    /// Community edition
    Community,
}

impl EditionSelector {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "tkg",
            Self::Community => "tce",
        }
    }
}

impl FromStr for EditionSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tkg" => Ok(Self::Standard),
            "tce" => Ok(Self::Community),
            other => Err(ConfigError::Validation(format!(
                "unknown edition '{other}', expected 'tkg' or 'tce'"
            ))),
        }
    }
}

impl Display for EditionSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pre-release plugin versions are offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionSelectorLevel {
    /// Every pre-release
    All,
    /// Pre-releases tagged alpha
    Alpha,
    /// Pre-releases tagged experimental
    Experimental,
    /// Releases only
    None,
}

impl VersionSelectorLevel {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Alpha => "alpha",
            Self::Experimental => "experimental",
            Self::None => "none",
        }
    }
}

impl FromStr for VersionSelectorLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "alpha" => Ok(Self::Alpha),
            "experimental" => Ok(Self::Experimental),
            "none" => Ok(Self::None),
            other => Err(ConfigError::Validation(format!(
                "unknown unstable version selector '{other}', expected one of all, alpha, experimental, none"
            ))),
        }
    }
}

impl Display for VersionSelectorLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of the metadata file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMetadata {
    /// Metadata body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_metadata: Option<Metadata>,
}

/// Settings and patch strategies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Dotted field path → `replace` | `merge`
    #[serde(
        default,
        deserialize_with = "lenient::map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub patch_strategy: BTreeMap<String, String>,
    /// Free-form settings
    #[serde(
        default,
        deserialize_with = "lenient::map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub settings: BTreeMap<String, String>,
}

/// Deserializers accepting any scalar where a string is expected, so
/// hand-edited `flag: true` reads the same as `flag: "true"`
mod lenient {
    use std::collections::BTreeMap;

    use super::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Bool(bool),
        Int(i64),
        Float(f64),
        Null(()),
    }

    impl From<Scalar> for String {
        fn from(s: Scalar) -> Self {
            match s {
                Scalar::Str(s) => s,
                Scalar::Bool(b) => b.to_string(),
                Scalar::Int(i) => i.to_string(),
                Scalar::Float(f) => f.to_string(),
                Scalar::Null(()) => String::new(),
            }
        }
    }

    pub(super) fn map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, Scalar>>::deserialize(deserializer)?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.into()))
            .collect())
    }

    pub(super) fn nested_map<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<String, BTreeMap<String, String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, Option<BTreeMap<String, Scalar>>>>::deserialize(
            deserializer,
        )?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .map(|(plugin, flags)| {
                let flags = flags
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(k, v)| (k, v.into()))
                    .collect();
                (plugin, flags)
            })
            .collect())
    }
}
