//! Typed records projected onto config documents
//!
//! All records ignore unknown keys when decoded. The store never writes a
//! record back wholesale; it encodes it as a candidate and merges it into
//! the node tree, so keys this version does not know survive.

mod client;
mod discovery;
mod target;

pub use client::{
    ClientConfig, ClientOptions, CliOptions, ConfigMetadata, EditionSelector,
    FeatureMap, Metadata, VersionSelectorLevel, GLOBAL_FEATURES,
};
pub(crate) use client::parse_flag;
pub use discovery::{
    DiscoverySource, GcpDiscovery, GcpPluginRepository, KubernetesDiscovery, LocalDiscovery,
    OciDiscovery, PluginDiscovery, PluginRepository, RestDiscovery, DISCOVERY_KINDS,
    REPOSITORY_KINDS,
};
pub use target::{
    ClusterServer, Context, ContextType, GlobalServer, GlobalServerAuth, ManagementClusterServer,
    Server, ServerType,
};
