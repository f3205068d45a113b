//! Plugin discovery sources and repositories
//!
//! Both are tagged unions on disk: one mapping key names the variant and
//! holds the payload, e.g. `oci: {name: default, image: ...}`.

use serde::{Deserialize, Serialize};

use super::target::ContextType;

/// Variant keys of a discovery source, in identity lookup order
pub const DISCOVERY_KINDS: [&str; 5] = ["oci", "local", "gcp", "k8s", "rest"];

/// Variant keys of a repository
pub const REPOSITORY_KINDS: [&str; 1] = ["gcpPluginRepository"];

/// Discovery source entry: a variant plus the context kind it serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDiscovery {
    /// Variant and payload
    #[serde(flatten)]
    pub source: DiscoverySource,

    /// Context kind this source belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_type: Option<ContextType>,
}

impl PluginDiscovery {
    /// Wrap a source without a context tag
    #[inline]
    #[must_use]
    pub fn new(source: DiscoverySource) -> Self {
        Self {
            source,
            context_type: None,
        }
    }

    /// Set the context tag
    #[inline]
    #[must_use]
    pub fn with_context_type(mut self, context_type: ContextType) -> Self {
        self.context_type = Some(context_type);
        self
    }

    /// Name of the wrapped source
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Variant key of the wrapped source
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.source.kind()
    }
}

impl From<DiscoverySource> for PluginDiscovery {
    fn from(source: DiscoverySource) -> Self {
        Self::new(source)
    }
}

/// Where plugins are discovered from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoverySource {
    /// OCI image
    #[serde(rename = "oci")]
    Oci(OciDiscovery),
    /// Local directory
    #[serde(rename = "local")]
    Local(LocalDiscovery),
    /// GCP bucket
    #[serde(rename = "gcp")]
    Gcp(GcpDiscovery),
    /// Kubernetes cluster
    #[serde(rename = "k8s")]
    Kubernetes(KubernetesDiscovery),
    /// Generic REST endpoint
    #[serde(rename = "rest")]
    Rest(RestDiscovery),
}

impl DiscoverySource {
    /// Identity name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Oci(d) => &d.name,
            Self::Local(d) => &d.name,
            Self::Gcp(d) => &d.name,
            Self::Kubernetes(d) => &d.name,
            Self::Rest(d) => &d.name,
        }
    }

    /// Variant key
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Oci(_) => "oci",
            Self::Local(_) => "local",
            Self::Gcp(_) => "gcp",
            Self::Kubernetes(_) => "k8s",
            Self::Rest(_) => "rest",
        }
    }
}

/// OCI image discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OciDiscovery {
    /// Identity
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Image reference
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
}

/// Local directory discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDiscovery {
    /// Identity
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Directory path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// GCP bucket discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpDiscovery {
    /// Identity
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Bucket name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,
    /// Manifest path within the bucket
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manifest_path: String,
}

/// Kubernetes cluster discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesDiscovery {
    /// Identity
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Kubeconfig path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Kubeconfig context
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    /// Discovery API version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// Generic REST discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestDiscovery {
    /// Identity
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Base URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    /// Path under the endpoint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_path: String,
}

/// Plugin repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginRepository {
    /// GCP bucket repository
    #[serde(rename = "gcpPluginRepository")]
    Gcp(GcpPluginRepository),
}

impl PluginRepository {
    /// Identity name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Gcp(r) => &r.name,
        }
    }

    /// Variant key
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Gcp(_) => "gcpPluginRepository",
        }
    }
}

/// GCP bucket plugin repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpPluginRepository {
    /// Identity
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Bucket name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket_name: String,
    /// Root path within the bucket
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stanza_node::{from_node, to_node, Document};

    #[test]
    fn discovery_encodes_as_single_variant_key() {
        let source = PluginDiscovery::new(DiscoverySource::Oci(OciDiscovery {
            name: "default".to_string(),
            image: "registry/plugins:latest".to_string(),
        }))
        .with_context_type(ContextType::K8s);

        let node = to_node(&source).unwrap();
        let mut doc = Document::new();
        doc.insert("source", node.clone());
        assert_eq!(
            doc.to_yaml(),
            "source:\n    oci:\n        name: default\n        image: registry/plugins:latest\n    contextType: k8s\n"
        );

        let decoded: PluginDiscovery = from_node(&node).unwrap();
        assert_eq!(decoded, source);
    }

    #[test]
    fn discovery_decodes_with_unknown_siblings() {
        let doc = Document::parse("s:\n  local:\n    name: admin\n    path: p\n  futureField: 1\n")
            .unwrap();
        let decoded: PluginDiscovery = from_node(doc.get("s").unwrap()).unwrap();
        assert_eq!(decoded.kind(), "local");
        assert_eq!(decoded.name(), "admin");
        assert_eq!(decoded.context_type, None);
    }

    #[test]
    fn repository_round_trip() {
        let repo = PluginRepository::Gcp(GcpPluginRepository {
            name: "core".to_string(),
            bucket_name: "plugins".to_string(),
            root_path: "artifacts".to_string(),
        });
        let node = to_node(&repo).unwrap();
        assert!(node.get("gcpPluginRepository").is_some());
        assert_eq!(from_node::<PluginRepository>(&node).unwrap(), repo);
    }
}
