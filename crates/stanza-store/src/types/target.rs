//! Servers and contexts
//!
//! Two generations of the same concept: a [`Server`] is the legacy record,
//! a [`Context`] the current one. Every server has exactly one equivalent
//! context and vice versa; see [`crate::compat`].

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::discovery::PluginDiscovery;

/// Kind of a legacy server entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServerType {
    /// Kubernetes management cluster
    ManagementCluster,
    /// Global SaaS endpoint
    Global,
    /// Kind written by another client version
    Other(String),
}

impl ServerType {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ManagementCluster => "managementcluster",
            Self::Global => "global",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ServerType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "managementcluster" => Self::ManagementCluster,
            "global" => Self::Global,
            _ => Self::Other(s),
        }
    }
}

impl From<ServerType> for String {
    fn from(t: ServerType) -> Self {
        t.as_str().to_string()
    }
}

impl Display for ServerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a context entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContextType {
    /// Kubernetes cluster
    K8s,
    /// Tanzu Mission Control style SaaS endpoint
    Tmc,
    /// Kind written by another client version
    Other(String),
}

impl ContextType {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::K8s => "k8s",
            Self::Tmc => "tmc",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ContextType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "k8s" => Self::K8s,
            "tmc" => Self::Tmc,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for ContextType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<ContextType> for String {
    fn from(t: ContextType) -> Self {
        t.as_str().to_string()
    }
}

impl Display for ContextType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ServerType> for ContextType {
    fn from(t: &ServerType) -> Self {
        match t {
            ServerType::ManagementCluster => Self::K8s,
            ServerType::Global => Self::Tmc,
            ServerType::Other(s) => Self::Other(s.clone()),
        }
    }
}

impl From<&ContextType> for ServerType {
    fn from(t: &ContextType) -> Self {
        match t {
            ContextType::K8s => Self::ManagementCluster,
            ContextType::Tmc => Self::Global,
            ContextType::Other(s) => Self::Other(s.clone()),
        }
    }
}

/// Legacy server entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /// Identity
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Server kind
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub server_type: Option<ServerType>,

    /// Options for global servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_opts: Option<GlobalServer>,

    /// Options for management clusters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_cluster_opts: Option<ManagementClusterServer>,

    /// Plugin discovery sources scoped to this server
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discovery_sources: Vec<PluginDiscovery>,
}

impl Server {
    /// Whether this is a global server
    #[inline]
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.server_type == Some(ServerType::Global)
    }

    /// Whether this is a management cluster
    #[inline]
    #[must_use]
    pub fn is_management_cluster(&self) -> bool {
        self.server_type == Some(ServerType::ManagementCluster)
    }
}

/// Context entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Identity
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Context kind
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub context_type: Option<ContextType>,

    /// Options for global endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_opts: Option<GlobalServer>,

    /// Options for Kubernetes clusters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_opts: Option<ClusterServer>,

    /// Plugin discovery sources scoped to this context
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discovery_sources: Vec<PluginDiscovery>,
}

impl Context {
    /// Whether this context points at a management cluster
    #[inline]
    #[must_use]
    pub fn is_management_cluster(&self) -> bool {
        self.context_type == Some(ContextType::K8s)
            && self
                .cluster_opts
                .as_ref()
                .is_some_and(|opts| opts.is_management_cluster)
    }
}

/// Connection options of a management cluster server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementClusterServer {
    /// API endpoint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    /// Kubeconfig path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Kubeconfig context
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

/// Connection options of a Kubernetes context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServer {
    /// API endpoint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    /// Kubeconfig path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Kubeconfig context
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    /// Whether the cluster is a management cluster
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_management_cluster: bool,
}

/// Connection options of a global endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalServer {
    /// Endpoint address
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    /// Authentication state
    #[serde(default, skip_serializing_if = "GlobalServerAuth::is_empty")]
    pub auth: GlobalServerAuth,
}

/// Authentication state for a global endpoint
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalServerAuth {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(rename = "IDToken", default, skip_serializing_if = "String::is_empty")]
    pub id_token: String,
    #[serde(rename = "refresh_token", default, skip_serializing_if = "String::is_empty")]
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
    /// Token type, e.g. `api-token` or `id-token`
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub token_type: String,
}

impl GlobalServerAuth {
    /// Whether no field is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_types_pass_through() {
        let t = ServerType::from("edge".to_string());
        assert_eq!(t, ServerType::Other("edge".to_string()));
        assert_eq!(ContextType::from(&t), ContextType::Other("edge".to_string()));
        assert_eq!(ServerType::from(&ContextType::Tmc), ServerType::Global);
    }

    #[test]
    fn context_management_cluster_flag() {
        let mut ctx = Context {
            name: "mc".to_string(),
            context_type: Some(ContextType::K8s),
            cluster_opts: Some(ClusterServer {
                is_management_cluster: true,
                ..ClusterServer::default()
            }),
            ..Context::default()
        };
        assert!(ctx.is_management_cluster());
        ctx.context_type = Some(ContextType::Tmc);
        assert!(!ctx.is_management_cluster());
    }
}
