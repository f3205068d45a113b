//! Testing utilities for the stanza workspace
//!
//! Shared fixtures: an isolated config directory, a store bound to it and
//! builders for the records most tests need.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use stanza_store::{
    ClusterServer, ConfigPaths, ConfigStore, Context, ContextType, DiscoverySource, GlobalServer,
    ManagementClusterServer, OciDiscovery, PluginDiscovery, Server, ServerType, StoreOptions,
};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once; later calls are no-ops.
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=stanza_store=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config files in a private temporary directory, removed on drop
pub struct TestConfigEnv {
    dir: TempDir,
    paths: ConfigPaths,
}

impl TestConfigEnv {
    pub fn new() -> Self {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let paths = ConfigPaths::in_dir(dir.path());
        Self { dir, paths }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// A fresh handle; handles share nothing but the files
    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(self.paths.clone())
    }

    pub fn store_with(&self, options: StoreOptions) -> ConfigStore {
        ConfigStore::with_options(self.paths.clone(), options)
    }

    /// Create the legacy directory so main-file writes get mirrored
    pub fn enable_legacy_dir(&self) -> PathBuf {
        fs::create_dir_all(&self.paths.legacy_dir).unwrap();
        self.paths.legacy_config()
    }

    pub fn write_main(&self, yaml: &str) {
        fs::write(&self.paths.main, yaml).unwrap();
    }

    pub fn write_next_gen(&self, yaml: &str) {
        fs::write(&self.paths.next_gen, yaml).unwrap();
    }

    pub fn write_metadata(&self, yaml: &str) {
        fs::write(&self.paths.metadata, yaml).unwrap();
    }

    /// Turn split-file mode on through the metadata file
    pub fn enable_split_files(&self) {
        self.write_metadata("configMetadata:\n    settings:\n        use-split-files: 'true'\n");
    }

    pub fn read_main(&self) -> String {
        read_or_empty(&self.paths.main)
    }

    pub fn read_next_gen(&self) -> String {
        read_or_empty(&self.paths.next_gen)
    }

    pub fn read_metadata(&self) -> String {
        read_or_empty(&self.paths.metadata)
    }
}

impl Default for TestConfigEnv {
    fn default() -> Self {
        Self::new()
    }
}

fn read_or_empty(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

pub fn management_cluster_server(name: &str) -> Server {
    Server {
        name: name.to_string(),
        server_type: Some(ServerType::ManagementCluster),
        management_cluster_opts: Some(ManagementClusterServer {
            endpoint: format!("https://{name}.example.com:6443"),
            path: "/home/user/.kube/config".to_string(),
            context: format!("{name}-admin@{name}"),
        }),
        ..Server::default()
    }
}

pub fn global_server(name: &str, endpoint: &str) -> Server {
    Server {
        name: name.to_string(),
        server_type: Some(ServerType::Global),
        global_opts: Some(GlobalServer {
            endpoint: endpoint.to_string(),
            ..GlobalServer::default()
        }),
        ..Server::default()
    }
}

pub fn k8s_context(name: &str, management_cluster: bool) -> Context {
    Context {
        name: name.to_string(),
        context_type: Some(ContextType::K8s),
        cluster_opts: Some(ClusterServer {
            endpoint: format!("https://{name}.example.com:6443"),
            path: "/home/user/.kube/config".to_string(),
            context: format!("{name}-admin@{name}"),
            is_management_cluster: management_cluster,
        }),
        ..Context::default()
    }
}

pub fn tmc_context(name: &str, endpoint: &str) -> Context {
    Context {
        name: name.to_string(),
        context_type: Some(ContextType::Tmc),
        global_opts: Some(GlobalServer {
            endpoint: endpoint.to_string(),
            ..GlobalServer::default()
        }),
        ..Context::default()
    }
}

pub fn oci_source(name: &str, image: &str) -> PluginDiscovery {
    PluginDiscovery::new(DiscoverySource::Oci(OciDiscovery {
        name: name.to_string(),
        image: image.to_string(),
    }))
}
