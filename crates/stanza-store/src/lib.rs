//! Stanza Config Store
//!
//! Concurrent, schema-tolerant client configuration for CLI tooling. Many
//! processes read and write the same small set of YAML files; this crate
//! keeps them consistent.
//!
//! # Architecture
//!
//! ```text
//! accessor ─► lock main + next-gen ─► load + overlay ─► merge candidate ─► synchronize ─► save changed files
//!                                          ▲                                                  │
//!                                   metadata (split mode, patch strategies)          legacy mirror
//! ```
//!
//! - [`ConfigStore`]: handle to one set of files; every accessor lives on it
//! - [`ConfigPaths`]: where the files are, from env overrides or a directory
//! - [`compat`]: keeps servers and contexts mutually derived
//! - [`types`]: typed records encoded as merge candidates
//!
//! # Example
//!
//! ```rust,no_run
//! use stanza_store::{ConfigPaths, ConfigStore, Server, ServerType};
//!
//! let store = ConfigStore::new(ConfigPaths::in_dir("/tmp/stanza"));
//! let server = Server {
//!     name: "dev".to_string(),
//!     server_type: Some(ServerType::ManagementCluster),
//!     ..Server::default()
//! };
//! let dirty = store.set_server(&server, true)?;
//! assert!(store.server_exists("dev")?);
//! assert!(store.context_exists("dev")?);
//! # let _ = dirty;
//! # Ok::<(), stanza_store::ConfigError>(())
//! ```

#![warn(unreachable_pub)]

mod access;
mod cli_options;
pub mod compat;
mod contexts;
mod discovery;
mod env;
mod error;
mod features;
mod legacy;
mod metadata;
mod paths;
mod repositories;
mod schema;
mod servers;
mod store;
pub mod types;

pub use error::{ConfigError, ConfigResult};
pub use legacy::copy_legacy_config_dir;
pub use paths::{
    ConfigPaths, ENV_CONFIG, ENV_CONFIG_METADATA, ENV_CONFIG_NEXT_GEN, ENV_LEGACY_DIR,
    ENV_LOCAL_DIR,
};
pub use schema::client_schema;
pub use store::{
    ConfigStore, StoreOptions, API_VERSION, KIND, NEW_SCHEMA_KEYS, SPLIT_FILES_SETTING,
};
pub use types::*;

pub use stanza_merge::{PatchStrategy, PatchStrategyTable};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
