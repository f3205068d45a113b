//! Layered config store
//!
//! The combined client config is assembled from two files. The main file
//! holds the whole legacy layout; the next-gen file holds the new-schema
//! keys (`contexts`, `currentContext`). Metadata setting
//! [`SPLIT_FILES_SETTING`] decides where writes of those
//! keys go:
//!
//! | Mode    | Read                                  | Write                                              |
//! |---------|---------------------------------------|----------------------------------------------------|
//! | unsplit | main, overlaid with next-gen new keys | whole doc to main, new keys to next-gen if present |
//! | split   | main, overlaid with next-gen new keys | old keys to main, new keys to next-gen             |
//!
//! In split mode the main file keeps its own copy of the new keys for older
//! clients; entries deleted through the store are pruned from that copy so
//! they do not reappear on the next read.
//!
//! Reads take no lock. Every mutation runs under the main and next-gen
//! locks (in that order), re-reads both files, applies a closure,
//! re-synchronizes servers and contexts and writes only files whose bytes
//! changed.

use std::fs;
use std::io::ErrorKind;
use std::time::Duration;

use stanza_lock::{LockKind, LockManager, DEFAULT_LOCK_TIMEOUT};
use stanza_merge::{MergeContext, PatchStrategyTable};
use stanza_node::{
    from_node, load, load_snapshot, save, write_atomic, Document, Node, Snapshot,
};
use tracing::{debug, info};

use crate::compat::{self, CONTEXTS, CURRENT_CONTEXT};
use crate::error::{ConfigError, ConfigResult};
use crate::legacy;
use crate::paths::ConfigPaths;
use crate::schema::CLIENT_SCHEMA;
use crate::types::{ClientConfig, ConfigMetadata};

/// Metadata setting enabling split-file mode
pub const SPLIT_FILES_SETTING: &str = "use-split-files";

/// `apiVersion` of a freshly created main document
pub const API_VERSION: &str = "config.stanza.dev/v1alpha1";

/// `kind` of a freshly created main document
pub const KIND: &str = "ClientConfig";

/// Keys owned by the next-gen file
pub const NEW_SCHEMA_KEYS: [&str; 2] = [CONTEXTS, CURRENT_CONTEXT];

pub(crate) const CONFIG_METADATA: &str = "configMetadata";
pub(crate) const SETTINGS: &str = "settings";
pub(crate) const PATCH_STRATEGY: &str = "patchStrategy";

/// Store tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Budget for acquiring each config lock
    pub lock_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Handle to one set of config files.
///
/// Handles hold no cached state; every call re-reads the files, so any
/// number of handles (in any number of processes) may share the files.
#[derive(Debug)]
pub struct ConfigStore {
    paths: ConfigPaths,
    locks: LockManager,
}

/// What the metadata file says about how to read and merge
#[derive(Debug, Default)]
pub(crate) struct MetadataView {
    pub(crate) split_files: bool,
    pub(crate) strategies: PatchStrategyTable,
}

/// The combined document plus the on-disk state it was built from
#[derive(Debug)]
struct Layers {
    document: Document,
    main: Snapshot,
    next_gen: Snapshot,
    synced: bool,
}

impl ConfigStore {
    /// Create a store with default options
    #[inline]
    #[must_use]
    pub fn new(paths: ConfigPaths) -> Self {
        Self::with_options(paths, StoreOptions::default())
    }

    /// Create a store with explicit options
    #[must_use]
    pub fn with_options(paths: ConfigPaths, options: StoreOptions) -> Self {
        let locks = LockManager::new(
            paths.main.clone(),
            paths.next_gen.clone(),
            paths.metadata.clone(),
        )
        .with_timeout(options.lock_timeout);
        Self { paths, locks }
    }

    /// Create a store at the locations given by the environment
    ///
    /// # Errors
    /// See [`ConfigPaths::from_env`]
    pub fn from_env() -> ConfigResult<Self> {
        ConfigPaths::from_env().map(Self::new)
    }

    /// File locations
    #[inline]
    #[must_use]
    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Typed snapshot of the combined client config
    ///
    /// # Errors
    /// Returns error if a file cannot be read or parsed
    pub fn get_client_config(&self) -> ConfigResult<ClientConfig> {
        let doc = self.read()?;
        Ok(from_node(&Node::Mapping(doc.root().clone()))?)
    }

    /// Delete the main and next-gen files
    ///
    /// # Errors
    /// Returns error if a lock cannot be taken or a file cannot be removed
    pub fn delete_client_config(&self) -> ConfigResult<()> {
        let _main = self.locks.acquire(LockKind::Main)?;
        let _next_gen = self.locks.acquire(LockKind::NextGen)?;
        for path in [&self.paths.main, &self.paths.next_gen] {
            match fs::remove_file(path) {
                Ok(()) => info!(path = %path.display(), "deleted config file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(ConfigError::io(path, e)),
            }
        }
        Ok(())
    }

    /// Typed view of the metadata file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn get_config_metadata(&self) -> ConfigResult<ConfigMetadata> {
        let doc = load(&self.paths.metadata)?;
        Ok(from_node(&Node::Mapping(doc.root().clone()))?)
    }

    /// Combined, synchronized client config document. Takes no lock.
    pub(crate) fn read(&self) -> ConfigResult<Document> {
        Ok(self.load_layers()?.document)
    }

    /// Raw metadata document. Takes no lock.
    pub(crate) fn read_metadata(&self) -> ConfigResult<Document> {
        Ok(load(&self.paths.metadata)?)
    }

    /// Mutate the combined client config under lock.
    ///
    /// `mutate` receives the synchronized document and a merge context
    /// carrying the metadata's patch strategies, and returns whether it
    /// changed anything. Returns the same flag.
    ///
    /// # Errors
    /// Returns error if a lock times out, a file is malformed, the metadata
    /// holds an invalid patch strategy, `mutate` fails or a write fails. No
    /// file is written on error.
    pub(crate) fn update<F>(&self, mutate: F) -> ConfigResult<bool>
    where
        F: FnOnce(&mut Document, &MergeContext<'_>) -> ConfigResult<bool>,
    {
        let _main = self.locks.acquire(LockKind::Main)?;
        let _next_gen = self.locks.acquire(LockKind::NextGen)?;

        let view = self.metadata_view()?;
        let mut layers = self.load_layers()?;
        let ctx = MergeContext::new(&CLIENT_SCHEMA, &view.strategies);

        let dirty = mutate(&mut layers.document, &ctx)?;
        let synced = compat::synchronize(&mut layers.document)? || layers.synced;
        if dirty || synced {
            self.persist(&layers, view.split_files)?;
        }
        debug!(dirty, synced, "config update finished");
        Ok(dirty)
    }

    /// Mutate the metadata document under its own lock
    ///
    /// # Errors
    /// Returns error if the lock times out, the file is malformed, `mutate`
    /// fails or the write fails
    pub(crate) fn update_metadata<F>(&self, mutate: F) -> ConfigResult<bool>
    where
        F: FnOnce(&mut Document) -> ConfigResult<bool>,
    {
        let _metadata = self.locks.acquire(LockKind::Metadata)?;
        let snapshot = load_snapshot(&self.paths.metadata)?;
        let mut document = snapshot.document.clone();

        let dirty = mutate(&mut document)?;
        if dirty && snapshot.differs_from(&document) {
            save(&document, &self.paths.metadata)?;
        }
        Ok(dirty)
    }

    pub(crate) fn metadata_view(&self) -> ConfigResult<MetadataView> {
        let doc = load(&self.paths.metadata)?;
        let Some(metadata) = doc.get(CONFIG_METADATA) else {
            return Ok(MetadataView::default());
        };

        let split_files = metadata
            .get(SETTINGS)
            .and_then(|settings| settings.get_str(SPLIT_FILES_SETTING))
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        let entries = metadata
            .get(PATCH_STRATEGY)
            .and_then(Node::as_mapping)
            .into_iter()
            .flatten()
            .map(|(path, value)| (path.as_str(), value.as_str().unwrap_or("")));
        let strategies = PatchStrategyTable::from_entries(entries)?;

        Ok(MetadataView {
            split_files,
            strategies,
        })
    }

    fn load_layers(&self) -> ConfigResult<Layers> {
        let main = load_snapshot(&self.paths.main)?;
        let next_gen = load_snapshot(&self.paths.next_gen)?;

        let mut document = main.document.clone();
        if document.is_empty() {
            document.insert("apiVersion", Node::string(API_VERSION));
            document.insert("kind", Node::string(KIND));
        }
        overlay_new_schema_keys(&mut document, &next_gen.document);
        let synced = compat::synchronize(&mut document)?;

        Ok(Layers {
            document,
            main,
            next_gen,
            synced,
        })
    }

    fn persist(&self, layers: &Layers, split_files: bool) -> ConfigResult<()> {
        let mut next_gen = layers.next_gen.document.clone();
        take_new_schema_keys(&mut next_gen, &layers.document);

        let main = if split_files {
            main_without_new_schema_keys(&layers.main.document, &layers.document)
        } else {
            layers.document.clone()
        };

        if layers.main.differs_from(&main) {
            self.write_main(&main)?;
        }

        let write_next_gen = split_files || layers.next_gen.existed();
        if write_next_gen && layers.next_gen.differs_from(&next_gen) {
            save(&next_gen, &self.paths.next_gen)?;
        }
        Ok(())
    }

    fn write_main(&self, document: &Document) -> ConfigResult<()> {
        let yaml = document.to_yaml();
        write_atomic(&self.paths.main, yaml.as_bytes())?;
        legacy::mirror(yaml.as_bytes(), &self.paths.legacy_dir);
        Ok(())
    }
}

/// Replace `target`'s new-schema keys with `source`'s, in place
fn take_new_schema_keys(target: &mut Document, source: &Document) {
    for key in NEW_SCHEMA_KEYS {
        match source.get(key) {
            Some(node) => {
                target.insert(key, node.clone());
            }
            None => {
                target.remove(key);
            }
        }
    }
}

/// Overlay `next_gen`'s contexts (per name) and current pointers (per kind)
fn overlay_new_schema_keys(document: &mut Document, next_gen: &Document) {
    if let Some(contexts) = next_gen.get(CONTEXTS).and_then(Node::as_sequence) {
        let target = document
            .root_mut()
            .entry(CONTEXTS.to_string())
            .or_insert_with(|| Node::Sequence(Vec::new()));
        if !matches!(target, Node::Sequence(_)) {
            *target = Node::Sequence(Vec::new());
        }
        if let Some(items) = target.as_sequence_mut() {
            for context in contexts {
                let name = context.get_str("name");
                let slot = items
                    .iter_mut()
                    .find(|item| name.is_some() && item.get_str("name") == name);
                match slot {
                    Some(slot) => *slot = context.clone(),
                    None => items.push(context.clone()),
                }
            }
        }
    }

    if let Some(pointers) = next_gen.get(CURRENT_CONTEXT).and_then(Node::as_mapping) {
        let target = document
            .root_mut()
            .entry(CURRENT_CONTEXT.to_string())
            .or_insert_with(Node::mapping);
        if !matches!(target, Node::Mapping(_)) {
            *target = Node::mapping();
        }
        if let Some(map) = target.as_mapping_mut() {
            for (kind, name) in pointers {
                map.insert(kind.clone(), name.clone());
            }
        }
    }
}

/// The main file's content in split mode: every key of `combined` except
/// the new-schema keys, which keep their on-disk value minus the contexts
/// and pointers `combined` no longer has. Key order follows the file on
/// disk.
fn main_without_new_schema_keys(on_disk: &Document, combined: &Document) -> Document {
    let mut main = on_disk.clone();
    prune_removed_new_schema_entries(&mut main, combined);
    let stale: Vec<String> = main
        .root()
        .keys()
        .filter(|key| !NEW_SCHEMA_KEYS.contains(&key.as_str()) && combined.get(key).is_none())
        .cloned()
        .collect();
    for key in stale {
        main.remove(&key);
    }
    for (key, node) in combined.root() {
        if !NEW_SCHEMA_KEYS.contains(&key.as_str()) {
            main.insert(key.clone(), node.clone());
        }
    }
    main
}

/// Drop contexts and current-context pointers that `combined` lost
fn prune_removed_new_schema_entries(main: &mut Document, combined: &Document) {
    let live = compat::names(combined, CONTEXTS);
    let mut emptied = Vec::new();
    if let Some(items) = main.root_mut().get_mut(CONTEXTS).and_then(Node::as_sequence_mut) {
        let before = items.len();
        items.retain(|item| item.get_str("name").map_or(true, |name| live.contains(name)));
        if items.is_empty() && items.len() != before {
            emptied.push(CONTEXTS);
        }
    }

    let current = combined.get(CURRENT_CONTEXT).and_then(Node::as_mapping);
    if let Some(pointers) = main.root_mut().get_mut(CURRENT_CONTEXT).and_then(Node::as_mapping_mut) {
        let before = pointers.len();
        pointers.retain(|kind, _| current.is_some_and(|current| current.contains_key(kind)));
        if pointers.is_empty() && pointers.len() != before {
            emptied.push(CURRENT_CONTEXT);
        }
    }

    for key in emptied {
        main.remove(key);
    }
}
