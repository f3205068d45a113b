//! Server accessors
//!
//! Every server write also upserts the equivalent context so both
//! generations stay in step; removals drop both and clear the current
//! pointers naming them.

use stanza_node::{to_node, Document, Key, Node};
use tracing::info;

use crate::access::{decode, find_named, require_name, upsert_at};
use crate::compat::{self, CONTEXTS, CURRENT_CONTEXT, CURRENT_SERVER, SERVERS};
use crate::error::{ConfigError, ConfigResult};
use crate::types::{Context, ContextType, Server};
use crate::ConfigStore;

fn servers_key() -> [Key; 1] {
    [Key::sequence(SERVERS)]
}

fn contexts_key() -> [Key; 1] {
    [Key::sequence(CONTEXTS)]
}

/// Server named `name` in a combined document
pub(crate) fn server_in(doc: &Document, name: &str) -> ConfigResult<Server> {
    doc.get(SERVERS)
        .and_then(Node::as_sequence)
        .and_then(|items| find_named(items, name))
        .ok_or_else(|| ConfigError::not_found(format!("server '{name}'")))
        .and_then(decode)
}

/// Remove the server and context named `name` plus pointers to it.
/// Returns `NotFound` if neither exists.
pub(crate) fn remove_target(doc: &mut Document, name: &str) -> ConfigResult<()> {
    let mut removed = false;
    for key in [SERVERS, CONTEXTS] {
        if let Some(items) = doc.root_mut().get_mut(key).and_then(Node::as_sequence_mut) {
            let before = items.len();
            items.retain(|item| item.get_str("name") != Some(name));
            removed |= items.len() != before;
        }
    }
    if !removed {
        return Err(ConfigError::not_found(format!("server or context '{name}'")));
    }

    if doc.get(CURRENT_SERVER).and_then(Node::as_str) == Some(name) {
        doc.remove(CURRENT_SERVER);
    }
    if let Some(pointers) = doc.root_mut().get_mut(CURRENT_CONTEXT).and_then(Node::as_mapping_mut) {
        pointers.retain(|_, current| current.as_str() != Some(name));
    }
    Ok(())
}

impl ConfigStore {
    /// Server by name
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such server exists
    pub fn get_server(&self, name: &str) -> ConfigResult<Server> {
        server_in(&self.read()?, name)
    }

    /// Whether a server named `name` exists
    ///
    /// # Errors
    /// Returns error if the config cannot be read
    pub fn server_exists(&self, name: &str) -> ConfigResult<bool> {
        match self.get_server(name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All servers; empty if none are configured
    ///
    /// # Errors
    /// Returns error if the config cannot be read or an entry is malformed
    pub fn get_all_servers(&self) -> ConfigResult<Vec<Server>> {
        let doc = self.read()?;
        doc.get(SERVERS)
            .and_then(Node::as_sequence)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(decode)
            .collect()
    }

    /// Add or update a server and its equivalent context, optionally making
    /// it current. Returns whether anything changed.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if the server has no name, or any
    /// load, merge or write error
    pub fn set_server(&self, server: &Server, set_current: bool) -> ConfigResult<bool> {
        require_name("server", &server.name)?;
        let candidate = to_node(server)?;
        let context = Context::from(server);
        let context_candidate = to_node(&context)?;

        let dirty = self.update(|doc, ctx| {
            let mut dirty = upsert_at(doc, &servers_key(), candidate, ctx)?;
            dirty |= upsert_at(doc, &contexts_key(), context_candidate, ctx)?;
            if set_current {
                dirty |= point_current_server(doc, &server.name);
                if let Some(kind) = &context.context_type {
                    dirty |= compat::set_current_context(doc, kind, &server.name)?;
                }
            }
            Ok(dirty)
        })?;
        if dirty {
            info!(name = %server.name, set_current, "server saved");
        }
        Ok(dirty)
    }

    /// Remove a server, its context and any current pointers to it
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such server exists; nothing is
    /// written in that case
    pub fn remove_server(&self, name: &str) -> ConfigResult<()> {
        self.update(|doc, _| {
            server_in(doc, name)?;
            remove_target(doc, name)?;
            Ok(true)
        })?;
        info!(%name, "server removed");
        Ok(())
    }

    /// The current server
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no current server is set
    pub fn get_current_server(&self) -> ConfigResult<Server> {
        let doc = self.read()?;
        let name = doc
            .get(CURRENT_SERVER)
            .and_then(Node::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ConfigError::not_found("current server"))?;
        server_in(&doc, name)
    }

    /// Make an existing server current, along with its context
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such server exists
    pub fn set_current_server(&self, name: &str) -> ConfigResult<bool> {
        self.update(|doc, _| {
            let server = server_in(doc, name)?;
            let mut dirty = point_current_server(doc, name);
            if let Some(kind) = server.server_type.as_ref().map(ContextType::from) {
                dirty |= compat::set_current_context(doc, &kind, name)?;
            }
            Ok(dirty)
        })
    }

    /// Clear the current server if it is `name`
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if `name` is not the current server
    pub fn remove_current_server(&self, name: &str) -> ConfigResult<()> {
        self.update(|doc, _| {
            if doc.get(CURRENT_SERVER).and_then(Node::as_str) != Some(name) {
                return Err(ConfigError::not_found(format!("current server '{name}'")));
            }
            doc.remove(CURRENT_SERVER);
            Ok(true)
        })
        .map(|_| ())
    }
}

fn point_current_server(doc: &mut Document, name: &str) -> bool {
    if doc.get(CURRENT_SERVER).and_then(Node::as_str) == Some(name) {
        return false;
    }
    doc.insert(CURRENT_SERVER, Node::string(name));
    true
}
