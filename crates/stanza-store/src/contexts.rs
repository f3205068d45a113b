//! Context accessors

use std::collections::BTreeMap;

use stanza_node::{to_node, Document, Key, Node};
use tracing::info;

use crate::access::{decode, find_named, require_name, upsert_at};
use crate::compat::{self, CONTEXTS, CURRENT_CONTEXT, CURRENT_SERVER, SERVERS};
use crate::error::{ConfigError, ConfigResult};
use crate::servers::remove_target;
use crate::types::{Context, ContextType, Server};
use crate::ConfigStore;

fn context_in(doc: &Document, name: &str) -> ConfigResult<Context> {
    doc.get(CONTEXTS)
        .and_then(Node::as_sequence)
        .and_then(|items| find_named(items, name))
        .ok_or_else(|| ConfigError::not_found(format!("context '{name}'")))
        .and_then(decode)
}

/// Point the current server at `context` when it is eligible: a
/// management cluster or a tmc context
fn follow_with_server(doc: &mut Document, context: &Context) -> bool {
    let eligible = context.is_management_cluster() || context.context_type == Some(ContextType::Tmc);
    if !eligible || doc.get(CURRENT_SERVER).and_then(Node::as_str) == Some(context.name.as_str()) {
        return false;
    }
    doc.insert(CURRENT_SERVER, Node::string(&context.name));
    true
}

impl ConfigStore {
    /// Context by name
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such context exists
    pub fn get_context(&self, name: &str) -> ConfigResult<Context> {
        context_in(&self.read()?, name)
    }

    /// Whether a context named `name` exists
    ///
    /// # Errors
    /// Returns error if the config cannot be read
    pub fn context_exists(&self, name: &str) -> ConfigResult<bool> {
        match self.get_context(name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All contexts; empty if none are configured
    ///
    /// # Errors
    /// Returns error if the config cannot be read or an entry is malformed
    pub fn get_all_contexts(&self) -> ConfigResult<Vec<Context>> {
        let doc = self.read()?;
        doc.get(CONTEXTS)
            .and_then(Node::as_sequence)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(decode)
            .collect()
    }

    /// Add or update a context and its equivalent server, optionally making
    /// it current for its kind. Returns whether anything changed.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if the context has no name, or any
    /// load, merge or write error
    pub fn set_context(&self, context: &Context, set_current: bool) -> ConfigResult<bool> {
        require_name("context", &context.name)?;
        let candidate = to_node(context)?;
        let server_candidate = to_node(&Server::from(context))?;

        let dirty = self.update(|doc, ctx| {
            let mut dirty = upsert_at(doc, &[Key::sequence(CONTEXTS)], candidate, ctx)?;
            dirty |= upsert_at(doc, &[Key::sequence(SERVERS)], server_candidate, ctx)?;
            if set_current {
                if let Some(kind) = &context.context_type {
                    dirty |= compat::set_current_context(doc, kind, &context.name)?;
                }
                dirty |= follow_with_server(doc, context);
            }
            Ok(dirty)
        })?;
        if dirty {
            info!(name = %context.name, set_current, "context saved");
        }
        Ok(dirty)
    }

    /// Remove a context, its server and any current pointers to it
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such context exists; nothing
    /// is written in that case
    pub fn remove_context(&self, name: &str) -> ConfigResult<()> {
        self.update(|doc, _| {
            context_in(doc, name)?;
            remove_target(doc, name)?;
            Ok(true)
        })?;
        info!(%name, "context removed");
        Ok(())
    }

    /// Current context of `kind`
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if none is set for `kind`
    pub fn get_current_context(&self, kind: &ContextType) -> ConfigResult<Context> {
        let doc = self.read()?;
        let name = compat::current_context_of(&doc, kind)
            .ok_or_else(|| ConfigError::not_found(format!("current context of type '{kind}'")))?;
        context_in(&doc, name)
    }

    /// Current context of every kind that has one
    ///
    /// # Errors
    /// Returns error if the config cannot be read
    pub fn get_all_current_contexts(&self) -> ConfigResult<BTreeMap<ContextType, Context>> {
        let doc = self.read()?;
        let Some(pointers) = doc.get(CURRENT_CONTEXT).and_then(Node::as_mapping) else {
            return Ok(BTreeMap::new());
        };
        let mut current = BTreeMap::new();
        for (kind, name) in pointers {
            let Some(name) = name.as_str().filter(|n| !n.is_empty()) else {
                continue;
            };
            current.insert(ContextType::from(kind.as_str()), context_in(&doc, name)?);
        }
        Ok(current)
    }

    /// Make an existing context current for its kind
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no such context exists, or
    /// [`ConfigError::Validation`] if it has no type
    pub fn set_current_context(&self, name: &str) -> ConfigResult<bool> {
        self.update(|doc, _| {
            let context = context_in(doc, name)?;
            let kind = context.context_type.clone().ok_or_else(|| {
                ConfigError::Validation(format!("context '{name}' has no type"))
            })?;
            let mut dirty = compat::set_current_context(doc, &kind, name)?;
            dirty |= follow_with_server(doc, &context);
            Ok(dirty)
        })
    }

    /// Clear the current context of `kind`
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if none is set for `kind`
    pub fn remove_current_context(&self, kind: &ContextType) -> ConfigResult<()> {
        self.update(|doc, _| {
            let removed = doc
                .root_mut()
                .get_mut(CURRENT_CONTEXT)
                .and_then(Node::as_mapping_mut)
                .and_then(|pointers| pointers.shift_remove(kind.as_str()));
            match removed {
                Some(_) => Ok(true),
                None => Err(ConfigError::not_found(format!(
                    "current context of type '{kind}'"
                ))),
            }
        })
        .map(|_| ())
    }
}
