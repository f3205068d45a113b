//! Merge schema
//!
//! Provides [`MergeSchema`], the registry of which sequence paths are keyed
//! and by what [`IdentityRule`]. Sequences not in the schema are treated as
//! opaque lists.

use std::collections::HashMap;

use stanza_node::KeyPath;

use crate::identity::IdentityRule;

/// Registry of identity rules by sequence path
#[derive(Debug, Default, Clone)]
pub struct MergeSchema {
    rules: HashMap<KeyPath, IdentityRule>,
}

impl MergeSchema {
    /// Create new empty schema
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the rule for a sequence path
    pub fn register(&mut self, path: KeyPath, rule: IdentityRule) {
        self.rules.insert(path, rule);
    }

    /// Builder form of [`register`](Self::register)
    #[inline]
    #[must_use]
    pub fn with_rule(mut self, path: &[&str], rule: IdentityRule) -> Self {
        self.register(KeyPath::from(path), rule);
        self
    }

    /// Rule for the sequence at `path`
    #[inline]
    #[must_use]
    pub fn rule_for(&self, path: &KeyPath) -> Option<&IdentityRule> {
        self.rules.get(path)
    }

    /// Get number of registered rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if schema is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
