//! Field merge and keyed upsert
//!
//! [`merge_node`] folds a candidate subtree into an existing one field by
//! field, honouring the patch strategy of each path, and reports whether
//! anything changed. [`upsert`] places a candidate element into a keyed
//! sequence, updating the element with the same identity or appending.

use std::borrow::Cow;

use stanza_node::{KeyPath, Mapping, Node};
use tracing::debug;

use crate::error::{MergeError, MergeResult};
use crate::identity::{Identity, IdentityRule};
use crate::schema::MergeSchema;
use crate::strategy::{PatchStrategy, PatchStrategyTable};

/// What an upsert did to its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No element matched; the candidate was appended
    Inserted,
    /// An element matched and at least one field changed
    Updated,
    /// An element matched and nothing changed
    Unchanged,
}

impl UpsertOutcome {
    /// Whether the sequence was modified
    #[inline]
    #[must_use]
    pub const fn is_dirty(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Schema and strategies a merge runs under
#[derive(Debug, Clone)]
pub struct MergeContext<'a> {
    schema: &'a MergeSchema,
    strategies: Cow<'a, PatchStrategyTable>,
}

impl<'a> MergeContext<'a> {
    /// Create a context borrowing a schema and strategy table
    #[inline]
    #[must_use]
    pub fn new(schema: &'a MergeSchema, strategies: &'a PatchStrategyTable) -> Self {
        Self {
            schema,
            strategies: Cow::Borrowed(strategies),
        }
    }

    /// Identity schema
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &MergeSchema {
        self.schema
    }

    /// Strategy for `path`
    #[inline]
    #[must_use]
    pub fn strategy(&self, path: &KeyPath) -> PatchStrategy {
        self.strategies.strategy_for(path)
    }

    fn with_replaced(&self, paths: impl IntoIterator<Item = KeyPath>) -> MergeContext<'a> {
        MergeContext {
            schema: self.schema,
            strategies: Cow::Owned(self.strategies.with_replaced(paths)),
        }
    }
}

/// Fold `candidate` into `existing` at `path`.
///
/// Under `replace` the existing value is overwritten wholesale. Under
/// `merge`, empty candidate leaves keep the existing value, mappings recurse
/// per key (existing keys the candidate lacks are kept), keyed sequences
/// upsert per element and other sequences are replaced when the candidate is
/// non-empty.
///
/// Returns whether `existing` changed.
///
/// # Errors
/// Returns [`MergeError::MissingIdentity`] if an element of a keyed sequence
/// in the candidate has no identity
pub fn merge_node(
    candidate: &Node,
    existing: &mut Node,
    path: &KeyPath,
    ctx: &MergeContext<'_>,
) -> MergeResult<bool> {
    if ctx.strategy(path) == PatchStrategy::Replace {
        return Ok(overwrite(existing, candidate));
    }
    match (candidate, existing) {
        (Node::Mapping(candidate), Node::Mapping(existing)) => {
            merge_mappings(candidate, existing, path, ctx)
        }
        (Node::Sequence(candidate), Node::Sequence(existing)) => {
            merge_sequences(candidate, existing, path, ctx)
        }
        (candidate, _) if candidate.is_empty_value() => Ok(false),
        (candidate, existing) => Ok(overwrite(existing, candidate)),
    }
}

fn overwrite(existing: &mut Node, candidate: &Node) -> bool {
    if existing == candidate {
        return false;
    }
    *existing = candidate.clone();
    true
}

fn merge_mappings(
    candidate: &Mapping,
    existing: &mut Mapping,
    path: &KeyPath,
    ctx: &MergeContext<'_>,
) -> MergeResult<bool> {
    let mut changed = false;

    // `replace` fields the candidate leaves out are dropped
    let dropped: Vec<String> = existing
        .keys()
        .filter(|key| {
            candidate.get(key.as_str()).map_or(true, Node::is_empty_value)
                && ctx.strategy(&path.child(key.as_str())) == PatchStrategy::Replace
        })
        .cloned()
        .collect();
    for key in dropped {
        existing.shift_remove(&key);
        changed = true;
    }

    for (key, value) in candidate {
        let child = path.child(key.as_str());
        match existing.get_mut(key) {
            Some(current) => changed |= merge_node(value, current, &child, ctx)?,
            None if !value.is_empty_value() => {
                existing.insert(key.clone(), value.clone());
                changed = true;
            }
            None => {}
        }
    }
    Ok(changed)
}

fn merge_sequences(
    candidate: &[Node],
    existing: &mut Vec<Node>,
    path: &KeyPath,
    ctx: &MergeContext<'_>,
) -> MergeResult<bool> {
    if let Some(rule) = ctx.schema().rule_for(path) {
        let mut changed = false;
        for item in candidate {
            changed |= upsert_with(existing, item.clone(), rule, path, ctx)?.is_dirty();
        }
        return Ok(changed);
    }
    if candidate.is_empty() || candidate == existing.as_slice() {
        return Ok(false);
    }
    *existing = candidate.to_vec();
    Ok(true)
}

/// Upsert `candidate` into the keyed sequence at `path`
///
/// # Errors
/// Returns [`MergeError::NoIdentityRule`] if `path` is not keyed in the
/// schema, or [`MergeError::MissingIdentity`] if the candidate has no identity
pub fn upsert(
    items: &mut Vec<Node>,
    candidate: Node,
    path: &KeyPath,
    ctx: &MergeContext<'_>,
) -> MergeResult<UpsertOutcome> {
    let rule = ctx
        .schema()
        .rule_for(path)
        .ok_or_else(|| MergeError::NoIdentityRule {
            path: path.to_string(),
        })?;
    upsert_with(items, candidate, rule, path, ctx)
}

fn upsert_with(
    items: &mut Vec<Node>,
    candidate: Node,
    rule: &IdentityRule,
    path: &KeyPath,
    ctx: &MergeContext<'_>,
) -> MergeResult<UpsertOutcome> {
    let identity = rule
        .identify(&candidate)
        .ok_or_else(|| MergeError::MissingIdentity {
            path: path.to_string(),
        })?;

    let Some(found) = rule.locate(items, &identity) else {
        debug!(%path, %identity, "appending new element");
        items.push(candidate);
        return Ok(UpsertOutcome::Inserted);
    };

    let existing = &mut items[found.index];
    let changed = match &found.previous_kind {
        Some(previous) => {
            debug!(%path, %identity, previous_kind = %previous, "element changes kind");
            let forced = std::iter::once(path.child(previous.as_str()))
                .chain(rule.swap_fields().iter().map(|f| path.child(f.as_str())));
            merge_node(&candidate, existing, path, &ctx.with_replaced(forced))?
        }
        None => merge_node(&candidate, existing, path, ctx)?,
    };

    Ok(if changed {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Unchanged
    })
}

/// Remove the element with exactly `identity`, returning it
#[must_use = "a `None` result means nothing matched"]
pub fn remove(items: &mut Vec<Node>, identity: &Identity, rule: &IdentityRule) -> Option<Node> {
    rule.position(items, identity).map(|index| items.remove(index))
}

/// Remove the first element named `name`, whatever its kind
#[must_use = "a `None` result means nothing matched"]
pub fn remove_by_name(items: &mut Vec<Node>, name: &str, rule: &IdentityRule) -> Option<Node> {
    rule.position_by_name(items, name).map(|index| items.remove(index))
}
