//! Stanza Merge Engine
//!
//! Identity-based upsert of typed candidates into node trees, with
//! per-field patch strategies.
//!
//! # Core Concepts
//!
//! - [`IdentityRule`]: how elements of a keyed sequence are identified
//! - [`MergeSchema`]: which sequence paths are keyed, and by which rule
//! - [`PatchStrategy`] / [`PatchStrategyTable`]: `merge` or `replace` per dotted path
//! - [`upsert`] / [`merge_node`]: apply a candidate, reporting whether anything changed
//!
//! Applying the same candidate twice reports [`UpsertOutcome::Unchanged`]
//! the second time, which is what lets callers skip no-op writes.

#![warn(unreachable_pub)]

mod error;
mod identity;
mod merge;
mod schema;
mod strategy;

pub use error::{MergeError, MergeResult};
pub use identity::{Identity, IdentityRule, Match, VariantRule};
pub use merge::{merge_node, remove, remove_by_name, upsert, MergeContext, UpsertOutcome};
pub use schema::MergeSchema;
pub use strategy::{PatchStrategy, PatchStrategyTable};
