//! Patch strategies
//!
//! Provides [`PatchStrategy`], the per-field policy deciding whether a
//! candidate value is merged into or replaces the existing one, and
//! [`PatchStrategyTable`], the dotted-path → strategy lookup loaded from
//! config metadata.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use stanza_node::KeyPath;

use crate::error::{MergeError, MergeResult};

/// How a candidate value is applied to an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PatchStrategy {
    /// Keep existing values where the candidate is empty; recurse into
    /// mappings and identity-keyed sequences
    #[default]
    Merge,

    /// Overwrite wholesale; keys absent from the candidate are removed
    Replace,
}

impl PatchStrategy {
    /// Wire name of the strategy
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
        }
    }
}

impl Display for PatchStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchStrategy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("merge") {
            Ok(Self::Merge)
        } else if s.eq_ignore_ascii_case("replace") {
            Ok(Self::Replace)
        } else {
            Err(MergeError::InvalidStrategy {
                path: String::new(),
                value: s.to_string(),
            })
        }
    }
}

/// Dotted field path → patch strategy
///
/// Paths address mapping keys from the document root; sequence items add no
/// segment. Paths not in the table merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchStrategyTable {
    entries: BTreeMap<KeyPath, PatchStrategy>,
}

impl PatchStrategyTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `(path, value)` pairs as stored in metadata.
    ///
    /// # Errors
    /// Returns [`MergeError::InvalidStrategy`] for a value other than
    /// `replace`/`merge`, or [`MergeError::InvalidPath`] for a malformed path
    pub fn from_entries<I, K, V>(entries: I) -> MergeResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table = Self::new();
        for (path, value) in entries {
            let path = path.as_ref();
            let strategy = value.as_ref().parse::<PatchStrategy>().map_err(|_| {
                MergeError::InvalidStrategy {
                    path: path.to_string(),
                    value: value.as_ref().to_string(),
                }
            })?;
            table.insert(path.parse()?, strategy);
        }
        Ok(table)
    }

    /// Set the strategy for a path
    #[inline]
    pub fn insert(&mut self, path: KeyPath, strategy: PatchStrategy) {
        self.entries.insert(path, strategy);
    }

    /// Strategy for `path`, defaulting to [`PatchStrategy::Merge`]
    #[inline]
    #[must_use]
    pub fn strategy_for(&self, path: &KeyPath) -> PatchStrategy {
        self.entries.get(path).copied().unwrap_or_default()
    }

    /// Copy of this table with `paths` forced to [`PatchStrategy::Replace`]
    #[must_use]
    pub fn with_replaced(&self, paths: impl IntoIterator<Item = KeyPath>) -> Self {
        let mut table = self.clone();
        for path in paths {
            table.insert(path, PatchStrategy::Replace);
        }
        table
    }

    /// Number of explicit entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if table has no explicit entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over explicit entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&KeyPath, PatchStrategy)> {
        self.entries.iter().map(|(path, strategy)| (path, *strategy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strategy_case_insensitive() {
        assert_eq!("replace".parse::<PatchStrategy>().unwrap(), PatchStrategy::Replace);
        assert_eq!("MERGE".parse::<PatchStrategy>().unwrap(), PatchStrategy::Merge);
        assert!("append".parse::<PatchStrategy>().is_err());
    }

    #[test]
    fn table_defaults_to_merge() {
        let table = PatchStrategyTable::from_entries([("contexts.clusterOpts.endpoint", "replace")])
            .unwrap();
        let endpoint: KeyPath = "contexts.clusterOpts.endpoint".parse().unwrap();
        let path: KeyPath = "contexts.clusterOpts.path".parse().unwrap();
        assert_eq!(table.strategy_for(&endpoint), PatchStrategy::Replace);
        assert_eq!(table.strategy_for(&path), PatchStrategy::Merge);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn table_rejects_invalid_value_with_path() {
        let err = PatchStrategyTable::from_entries([("servers.type", "overwrite")]).unwrap_err();
        match err {
            MergeError::InvalidStrategy { path, value } => {
                assert_eq!(path, "servers.type");
                assert_eq!(value, "overwrite");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn with_replaced_overrides_copy_only() {
        let table = PatchStrategyTable::new();
        let path: KeyPath = "servers.discoverySources.oci".parse().unwrap();
        let forced = table.with_replaced([path.clone()]);
        assert_eq!(forced.strategy_for(&path), PatchStrategy::Replace);
        assert_eq!(table.strategy_for(&path), PatchStrategy::Merge);
    }
}
