//! Identity rules for keyed sequences
//!
//! Each keyed sequence has an [`IdentityRule`] that extracts an
//! [`Identity`] from its elements. Upserts use it to find the element a
//! candidate updates, deletions use it to find the element to drop.

use std::fmt::{self, Display, Formatter};

use stanza_node::Node;

/// Identity of one sequence element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Plain name (servers, contexts)
    Name(String),
    /// Variant kind plus name (discovery sources, repositories)
    Variant { kind: String, name: String },
}

impl Identity {
    /// Name part of the identity
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Variant { name, .. } => name,
        }
    }

    /// Variant kind, if any
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Variant { kind, .. } => Some(kind),
        }
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Variant { kind, name } => write!(f, "{kind}/{name}"),
        }
    }
}

/// Where a candidate landed in a sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Index of the matched element
    pub index: usize,
    /// Kind of the matched element when it differs from the candidate's
    pub previous_kind: Option<String>,
}

/// Element layout of a tagged-union sequence: each element is a mapping with
/// exactly one variant key (`oci`, `gcp`, ...) whose value holds the name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRule {
    kinds: Vec<String>,
    name_field: String,
    aliases: Vec<Vec<String>>,
    swap_fields: Vec<String>,
}

/// How elements of a keyed sequence are identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRule {
    /// Elements are mappings identified by a scalar field
    Field(String),
    /// Elements are tagged unions identified by `(kind, name)`
    Variant(VariantRule),
}

impl IdentityRule {
    /// Rule keyed on a scalar field, e.g. `name`
    #[inline]
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Rule for a tagged union over `kinds`, named by a `name` field inside
    /// the variant payload. Earlier kinds win when an element carries more
    /// than one variant key.
    #[must_use]
    pub fn variant(kinds: &[&str]) -> Self {
        Self::Variant(VariantRule {
            kinds: kinds.iter().map(|k| (*k).to_string()).collect(),
            name_field: "name".to_string(),
            aliases: Vec::new(),
            swap_fields: Vec::new(),
        })
    }

    /// Treat every name in `group` as the same name. Only meaningful for
    /// variant rules.
    #[must_use]
    pub fn with_alias_group(mut self, group: &[&str]) -> Self {
        if let Self::Variant(rule) = &mut self {
            rule.aliases
                .push(group.iter().map(|n| (*n).to_string()).collect());
        }
        self
    }

    /// Sibling field replaced together with the variant payload when a
    /// candidate swaps an element's kind. Only meaningful for variant rules.
    #[must_use]
    pub fn with_swap_field(mut self, field: impl Into<String>) -> Self {
        if let Self::Variant(rule) = &mut self {
            rule.swap_fields.push(field.into());
        }
        self
    }

    /// Fields forced to `replace` when an element changes kind
    #[must_use]
    pub fn swap_fields(&self) -> &[String] {
        match self {
            Self::Field(_) => &[],
            Self::Variant(rule) => &rule.swap_fields,
        }
    }

    /// Extract the identity of an element
    #[must_use]
    pub fn identify(&self, node: &Node) -> Option<Identity> {
        match self {
            Self::Field(field) => node
                .get_str(field)
                .filter(|name| !name.is_empty())
                .map(|name| Identity::Name(name.to_string())),
            Self::Variant(rule) => rule.kinds.iter().find_map(|kind| {
                let name = node.get(kind)?.get_str(&rule.name_field)?;
                (!name.is_empty()).then(|| Identity::Variant {
                    kind: kind.clone(),
                    name: name.to_string(),
                })
            }),
        }
    }

    /// Best match for `identity` in `items`.
    ///
    /// Ranking: same kind and name, same kind with an aliased name, other
    /// kind with the same name, other kind with an aliased name. The earliest
    /// index wins within a rank.
    #[must_use]
    pub fn locate(&self, items: &[Node], identity: &Identity) -> Option<Match> {
        let mut best: Option<(u8, Match)> = None;
        for (index, item) in items.iter().enumerate() {
            let Some(found) = self.identify(item) else {
                continue;
            };
            let Some(rank) = self.rank(identity, &found) else {
                continue;
            };
            if best.as_ref().map_or(true, |(r, _)| rank < *r) {
                let previous_kind = match (identity.kind(), found.kind()) {
                    (Some(want), Some(have)) if want != have => Some(have.to_string()),
                    _ => None,
                };
                best = Some((rank, Match { index, previous_kind }));
                if rank == 0 {
                    break;
                }
            }
        }
        best.map(|(_, found)| found)
    }

    /// Index of the element with exactly this identity
    #[must_use]
    pub fn position(&self, items: &[Node], identity: &Identity) -> Option<usize> {
        items
            .iter()
            .position(|item| self.identify(item).as_ref() == Some(identity))
    }

    /// Index of the first element named `name`, whatever its kind
    #[must_use]
    pub fn position_by_name(&self, items: &[Node], name: &str) -> Option<usize> {
        items.iter().position(|item| {
            self.identify(item)
                .is_some_and(|found| found.name() == name)
        })
    }

    fn rank(&self, wanted: &Identity, found: &Identity) -> Option<u8> {
        let same_name = wanted.name() == found.name();
        let alias = !same_name && self.aliased(wanted.name(), found.name());
        if !same_name && !alias {
            return None;
        }
        let same_kind = wanted.kind() == found.kind();
        Some(match (same_kind, same_name) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        })
    }

    fn aliased(&self, a: &str, b: &str) -> bool {
        match self {
            Self::Field(_) => false,
            Self::Variant(rule) => rule
                .aliases
                .iter()
                .any(|group| group.iter().any(|n| n == a) && group.iter().any(|n| n == b)),
        }
    }
}
