//! Keyed sequences of the client config and their identity rules

use once_cell::sync::Lazy;
use stanza_merge::{IdentityRule, MergeSchema};

use crate::types::{DISCOVERY_KINDS, REPOSITORY_KINDS};

/// Two default-source names that denote the same entry
const DEFAULT_ALIASES: [&str; 2] = ["default", "default-local"];

/// Shared schema for every store handle
pub(crate) static CLIENT_SCHEMA: Lazy<MergeSchema> = Lazy::new(client_schema);

fn discovery_rule() -> IdentityRule {
    IdentityRule::variant(&DISCOVERY_KINDS)
        .with_alias_group(&DEFAULT_ALIASES)
        .with_swap_field("contextType")
}

/// Identity rules of the client config's keyed sequences
#[must_use]
pub fn client_schema() -> MergeSchema {
    MergeSchema::new()
        .with_rule(&["servers"], IdentityRule::field("name"))
        .with_rule(&["contexts"], IdentityRule::field("name"))
        .with_rule(&["servers", "discoverySources"], discovery_rule())
        .with_rule(&["contexts", "discoverySources"], discovery_rule())
        .with_rule(
            &["clientOptions", "cli", "discoverySources"],
            discovery_rule(),
        )
        .with_rule(
            &["clientOptions", "cli", "repositories"],
            IdentityRule::variant(&REPOSITORY_KINDS),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use stanza_node::KeyPath;

    #[test]
    fn every_keyed_sequence_has_a_rule() {
        let schema = client_schema();
        assert_eq!(schema.len(), 6);
        for path in [
            "servers",
            "contexts.discoverySources",
            "clientOptions.cli.repositories",
        ] {
            assert!(schema.rule_for(&path.parse::<KeyPath>().unwrap()).is_some(), "{path}");
        }
        assert!(schema
            .rule_for(&"clientOptions.features".parse::<KeyPath>().unwrap())
            .is_none());
    }
}
