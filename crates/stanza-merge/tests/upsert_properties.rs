//! Property tests for keyed upserts

use proptest::prelude::*;
use stanza_merge::{upsert, IdentityRule, MergeContext, MergeSchema, PatchStrategyTable};
use stanza_node::{KeyPath, Mapping, Node};

fn schema() -> MergeSchema {
    MergeSchema::new().with_rule(&["servers"], IdentityRule::field("name"))
}

fn server(name: &str, endpoint: &str, extra: Option<&str>) -> Node {
    let mut map = Mapping::new();
    map.insert("name".to_string(), Node::string(name));
    map.insert("endpoint".to_string(), Node::string(endpoint));
    if let Some(extra) = extra {
        map.insert("extra".to_string(), Node::string(extra));
    }
    Node::Mapping(map)
}

proptest! {
    #[test]
    fn prop_second_identical_upsert_is_clean(
        ops in proptest::collection::vec(
            ("[a-d]", "[a-z]{0,4}", proptest::option::of("[a-z]{1,4}")),
            1..20,
        )
    ) {
        let schema = schema();
        let table = PatchStrategyTable::new();
        let ctx = MergeContext::new(&schema, &table);
        let path: KeyPath = "servers".parse().unwrap();
        let mut items = Vec::new();

        for (name, endpoint, extra) in &ops {
            let candidate = server(name, endpoint, extra.as_deref());
            upsert(&mut items, candidate.clone(), &path, &ctx).unwrap();
            let snapshot = items.clone();

            let again = upsert(&mut items, candidate, &path, &ctx).unwrap();
            prop_assert!(!again.is_dirty());
            prop_assert_eq!(&items, &snapshot);
        }

        // identity stays unique: one element per distinct name
        let mut names: Vec<_> = ops.iter().map(|(n, _, _)| n.clone()).collect();
        names.sort();
        names.dedup();
        prop_assert_eq!(items.len(), names.len());
    }
}
