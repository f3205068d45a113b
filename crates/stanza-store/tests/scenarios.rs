//! End-to-end behaviour of the merge and compatibility layers

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use stanza_node::{Document, Node};
use stanza_store::{
    ConfigError, ContextType, DiscoverySource, LocalDiscovery, ManagementClusterServer,
    PluginDiscovery, Server,
};
use stanza_test_utils::{
    global_server, k8s_context, management_cluster_server, oci_source, tmc_context, TestConfigEnv,
};

#[test]
fn oci_default_source_updates_once() {
    let env = TestConfigEnv::new();
    env.write_main(
        "clientOptions:\n  cli:\n    discoverySources:\n    - oci:\n        name: default\n        image: \"/:\"\n",
    );
    let store = env.store();
    let updated = oci_source("default", "updated-image");

    assert!(store.set_cli_discovery_source(&updated).unwrap());
    let after_first = env.read_main();
    assert!(!store.set_cli_discovery_source(&updated).unwrap());
    assert_eq!(env.read_main(), after_first);

    let sources = store.get_cli_discovery_sources().unwrap();
    assert_eq!(sources.len(), 1);
    match &sources[0].source {
        DiscoverySource::Oci(oci) => assert_eq!(oci.image, "updated-image"),
        other => panic!("unexpected source {other:?}"),
    }
}

#[test]
fn default_alias_matches_default_local() {
    let env = TestConfigEnv::new();
    env.write_main(
        "clientOptions:\n  cli:\n    discoverySources:\n    - local:\n        name: default-local\n        path: standalone\n",
    );
    let store = env.store();

    let local = PluginDiscovery::new(DiscoverySource::Local(LocalDiscovery {
        name: "default".to_string(),
        path: "standalone".to_string(),
    }));
    store.set_cli_discovery_source(&local).unwrap();
    assert_eq!(store.get_cli_discovery_sources().unwrap().len(), 1);
}

#[test]
fn source_kind_change_replaces_variant() {
    let env = TestConfigEnv::new();
    let store = env.store();
    let local = PluginDiscovery::new(DiscoverySource::Local(LocalDiscovery {
        name: "admin".to_string(),
        path: "/plugins".to_string(),
    }));
    store.set_cli_discovery_source(&local).unwrap();
    assert!(store
        .set_cli_discovery_source(&oci_source("admin", "registry/admin:v1"))
        .unwrap());

    let sources = store.get_cli_discovery_sources().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].kind(), "oci");
    assert!(!env.read_main().contains("local:"));
}

#[test]
fn patch_strategy_switches_merge_to_replace() {
    let env = TestConfigEnv::new();
    let store = env.store();
    store.set_server(&management_cluster_server("mc"), false).unwrap();

    let endpoint_only = Server {
        management_cluster_opts: Some(ManagementClusterServer {
            endpoint: "https://new.example.com:6443".to_string(),
            ..ManagementClusterServer::default()
        }),
        ..management_cluster_server("mc")
    };

    // merge: empty candidate fields keep what is on disk
    assert!(store.set_server(&endpoint_only, false).unwrap());
    let opts = store.get_server("mc").unwrap().management_cluster_opts.unwrap();
    assert_eq!(opts.endpoint, "https://new.example.com:6443");
    assert_eq!(opts.path, "/home/user/.kube/config");

    // replace: the candidate's opts win wholesale
    store
        .set_patch_strategy("servers.managementClusterOpts", "replace")
        .unwrap();
    assert!(store.set_server(&endpoint_only, false).unwrap());
    let opts = store.get_server("mc").unwrap().management_cluster_opts.unwrap();
    assert_eq!(opts.endpoint, "https://new.example.com:6443");
    assert_eq!(opts.path, "");
    assert_eq!(opts.context, "");
}

#[test]
fn invalid_patch_strategy_is_rejected_before_mutation() {
    let env = TestConfigEnv::new();
    let store = env.store();

    let err = store.set_patch_strategy("servers.name", "append").unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(!env.paths().metadata.exists());

    env.write_metadata("configMetadata:\n  patchStrategy:\n    servers.name: sometimes\n");
    let err = store.set_env("A", "1").unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(!env.paths().main.exists());
}

#[test]
fn servers_and_contexts_stay_paired_over_round_trips() {
    let env = TestConfigEnv::new();
    let store = env.store();

    for _ in 0..5 {
        store.set_server(&management_cluster_server("mc"), false).unwrap();
        store.set_context(&tmc_context("saas", "saas.example.com:443"), false).unwrap();
        store.set_server(&global_server("edge-saas", "edge.example.com:443"), false).unwrap();
        store.set_context(&k8s_context("wl", false), false).unwrap();

        let config = store.get_client_config().unwrap();
        assert_eq!(config.known_servers.len(), 4);
        assert_eq!(config.known_contexts.len(), 4);
    }

    assert!(store.get_server("saas").unwrap().is_global());
    assert!(store.get_context("mc").unwrap().is_management_cluster());
}

#[test]
fn legacy_only_file_reads_as_contexts() {
    let env = TestConfigEnv::new();
    env.write_main(
        "current: mc\nservers:\n- name: mc\n  type: managementcluster\n  managementClusterOpts:\n    path: /kube\n    context: admin\n",
    );
    let store = env.store();

    let context = store.get_current_context(&ContextType::K8s).unwrap();
    assert_eq!(context.name, "mc");
    assert!(context.is_management_cluster());

    // reads never write
    assert!(!env.read_main().contains("contexts"));
    store.set_env("A", "1").unwrap();
    assert!(env.read_main().contains("contexts"));
}

#[test]
fn unknown_fields_survive_writes() {
    let env = TestConfigEnv::new();
    env.write_main(
        "apiVersion: v1\nfutureTopLevel:\n  nested: [1, 2]\nservers:\n- name: a\n  type: global\n  futureServerField: keep\nclientOptions:\n  cli:\n    futureCli: keep\n",
    );
    let store = env.store();
    store.set_env("FOO", "bar").unwrap();
    store.set_server(&global_server("a", "a.example.com:443"), false).unwrap();

    let doc = Document::parse(&env.read_main()).unwrap();
    let nested = doc.get("futureTopLevel").and_then(|n| n.get("nested"));
    assert_eq!(nested.and_then(Node::as_sequence).map(Vec::len), Some(2));
    let server = &doc.get("servers").and_then(Node::as_sequence).unwrap()[0];
    assert_eq!(server.get_str("futureServerField"), Some("keep"));
    assert_eq!(
        doc.get("clientOptions")
            .and_then(|o| o.get("cli"))
            .and_then(|c| c.get_str("futureCli")),
        Some("keep")
    );
    assert_eq!(doc.get("apiVersion").and_then(Node::as_str), Some("v1"));
}

#[test]
fn deleting_absent_entries_leaves_file_untouched() {
    let env = TestConfigEnv::new();
    let store = env.store();
    store.set_server(&management_cluster_server("mc"), true).unwrap();
    store.set_env("A", "1").unwrap();
    let before = env.read_main();

    assert!(store.remove_server("missing").unwrap_err().is_not_found());
    assert!(store.remove_context("missing").unwrap_err().is_not_found());
    assert!(store.delete_env("missing").unwrap_err().is_not_found());
    assert!(store.delete_cli_discovery_source("missing").unwrap_err().is_not_found());
    assert!(store.delete_feature("global", "missing").unwrap_err().is_not_found());
    assert_eq!(env.read_main(), before);

    store.remove_server("mc").unwrap();
    assert!(store.get_all_servers().unwrap().is_empty());
    assert!(store.get_all_contexts().unwrap().is_empty());
    assert!(store.get_current_server().unwrap_err().is_not_found());
    assert_eq!(store.get_env("A").unwrap(), "1");
}

#[test]
fn comments_survive_writes() {
    let env = TestConfigEnv::new();
    env.write_main("# keep me\nclientOptions:\n    env:\n        A: '1' # why\n");
    let store = env.store();

    assert!(store.set_env("B", "2").unwrap());
    assert_eq!(
        env.read_main(),
        "# keep me\nclientOptions:\n    env:\n        A: '1' # why\n        B: '2'\n"
    );

    store.delete_env("A").unwrap();
    assert_eq!(
        env.read_main(),
        "# keep me\nclientOptions:\n    env:\n        B: '2'\n"
    );
}

/// Named items of the sequence at `path`, each emitted on its own
fn emitted_items(yaml: &str, path: &[&str]) -> Vec<(String, String)> {
    let doc = Document::parse(yaml).unwrap();
    let (last, parents) = path.split_last().unwrap();
    let mut node = doc.root();
    for key in parents {
        node = node.get(*key).and_then(Node::as_mapping).unwrap();
    }
    node.get(*last)
        .and_then(Node::as_sequence)
        .unwrap()
        .iter()
        .map(|item| {
            let map = item.as_mapping().unwrap();
            let name = map
                .get("name")
                .or_else(|| map.values().find_map(|payload| payload.get("name")))
                .and_then(Node::as_str)
                .unwrap()
                .to_string();
            let mut single = stanza_node::Mapping::new();
            single.insert("item".to_string(), item.clone());
            (name, Document::from_mapping(single).to_yaml())
        })
        .collect()
}

#[test]
fn deleting_present_entries_keeps_siblings_byte_identical() {
    let env = TestConfigEnv::new();
    let store = env.store();
    store.set_server(&management_cluster_server("a"), false).unwrap();
    store.set_server(&management_cluster_server("b"), true).unwrap();
    store.set_context(&k8s_context("c", false), false).unwrap();
    for name in ["s1", "s2", "s3"] {
        store.set_cli_discovery_source(&oci_source(name, &format!("{name}-image"))).unwrap();
    }
    store.set_env("A", "1").unwrap();
    let before = env.read_main();

    store.remove_server("a").unwrap();
    store.remove_context("c").unwrap();
    store.delete_cli_discovery_source("s2").unwrap();
    let after = env.read_main();

    let kept = |path: &[&str], gone: &[&str]| {
        let mut expected = emitted_items(&before, path);
        expected.retain(|(name, _)| !gone.contains(&name.as_str()));
        assert_eq!(emitted_items(&after, path), expected);
    };
    kept(&["servers"], &["a", "c"]);
    kept(&["contexts"], &["a", "c"]);
    kept(&["clientOptions", "cli", "discoverySources"], &["s2"]);

    assert_eq!(store.get_current_server().unwrap().name, "b");
    assert_eq!(store.get_env("A").unwrap(), "1");
    let names: Vec<_> = store
        .get_cli_discovery_sources()
        .unwrap()
        .into_iter()
        .map(|source| source.source.name().to_string())
        .collect();
    assert_eq!(names, vec!["s1", "s3"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_repeated_set_is_clean(
        writes in proptest::collection::vec(("[a-c]", "[a-z]{1,6}"), 1..6)
    ) {
        let env = TestConfigEnv::new();
        let store = env.store();
        for (name, endpoint) in &writes {
            let server = global_server(name, &format!("{endpoint}.example.com:443"));
            store.set_server(&server, false).unwrap();
            let bytes = env.read_main();
            prop_assert!(!store.set_server(&server, false).unwrap());
            prop_assert_eq!(env.read_main(), bytes);
        }
        let mut names: Vec<_> = writes.iter().map(|(n, _)| n.clone()).collect();
        names.sort();
        names.dedup();
        prop_assert_eq!(store.get_all_servers().unwrap().len(), names.len());
    }
}
