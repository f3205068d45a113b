//! Stanza accessors against real files

use pretty_assertions::assert_eq;
use stanza_store::{
    ConfigError, ContextType, DiscoverySource, EditionSelector, GcpPluginRepository,
    PluginRepository, VersionSelectorLevel,
};
use stanza_test_utils::{
    global_server, k8s_context, management_cluster_server, tmc_context, TestConfigEnv,
};

fn gcp_repository(name: &str, bucket: &str) -> PluginRepository {
    PluginRepository::Gcp(GcpPluginRepository {
        name: name.to_string(),
        bucket_name: bucket.to_string(),
        root_path: "plugins".to_string(),
    })
}

#[test]
fn features_accept_unquoted_booleans() {
    let env = TestConfigEnv::new();
    env.write_main(
        "clientOptions:\n  features:\n    global:\n      context-aware: true\n      dry-run: false\n      broken: maybe\n",
    );
    let store = env.store();

    assert_eq!(store.get_feature("global", "context-aware").unwrap(), "true");
    assert!(store.is_feature_activated("global", "context-aware").unwrap());
    assert!(!store.is_feature_activated("global", "dry-run").unwrap());
    assert!(!store.is_feature_activated("cluster", "anything").unwrap());
    assert!(matches!(
        store.is_feature_activated("global", "broken").unwrap_err(),
        ConfigError::Validation(_)
    ));

    let before = env.read_main();
    assert!(!store.set_feature("global", "context-aware", "true").unwrap());
    assert_eq!(env.read_main(), before);

    assert!(store.set_feature("cluster", "new-flag", "true").unwrap());
    let all = store.get_all_features().unwrap();
    assert_eq!(all["cluster"]["new-flag"], "true");
    assert_eq!(all["global"].len(), 3);

    store.delete_feature("global", "broken").unwrap();
    assert!(store.get_feature("global", "broken").unwrap_err().is_not_found());
}

#[test]
fn env_round_trip() {
    let env = TestConfigEnv::new();
    let store = env.store();

    assert!(store.get_env_configurations().unwrap().is_empty());
    assert!(store.get_env("HTTP_PROXY").unwrap_err().is_not_found());

    assert!(store.set_env("HTTP_PROXY", "http://proxy:3128").unwrap());
    assert!(store.set_env("NO_PROXY", "localhost").unwrap());
    assert!(!store.set_env("NO_PROXY", "localhost").unwrap());
    assert_eq!(store.get_env("HTTP_PROXY").unwrap(), "http://proxy:3128");

    let all = store.get_env_configurations().unwrap();
    assert_eq!(all.keys().collect::<Vec<_>>(), vec!["HTTP_PROXY", "NO_PROXY"]);

    store.delete_env("HTTP_PROXY").unwrap();
    assert!(store.delete_env("HTTP_PROXY").unwrap_err().is_not_found());
    assert_eq!(store.get_env_configurations().unwrap().len(), 1);
}

#[test]
fn cli_options_validate_before_writing() {
    let env = TestConfigEnv::new();
    let store = env.store();

    assert!(store.get_edition().unwrap_err().is_not_found());
    assert!(matches!(
        store.set_edition("enterprise").unwrap_err(),
        ConfigError::Validation(_)
    ));
    assert!(matches!(
        store.set_unstable_version_selector("beta").unwrap_err(),
        ConfigError::Validation(_)
    ));
    assert!(!env.paths().main.exists());

    assert!(store.set_edition("tce").unwrap());
    assert_eq!(store.get_edition().unwrap(), EditionSelector::Community);
    assert!(store.set_unstable_version_selector("alpha").unwrap());
    assert_eq!(
        store.get_unstable_version_selector().unwrap(),
        VersionSelectorLevel::Alpha
    );

    store.set_bom_repo("registry.example.com/bom").unwrap();
    store.set_compatibility_file_path("compat/v1").unwrap();
    assert_eq!(store.get_bom_repo().unwrap(), "registry.example.com/bom");
    assert_eq!(store.get_compatibility_file_path().unwrap(), "compat/v1");

    let cli = store.get_client_config().unwrap();
    let cli = cli.cli().unwrap();
    assert_eq!(cli.edition, "tce");
    assert_eq!(cli.bom_repo, "registry.example.com/bom");
}

#[test]
fn repositories_upsert_and_delete() {
    let env = TestConfigEnv::new();
    let store = env.store();

    assert!(store.get_cli_repositories().unwrap_err().is_not_found());
    assert!(store.set_cli_repository(&gcp_repository("core", "bucket-a")).unwrap());
    assert!(!store.set_cli_repository(&gcp_repository("core", "bucket-a")).unwrap());
    assert!(store.set_cli_repository(&gcp_repository("core", "bucket-b")).unwrap());
    assert!(store.set_cli_repository(&gcp_repository("extra", "bucket-c")).unwrap());

    assert_eq!(store.get_cli_repositories().unwrap().len(), 2);
    match store.get_cli_repository("core").unwrap() {
        PluginRepository::Gcp(repo) => assert_eq!(repo.bucket_name, "bucket-b"),
    }

    store.delete_cli_repository("core").unwrap();
    assert!(store.delete_cli_repository("core").unwrap_err().is_not_found());
    assert!(store.get_cli_repository("core").unwrap_err().is_not_found());
    assert_eq!(store.get_cli_repositories().unwrap().len(), 1);
}

#[test]
fn metadata_settings_live_in_their_own_file() {
    let env = TestConfigEnv::new();
    let store = env.store();

    assert!(store.get_metadata_settings().unwrap_err().is_not_found());
    assert!(!store.is_metadata_setting_enabled("use-split-files").unwrap());

    assert!(store.set_metadata_setting("use-split-files", "true").unwrap());
    assert!(!store.set_metadata_setting("use-split-files", "true").unwrap());
    assert!(store.is_metadata_setting_enabled("use-split-files").unwrap());
    assert_eq!(store.get_metadata_setting("use-split-files").unwrap(), "true");
    assert!(!env.paths().main.exists());

    let metadata = store.get_config_metadata().unwrap();
    let settings = metadata.config_metadata.unwrap().settings;
    assert_eq!(settings["use-split-files"], "true");

    store.delete_metadata_setting("use-split-files").unwrap();
    assert!(store
        .delete_metadata_setting("use-split-files")
        .unwrap_err()
        .is_not_found());
    assert!(store.get_metadata_settings().unwrap().is_empty());
}

#[test]
fn patch_strategies_round_trip() {
    let env = TestConfigEnv::new();
    let store = env.store();

    store
        .set_patch_strategy("contexts.globalOpts.auth", "replace")
        .unwrap();
    assert_eq!(store.get_patch_strategies().unwrap().len(), 1);
    assert!(env.read_metadata().contains("contexts.globalOpts.auth: replace"));

    store.delete_patch_strategy("contexts.globalOpts.auth").unwrap();
    assert!(store.get_patch_strategies().unwrap().is_empty());
    assert!(store
        .delete_patch_strategy("contexts.globalOpts.auth")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn current_server_follows_contexts() {
    let env = TestConfigEnv::new();
    let store = env.store();

    assert!(store.get_current_server().unwrap_err().is_not_found());
    store.set_server(&management_cluster_server("mc"), true).unwrap();
    store.set_server(&management_cluster_server("other"), false).unwrap();

    assert_eq!(store.get_current_server().unwrap().name, "mc");
    assert_eq!(store.get_current_context(&ContextType::K8s).unwrap().name, "mc");

    assert!(store.set_current_server("other").unwrap());
    assert!(!store.set_current_server("other").unwrap());
    assert_eq!(store.get_current_context(&ContextType::K8s).unwrap().name, "other");
    assert!(store.set_current_server("missing").unwrap_err().is_not_found());

    assert!(store.remove_current_server("mc").unwrap_err().is_not_found());
    store.remove_current_server("other").unwrap();
    assert!(store.get_current_server().unwrap_err().is_not_found());
    assert!(store.server_exists("other").unwrap());
}

#[test]
fn current_contexts_per_kind() {
    let env = TestConfigEnv::new();
    let store = env.store();

    store.set_context(&k8s_context("workload", false), true).unwrap();
    store.set_context(&tmc_context("saas", "saas.example.com:443"), true).unwrap();

    let current = store.get_all_current_contexts().unwrap();
    assert_eq!(current.len(), 2);
    assert_eq!(current[&ContextType::K8s].name, "workload");
    assert_eq!(current[&ContextType::Tmc].name, "saas");

    // only management-cluster and tmc contexts move the server pointer
    assert_eq!(store.get_current_server().unwrap().name, "saas");

    store.set_context(&k8s_context("mgmt", true), false).unwrap();
    assert!(store.set_current_context("mgmt").unwrap());
    assert_eq!(store.get_current_server().unwrap().name, "mgmt");
    assert!(store.set_current_context("missing").unwrap_err().is_not_found());

    store.remove_current_context(&ContextType::Tmc).unwrap();
    assert!(store
        .remove_current_context(&ContextType::Tmc)
        .unwrap_err()
        .is_not_found());
    assert!(store.get_current_context(&ContextType::Tmc).unwrap_err().is_not_found());
    assert!(store.context_exists("saas").unwrap());
}

#[test]
fn server_discovery_sources_include_default() {
    let env = TestConfigEnv::new();
    let store = env.store();
    store.set_server(&management_cluster_server("mc"), false).unwrap();
    store.set_server(&global_server("saas", "saas.example.com:443"), false).unwrap();

    let mc = store.get_discovery_sources("mc").unwrap();
    assert_eq!(mc.len(), 1);
    match &mc[0].source {
        DiscoverySource::Kubernetes(k8s) => {
            assert_eq!(k8s.name, "default-mc");
            assert_eq!(k8s.path, "/home/user/.kube/config");
            assert_eq!(k8s.context, "mc-admin@mc");
        }
        other => panic!("unexpected source {other:?}"),
    }

    let saas = store.get_discovery_sources("saas").unwrap();
    match &saas[0].source {
        DiscoverySource::Rest(rest) => assert_eq!(rest.endpoint, "https://saas.example.com"),
        other => panic!("unexpected source {other:?}"),
    }

    assert!(store.get_discovery_sources("missing").unwrap_err().is_not_found());
}

#[test]
fn empty_names_are_rejected() {
    let env = TestConfigEnv::new();
    let store = env.store();

    let err = store.set_server(&global_server("", "x:443"), false).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    let err = store.set_context(&k8s_context(" ", false), false).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(!env.paths().main.exists());
}

#[test]
fn delete_client_config_removes_both_files() {
    let env = TestConfigEnv::new();
    env.write_next_gen("contexts: []\n");
    let store = env.store();
    store.set_server(&management_cluster_server("mc"), true).unwrap();
    store.set_metadata_setting("keep", "me").unwrap();
    assert!(env.paths().next_gen.exists());

    store.delete_client_config().unwrap();
    assert!(!env.paths().main.exists());
    assert!(!env.paths().next_gen.exists());
    assert!(env.paths().metadata.exists());

    // deleting twice is fine and reads start from scratch
    store.delete_client_config().unwrap();
    assert!(store.get_all_servers().unwrap().is_empty());
}

#[test]
fn malformed_main_file_surfaces_parse_error() {
    let env = TestConfigEnv::new();
    env.write_main("servers: [unclosed\n");
    let store = env.store();

    assert!(matches!(
        store.get_all_servers().unwrap_err(),
        ConfigError::Parse { .. }
    ));
    assert!(matches!(store.set_env("A", "1").unwrap_err(), ConfigError::Parse { .. }));
    assert_eq!(env.read_main(), "servers: [unclosed\n");
}
