//! Server ⇄ context synchronization
//!
//! Servers are the legacy record, contexts the current one. Older clients
//! only write servers and newer ones may only write contexts, so on every
//! load and before every save [`synchronize`] derives whichever side is
//! missing. Derivation only appends: an existing entry is never rewritten
//! from its counterpart, which makes repeated runs a no-op.

use std::collections::HashSet;

use stanza_node::{from_node, to_node, Document, Key, Node};
use tracing::{debug, warn};

use crate::error::ConfigResult;
use crate::types::{
    ClusterServer, Context, ContextType, ManagementClusterServer, Server, ServerType,
};

pub(crate) const SERVERS: &str = "servers";
pub(crate) const CONTEXTS: &str = "contexts";
pub(crate) const CURRENT_SERVER: &str = "current";
pub(crate) const CURRENT_CONTEXT: &str = "currentContext";

impl From<&Server> for Context {
    fn from(server: &Server) -> Self {
        let cluster_opts = server.is_management_cluster().then(|| {
            let opts = server.management_cluster_opts.clone().unwrap_or_default();
            ClusterServer {
                endpoint: opts.endpoint,
                path: opts.path,
                context: opts.context,
                is_management_cluster: true,
            }
        });
        Self {
            name: server.name.clone(),
            context_type: server.server_type.as_ref().map(ContextType::from),
            global_opts: server.global_opts.clone(),
            cluster_opts,
            discovery_sources: server.discovery_sources.clone(),
        }
    }
}

impl From<&Context> for Server {
    fn from(context: &Context) -> Self {
        let management_cluster_opts = context
            .cluster_opts
            .as_ref()
            .filter(|opts| opts.is_management_cluster)
            .map(|opts| ManagementClusterServer {
                endpoint: opts.endpoint.clone(),
                path: opts.path.clone(),
                context: opts.context.clone(),
            });
        Self {
            name: context.name.clone(),
            server_type: context.context_type.as_ref().map(ServerType::from),
            global_opts: context.global_opts.clone(),
            management_cluster_opts,
            discovery_sources: context.discovery_sources.clone(),
        }
    }
}

/// Bring servers, contexts and current pointers into agreement.
///
/// Returns whether `doc` changed.
///
/// # Errors
/// Returns error if `servers`, `contexts` or `currentContext` hold a node
/// of the wrong shape
pub fn synchronize(doc: &mut Document) -> ConfigResult<bool> {
    let mut changed = derive_contexts_from_servers(doc)?;
    changed |= derive_servers_from_contexts(doc)?;
    changed |= tag_cli_discovery_sources(doc);
    changed |= clear_dangling_pointers(doc);
    Ok(changed)
}

/// Append a context for every server that has none
///
/// # Errors
/// Returns error if `contexts` or `currentContext` has the wrong shape
pub fn derive_contexts_from_servers(doc: &mut Document) -> ConfigResult<bool> {
    let existing = names(doc, CONTEXTS);
    let current = doc.get(CURRENT_SERVER).and_then(Node::as_str).unwrap_or("").to_string();

    let mut changed = false;
    for server in decode_all::<Server>(doc, SERVERS) {
        if server.name.is_empty() || existing.contains(&server.name) {
            continue;
        }
        let context = Context::from(&server);
        debug!(name = %context.name, "deriving context from server");
        push(doc, CONTEXTS, to_node(&context)?)?;
        changed = true;

        if server.name == current {
            if let Some(kind) = &context.context_type {
                if current_context_of(doc, kind).is_none() {
                    set_current_context(doc, kind, &context.name)?;
                }
            }
        }
    }
    Ok(changed)
}

/// Append a server for every context that has none
///
/// # Errors
/// Returns error if `servers` has the wrong shape
pub fn derive_servers_from_contexts(doc: &mut Document) -> ConfigResult<bool> {
    let existing = names(doc, SERVERS);

    let mut changed = false;
    for context in decode_all::<Context>(doc, CONTEXTS) {
        if context.name.is_empty() || existing.contains(&context.name) {
            continue;
        }
        let server = Server::from(&context);
        debug!(name = %server.name, "deriving server from context");
        push(doc, SERVERS, to_node(&server)?)?;
        changed = true;

        let current_empty = doc.get(CURRENT_SERVER).and_then(Node::as_str).map_or(true, str::is_empty);
        let is_current = context
            .context_type
            .as_ref()
            .and_then(|kind| current_context_of(doc, kind))
            == Some(context.name.as_str());
        let eligible =
            context.is_management_cluster() || context.context_type == Some(ContextType::Tmc);
        if current_empty && is_current && eligible {
            doc.insert(CURRENT_SERVER, Node::string(&context.name));
        }
    }
    Ok(changed)
}

/// Tag CLI-level discovery sources that carry no `contextType` as `k8s`
fn tag_cli_discovery_sources(doc: &mut Document) -> bool {
    let Some(sources) = doc
        .find_mut(&[
            Key::mapping("clientOptions"),
            Key::mapping("cli"),
            Key::sequence("discoverySources"),
        ])
        .and_then(Node::as_sequence_mut)
    else {
        return false;
    };

    let mut changed = false;
    for source in sources.iter_mut().filter_map(Node::as_mapping_mut) {
        let tagged = source.get("contextType").is_some_and(|t| !t.is_empty_value());
        if !tagged {
            source.insert("contextType".to_string(), Node::string(ContextType::K8s.as_str()));
            changed = true;
        }
    }
    changed
}

/// Drop `current` and `currentContext.<kind>` values naming absent entries
fn clear_dangling_pointers(doc: &mut Document) -> bool {
    let mut changed = false;

    let servers = names(doc, SERVERS);
    let dangling_server = doc
        .get(CURRENT_SERVER)
        .and_then(Node::as_str)
        .is_some_and(|name| !name.is_empty() && !servers.contains(name));
    if dangling_server {
        warn!("current server no longer exists, clearing");
        doc.remove(CURRENT_SERVER);
        changed = true;
    }

    let contexts = names(doc, CONTEXTS);
    let mut emptied = false;
    if let Some(pointers) = doc.root_mut().get_mut(CURRENT_CONTEXT).and_then(Node::as_mapping_mut) {
        let before = pointers.len();
        pointers.retain(|kind, name| {
            let keep = name.as_str().map_or(true, |n| n.is_empty() || contexts.contains(n));
            if !keep {
                warn!(%kind, "current context no longer exists, clearing");
            }
            keep
        });
        if pointers.len() != before {
            changed = true;
            emptied = pointers.is_empty();
        }
    }
    if emptied {
        doc.remove(CURRENT_CONTEXT);
    }
    changed
}

/// Names of the entries of the sequence at top-level `key`
pub(crate) fn names(doc: &Document, key: &str) -> HashSet<String> {
    doc.get(key)
        .and_then(Node::as_sequence)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get_str("name"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn decode_all<T: serde::de::DeserializeOwned>(doc: &Document, key: &str) -> Vec<T> {
    let Some(items) = doc.get(key).and_then(Node::as_sequence) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match from_node(item) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(stanza = key, error = %e, "skipping undecodable entry");
                None
            }
        })
        .collect()
}

fn push(doc: &mut Document, key: &str, node: Node) -> ConfigResult<()> {
    if let Some(items) = doc.find_or_create(&[Key::sequence(key)])?.as_sequence_mut() {
        items.push(node);
    }
    Ok(())
}

/// Non-empty `currentContext.<kind>`
pub(crate) fn current_context_of<'a>(doc: &'a Document, kind: &ContextType) -> Option<&'a str> {
    doc.get(CURRENT_CONTEXT)
        .and_then(|pointers| pointers.get_str(kind.as_str()))
        .filter(|name| !name.is_empty())
}

/// Point `currentContext.<kind>` at `name`, returning whether it changed
///
/// # Errors
/// Returns error if `currentContext` is not a mapping
pub(crate) fn set_current_context(
    doc: &mut Document,
    kind: &ContextType,
    name: &str,
) -> ConfigResult<bool> {
    let node = doc.find_or_create(&[Key::mapping(CURRENT_CONTEXT)])?;
    let Some(pointers) = node.as_mapping_mut() else {
        return Ok(false);
    };
    if pointers.get(kind.as_str()).and_then(Node::as_str) == Some(name) {
        return Ok(false);
    }
    pointers.insert(kind.as_str().to_string(), Node::string(name));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(yaml: &str) -> Document {
        Document::parse(yaml).unwrap()
    }

    #[test]
    fn server_derives_context_and_backfills_pointer() {
        let mut d = doc(
            "current: mc\nservers:\n- name: mc\n  type: managementcluster\n  managementClusterOpts:\n    path: /kube\n    context: admin\n",
        );
        assert!(synchronize(&mut d).unwrap());

        let contexts = d.get(CONTEXTS).and_then(Node::as_sequence).unwrap();
        assert_eq!(contexts.len(), 1);
        let ctx: Context = from_node(&contexts[0]).unwrap();
        assert_eq!(ctx.context_type, Some(ContextType::K8s));
        let opts = ctx.cluster_opts.unwrap();
        assert!(opts.is_management_cluster);
        assert_eq!(opts.path, "/kube");
        assert_eq!(current_context_of(&d, &ContextType::K8s), Some("mc"));
    }

    #[test]
    fn context_derives_server_and_backfills_current() {
        let mut d = doc(
            "contexts:\n- name: saas\n  type: tmc\n  globalOpts:\n    endpoint: e:443\ncurrentContext:\n  tmc: saas\n",
        );
        assert!(synchronize(&mut d).unwrap());

        let servers = d.get(SERVERS).and_then(Node::as_sequence).unwrap();
        let server: Server = from_node(&servers[0]).unwrap();
        assert!(server.is_global());
        assert_eq!(server.global_opts.unwrap().endpoint, "e:443");
        assert_eq!(d.get(CURRENT_SERVER).and_then(Node::as_str), Some("saas"));
    }

    #[test]
    fn plain_k8s_context_does_not_become_current_server() {
        let mut d = doc("contexts:\n- name: wl\n  type: k8s\ncurrentContext:\n  k8s: wl\n");
        synchronize(&mut d).unwrap();
        let server: Server =
            from_node(&d.get(SERVERS).and_then(Node::as_sequence).unwrap()[0]).unwrap();
        assert!(server.is_management_cluster());
        assert!(server.management_cluster_opts.is_none());
        assert!(d.get(CURRENT_SERVER).is_none());
    }

    #[test]
    fn synchronize_is_idempotent() {
        let mut d = doc(
            "servers:\n- name: a\n  type: global\ncontexts:\n- name: b\n  type: k8s\n  clusterOpts:\n    isManagementCluster: true\n",
        );
        assert!(synchronize(&mut d).unwrap());
        let once = d.to_yaml();
        for _ in 0..3 {
            assert!(!synchronize(&mut d).unwrap());
        }
        assert_eq!(d.to_yaml(), once);
        assert_eq!(names(&d, SERVERS).len(), 2);
        assert_eq!(names(&d, CONTEXTS).len(), 2);
    }

    #[test]
    fn unknown_types_pass_through() {
        let mut d = doc("servers:\n- name: edge\n  type: edgecluster\n");
        synchronize(&mut d).unwrap();
        let ctx: Context =
            from_node(&d.get(CONTEXTS).and_then(Node::as_sequence).unwrap()[0]).unwrap();
        assert_eq!(ctx.context_type, Some(ContextType::Other("edgecluster".into())));
    }

    #[test]
    fn cli_sources_get_k8s_tag() {
        let mut d = doc(
            "clientOptions:\n  cli:\n    discoverySources:\n    - oci:\n        name: default\n    - local:\n        name: l\n      contextType: tmc\n",
        );
        assert!(synchronize(&mut d).unwrap());
        let yaml = d.to_yaml();
        assert!(yaml.contains("      contextType: k8s\n"));
        assert!(yaml.contains("      contextType: tmc\n"));
    }

    #[test]
    fn dangling_pointers_are_cleared() {
        let mut d = doc("current: gone\ncurrentContext:\n  k8s: gone\n");
        assert!(synchronize(&mut d).unwrap());
        assert!(d.get(CURRENT_SERVER).is_none());
        assert!(d.get(CURRENT_CONTEXT).is_none());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let mut d = doc("servers:\n- name: ok\n  type: global\n- name: [bad]\n");
        synchronize(&mut d).unwrap();
        assert_eq!(names(&d, CONTEXTS).len(), 1);
    }
}
