//! Node-level helpers shared by the stanza accessors

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use stanza_merge::{upsert, MergeContext};
use stanza_node::{from_node, Document, Key, KeyPath, Mapping, Node};

use crate::error::{ConfigError, ConfigResult};

/// Dotted form of a descent, for messages and strategy lookups
pub(crate) fn key_path(keys: &[Key]) -> KeyPath {
    KeyPath::new(keys.iter().map(|k| k.name.clone()).collect())
}

/// Node at `keys`, or `NotFound`
pub(crate) fn find<'a>(doc: &'a Document, keys: &[Key]) -> ConfigResult<&'a Node> {
    doc.find(keys)
        .ok_or_else(|| ConfigError::not_found(key_path(keys).to_string()))
}

/// Sequence at `keys`, or `NotFound`
pub(crate) fn sequence<'a>(doc: &'a Document, keys: &[Key]) -> ConfigResult<&'a [Node]> {
    find(doc, keys)?
        .as_sequence()
        .map(Vec::as_slice)
        .ok_or_else(|| ConfigError::not_found(key_path(keys).to_string()))
}

/// Mapping at `keys`, or `NotFound`
pub(crate) fn mapping<'a>(doc: &'a Document, keys: &[Key]) -> ConfigResult<&'a Mapping> {
    find(doc, keys)?
        .as_mapping()
        .ok_or_else(|| ConfigError::not_found(key_path(keys).to_string()))
}

/// Scalar text at `keys`, or `NotFound`; empty counts as absent
pub(crate) fn scalar<'a>(doc: &'a Document, keys: &[Key]) -> ConfigResult<&'a str> {
    find(doc, keys)?
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::not_found(key_path(keys).to_string()))
}

/// Decode one node into a typed record
pub(crate) fn decode<T: DeserializeOwned>(node: &Node) -> ConfigResult<T> {
    Ok(from_node(node)?)
}

/// Element of `items` whose `name` field (or variant payload name) is `name`
pub(crate) fn find_named<'a>(items: &'a [Node], name: &str) -> Option<&'a Node> {
    items.iter().find(|item| element_name(item) == Some(name))
}

/// Name of a plain entry (`name: x`) or a tagged-union entry (`oci: {name: x}`)
pub(crate) fn element_name(item: &Node) -> Option<&str> {
    item.get_str("name").or_else(|| {
        item.as_mapping()?
            .values()
            .find_map(|payload| payload.get_str("name"))
    })
}

/// Upsert `candidate` into the keyed sequence at `keys`, creating it if needed
pub(crate) fn upsert_at(
    doc: &mut Document,
    keys: &[Key],
    candidate: Node,
    ctx: &MergeContext<'_>,
) -> ConfigResult<bool> {
    let path = key_path(keys);
    match doc.find_or_create(keys)?.as_sequence_mut() {
        Some(items) => Ok(upsert(items, candidate, &path, ctx)?.is_dirty()),
        None => Err(ConfigError::Validation(format!("'{path}' is not a sequence"))),
    }
}

/// Set scalar `key` of the mapping at `parent`, creating parents as needed
pub(crate) fn set_scalar(
    doc: &mut Document,
    parent: &[Key],
    key: &str,
    value: &str,
) -> ConfigResult<bool> {
    let node = doc.find_or_create(parent)?;
    let Some(map) = node.as_mapping_mut() else {
        return Err(ConfigError::Validation(format!(
            "'{}' is not a mapping",
            key_path(parent)
        )));
    };
    if map.get(key).and_then(Node::as_str) == Some(value) {
        return Ok(false);
    }
    map.insert(key.to_string(), Node::string(value));
    Ok(true)
}

/// Remove `key` from the mapping at `parent`, or `NotFound`
pub(crate) fn remove_key(doc: &mut Document, parent: &[Key], key: &str) -> ConfigResult<Node> {
    doc.find_mut(parent)
        .and_then(Node::as_mapping_mut)
        .and_then(|map| map.shift_remove(key))
        .ok_or_else(|| ConfigError::not_found(key_path(parent).child(key).to_string()))
}

/// Scalar entries of a mapping as strings; non-scalars are skipped
pub(crate) fn string_map(map: &Mapping) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
        .collect()
}

/// Reject an empty identity name before touching any file
pub(crate) fn require_name(what: &str, name: &str) -> ConfigResult<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{what} name must not be empty")));
    }
    Ok(())
}
