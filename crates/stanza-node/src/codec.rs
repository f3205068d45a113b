//! Typed codec
//!
//! Converts between typed records and detached [`Node`] subtrees, going
//! through [`serde_yaml::Value`] so the field naming and skipping rules of
//! the record's serde attributes apply unchanged.

use serde::{de::DeserializeOwned, Serialize};
use serde_yaml::Value;

use crate::error::NodeError;
use crate::node::{Mapping, Node, ScalarTag};

/// Encode a typed value into a detached node tree
///
/// # Errors
/// Returns [`NodeError::Encode`] if the value cannot be represented in YAML
pub fn to_node<T: Serialize>(value: &T) -> Result<Node, NodeError> {
    let value = serde_yaml::to_value(value).map_err(|e| NodeError::Encode(e.to_string()))?;
    from_value(value, "<encoded value>")
}

/// Decode a node tree into a typed value
///
/// Unknown keys are ignored by the target type but stay in the node.
///
/// # Errors
/// Returns [`NodeError::Decode`] if the node does not match the target type
pub fn from_node<T: DeserializeOwned>(node: &Node) -> Result<T, NodeError> {
    serde_yaml::from_value(into_value(node)).map_err(|e| NodeError::Decode(e.to_string()))
}

/// Convert a parsed YAML value into a node, keeping mapping order
pub(crate) fn from_value(value: Value, source: &str) -> Result<Node, NodeError> {
    Ok(match value {
        Value::Null => Node::null(),
        Value::Bool(b) => Node::bool(b),
        Value::Number(n) => {
            let tag = if n.is_i64() || n.is_u64() {
                ScalarTag::Int
            } else {
                ScalarTag::Float
            };
            Node::Scalar {
                value: n.to_string(),
                tag,
            }
        }
        Value::String(s) => Node::string(s),
        Value::Sequence(items) => Node::Sequence(
            items
                .into_iter()
                .map(|item| from_value(item, source))
                .collect::<Result<_, _>>()?,
        ),
        Value::Mapping(entries) => {
            let mut map = Mapping::with_capacity(entries.len());
            for (key, child) in entries {
                let key = match key {
                    Value::String(s) => s,
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::Null => "null".to_string(),
                    Value::Tagged(tagged) => match tagged.value {
                        Value::String(s) => s,
                        _ => return Err(NodeError::UnsupportedKey { path: source.to_string() }),
                    },
                    Value::Sequence(_) | Value::Mapping(_) => {
                        return Err(NodeError::UnsupportedKey { path: source.to_string() })
                    }
                };
                map.insert(key, from_value(child, source)?);
            }
            Node::Mapping(map)
        }
        // Local tags are not preserved; the tagged value is kept as-is.
        Value::Tagged(tagged) => from_value(tagged.value, source)?,
    })
}

/// Convert a node back into a YAML value
pub(crate) fn into_value(node: &Node) -> Value {
    match node {
        Node::Scalar { value, tag } => scalar_value(value, *tag),
        Node::Sequence(items) => Value::Sequence(items.iter().map(into_value).collect()),
        Node::Mapping(map) => {
            let mut out = serde_yaml::Mapping::with_capacity(map.len());
            for (key, child) in map {
                out.insert(Value::String(key.clone()), into_value(child));
            }
            Value::Mapping(out)
        }
    }
}

fn scalar_value(text: &str, tag: ScalarTag) -> Value {
    match tag {
        ScalarTag::Str => Value::String(text.to_string()),
        ScalarTag::Null => Value::Null,
        ScalarTag::Bool => text
            .parse::<bool>()
            .map_or_else(|_| Value::String(text.to_string()), Value::Bool),
        ScalarTag::Int | ScalarTag::Float => match serde_yaml::from_str::<Value>(text) {
            Ok(number @ Value::Number(_)) => number,
            _ => Value::String(text.to_string()),
        },
    }
}
