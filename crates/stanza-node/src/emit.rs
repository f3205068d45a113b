//! Block-style YAML emitter
//!
//! Writes a node tree with 4-space indentation. Sequences sit one level
//! under their key and mapping items continue two columns after the `- `
//! marker:
//!
//! ```yaml
//! servers:
//!     - name: dev
//!       type: managementcluster
//! ```

use serde_yaml::Value;

use crate::comments::{Comments, Step};
use crate::node::{Mapping, Node, ScalarTag};

/// Block indentation width
pub const INDENT: usize = 4;

/// Characters that cannot start a plain scalar
const INDICATORS: &[char] = &[
    '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
];

/// Writer state: output, comments to re-attach and the current entry path
struct Emitter<'a> {
    out: String,
    comments: &'a Comments,
    path: Vec<Step>,
}

/// Emit a root mapping as a YAML document, re-attaching `comments`
pub(crate) fn emit(root: &Mapping, comments: &Comments) -> String {
    let mut emitter = Emitter {
        out: String::new(),
        comments,
        path: Vec::new(),
    };
    if root.is_empty() {
        emitter.out.push_str("{}\n");
    } else {
        emitter.write_mapping(root, 0);
    }
    for line in comments.footer() {
        emitter.out.push_str(line);
        emitter.out.push('\n');
    }
    emitter.out
}

impl Emitter<'_> {
    fn leading(&mut self, indent: usize) {
        let Some(entry) = self.comments.get(&self.path) else {
            return;
        };
        for line in &entry.leading {
            pad(&mut self.out, indent);
            self.out.push_str(line);
            self.out.push('\n');
        }
    }

    /// Trailing comment of the current entry, if any, then end the line
    fn end_line(&mut self) {
        if let Some(trailing) = self
            .comments
            .get(&self.path)
            .and_then(|entry| entry.trailing.as_deref())
        {
            self.out.push(' ');
            self.out.push_str(trailing);
        }
        self.out.push('\n');
    }

    fn write_mapping(&mut self, map: &Mapping, indent: usize) {
        for (key, value) in map {
            self.path.push(Step::Key(key.clone()));
            self.leading(indent);
            pad(&mut self.out, indent);
            self.write_key(key, value, indent);
            self.path.pop();
        }
    }

    fn write_key(&mut self, key: &str, value: &Node, indent: usize) {
        self.out.push_str(&quote_str(key));
        self.out.push(':');
        self.write_value(value, indent);
    }

    /// Write the value of a mapping entry; cursor sits right after `key:`
    fn write_value(&mut self, value: &Node, indent: usize) {
        match value {
            Node::Scalar { value, tag } => {
                self.out.push(' ');
                self.out.push_str(&scalar(value, *tag));
                self.end_line();
            }
            Node::Mapping(map) if map.is_empty() => {
                self.out.push_str(" {}");
                self.end_line();
            }
            Node::Sequence(items) if items.is_empty() => {
                self.out.push_str(" []");
                self.end_line();
            }
            Node::Mapping(map) => {
                self.end_line();
                self.write_mapping(map, indent + INDENT);
            }
            Node::Sequence(items) => {
                self.end_line();
                self.write_sequence(items, indent + INDENT);
            }
        }
    }

    fn write_sequence(&mut self, items: &[Node], indent: usize) {
        for (index, item) in items.iter().enumerate() {
            self.path.push(Step::item(item, index));
            self.leading(indent);
            if let Node::Mapping(map) = item {
                // comments above the first key go above the `-` line
                if let Some((first, _)) = map.first() {
                    self.path.push(Step::Key(first.clone()));
                    self.leading(indent);
                    self.path.pop();
                }
            }
            pad(&mut self.out, indent);
            self.out.push('-');
            self.write_item(item, indent);
            self.path.pop();
        }
    }

    /// Write a sequence item; cursor sits right after `-`
    fn write_item(&mut self, item: &Node, indent: usize) {
        let inner = indent + 2;
        match item {
            Node::Scalar { value, tag } => {
                self.out.push(' ');
                self.out.push_str(&scalar(value, *tag));
                self.end_line();
            }
            Node::Mapping(map) if map.is_empty() => {
                self.out.push_str(" {}");
                self.end_line();
            }
            Node::Sequence(items) if items.is_empty() => {
                self.out.push_str(" []");
                self.end_line();
            }
            Node::Mapping(map) => {
                self.out.push(' ');
                for (i, (key, value)) in map.iter().enumerate() {
                    self.path.push(Step::Key(key.clone()));
                    if i > 0 {
                        self.leading(inner);
                        pad(&mut self.out, inner);
                    }
                    self.write_key(key, value, inner);
                    self.path.pop();
                }
            }
            Node::Sequence(items) => {
                self.end_line();
                self.write_sequence(items, inner);
            }
        }
    }
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(' ').take(indent));
}

fn scalar(value: &str, tag: ScalarTag) -> String {
    match tag {
        ScalarTag::Str => quote_str(value),
        ScalarTag::Null => "null".to_string(),
        ScalarTag::Bool | ScalarTag::Int | ScalarTag::Float => value.to_string(),
    }
}

/// Render a string scalar, quoting only when a plain scalar would read back
/// as something else.
pub(crate) fn quote_str(value: &str) -> String {
    if value.chars().any(char::is_control) {
        // JSON string syntax is a subset of YAML double-quoted scalars.
        return serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""));
    }
    if is_plain_safe(value) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "''"))
}

fn is_plain_safe(value: &str) -> bool {
    if value.is_empty() || value.trim() != value || value.starts_with(INDICATORS) {
        return false;
    }
    matches!(serde_yaml::from_str::<Value>(value), Ok(Value::String(parsed)) if parsed == value)
}
