//! Comment capture
//!
//! The YAML parser discards comments, so they are collected in a separate
//! pass over the source lines. Each comment is keyed by the path of the
//! entry it annotates: full-line comments lead the entry below them, a
//! `# ...` tail after a value trails its entry. Sequence items are keyed by
//! their `name` (plain or inside a single-key variant) and by index only
//! when they have none, so comments follow their entry when the sequence is
//! reordered or extended. Comments after the last entry form the footer.

use std::collections::HashMap;

use crate::node::{Mapping, Node};

/// One step of a comment path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Step {
    /// Mapping entry
    Key(String),
    /// Sequence item with a name
    Named(String),
    /// Sequence item without a name
    Index(usize),
}

impl Step {
    /// Step for `item` found at `index` of its sequence
    pub(crate) fn item(item: &Node, index: usize) -> Self {
        item_name(item).map_or(Self::Index(index), |name| Self::Named(name.to_string()))
    }
}

fn item_name(item: &Node) -> Option<&str> {
    let map = item.as_mapping()?;
    map.get("name").and_then(Node::as_str).or_else(|| {
        map.values()
            .filter_map(Node::as_mapping)
            .find_map(|payload| payload.get("name").and_then(Node::as_str))
    })
}

/// Comments attached to one entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct EntryComments {
    /// Full-line comments above the entry, `#` included
    pub(crate) leading: Vec<String>,
    /// Comment after the entry's value on the same line
    pub(crate) trailing: Option<String>,
}

/// Comments of one document, keyed by entry path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Comments {
    entries: HashMap<Vec<Step>, EntryComments>,
    footer: Vec<String>,
}

impl Comments {
    /// Collect the comments of `text`, whose parsed root is `root`
    pub(crate) fn capture(text: &str, root: &Mapping) -> Self {
        let mut comments = Self::default();
        for (raw, entry) in scan(text) {
            match raw.and_then(|raw| resolve(root, &raw)) {
                Some(path) => comments.merge(path, entry),
                // the entry could not be placed; keep the text at the end
                None => {
                    comments.footer.extend(entry.leading);
                    comments.footer.extend(entry.trailing);
                }
            }
        }
        comments
    }

    fn merge(&mut self, path: Vec<Step>, entry: EntryComments) {
        let slot = self.entries.entry(path).or_default();
        slot.leading.extend(entry.leading);
        if entry.trailing.is_some() {
            slot.trailing = entry.trailing;
        }
    }

    pub(crate) fn get(&self, path: &[Step]) -> Option<&EntryComments> {
        self.entries.get(path)
    }

    pub(crate) fn footer(&self) -> &[String] {
        &self.footer
    }
}

/// Step of a path as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawStep {
    Key(String),
    Item(usize),
}

#[derive(Debug)]
struct Frame {
    indent: usize,
    step: RawStep,
    /// Key with no inline value; its block children follow
    open: bool,
    items: usize,
}

/// Comment groups with the source path they belong to; `None` is the footer
fn scan(text: &str) -> Vec<(Option<Vec<RawStep>>, EntryComments)> {
    let mut found = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    let mut block_scalar: Option<usize> = None;
    let mut flow_depth = 0usize;

    for line in text.lines() {
        let content = line.trim_start();
        let indent = line.len() - content.len();
        if content.trim().is_empty() {
            continue;
        }
        if let Some(owner) = block_scalar {
            if indent > owner {
                continue;
            }
            block_scalar = None;
        }
        if flow_depth > 0 {
            flow_depth = flow_depth.saturating_add_signed(bracket_balance(content));
            continue;
        }
        if content.starts_with('#') {
            pending.push(content.trim_end().to_string());
            continue;
        }
        if content.starts_with("---") || content.starts_with("...") {
            continue;
        }

        let mut col = indent;
        let mut rest = content;
        let mut target: Option<Vec<RawStep>> = None;

        while let Some(after) = strip_dash(rest) {
            open_item(&mut stack, col);
            let path = path_of(&stack);
            if !pending.is_empty() {
                found.push((
                    Some(path.clone()),
                    EntryComments {
                        leading: std::mem::take(&mut pending),
                        trailing: None,
                    },
                ));
            }
            target = Some(path);
            let trimmed = after.trim_start();
            col += rest.len() - trimmed.len();
            rest = trimmed;
        }

        let (body, trailing) = split_comment(rest);
        if let Some((key, value)) = split_key(body) {
            while stack.last().is_some_and(|top| top.indent >= col) {
                stack.pop();
            }
            let value = value.trim();
            stack.push(Frame {
                indent: col,
                step: RawStep::Key(key),
                open: value.is_empty(),
                items: 0,
            });
            if value.starts_with('|') || value.starts_with('>') {
                block_scalar = Some(col);
            }
            if value.starts_with('[') || value.starts_with('{') {
                flow_depth = 0usize.saturating_add_signed(bracket_balance(value));
            }
            target = Some(path_of(&stack));
        } else if target.is_none() {
            // continuation of a multi-line scalar
            continue;
        }

        if pending.is_empty() && trailing.is_none() {
            continue;
        }
        found.push((
            target,
            EntryComments {
                leading: std::mem::take(&mut pending),
                trailing: trailing.map(str::to_string),
            },
        ));
    }

    if !pending.is_empty() {
        found.push((
            None,
            EntryComments {
                leading: pending,
                trailing: None,
            },
        ));
    }
    found
}

/// Push the frame of a sequence item whose `-` sits at column `col`
fn open_item(stack: &mut Vec<Frame>, col: usize) {
    while let Some(top) = stack.last() {
        let sibling_item = top.indent == col && matches!(top.step, RawStep::Item(_));
        let closed_key = top.indent == col && matches!(top.step, RawStep::Key(_)) && !top.open;
        if top.indent > col || sibling_item || closed_key {
            stack.pop();
        } else {
            break;
        }
    }
    let index = stack.last_mut().map_or(0, |parent| {
        parent.items += 1;
        parent.items - 1
    });
    stack.push(Frame {
        indent: col,
        step: RawStep::Item(index),
        open: false,
        items: 0,
    });
}

fn path_of(stack: &[Frame]) -> Vec<RawStep> {
    stack.iter().map(|frame| frame.step.clone()).collect()
}

fn strip_dash(content: &str) -> Option<&str> {
    match content.strip_prefix('-')? {
        "" => Some(""),
        rest if rest.starts_with([' ', '\t']) => Some(rest),
        _ => None,
    }
}

/// Split a `# comment` tail off a line, ignoring `#` inside quotes or
/// glued to a value
fn split_comment(line: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if (c == '\'' || c == '"') && (prev == ' ' || i == 0) => quote = Some(c),
            None if c == '#' && prev.is_whitespace() => {
                return (line[..i].trim_end(), Some(line[i..].trim_end()));
            }
            None => {}
        }
        prev = c;
    }
    (line.trim_end(), None)
}

/// `key: value` or `key:`; quoted keys are unquoted
fn split_key(body: &str) -> Option<(String, &str)> {
    if body.starts_with(['[', '{', '?', '|', '>']) {
        return None;
    }
    if let Some(q) = body.chars().next().filter(|c| *c == '\'' || *c == '"') {
        let close = body[1..].find(q)? + 1;
        let rest = body[close + 1..].strip_prefix(':')?;
        if !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
            return None;
        }
        let key = serde_yaml::from_str::<String>(&body[..=close])
            .unwrap_or_else(|_| body[1..close].to_string());
        return Some((key, rest));
    }
    let bytes = body.as_bytes();
    let at = (0..bytes.len()).find(|&i| {
        bytes[i] == b':' && bytes.get(i + 1).map_or(true, |next| *next == b' ' || *next == b'\t')
    })?;
    Some((body[..at].trim_end().to_string(), &body[at + 1..]))
}

fn bracket_balance(text: &str) -> isize {
    let (body, _) = split_comment(text);
    body.chars().fold(0, |depth, c| match c {
        '[' | '{' => depth + 1,
        ']' | '}' => depth - 1,
        _ => depth,
    })
}

/// Map a source path onto the parsed tree
fn resolve(root: &Mapping, raw: &[RawStep]) -> Option<Vec<Step>> {
    let mut steps = Vec::with_capacity(raw.len());
    let mut node: Option<&Node> = None;
    for step in raw {
        match step {
            RawStep::Key(key) => {
                let map = match node {
                    None => root,
                    Some(n) => n.as_mapping()?,
                };
                node = Some(map.get(key.as_str())?);
                steps.push(Step::Key(key.clone()));
            }
            RawStep::Item(index) => {
                let item = node?.as_sequence()?.get(*index)?;
                steps.push(Step::item(item, *index));
                node = Some(item);
            }
        }
    }
    Some(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use pretty_assertions::assert_eq;

    fn key(k: &str) -> Step {
        Step::Key(k.to_string())
    }

    fn capture(text: &str) -> Comments {
        let doc = Document::parse(text).unwrap();
        Comments::capture(text, doc.root())
    }

    #[test]
    fn leading_trailing_and_footer() {
        let c = capture("# head\na: 1 # one\nb:\n    # inner\n    c: x\n# tail\n");
        let a = c.get(&[key("a")]).unwrap();
        assert_eq!(a.leading, vec!["# head"]);
        assert_eq!(a.trailing.as_deref(), Some("# one"));
        assert_eq!(c.get(&[key("b"), key("c")]).unwrap().leading, vec!["# inner"]);
        assert_eq!(c.footer(), ["# tail"]);
    }

    #[test]
    fn sequence_items_keyed_by_name() {
        let c = capture(
            "servers:\n# first\n- name: a\n  type: x # kind\n- oci:\n    name: b # image source\n- plain # bare\n",
        );
        let a = [key("servers"), Step::Named("a".into())];
        assert_eq!(c.get(&a).unwrap().leading, vec!["# first"]);
        let a_type = [key("servers"), Step::Named("a".into()), key("type")];
        assert_eq!(c.get(&a_type).unwrap().trailing.as_deref(), Some("# kind"));
        let b_name = [key("servers"), Step::Named("b".into()), key("oci"), key("name")];
        assert_eq!(c.get(&b_name).unwrap().trailing.as_deref(), Some("# image source"));
        let bare = [key("servers"), Step::Index(2)];
        assert_eq!(c.get(&bare).unwrap().trailing.as_deref(), Some("# bare"));
    }

    #[test]
    fn hashes_in_values_are_not_comments() {
        let c = capture("a: 'x # y'\nb: c#d\nc: |\n    # text\n    more\nd: [1, 2] # flow\n");
        assert!(c.get(&[key("a")]).is_none());
        assert!(c.get(&[key("b")]).is_none());
        assert!(c.get(&[key("c")]).is_none());
        assert_eq!(c.get(&[key("d")]).unwrap().trailing.as_deref(), Some("# flow"));
        assert!(c.footer().is_empty());
    }

    #[test]
    fn split_key_forms() {
        assert_eq!(split_key("a: b"), Some(("a".to_string(), " b")));
        assert_eq!(split_key("'a:b': c"), Some(("a:b".to_string(), " c")));
        assert_eq!(split_key("https://x"), None);
        assert_eq!(split_key("k:"), Some(("k".to_string(), "")));
    }
}
