//! Stanza Node Store
//!
//! Ordered YAML node trees with typed descent, a 4-space block emitter and
//! a serde-backed codec for typed records.
//!
//! # Core Concepts
//!
//! - [`Document`]: in-memory tree of one YAML file, rooted at a mapping
//! - [`Node`]: scalar, mapping or sequence, mapping keys in insertion order
//! - [`Key`] / [`KeyPath`]: typed descent steps and dotted field paths
//! - [`to_node`] / [`from_node`]: typed record ⇄ detached subtree
//! - [`ContentHash`]: Blake3 digest used to skip no-op writes
//!
//! # Example
//!
//! ```rust
//! use stanza_node::{Document, Key, Node};
//!
//! let mut doc = Document::parse("clientOptions:\n    cli:\n        edition: tkg\n").unwrap();
//! let env = doc
//!     .find_or_create(&[Key::mapping("clientOptions"), Key::mapping("env")])
//!     .unwrap();
//! env.as_mapping_mut().unwrap().insert("FOO".into(), Node::string("bar"));
//! assert!(doc.to_yaml().contains("    env:\n        FOO: bar\n"));
//! ```

#![warn(unreachable_pub)]

mod codec;
mod comments;
mod document;
mod emit;
mod error;
mod hash;
mod io;
mod node;
mod path;

pub use codec::{from_node, to_node};
pub use document::Document;
pub use emit::INDENT;
pub use error::NodeError;
pub use hash::ContentHash;
pub use io::{load, load_snapshot, save, write_atomic, Snapshot};
pub use node::{Mapping, Node, NodeKind, ScalarTag};
pub use path::{Key, KeyPath, PathError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
