//! # oaslint-yaml
//!
//! Parses YAML and JSON source text into a [`Node`] tree that carries a byte
//! span for every value and a separate span for every mapping key.
//!
//! The tree is syntax independent: a JSON document and the equivalent YAML
//! document produce the same values, and both can be addressed with RFC 6901
//! JSON Pointers (see [`pointer`]).
//!
//! ## Example
//!
//! ```rust
//! use oaslint_yaml::parse_yaml;
//!
//! let text = "paths:\n  /pets:\n    get: {}\n";
//! let root = parse_yaml(text).unwrap();
//! let get = root.pointer("/paths/~1pets/get").unwrap();
//! assert!(get.is_mapping());
//!
//! let entry = root.entry_at("/paths/~1pets").unwrap();
//! assert_eq!(&text[entry.key_span.start..entry.key_span.end], "/pets");
//! ```

mod error;
mod json;
mod node;
mod parser;
pub mod pointer;

pub use error::{Error, Result};
pub use json::parse_json;
pub use node::{Entry, Node, Span, Value};
pub use parser::parse_yaml;
