//! Source positions for OpenAPI documents.
//!
//! Parsers in this workspace record byte offsets. Editors and diagnostic
//! consumers want 0-based lines with UTF-16 character offsets (the LSP
//! convention). This crate owns that conversion.
//!
//! - [`Location`]: a resolved position (byte offset, row, UTF-16 column)
//! - [`Range`]: a pair of locations
//! - [`FileInformation`]: per-file line index built once per document
//!
//! # Example
//!
//! ```rust
//! use oaslint_source_map::FileInformation;
//!
//! let text = "openapi: 3.1.0\ninfo:\n  title: Pets\n";
//! let info = FileInformation::new(text);
//! let loc = info.offset_to_location(text, 17).unwrap();
//! assert_eq!((loc.row, loc.column), (1, 2));
//! ```

pub mod file_info;
pub mod types;

pub use file_info::FileInformation;
pub use types::{Location, Range};
