//! Error types for YAML and JSON parsing.

use thiserror::Error;

/// Result type alias for oaslint-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The text is not well-formed YAML or JSON.
    ///
    /// `line` and `column` are 0-based; `offset` is a byte offset into the
    /// parsed text.
    #[error("{message} (line {}, column {})", .line + 1, .column + 1)]
    Syntax {
        message: String,
        offset: usize,
        line: usize,
        column: usize,
    },

    /// The event stream did not describe a single well-formed tree.
    #[error("invalid document structure: {0}")]
    InvalidStructure(String),
}

impl Error {
    /// Byte offset of the failure, if known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Syntax { offset, .. } => Some(*offset),
            Error::InvalidStructure(_) => None,
        }
    }
}
