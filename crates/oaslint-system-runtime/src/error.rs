/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Errors raised by file system and URI operations.
 */

use std::io;

use thiserror::Error;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The addressed document does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A string could not be interpreted as a document URI
    #[error("invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// A glob pattern was malformed
    #[error("invalid glob pattern: {0}")]
    Glob(String),

    /// The change watcher could not be installed
    #[error("watch failed: {0}")]
    Watch(String),

    /// Operation not supported by this file system (e.g., watching on WASM)
    #[error("operation not supported: {0}")]
    NotSupported(String),
}

impl RuntimeError {
    pub(crate) fn invalid_uri(uri: impl Into<String>, reason: impl ToString) -> Self {
        RuntimeError::InvalidUri {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            RuntimeError::NotFound(_) => true,
            RuntimeError::Io(err) => err.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
