/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for oaslint-core.
 */

//! Error types for oaslint-core
//!
//! Data failures (unreadable files, malformed documents, broken refs, rules
//! that fail) are absorbed into the project context and the diagnostics it
//! produces. Only configuration mistakes are returned to the caller.

use oaslint_system_runtime::{RuntimeError, Uri};
use thiserror::Error;

/// A document could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("document not found: {0}")]
    NotFound(Uri),

    #[error("failed to read {uri}: {message}")]
    Io { uri: Uri, message: String },
}

impl LoadError {
    pub fn from_runtime(uri: &Uri, err: &RuntimeError) -> Self {
        if err.is_not_found() {
            LoadError::NotFound(uri.clone())
        } else {
            LoadError::Io {
                uri: uri.clone(),
                message: err.to_string(),
            }
        }
    }

    pub fn uri(&self) -> &Uri {
        match self {
            LoadError::NotFound(uri) | LoadError::Io { uri, .. } => uri,
        }
    }
}

/// A `$ref` could not be followed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("invalid reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("referenced document is not loaded: {0}")]
    DocumentNotLoaded(Uri),

    #[error("referenced document could not be parsed: {0}")]
    DocumentUnparsed(Uri),

    #[error("'{pointer}' does not exist in {uri}")]
    PointerNotFound { uri: Uri, pointer: String },

    #[error("reference cycle at {uri}#{pointer}")]
    Cycle { uri: Uri, pointer: String },

    #[error("reference chain longer than {0} hops")]
    TooManyHops(usize),
}

/// A rule callback failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{0}")]
    Failed(String),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl RuleError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Building a project context for the cache failed.
///
/// Only the caller whose builder failed sees this; the cache entry stays
/// empty so the next request builds again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to build project context for {root}: {message}")]
pub struct CacheBuildError {
    pub root: Uri,
    pub message: String,
}

/// Invalid configuration or rule registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown rule '{0}' in configuration")]
    UnknownRule(String),

    #[error("rule id '{0}' is already registered")]
    DuplicateRuleId(String),

    #[error("rule number {number} of '{id}' is already used by '{existing}'")]
    DuplicateRuleNumber {
        number: u32,
        id: String,
        existing: String,
    },

    #[error("rule id '{0}' is reserved for engine diagnostics")]
    ReservedRuleId(String),

    #[error("invalid configuration: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    CacheBuild(#[from] CacheBuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, Error>;
