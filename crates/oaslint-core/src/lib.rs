//! Multi-file OpenAPI analysis.
//!
//! This crate turns a set of root documents into a project context and runs
//! lint rules over it.
//!
//! # Architecture
//!
//! ```text
//!   FileSystem ──► load_document ──► ParsedDocument (IR + spans)
//!                                          │
//!            build_project_context ◄───────┘   waves of concurrent loads
//!                     │
//!      ┌──────────────┼──────────────┐
//!      ▼              ▼              ▼
//!   RefGraph       Resolver     ProjectIndex      (typed atoms, lookups)
//!      └──────────────┼──────────────┘
//!                     ▼
//!               ProjectContext ──► run_engine ──► Vec<Diagnostic>
//! ```
//!
//! - [`ProjectContext`] - documents, graph, resolver and index for some roots
//! - [`ProjectContextCache`] - contexts shared by root, one build in flight
//! - [`Rule`] / [`Visitor`] - the rule plugin interface
//! - [`run_engine`] - deterministic rule execution
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use oaslint_core::{ContextOptions, EngineOptions, build_project_context, run_engine};
//! use oaslint_system_runtime::{NativeFileSystem, Uri};
//!
//! let fs = Arc::new(NativeFileSystem::new());
//! let root = Uri::from_file_path("openapi.yaml")?;
//! let ctx = build_project_context(&[root.clone()], fs, ContextOptions::default()).await;
//! let output = run_engine(&ctx, &[root], &EngineOptions::default());
//! for diagnostic in output.diagnostics {
//!     println!("{}: {}", diagnostic.rule_id, diagnostic.message);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod graph;
pub mod index;
pub mod locate;
pub mod resolver;
pub mod rule;
pub mod types;

pub use cache::ProjectContextCache;
pub use config::{LintConfig, RuleErrorPolicy, RuleSetting};
pub use context::{
    ContextOptions, MultiRootContexts, ProjectContext, SharedDocument, VersionCounter,
    build_project_context, build_project_context_for_root, discover_roots, find_shared_schemas,
    resolve_multiple_roots,
};
pub use document::{
    ClassifierPolicy, Dialect, DocumentFormat, DocumentKind, DocumentMap, ParseFailure,
    ParsedDocument, classify_document, load_document,
};
pub use engine::{EngineOptions, EngineOutput, INTERNAL_RULE_ERROR, LOAD_ERROR, PARSE_ERROR, run_engine};
pub use error::{
    CacheBuildError, ConfigError, Error, LoadError, ResolutionError, Result, RuleError,
};
pub use graph::{GraphNode, RefGraph, RefSite, UnresolvedRef, build_ref_graph};
pub use index::{
    Atom, AtomData, AtomKind, EffectiveParameter, IndexKey, ParameterLocation, ProjectIndex,
    SchemaFlags, build_index,
};
pub use resolver::{Resolved, Resolver};
pub use rule::{
    NodeRef, Report, Rule, RuleContext, RuleMeta, RuleRegistry, RuleScope, RuleType, Visitor,
};
pub use types::{Diagnostic, Position, Range, RelatedInformation, Severity};
