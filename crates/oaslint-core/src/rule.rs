/*
 * rule.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Rule plugin interface and reporting context.
 */

//! Rule plugin interface.
//!
//! A [`Rule`] carries static metadata and hands out a fresh [`Visitor`] for
//! every run. The engine calls the visitor once per atom of the matching
//! kind; visitors may keep state between calls (for example to collect
//! path segments and judge them in [`Visitor::project`]).
//!
//! # Example
//!
//! ```ignore
//! struct NoEmptyDescriptions;
//!
//! impl Rule for NoEmptyDescriptions {
//!     fn meta(&self) -> &RuleMeta { &META }
//!     fn check(&self) -> Box<dyn Visitor> { Box::new(Check) }
//! }
//!
//! struct Check;
//!
//! impl Visitor for Check {
//!     fn operation(&mut self, op: &Atom, cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
//!         if cx.document(&op.uri).and_then(|d| d.node(&op.pointer)).is_some_and(|n| n.get("description").is_none()) {
//!             cx.report_key(op, "operation has no description");
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use oaslint_system_runtime::Uri;
use oaslint_yaml::pointer;

use crate::context::ProjectContext;
use crate::document::ParsedDocument;
use crate::engine::ENGINE_RULES;
use crate::error::{ConfigError, RuleError};
use crate::graph::{GraphNode, RefGraph, RefSite};
use crate::index::{Atom, ProjectIndex};
use crate::locate;
use crate::resolver::Resolver;
use crate::types::{Diagnostic, Range, RelatedInformation, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Likely to break consumers of the API description.
    Problem,
    Suggestion,
    Style,
}

/// Whether a rule looks at documents one at a time or at the whole project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleScope {
    Document,
    Project,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMeta {
    /// Stable kebab-case id used in configuration and output.
    pub id: String,
    /// Numeric code, unique across the registry.
    pub number: u32,
    pub rule_type: RuleType,
    pub description: String,
    pub default_severity: Severity,
    pub scope: RuleScope,
}

impl RuleMeta {
    pub fn new(
        id: impl Into<String>,
        number: u32,
        rule_type: RuleType,
        default_severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            number,
            rule_type,
            description: description.into(),
            default_severity,
            scope: RuleScope::Document,
        }
    }

    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }
}

/// What a rule wants to say about a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub message: String,
    /// Overrides the rule's default severity, but not the configured one.
    pub severity: Option<Severity>,
    pub related: Vec<RelatedInformation>,
}

impl Report {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: None,
            related: Vec::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_related(mut self, uri: Uri, range: Range, message: impl Into<String>) -> Self {
        self.related.push(RelatedInformation {
            uri,
            range,
            message: message.into(),
        });
        self
    }
}

impl From<&str> for Report {
    fn from(message: &str) -> Self {
        Report::new(message)
    }
}

impl From<String> for Report {
    fn from(message: String) -> Self {
        Report::new(message)
    }
}

/// Anything that names a node: a document URI plus a JSON Pointer.
pub trait NodeRef {
    fn uri(&self) -> &Uri;
    fn pointer(&self) -> &str;
}

impl NodeRef for Atom {
    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn pointer(&self) -> &str {
        &self.pointer
    }
}

impl NodeRef for GraphNode {
    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn pointer(&self) -> &str {
        &self.pointer
    }
}

impl NodeRef for RefSite {
    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn pointer(&self) -> &str {
        &self.pointer
    }
}

/// Per-run callbacks of a rule. Every method defaults to doing nothing.
pub trait Visitor: Send {
    /// Called once per reachable parsed document, before its atoms.
    fn document(&mut self, _doc: &ParsedDocument, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn root(&mut self, _atom: &Atom, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn path_item(&mut self, _atom: &Atom, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn operation(&mut self, _atom: &Atom, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn parameter(&mut self, _atom: &Atom, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn request_body(&mut self, _atom: &Atom, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn response(&mut self, _atom: &Atom, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn schema(&mut self, _atom: &Atom, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn security_scheme(&mut self, _atom: &Atom, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    /// Called once after every document has been visited.
    fn project(&mut self, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }
}

/// A lint rule.
pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    /// A fresh visitor for one engine run.
    fn check(&self) -> Box<dyn Visitor>;
}

/// Read access to the project plus the reporting sink of one rule.
pub struct RuleContext<'a> {
    project: &'a ProjectContext,
    roots: &'a [Uri],
    meta: &'a RuleMeta,
    configured: Option<Severity>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(
        project: &'a ProjectContext,
        roots: &'a [Uri],
        meta: &'a RuleMeta,
        configured: Option<Severity>,
    ) -> Self {
        Self {
            project,
            roots,
            meta,
            configured,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn project(&self) -> &'a ProjectContext {
        self.project
    }

    /// The roots this run was asked to lint. A context may hold more.
    pub fn roots(&self) -> &'a [Uri] {
        self.roots
    }

    pub fn index(&self) -> &'a ProjectIndex {
        self.project.index()
    }

    pub fn graph(&self) -> &'a RefGraph {
        self.project.graph()
    }

    pub fn resolver(&self) -> &'a Resolver {
        self.project.resolver()
    }

    pub fn document(&self, uri: &Uri) -> Option<&'a ParsedDocument> {
        self.project.document(uri).map(Arc::as_ref)
    }

    pub fn meta(&self) -> &'a RuleMeta {
        self.meta
    }

    /// Report at the key of `field` under `node`, falling back to the node
    /// itself and then to the document start.
    pub fn report_at(&mut self, node: &impl NodeRef, field: &str, report: impl Into<Report>) {
        let child = pointer::join_pointer(node.pointer(), field);
        let range = self.document(node.uri()).map_or_else(locate::document_start, |doc| {
            locate::locate_key(doc, &child)
                .or_else(|| locate::locate(doc, node.pointer()))
                .unwrap_or_else(locate::document_start)
        });
        self.push(node.uri().clone(), range, Some(child), report.into());
    }

    /// Report at the value of `node`.
    pub fn report_here(&mut self, node: &impl NodeRef, report: impl Into<Report>) {
        let range = self.document(node.uri()).map_or_else(locate::document_start, |doc| {
            locate::locate(doc, node.pointer())
                .unwrap_or_else(|| locate::locate_or_ancestor(doc, node.pointer()))
        });
        self.push(node.uri().clone(), range, Some(node.pointer().to_string()), report.into());
    }

    /// Report at the key naming `node`, e.g. `get:` for an operation.
    pub fn report_key(&mut self, node: &impl NodeRef, report: impl Into<Report>) {
        let range = self
            .document(node.uri())
            .map_or_else(locate::document_start, |doc| locate::locate_or_ancestor(doc, node.pointer()));
        self.push(node.uri().clone(), range, Some(node.pointer().to_string()), report.into());
    }

    /// Report at an explicit range.
    pub fn report(&mut self, uri: &Uri, range: Range, report: impl Into<Report>) {
        self.push(uri.clone(), range, None, report.into());
    }

    fn push(&mut self, uri: Uri, range: Range, pointer: Option<String>, report: Report) {
        let severity = self
            .configured
            .or(report.severity)
            .unwrap_or(self.meta.default_severity);
        self.diagnostics.push(Diagnostic {
            uri,
            range,
            severity,
            message: report.message,
            code: self.meta.number,
            rule_id: self.meta.id.clone(),
            pointer,
            related_information: report.related,
        });
    }
}

/// Registered rules in registration order.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
    numbers: BTreeMap<u32, String>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule.
    ///
    /// # Errors
    ///
    /// The id or number is already taken, or the id belongs to an
    /// engine diagnostic.
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<(), ConfigError> {
        let meta = rule.meta();
        if let Some((id, number)) = ENGINE_RULES.iter().find(|(id, number)| *id == meta.id || *number == meta.number) {
            return Err(if *id == meta.id {
                ConfigError::ReservedRuleId(meta.id.clone())
            } else {
                ConfigError::DuplicateRuleNumber {
                    number: *number,
                    id: meta.id.clone(),
                    existing: (*id).to_string(),
                }
            });
        }
        if self.contains(&meta.id) {
            return Err(ConfigError::DuplicateRuleId(meta.id.clone()));
        }
        if let Some(existing) = self.numbers.get(&meta.number) {
            return Err(ConfigError::DuplicateRuleNumber {
                number: meta.number,
                id: meta.id.clone(),
                existing: existing.clone(),
            });
        }
        tracing::debug!(rule = %meta.id, number = meta.number, "registered rule");
        self.numbers.insert(meta.number, meta.id.clone());
        self.rules.push(rule);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.iter().find(|rule| rule.meta().id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.meta().id.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
