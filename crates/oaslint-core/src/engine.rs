/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Rule engine: traversal, dispatch and diagnostic collection.
 */

//! Rule engine.
//!
//! Documents reachable from the requested roots are visited in URI order.
//! For each document every enabled rule first sees the document itself, then
//! each atom in document order; rules run in registration order. Project
//! hooks run last. Each callback is isolated: an `Err` or a panic becomes an
//! `internal-rule-error` diagnostic (or is dropped, per configuration) and
//! the run goes on.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use oaslint_system_runtime::Uri;
use serde::Serialize;

use crate::config::{LintConfig, RuleErrorPolicy};
use crate::context::ProjectContext;
use crate::error::RuleError;
use crate::index::{Atom, AtomKind};
use crate::locate;
use crate::rule::{RuleContext, RuleMeta, RuleRegistry, Visitor};
use crate::types::{Diagnostic, Range, Severity};

pub const PARSE_ERROR: &str = "parse-error";
pub const LOAD_ERROR: &str = "load-error";
pub const INTERNAL_RULE_ERROR: &str = "internal-rule-error";

/// Ids and codes of the diagnostics the engine emits itself.
pub(crate) const ENGINE_RULES: &[(&str, u32)] = &[
    (PARSE_ERROR, 9001),
    (LOAD_ERROR, 9002),
    (INTERNAL_RULE_ERROR, 9003),
];

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub registry: RuleRegistry,
    pub config: LintConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineOutput {
    pub diagnostics: Vec<Diagnostic>,
}

struct RuleRun<'a> {
    meta: &'a RuleMeta,
    visitor: Box<dyn Visitor>,
    cx: RuleContext<'a>,
}

/// Where a failed callback is reported.
struct Site<'a> {
    uri: &'a Uri,
    pointer: Option<&'a str>,
}

/// Lint everything reachable from `roots`.
///
/// The output is sorted by (uri, range, rule id), keeping report order for
/// ties, so two runs over the same context are identical.
pub fn run_engine(ctx: &ProjectContext, roots: &[Uri], options: &EngineOptions) -> EngineOutput {
    let config = &options.config;
    let policy = config.rule_error_policy();
    let mut diagnostics = Vec::new();

    for root in roots {
        if let Some(err) = ctx.load_failure(root) {
            diagnostics.push(engine_diagnostic(root, Range::default(), None, LOAD_ERROR, err.to_string()));
        }
    }

    let reachable = ctx.reachable_from(roots);
    for uri in &reachable {
        let Some(doc) = ctx.document(uri) else {
            continue;
        };
        if let Some(failure) = &doc.parse_failure {
            let range = failure
                .offset
                .and_then(|offset| locate::offset_to_range(doc, offset, offset))
                .unwrap_or_else(locate::document_start);
            diagnostics.push(engine_diagnostic(uri, range, None, PARSE_ERROR, failure.message.clone()));
        }
    }

    let mut runs: Vec<RuleRun<'_>> = options
        .registry
        .iter()
        .filter(|rule| config.is_enabled(&rule.meta().id))
        .map(|rule| {
            let meta = rule.meta();
            let configured = config.setting(&meta.id).and_then(|s| s.severity());
            RuleRun {
                meta,
                visitor: rule.check(),
                cx: RuleContext::new(ctx, roots, meta, configured),
            }
        })
        .collect();
    tracing::debug!(
        rules = runs.len(),
        documents = reachable.len(),
        version = ctx.version(),
        "running rules"
    );

    let mut failures = Vec::new();
    for uri in &reachable {
        let Some(doc) = ctx.document(uri).filter(|doc| doc.is_parsed()) else {
            continue;
        };
        let site = Site { uri, pointer: None };
        for run in &mut runs {
            invoke(ctx, run, policy, &site, &mut failures, |v, cx| v.document(doc, cx));
        }
        for atom in ctx.index().atoms_in(uri) {
            let site = Site {
                uri,
                pointer: Some(atom.pointer.as_str()),
            };
            for run in &mut runs {
                invoke(ctx, run, policy, &site, &mut failures, |v, cx| dispatch(v, atom, cx));
            }
        }
    }

    if let Some(first) = roots.first() {
        let site = Site {
            uri: first,
            pointer: None,
        };
        for run in &mut runs {
            invoke(ctx, run, policy, &site, &mut failures, |v, cx| v.project(cx));
        }
    } else {
        tracing::debug!(rules = runs.len(), "no roots requested, skipping project hooks");
    }

    for run in runs {
        diagnostics.extend(run.cx.into_diagnostics());
    }
    diagnostics.extend(failures);
    diagnostics.sort_by(Diagnostic::cmp_location);

    tracing::debug!(diagnostics = diagnostics.len(), "rule run finished");
    EngineOutput { diagnostics }
}

fn dispatch(visitor: &mut dyn Visitor, atom: &Atom, cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
    match atom.kind() {
        AtomKind::Root => visitor.root(atom, cx),
        AtomKind::PathItem => visitor.path_item(atom, cx),
        AtomKind::Operation => visitor.operation(atom, cx),
        AtomKind::Parameter => visitor.parameter(atom, cx),
        AtomKind::RequestBody => visitor.request_body(atom, cx),
        AtomKind::Response => visitor.response(atom, cx),
        AtomKind::Schema => visitor.schema(atom, cx),
        AtomKind::SecurityScheme => visitor.security_scheme(atom, cx),
    }
}

fn invoke<F>(
    ctx: &ProjectContext,
    run: &mut RuleRun<'_>,
    policy: RuleErrorPolicy,
    site: &Site<'_>,
    failures: &mut Vec<Diagnostic>,
    callback: F,
) where
    F: FnOnce(&mut dyn Visitor, &mut RuleContext<'_>) -> Result<(), RuleError>,
{
    let RuleRun { visitor, cx, meta } = run;
    let error = match catch_unwind(AssertUnwindSafe(|| callback(visitor.as_mut(), cx))) {
        Ok(Ok(())) => return,
        Ok(Err(err)) => err,
        Err(payload) => RuleError::Panicked(panic_message(payload.as_ref())),
    };

    tracing::warn!(
        rule = %meta.id,
        uri = %site.uri,
        pointer = site.pointer.unwrap_or_default(),
        error = %error,
        "rule failed"
    );
    if policy == RuleErrorPolicy::Drop {
        return;
    }

    let range = match (ctx.document(site.uri), site.pointer) {
        (Some(doc), Some(pointer)) => locate::locate_or_ancestor(doc, pointer),
        _ => locate::document_start(),
    };
    failures.push(engine_diagnostic(
        site.uri,
        range,
        site.pointer,
        INTERNAL_RULE_ERROR,
        format!("rule '{}' failed: {error}", meta.id),
    ));
}

fn engine_diagnostic(uri: &Uri, range: Range, pointer: Option<&str>, rule_id: &str, message: String) -> Diagnostic {
    let code = ENGINE_RULES
        .iter()
        .find(|(id, _)| *id == rule_id)
        .map_or(0, |(_, code)| *code);
    Diagnostic {
        uri: uri.clone(),
        range,
        severity: Severity::Error,
        message,
        code,
        rule_id: rule_id.to_string(),
        pointer: pointer.map(str::to_string),
        related_information: Vec::new(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextOptions, build_project_context};
    use crate::rule::{Report, Rule, RuleType};
    use crate::types::Position;
    use oaslint_system_runtime::{FileSystem, MemoryFileSystem};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    /// Reports every operation at its key.
    struct EveryOperation(RuleMeta);

    impl Rule for EveryOperation {
        fn meta(&self) -> &RuleMeta {
            &self.0
        }

        fn check(&self) -> Box<dyn Visitor> {
            struct Check;
            impl Visitor for Check {
                fn operation(&mut self, atom: &Atom, cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
                    cx.report_key(atom, "operation");
                    Ok(())
                }
            }
            Box::new(Check)
        }
    }

    /// Fails on the first path item and panics on the second.
    struct Flaky(RuleMeta);

    impl Rule for Flaky {
        fn meta(&self) -> &RuleMeta {
            &self.0
        }

        fn check(&self) -> Box<dyn Visitor> {
            struct Check(usize);
            impl Visitor for Check {
                fn path_item(&mut self, _atom: &Atom, _cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
                    self.0 += 1;
                    match self.0 {
                        1 => Err(RuleError::new("no luck")),
                        2 => panic!("boom"),
                        _ => Ok(()),
                    }
                }

                fn project(&mut self, cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
                    let root = cx.roots()[0].clone();
                    cx.report(&root, Range::default(), Report::new("done").with_severity(Severity::Info));
                    Ok(())
                }
            }
            Box::new(Check(0))
        }
    }

    fn registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry
            .register(Arc::new(EveryOperation(RuleMeta::new(
                "every-operation",
                1,
                RuleType::Style,
                Severity::Warning,
                "reports operations",
            ))))
            .unwrap();
        registry
            .register(Arc::new(Flaky(RuleMeta::new(
                "flaky",
                2,
                RuleType::Problem,
                Severity::Error,
                "fails",
            ))))
            .unwrap();
        registry
    }

    async fn context() -> ProjectContext {
        let fs = MemoryFileSystem::new()
            .with_file(
                "file:///api.yaml",
                "openapi: 3.0.0\npaths:\n  /a:\n    get: {}\n  /b:\n    post: {}\n  /c:\n    $ref: './broken.yaml'\n",
            )
            .unwrap()
            .with_file("file:///broken.yaml", "get: [unclosed\n")
            .unwrap();
        let fs: Arc<dyn FileSystem> = Arc::new(fs);
        build_project_context(
            &[uri("file:///api.yaml"), uri("file:///gone.yaml")],
            fs,
            ContextOptions::default(),
        )
        .await
    }

    fn rule_ids(output: &EngineOutput) -> Vec<&str> {
        output.diagnostics.iter().map(|d| d.rule_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let ctx = context().await;
        let roots = ctx.roots().to_vec();
        let options = EngineOptions {
            registry: registry(),
            config: LintConfig::default(),
        };
        let output = run_engine(&ctx, &roots, &options);

        assert_eq!(
            rule_ids(&output),
            vec![
                "flaky",
                "internal-rule-error",
                "every-operation",
                "internal-rule-error",
                "every-operation",
                "parse-error",
                "load-error",
            ]
        );
        let get = &output.diagnostics[2];
        assert_eq!(get.severity, Severity::Warning);
        assert_eq!(get.range.start, Position::new(3, 4));
        assert_eq!(get.pointer.as_deref(), Some("/paths/~1a/get"));

        assert!(output.diagnostics[1].message.contains("no luck"));
        assert_eq!(output.diagnostics[1].range.start, Position::new(2, 2));
        assert!(output.diagnostics[3].message.contains("boom"));
        assert_eq!(output.diagnostics[5].code, 9001);
        assert_eq!(output.diagnostics[6].code, 9002);
        assert_eq!(output.diagnostics[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_configuration_applies() {
        let ctx = context().await;
        let roots = ctx.roots().to_vec();
        let options = EngineOptions {
            registry: registry(),
            config: LintConfig::from_yaml("rules:\n  every-operation: error\n  flaky: off\nrule-errors: drop\n").unwrap(),
        };
        let output = run_engine(&ctx, &roots, &options);
        assert_eq!(
            rule_ids(&output),
            vec!["every-operation", "every-operation", "parse-error", "load-error"]
        );
        assert!(output.diagnostics[..2].iter().all(|d| d.severity == Severity::Error));
    }

    #[tokio::test]
    async fn test_no_roots_runs_nothing() {
        let ctx = context().await;
        let options = EngineOptions {
            registry: registry(),
            config: LintConfig::default(),
        };
        let output = run_engine(&ctx, &[], &options);
        assert_eq!(output, EngineOutput::default());
    }

    #[tokio::test]
    async fn test_rules_see_only_requested_roots() {
        let ctx = context().await;
        let options = EngineOptions {
            registry: registry(),
            config: LintConfig::from_yaml("rules:\n  every-operation: off\n").unwrap(),
        };
        // The project hook reports at the first root it is given.
        let output = run_engine(&ctx, &[uri("file:///gone.yaml")], &options);
        assert_eq!(rule_ids(&output), vec!["flaky", "load-error"]);
        assert!(output.diagnostics.iter().all(|d| d.uri.as_str() == "file:///gone.yaml"));
    }

    #[tokio::test]
    async fn test_runs_are_deterministic() {
        let ctx = context().await;
        let roots = ctx.roots().to_vec();
        let options = EngineOptions {
            registry: registry(),
            config: LintConfig::default(),
        };
        let first = run_engine(&ctx, &roots, &options);
        let second = run_engine(&ctx, &roots, &options);
        assert_eq!(first, second);
    }
}
