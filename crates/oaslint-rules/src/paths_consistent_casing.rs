/*
 * paths_consistent_casing.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Report paths whose segments break the project's majority casing.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use oaslint_core::{
    Atom, AtomKind, GraphNode, Rule, RuleContext, RuleError, RuleMeta, RuleScope, RuleType,
    Severity, Visitor,
};
use oaslint_yaml::pointer;

/// Casing style of a literal path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Casing {
    Kebab,
    Camel,
    Snake,
    Pascal,
}

impl Casing {
    /// `None` for segments that fit every style (`pets`, `v2`) and for
    /// segments mixing separators or cases.
    pub fn of(segment: &str) -> Option<Casing> {
        let has_dash = segment.contains('-');
        let has_underscore = segment.contains('_');
        let has_upper = segment.chars().any(char::is_uppercase);
        let has_lower = segment.chars().any(char::is_lowercase);

        match (has_dash, has_underscore, has_upper) {
            (true, false, false) => Some(Casing::Kebab),
            (false, true, false) => Some(Casing::Snake),
            (false, false, true) if has_lower => {
                if segment.starts_with(char::is_uppercase) {
                    Some(Casing::Pascal)
                } else {
                    Some(Casing::Camel)
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for Casing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Casing::Kebab => "kebab-case",
            Casing::Camel => "camelCase",
            Casing::Snake => "snake_case",
            Casing::Pascal => "PascalCase",
        })
    }
}

/// Compares the casing of literal path segments across the whole project
/// and reports every path using a style other than the most common one.
/// Template variables such as `{petId}` are ignored.
pub struct PathsConsistentCasing {
    meta: RuleMeta,
}

impl PathsConsistentCasing {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "paths-consistent-casing",
                4,
                RuleType::Style,
                Severity::Warning,
                "Path segments should share one casing style",
            )
            .with_scope(RuleScope::Project),
        }
    }
}

impl Default for PathsConsistentCasing {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for PathsConsistentCasing {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self) -> Box<dyn Visitor> {
        Box::new(Check::default())
    }
}

#[derive(Default)]
struct Check {
    paths: BTreeSet<String>,
}

impl Visitor for Check {
    fn path_item(&mut self, atom: &Atom, cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        self.paths
            .extend(cx.index().paths_for(&atom.node()).into_iter().map(str::to_string));
        Ok(())
    }

    fn project(&mut self, cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let project = cx.project();
        let requested = cx.roots();
        let roots: Vec<&Atom> = cx.index().atoms_of_kind(AtomKind::Root);

        // Where each path is declared among the requested roots. Paths that
        // only roots outside this run declare are left to that run.
        let mut declared: BTreeMap<&str, Vec<GraphNode>> = BTreeMap::new();
        for path in &self.paths {
            let key = pointer::join_pointer("/paths", path);
            let declaring: Vec<GraphNode> = roots
                .iter()
                .map(|root| GraphNode::new(root.uri.clone(), key.clone()))
                .filter(|node| project.locate_key(&node.uri, &node.pointer).is_some())
                .collect();
            let in_run: Vec<GraphNode> = declaring
                .iter()
                .filter(|node| requested.contains(&node.uri))
                .cloned()
                .collect();
            if declaring.is_empty() || !in_run.is_empty() {
                declared.insert(path.as_str(), in_run);
            }
        }

        let styles: BTreeMap<&str, BTreeSet<Casing>> = declared
            .keys()
            .map(|path| (*path, segment_styles(path)))
            .collect();

        let mut counts: BTreeMap<Casing, usize> = BTreeMap::new();
        for casing in styles.values().flatten() {
            *counts.entry(*casing).or_default() += 1;
        }
        // Ties go to the style declared first.
        let Some(majority) = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(casing, _)| *casing)
        else {
            return Ok(());
        };
        tracing::trace!(%majority, paths = styles.len(), "majority path casing");

        for (path, found) in &styles {
            let Some(other) = found.iter().find(|c| **c != majority) else {
                continue;
            };
            let message = format!("path '{path}' uses {other} segments; most paths use {majority}");
            let Some(nodes) = declared.get(path) else {
                continue;
            };
            if nodes.is_empty() {
                // Mounted only through webhooks or callbacks; fall back to the
                // first requested root.
                if let Some(root) = roots.iter().find(|root| requested.contains(&root.uri)) {
                    cx.report_here(*root, message);
                }
                continue;
            }
            for node in nodes {
                cx.report_key(node, message.clone());
            }
        }
        Ok(())
    }
}

fn segment_styles(path: &str) -> BTreeSet<Casing> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && !segment.contains('{'))
        .filter_map(Casing::of)
        .collect()
}
