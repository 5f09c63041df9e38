/*
 * path_params_defined.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Check that path templates and path parameters agree.
 */

use std::collections::BTreeSet;

use oaslint_core::{
    Atom, AtomData, GraphNode, ParameterLocation, Rule, RuleContext, RuleError, RuleMeta, RuleType,
    Severity, Visitor,
};

/// Every `{name}` in an operation's path template must be declared
/// `in: path`, at the path item or the operation, and every declared path
/// parameter must appear in the template.
///
/// Parameters are looked up after following `$ref`, so a parameter shared
/// from another file counts. A path item mounted under several paths is
/// checked against each of them.
pub struct PathParamsDefined {
    meta: RuleMeta,
}

impl PathParamsDefined {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "path-params-defined",
                2,
                RuleType::Problem,
                Severity::Error,
                "Path template variables and path parameters must match",
            ),
        }
    }
}

impl Default for PathParamsDefined {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for PathParamsDefined {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self) -> Box<dyn Visitor> {
        Box::new(Check::default())
    }
}

#[derive(Default)]
struct Check {
    /// Declarations already reported as unused; path-item parameters are
    /// seen once per operation.
    reported_unused: BTreeSet<GraphNode>,
}

impl Visitor for Check {
    fn operation(&mut self, atom: &Atom, cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let index = cx.index();
        let paths = index.operation_paths(atom);
        if paths.is_empty() {
            // webhooks and callbacks have no path template
            return Ok(());
        }
        let method = match &atom.data {
            AtomData::Operation { method, .. } => method.to_uppercase(),
            _ => return Ok(()),
        };

        let declared: Vec<_> = index
            .operation_parameters(&atom.node())
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
            .collect();

        for path in &paths {
            for name in template_params(path) {
                if !declared.iter().any(|p| p.name == name) {
                    cx.report_key(
                        atom,
                        format!("{method} {path}: path parameter '{name}' is not declared"),
                    );
                }
            }
        }

        for param in declared {
            let used = paths
                .iter()
                .any(|path| template_params(path).contains(&param.name.as_str()));
            if !used && self.reported_unused.insert(param.declared_at.clone()) {
                cx.report_at(
                    &param.declared_at,
                    "name",
                    format!(
                        "path parameter '{}' does not appear in {}",
                        param.name,
                        paths.join(", ")
                    ),
                );
            }
        }
        Ok(())
    }
}

/// Variable names of a path template, e.g. `["id"]` for `/items/{id}`.
fn template_params(path: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let name = after[..close].trim();
        if !name.is_empty() {
            names.push(name);
        }
        rest = &after[close + 1..];
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_params() {
        assert_eq!(template_params("/a/{id}/b/{sub_id}"), vec!["id", "sub_id"]);
        assert_eq!(template_params("/files/{name}.{ext}"), vec!["name", "ext"]);
        assert!(template_params("/plain").is_empty());
        assert!(template_params("/broken/{id").is_empty());
        assert!(template_params("/empty/{}").is_empty());
    }
}
