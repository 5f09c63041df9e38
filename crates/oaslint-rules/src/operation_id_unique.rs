/*
 * operation_id_unique.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Report operationId values shared by several operations.
 */

use oaslint_core::{
    Atom, Report, Rule, RuleContext, RuleError, RuleMeta, RuleType, Severity, Visitor,
};
use oaslint_yaml::pointer;

/// Every duplicate is reported at its own `operationId`, with the other
/// occurrences attached as related locations.
pub struct OperationIdUnique {
    meta: RuleMeta,
}

impl OperationIdUnique {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "operation-id-unique",
                3,
                RuleType::Problem,
                Severity::Error,
                "operationId must be unique across the project",
            ),
        }
    }
}

impl Default for OperationIdUnique {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for OperationIdUnique {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self) -> Box<dyn Visitor> {
        Box::new(Check)
    }
}

struct Check;

impl Visitor for Check {
    fn operation(&mut self, atom: &Atom, cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let Some(id) = atom.operation_id() else {
            return Ok(());
        };
        let occurrences = cx.index().occurrences(id);
        if occurrences.len() < 2 {
            return Ok(());
        }

        let this = atom.node();
        let mut report = Report::new(format!(
            "operationId '{id}' is used by {} operations",
            occurrences.len()
        ));
        for other in occurrences.iter().filter(|other| **other != this) {
            let field = pointer::join_pointer(&other.pointer, "operationId");
            let project = cx.project();
            let range = project
                .locate_key(&other.uri, &field)
                .or_else(|| project.locate(&other.uri, &other.pointer))
                .unwrap_or_default();
            report = report.with_related(other.uri.clone(), range, format!("'{id}' is also used here"));
        }
        cx.report_at(atom, "operationId", report);
        Ok(())
    }
}
