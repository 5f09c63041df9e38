/*
 * no_unresolved_refs.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Report references that cannot be followed.
 */

use oaslint_core::{
    GraphNode, ParsedDocument, Rule, RuleContext, RuleError, RuleMeta, RuleType, Severity, Visitor,
};
use oaslint_yaml::pointer;

/// One diagnostic per unresolved `$ref`, at the reference string.
pub struct NoUnresolvedRefs {
    meta: RuleMeta,
}

impl NoUnresolvedRefs {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "no-unresolved-refs",
                1,
                RuleType::Problem,
                Severity::Error,
                "Every $ref must point at an existing document and location",
            ),
        }
    }
}

impl Default for NoUnresolvedRefs {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for NoUnresolvedRefs {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self) -> Box<dyn Visitor> {
        Box::new(Check)
    }
}

struct Check;

impl Visitor for Check {
    fn document(&mut self, doc: &ParsedDocument, cx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let graph = cx.graph();
        for unresolved in graph.unresolved_in(&doc.uri) {
            let site = &unresolved.site;
            let value = GraphNode::new(site.uri.clone(), pointer::join_pointer(&site.pointer, "$ref"));
            cx.report_here(
                &value,
                format!("can't resolve '{}': {}", site.reference, unresolved.error),
            );
        }
        Ok(())
    }
}
