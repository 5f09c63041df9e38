/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Built-in lint rules.
 */

//! Built-in lint rules.
//!
//! - [`NoUnresolvedRefs`] - every `$ref` resolves
//! - [`PathParamsDefined`] - path templates and `in: path` parameters agree
//! - [`OperationIdUnique`] - no two operations share an `operationId`
//! - [`PathsConsistentCasing`] - path segments follow the project's majority casing
//!
//! The rules implement [`Rule`](oaslint_core::Rule) and are registered in
//! this order by [`builtin_registry`].

use std::sync::Arc;

use oaslint_core::{ConfigError, Rule, RuleRegistry};

mod no_unresolved_refs;
mod operation_id_unique;
mod path_params_defined;
mod paths_consistent_casing;

pub use no_unresolved_refs::NoUnresolvedRefs;
pub use operation_id_unique::OperationIdUnique;
pub use path_params_defined::PathParamsDefined;
pub use paths_consistent_casing::{Casing, PathsConsistentCasing};

/// Fresh instances of every built-in rule, in registration order.
pub fn builtin_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(NoUnresolvedRefs::new()),
        Arc::new(PathParamsDefined::new()),
        Arc::new(OperationIdUnique::new()),
        Arc::new(PathsConsistentCasing::new()),
    ]
}

/// A registry holding the built-in rules.
///
/// # Errors
///
/// Never for the built-in set; the result type is that of
/// [`RuleRegistry::register`].
pub fn builtin_registry() -> Result<RuleRegistry, ConfigError> {
    let mut registry = RuleRegistry::new();
    for rule in builtin_rules() {
        registry.register(rule)?;
    }
    Ok(registry)
}
