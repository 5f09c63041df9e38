//! Lint configuration.
//!
//! ```yaml
//! rules:
//!   operation-id-unique: warning   # error | warning | info | off
//! rule-errors: report              # report | drop
//! classifier: lenient              # lenient | strict
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::ClassifierPolicy;
use crate::error::ConfigError;
use crate::rule::RuleRegistry;
use crate::types::Severity;

/// Configured level of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSetting {
    Error,
    Warning,
    Info,
    Off,
}

impl RuleSetting {
    /// The severity this setting forces, or `None` for `off`.
    pub fn severity(self) -> Option<Severity> {
        match self {
            RuleSetting::Error => Some(Severity::Error),
            RuleSetting::Warning => Some(Severity::Warning),
            RuleSetting::Info => Some(Severity::Info),
            RuleSetting::Off => None,
        }
    }
}

/// What to do when a rule callback fails or panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleErrorPolicy {
    /// Emit an `internal-rule-error` diagnostic.
    #[default]
    Report,
    /// Log and continue silently.
    Drop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LintConfig {
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_errors: Option<RuleErrorPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ClassifierPolicy>,
}

impl LintConfig {
    /// Parse YAML (or JSON, which is YAML too).
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed text, unknown keys or unknown
    /// levels.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Check that every configured rule exists.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownRule`] for the first unknown id.
    pub fn validate(&self, registry: &RuleRegistry) -> Result<(), ConfigError> {
        match self.rules.keys().find(|id| !registry.contains(id)) {
            Some(id) => Err(ConfigError::UnknownRule(id.clone())),
            None => Ok(()),
        }
    }

    /// Layer `other` on top of `self`; settings in `other` win.
    pub fn merge(mut self, other: LintConfig) -> LintConfig {
        self.rules.extend(other.rules);
        self.rule_errors = other.rule_errors.or(self.rule_errors);
        self.classifier = other.classifier.or(self.classifier);
        self
    }

    pub fn setting(&self, rule_id: &str) -> Option<RuleSetting> {
        self.rules.get(rule_id).copied()
    }

    pub fn is_enabled(&self, rule_id: &str) -> bool {
        self.setting(rule_id) != Some(RuleSetting::Off)
    }

    pub fn rule_error_policy(&self) -> RuleErrorPolicy {
        self.rule_errors.unwrap_or_default()
    }

    pub fn classifier_policy(&self) -> ClassifierPolicy {
        self.classifier.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = LintConfig::from_yaml(
            "rules:\n  operation-id-unique: warning\n  paths-consistent-casing: off\nrule-errors: drop\nclassifier: strict\n",
        )
        .unwrap();
        assert_eq!(config.setting("operation-id-unique"), Some(RuleSetting::Warning));
        assert!(!config.is_enabled("paths-consistent-casing"));
        assert!(config.is_enabled("no-unresolved-refs"));
        assert_eq!(config.rule_error_policy(), RuleErrorPolicy::Drop);
        assert_eq!(config.classifier_policy(), ClassifierPolicy::Strict);
    }

    #[test]
    fn test_defaults_and_errors() {
        let empty = LintConfig::from_yaml("").unwrap();
        assert_eq!(empty, LintConfig::default());
        assert_eq!(empty.rule_error_policy(), RuleErrorPolicy::Report);

        assert!(matches!(
            LintConfig::from_yaml("rules:\n  a: loud\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            LintConfig::from_yaml("extends: recommended\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_unknown_rule() {
        let config = LintConfig::from_yaml("rules:\n  nope: error\n").unwrap();
        assert_eq!(
            config.validate(&RuleRegistry::new()),
            Err(ConfigError::UnknownRule("nope".into()))
        );
    }

    #[test]
    fn test_merge() {
        let base = LintConfig::from_yaml("rules:\n  a: error\n  b: warning\nrule-errors: drop\n").unwrap();
        let user = LintConfig::from_yaml("rules:\n  b: off\n").unwrap();
        let merged = base.merge(user);
        assert_eq!(merged.setting("a"), Some(RuleSetting::Error));
        assert_eq!(merged.setting("b"), Some(RuleSetting::Off));
        assert_eq!(merged.rule_error_policy(), RuleErrorPolicy::Drop);
    }
}
