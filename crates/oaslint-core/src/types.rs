//! Diagnostic types produced by the engine.
//!
//! These types are transport-agnostic: they serialize to plain JSON and map
//! 1:1 onto editor-protocol diagnostics.
//!
//! All positions use 0-based line and character indices; characters are
//! counted in UTF-16 code units.

use std::cmp::Ordering;

use oaslint_system_runtime::Uri;
use serde::{Deserialize, Serialize};

/// A position in a text document, expressed as zero-based line and character offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    pub line: u32,
    /// UTF-16 code units from the start of the line.
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then(self.character.cmp(&other.character))
    }
}

/// A range in a text document. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width range at `pos`.
    pub fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// A secondary location attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedInformation {
    pub uri: Uri,
    pub range: Range,
    pub message: String,
}

/// One finding about one location in one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub uri: Uri,
    pub range: Range,
    pub severity: Severity,
    pub message: String,
    /// Numeric code of the rule that produced this diagnostic.
    pub code: u32,
    pub rule_id: String,
    /// JSON Pointer of the reported node, when the report was node-based.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pointer: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub related_information: Vec<RelatedInformation>,
}

impl Diagnostic {
    /// Output order: uri, then range, then rule id.
    pub fn cmp_location(&self, other: &Self) -> Ordering {
        self.uri
            .cmp(&other.uri)
            .then(self.range.start.cmp(&other.range.start))
            .then(self.range.end.cmp(&other.range.end))
            .then(self.rule_id.cmp(&other.rule_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(0, 10) < Position::new(1, 0));
        assert!(Position::new(2, 3) < Position::new(2, 4));
        assert_eq!(
            Position::new(1, 1).cmp(&Position::new(1, 1)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_range_contains() {
        let range = Range::new(Position::new(1, 2), Position::new(1, 6));
        assert!(range.contains(Position::new(1, 2)));
        assert!(!range.contains(Position::new(1, 6)));
        assert!(Range::point(Position::new(3, 0)).is_empty());
    }

    #[test]
    fn test_diagnostic_serialization_shape() {
        let diagnostic = Diagnostic {
            uri: Uri::parse("file:///api.yaml").unwrap(),
            range: Range::new(Position::new(0, 0), Position::new(0, 4)),
            severity: Severity::Warning,
            message: "msg".into(),
            code: 4,
            rule_id: "some-rule".into(),
            pointer: None,
            related_information: vec![],
        };
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["ruleId"], "some-rule");
        assert_eq!(json["range"]["end"]["character"], 4);
        assert!(json.get("relatedInformation").is_none());
        assert!(json.get("pointer").is_none());
    }
}
