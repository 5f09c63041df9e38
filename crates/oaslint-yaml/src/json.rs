//! JSON parsing.
//!
//! JSON is validated strictly with serde_json, then read through the same
//! event builder as YAML so both syntaxes yield identical trees and spans.

use crate::node::Node;
use crate::parser::parse_yaml;
use crate::{Error, Result};

/// Parse a JSON document into a [`Node`] tree.
///
/// # Errors
///
/// Returns [`Error::Syntax`] at serde_json's reported position for malformed
/// JSON.
pub fn parse_json(text: &str) -> Result<Node> {
    if let Err(err) = serde_json::from_str::<serde_json::Value>(text) {
        return Err(syntax_error(text, &err));
    }

    // Raw tabs can only appear as insignificant whitespace in valid JSON, and
    // the YAML scanner rejects some of them. Swapping byte for byte keeps
    // every offset intact.
    let normalized = text.replace('\t', " ");
    parse_yaml(&normalized).map_err(|err| match err {
        Error::InvalidStructure(message) => Error::InvalidStructure(message),
        Error::Syntax { message, .. } => {
            Error::InvalidStructure(format!("JSON not representable as YAML: {message}"))
        }
    })
}

fn syntax_error(text: &str, err: &serde_json::Error) -> Error {
    // serde_json positions are 1-based; column 0 means "before the line".
    let line = err.line().saturating_sub(1);
    let column = err.column().saturating_sub(1);
    let line_start = text
        .split_inclusive('\n')
        .take(line)
        .map(str::len)
        .sum::<usize>();
    Error::Syntax {
        message: err.to_string(),
        offset: (line_start + column).min(text.len()),
        line,
        column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_matches_yaml() {
        let json = r#"{"openapi": "3.1.0", "info": {"title": "T", "version": "1"}, "n": 3}"#;
        let yaml = "openapi: 3.1.0\ninfo:\n  title: T\n  version: \"1\"\nn: 3\n";

        let from_json = parse_json(json).unwrap();
        let from_yaml = parse_yaml(yaml).unwrap();

        for pointer in ["/openapi", "/info/title", "/info/version", "/n"] {
            assert_eq!(
                from_json.pointer(pointer).map(|n| &n.value),
                from_yaml.pointer(pointer).map(|n| &n.value),
                "mismatch at {pointer}"
            );
        }
    }

    #[test]
    fn test_json_spans() {
        let text = "{\n\t\"paths\": {\"/a\": {\"$ref\": \"b.json\"}}\n}";
        let root = parse_json(text).unwrap();
        let entry = root.entry_at("/paths/~1a/$ref").unwrap();
        assert_eq!(&text[entry.key_span.start..entry.key_span.end], "\"$ref\"");
        assert_eq!(
            &text[entry.value.span.start..entry.value.span.end],
            "\"b.json\""
        );
        assert_eq!(entry.value.value, Value::String("b.json".into()));
    }

    #[test]
    fn test_json_syntax_error() {
        let text = "{\n  \"a\": 1,\n  \"b\": \n}";
        match parse_json(text).unwrap_err() {
            Error::Syntax { line, offset, .. } => {
                assert_eq!(line, 3);
                assert!(offset <= text.len());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_json_rejects_trailing_comma() {
        assert!(matches!(
            parse_json("{\"a\": 1,}"),
            Err(Error::Syntax { .. })
        ));
    }
}
