//! Parsed documents: loading, format detection and classification.

use std::collections::BTreeMap;
use std::sync::Arc;

use oaslint_source_map::FileInformation;
use oaslint_system_runtime::{FileSystem, Uri, content_hash};
use oaslint_yaml::{Node, Span, Value};
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// All documents of a project context, keyed by normalized URI.
pub type DocumentMap = BTreeMap<Uri, Arc<ParsedDocument>>;

/// HTTP methods that name operations inside a path item.
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Keywords whose presence marks a mapping as a JSON Schema.
pub(crate) const SCHEMA_KEYWORDS: &[&str] = &[
    "type",
    "properties",
    "items",
    "allOf",
    "oneOf",
    "anyOf",
    "enum",
    "additionalProperties",
    "required",
    "format",
];

/// Keys of shared component collections, OpenAPI 3.x and Swagger 2.0.
const COLLECTION_KEYS: &[&str] = &[
    "schemas",
    "parameters",
    "responses",
    "requestBodies",
    "securitySchemes",
    "definitions",
    "paths",
    "components",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Yaml,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// OpenAPI 3.x (`openapi:` marker)
    OpenApi,
    /// Swagger 2.0 (`swagger:` marker)
    Swagger,
}

/// What a document looks like on its own, before any `$ref` context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentKind {
    /// An entry document carrying an `openapi` or `swagger` version marker.
    Root { dialect: Dialect, version: String },
    /// A piece of an API description meant to be referenced.
    Fragment,
    /// Arbitrary YAML or JSON, or a document that failed to parse.
    Unknown,
}

impl DocumentKind {
    pub fn is_root(&self) -> bool {
        matches!(self, DocumentKind::Root { .. })
    }
}

/// How eagerly [`classify_document`] accepts fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierPolicy {
    /// A mapping holding nothing but `$ref` still counts as a fragment.
    #[default]
    Lenient,
    /// A bare `$ref` mapping is too ambiguous and is classified Unknown.
    Strict,
}

/// Why a document has no IR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub message: String,
    /// Byte offset of the failure, when the parser reported one.
    pub offset: Option<usize>,
}

/// An immutable snapshot of one document.
///
/// Documents are shared as `Arc<ParsedDocument>` and replaced wholesale when
/// the text changes.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub uri: Uri,
    pub format: DocumentFormat,
    pub text: String,
    /// `None` when parsing failed; see `parse_failure`.
    pub root: Option<Node>,
    pub parse_failure: Option<ParseFailure>,
    pub kind: DocumentKind,
    /// Line index over `text`, used to turn spans into ranges.
    pub lines: FileInformation,
    pub hash: String,
}

impl ParsedDocument {
    /// Parse `text` as the content of `uri` with the lenient classifier.
    pub fn from_text(uri: Uri, text: impl Into<String>) -> Self {
        Self::from_text_with_policy(uri, text, ClassifierPolicy::default())
    }

    pub fn from_text_with_policy(
        uri: Uri,
        text: impl Into<String>,
        policy: ClassifierPolicy,
    ) -> Self {
        let text = text.into();
        let format = detect_format(&uri, &text);
        let parsed = match format {
            DocumentFormat::Json => oaslint_yaml::parse_json(&text),
            DocumentFormat::Yaml => oaslint_yaml::parse_yaml(&text),
        };

        let (root, parse_failure) = match parsed {
            Ok(root) => (Some(root), None),
            Err(err) => {
                tracing::debug!(uri = %uri, error = %err, "document failed to parse");
                let failure = ParseFailure {
                    message: err.to_string(),
                    offset: err.offset(),
                };
                (None, Some(failure))
            }
        };

        let kind = root
            .as_ref()
            .map_or(DocumentKind::Unknown, |root| {
                classify_document(root, &text, policy)
            });

        Self {
            lines: FileInformation::new(&text),
            hash: content_hash(&text),
            uri,
            format,
            text,
            root,
            parse_failure,
            kind,
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.root.is_some()
    }

    /// Node addressed by a JSON Pointer.
    pub fn node(&self, pointer: &str) -> Option<&Node> {
        self.root.as_ref()?.pointer(pointer)
    }

    /// Source text covered by `span`, or "" when out of bounds.
    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or_default()
    }
}

/// Read and parse one document.
///
/// # Errors
///
/// Only an I/O failure is an error. Malformed text produces a document with
/// `root: None` and a recorded [`ParseFailure`].
pub async fn load_document(
    fs: &dyn FileSystem,
    uri: &Uri,
    policy: ClassifierPolicy,
) -> Result<ParsedDocument, LoadError> {
    let content = fs
        .read(uri)
        .await
        .map_err(|err| LoadError::from_runtime(uri, &err))?;
    tracing::debug!(uri = %uri, bytes = content.text.len(), "loaded document");
    Ok(ParsedDocument::from_text_with_policy(
        uri.clone(),
        content.text,
        policy,
    ))
}

/// Decide between JSON and YAML.
///
/// The extension wins when it is `.json`, `.yaml` or `.yml`; anything else
/// is sniffed: text starting with `{` or `[` is JSON.
pub fn detect_format(uri: &Uri, text: &str) -> DocumentFormat {
    match uri.extension().as_deref() {
        Some("json") => DocumentFormat::Json,
        Some("yaml" | "yml") => DocumentFormat::Yaml,
        _ => match text.trim_start_matches('\u{feff}').trim_start().chars().next() {
            Some('{' | '[') => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        },
    }
}

/// Classify a parsed document by its markers.
pub fn classify_document(root: &Node, text: &str, policy: ClassifierPolicy) -> DocumentKind {
    if !root.is_mapping() {
        return DocumentKind::Unknown;
    }

    for (key, dialect) in [("openapi", Dialect::OpenApi), ("swagger", Dialect::Swagger)] {
        if let Some(marker) = root.get(key) {
            return DocumentKind::Root {
                dialect,
                version: version_text(marker, text),
            };
        }
    }

    let keys: Vec<&str> = root.keys().collect();
    if keys == ["$ref"] {
        return match policy {
            ClassifierPolicy::Lenient => DocumentKind::Fragment,
            ClassifierPolicy::Strict => DocumentKind::Unknown,
        };
    }

    if looks_like_fragment(root) {
        DocumentKind::Fragment
    } else {
        DocumentKind::Unknown
    }
}

/// Fragment markers: refs, operations, parameters, schemas, responses and
/// component collections.
pub(crate) fn looks_like_fragment(root: &Node) -> bool {
    let has = |key: &str| root.contains_key(key);
    has("$ref")
        || HTTP_METHODS.iter().any(|m| has(*m))
        || (has("name") && has("in"))
        || SCHEMA_KEYWORDS.iter().any(|k| has(*k))
        || (has("description") && (has("content") || has("headers") || has("schema")))
        || COLLECTION_KEYS.iter().any(|k| has(*k))
}

/// The version marker as written, so `3.0` is not rendered as `3`.
fn version_text(marker: &Node, text: &str) -> String {
    match &marker.value {
        Value::String(s) => s.clone(),
        _ => text
            .get(marker.span.start..marker.span.end)
            .map(str::to_string)
            .or_else(|| marker.scalar_text())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oaslint_system_runtime::MemoryFileSystem;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(&uri("file:///a.json"), "a: 1"), DocumentFormat::Json);
        assert_eq!(detect_format(&uri("file:///a.YML"), "{}"), DocumentFormat::Yaml);
        assert_eq!(detect_format(&uri("file:///a"), "  {\"a\": 1}"), DocumentFormat::Json);
        assert_eq!(detect_format(&uri("file:///a.txt"), "a: 1"), DocumentFormat::Yaml);
    }

    #[test]
    fn test_classify_roots() {
        let doc = ParsedDocument::from_text(uri("file:///api.yaml"), "openapi: 3.0\ninfo: {}\n");
        assert_eq!(
            doc.kind,
            DocumentKind::Root {
                dialect: Dialect::OpenApi,
                version: "3.0".into()
            }
        );

        let doc = ParsedDocument::from_text(uri("file:///api.json"), r#"{"swagger": "2.0"}"#);
        assert!(matches!(
            doc.kind,
            DocumentKind::Root {
                dialect: Dialect::Swagger,
                ..
            }
        ));
    }

    #[test]
    fn test_classify_fragments_and_unknown() {
        let param = ParsedDocument::from_text(uri("file:///p.yaml"), "name: id\nin: path\n");
        assert_eq!(param.kind, DocumentKind::Fragment);

        let item = ParsedDocument::from_text(uri("file:///i.yaml"), "get:\n  responses: {}\n");
        assert_eq!(item.kind, DocumentKind::Fragment);

        let config = ParsedDocument::from_text(uri("file:///c.yaml"), "name: app\nport: 8080\n");
        assert_eq!(config.kind, DocumentKind::Unknown);

        let list = ParsedDocument::from_text(uri("file:///l.yaml"), "- a\n- b\n");
        assert_eq!(list.kind, DocumentKind::Unknown);

        let shared = ParsedDocument::from_text(uri("file:///s.yaml"), "requestBodies:\n  Pet: {}\n");
        assert_eq!(shared.kind, DocumentKind::Fragment);
    }

    #[test]
    fn test_bare_ref_depends_on_policy() {
        let text = "$ref: './other.yaml'\n";
        let lenient = ParsedDocument::from_text(uri("file:///r.yaml"), text);
        assert_eq!(lenient.kind, DocumentKind::Fragment);

        let strict = ParsedDocument::from_text_with_policy(
            uri("file:///r.yaml"),
            text,
            ClassifierPolicy::Strict,
        );
        assert_eq!(strict.kind, DocumentKind::Unknown);
    }

    #[test]
    fn test_parse_failure_is_recorded() {
        let doc = ParsedDocument::from_text(uri("file:///bad.yaml"), "a: [1, 2\n");
        assert!(!doc.is_parsed());
        assert_eq!(doc.kind, DocumentKind::Unknown);
        let failure = doc.parse_failure.as_ref().unwrap();
        assert!(failure.offset.is_some());
    }

    #[test]
    fn test_alias_expansion_failure_is_recorded() {
        let mut text = String::from("a0: &a0 [x, x, x, x, x, x, x, x, x, x]\n");
        for level in 1..8 {
            let items = vec![format!("*a{}", level - 1); 10].join(", ");
            text.push_str(&format!("a{level}: &a{level} [{items}]\n"));
        }
        let doc = ParsedDocument::from_text(uri("file:///aliases.yaml"), text);
        assert!(!doc.is_parsed());
        assert_eq!(doc.kind, DocumentKind::Unknown);
        let failure = doc.parse_failure.as_ref().unwrap();
        assert!(failure.message.contains("alias expansion"));
    }

    #[tokio::test]
    async fn test_load_document() {
        let fs = MemoryFileSystem::new()
            .with_file("file:///api.yaml", "openapi: 3.1.0\n")
            .unwrap();

        let doc = load_document(&fs, &uri("file:///api.yaml"), ClassifierPolicy::Lenient)
            .await
            .unwrap();
        assert!(doc.kind.is_root());
        assert!(doc.hash.starts_with("sha256:"));

        let err = load_document(&fs, &uri("file:///missing.yaml"), ClassifierPolicy::Lenient)
            .await
            .unwrap_err();
        assert_eq!(err, LoadError::NotFound(uri("file:///missing.yaml")));
    }
}
