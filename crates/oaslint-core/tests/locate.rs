//! YAML and JSON documents map pointers to ranges the same way.

use oaslint_core::{Position, Range, locate};
use oaslint_core::document::ParsedDocument;
use oaslint_system_runtime::Uri;
use pretty_assertions::assert_eq;

fn doc(name: &str, text: &str) -> ParsedDocument {
    ParsedDocument::from_text(Uri::parse(name).unwrap(), text)
}

#[test]
fn equivalent_documents_locate_alike() {
    let yaml = doc(
        "file:///api.yaml",
        "openapi: 3.0.0\npaths:\n  /a:\n    get:\n      operationId: x\n",
    );
    let json = doc(
        "file:///api.json",
        "{\n\"openapi\": \"3.0.0\",\n\"paths\": {\n  \"/a\": {\n    \"get\": {\n      \"operationId\": \"x\"\n    }\n  }\n}\n}\n",
    );

    for doc in [&yaml, &json] {
        let key = locate::locate_key(doc, "/paths/~1a/get").unwrap();
        assert_eq!(key.start.line, 3, "{}", doc.uri);
        assert_eq!(key.start.character, 4, "{}", doc.uri);
        assert!(locate::locate(doc, "/paths/~1a/get/operationId").is_some());
        assert!(locate::locate(doc, "/paths/~1b").is_none());
        assert!(locate::locate_key(doc, "").is_none());
    }
}

#[test]
fn failed_lookups_never_panic() {
    let broken = doc("file:///broken.yaml", "a: [1, 2\n");
    assert!(!broken.is_parsed());
    assert!(locate::locate(&broken, "/a").is_none());
    assert_eq!(locate::locate_or_ancestor(&broken, "/a/0"), Range::default());
    assert!(locate::offset_to_range(&broken, 5, 2).is_none());
    assert!(locate::offset_to_range(&broken, 0, 10_000).is_none());
    assert_eq!(
        locate::offset_to_range(&broken, 3, 3).map(|r| r.start),
        Some(Position::new(0, 3))
    );
}
