//! Pointer to text range mapping.
//!
//! Every function returns `None` instead of failing when a pointer has no
//! concrete location, so callers can fall back to a parent or the document
//! start. YAML and JSON documents are handled the same way since both carry
//! the same spans.

use oaslint_yaml::pointer;

use crate::document::ParsedDocument;
use crate::types::{Position, Range};

/// Range of the value addressed by `pointer`.
pub fn locate(doc: &ParsedDocument, pointer: &str) -> Option<Range> {
    let node = doc.node(pointer)?;
    offset_to_range(doc, node.span.start, node.span.end)
}

/// Range of the mapping key whose value `pointer` addresses.
///
/// `None` for the document root and for sequence items, which have no key.
pub fn locate_key(doc: &ParsedDocument, pointer: &str) -> Option<Range> {
    let entry = doc.root.as_ref()?.entry_at(pointer)?;
    offset_to_range(doc, entry.key_span.start, entry.key_span.end)
}

/// Convert a byte range of the document text.
pub fn offset_to_range(doc: &ParsedDocument, start: usize, end: usize) -> Option<Range> {
    if start > end {
        return None;
    }
    let range = doc.lines.range(&doc.text, start, end)?;
    Some(Range::new(
        position(range.start.row, range.start.column),
        position(range.end.row, range.end.column),
    ))
}

/// Zero-width range at the start of the document.
pub fn document_start() -> Range {
    Range::default()
}

/// Key range of `pointer`, else its value range, else the nearest locatable
/// ancestor, else the document start.
pub fn locate_or_ancestor(doc: &ParsedDocument, pointer: &str) -> Range {
    let mut current = Some(pointer);
    while let Some(ptr) = current {
        if let Some(range) = locate_key(doc, ptr).or_else(|| locate(doc, ptr)) {
            return range;
        }
        current = pointer::parent_pointer(ptr);
    }
    document_start()
}

fn position(row: usize, column: usize) -> Position {
    Position::new(
        u32::try_from(row).unwrap_or(u32::MAX),
        u32::try_from(column).unwrap_or(u32::MAX),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use oaslint_system_runtime::Uri;
    use pretty_assertions::assert_eq;

    fn range(l1: u32, c1: u32, l2: u32, c2: u32) -> Range {
        Range::new(Position::new(l1, c1), Position::new(l2, c2))
    }

    const YAML: &str = "openapi: 3.1.0\npaths:\n  /pets:\n    get:\n      operationId: listPets\n";
    const JSON: &str = "{\n  \"openapi\": \"3.1.0\",\n  \"paths\": {\n    \"/pets\": {\n      \"get\": {\n        \"operationId\": \"listPets\"\n      }\n    }\n  }\n}\n";

    fn doc(name: &str, text: &str) -> ParsedDocument {
        ParsedDocument::from_text(Uri::parse(&format!("file:///{name}")).unwrap(), text)
    }

    #[test]
    fn test_key_and_value_ranges_yaml() {
        let doc = doc("api.yaml", YAML);
        let ptr = "/paths/~1pets/get/operationId";
        assert_eq!(locate_key(&doc, ptr), Some(range(4, 6, 4, 17)));
        assert_eq!(locate(&doc, ptr), Some(range(4, 19, 4, 27)));
    }

    #[test]
    fn test_key_and_value_ranges_json() {
        let doc = doc("api.json", JSON);
        let ptr = "/paths/~1pets/get/operationId";
        // JSON keys include their quotes.
        assert_eq!(locate_key(&doc, ptr), Some(range(5, 8, 5, 21)));
        assert_eq!(locate(&doc, ptr), Some(range(5, 23, 5, 33)));
    }

    #[test]
    fn test_missing_pointer_is_none() {
        for doc in [doc("api.yaml", YAML), doc("api.json", JSON)] {
            assert_eq!(locate(&doc, "/paths/~1dogs"), None);
            assert_eq!(locate_key(&doc, "/paths/~1dogs"), None);
            assert_eq!(locate_key(&doc, ""), None);
            assert_eq!(
                locate_or_ancestor(&doc, "/paths/~1dogs/get"),
                locate_key(&doc, "/paths").unwrap()
            );
        }
    }

    #[test]
    fn test_unparsed_document() {
        let doc = doc("bad.yaml", "a: [\n");
        assert_eq!(locate(&doc, ""), None);
        assert_eq!(locate_or_ancestor(&doc, "/a"), document_start());
        assert_eq!(offset_to_range(&doc, 0, 2), Some(range(0, 0, 0, 2)));
        assert_eq!(offset_to_range(&doc, 3, 1), None);
    }

    #[test]
    fn test_utf16_columns() {
        let doc = doc("api.yaml", "title: 😀\nx: 1\n");
        // The emoji is two UTF-16 code units.
        assert_eq!(locate(&doc, "/title"), Some(range(0, 7, 0, 9)));
    }
}
