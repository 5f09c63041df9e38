//! Pointer-addressable document tree with source spans.

use crate::pointer;

/// A byte range `[start, end)` in the parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// The value held by a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Node>),
    /// Entries in source order. Keys are kept as written.
    Mapping(Vec<Entry>),
}

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub value: Value,
    /// Span of the value itself (for containers, first to last child).
    pub span: Span,
}

/// A key/value pair of a mapping.
///
/// The key span and the value span are tracked separately so diagnostics can
/// point at either.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub key_span: Span,
    pub value: Node,
}

impl Entry {
    /// Span from the start of the key to the end of the value.
    pub fn span(&self) -> Span {
        self.key_span.cover(self.value.span)
    }
}

impl Node {
    pub fn new(value: Value, span: Span) -> Self {
        Self { value, span }
    }

    pub fn null(span: Span) -> Self {
        Self::new(Value::Null, span)
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.value, Value::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.value, Value::Sequence(_))
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_mapping() && !self.is_sequence()
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            Value::Integer(i) => Some(i as f64),
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[Entry]> {
        match &self.value {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Scalar rendered as text, the way it would appear as a mapping key.
    pub fn scalar_text(&self) -> Option<String> {
        match &self.value {
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Sequence(_) | Value::Mapping(_) => None,
        }
    }

    /// Look up a mapping entry by key. Later duplicates are ignored.
    pub fn get_entry(&self, key: &str) -> Option<&Entry> {
        self.as_mapping()?.iter().find(|entry| entry.key == key)
    }

    /// Look up a mapping value by key.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.get_entry(key).map(|entry| &entry.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get_entry(key).is_some()
    }

    /// Keys of a mapping, in source order. Empty for non-mappings.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.as_mapping()
            .unwrap_or_default()
            .iter()
            .map(|entry| entry.key.as_str())
    }

    /// The `$ref` string of a reference object.
    pub fn ref_target(&self) -> Option<&str> {
        self.get("$ref")?.as_str()
    }

    /// Child addressed by one unescaped pointer token.
    pub fn child(&self, token: &str) -> Option<&Node> {
        match &self.value {
            Value::Mapping(_) => self.get(token),
            Value::Sequence(items) => parse_index(token).and_then(|idx| items.get(idx)),
            _ => None,
        }
    }

    /// Resolve a JSON Pointer relative to this node.
    pub fn pointer(&self, pointer: &str) -> Option<&Node> {
        let tokens = pointer::split_pointer(pointer)?;
        tokens
            .iter()
            .try_fold(self, |node, token| node.child(token))
    }

    /// The mapping entry whose value is addressed by `pointer`.
    ///
    /// Returns `None` for the root and for sequence items, which have no key.
    pub fn entry_at(&self, pointer: &str) -> Option<&Entry> {
        let parent = self.pointer(pointer::parent_pointer(pointer)?)?;
        let key = pointer::last_token(pointer)?;
        parent.get_entry(&key)
    }

    /// Visit every node in pre-order together with its pointer.
    pub fn walk<F>(&self, f: &mut F)
    where
        F: FnMut(&str, &Node),
    {
        let mut path = String::new();
        self.walk_inner(&mut path, f);
    }

    fn walk_inner<F>(&self, path: &mut String, f: &mut F)
    where
        F: FnMut(&str, &Node),
    {
        f(path, self);
        let len = path.len();
        match &self.value {
            Value::Mapping(entries) => {
                for entry in entries {
                    path.push('/');
                    path.push_str(&pointer::escape_token(&entry.key));
                    entry.value.walk_inner(path, f);
                    path.truncate(len);
                }
            }
            Value::Sequence(items) => {
                for (idx, item) in items.iter().enumerate() {
                    path.push('/');
                    path.push_str(&idx.to_string());
                    item.walk_inner(path, f);
                    path.truncate(len);
                }
            }
            _ => {}
        }
    }

    /// Human readable name of the value type.
    pub fn type_name(&self) -> &'static str {
        match self.value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Sequence(_) => "array",
            Value::Mapping(_) => "object",
        }
    }
}

/// Array indices in pointers are decimal without leading zeros.
fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> Node {
        Node::new(Value::String(value.to_string()), Span::default())
    }

    fn map(entries: Vec<(&str, Node)>) -> Node {
        Node::new(
            Value::Mapping(
                entries
                    .into_iter()
                    .map(|(key, value)| Entry {
                        key: key.to_string(),
                        key_span: Span::default(),
                        value,
                    })
                    .collect(),
            ),
            Span::default(),
        )
    }

    #[test]
    fn pointer_lookup_through_mappings_and_sequences() {
        let root = map(vec![(
            "paths",
            map(vec![(
                "/pets",
                map(vec![(
                    "parameters",
                    Node::new(Value::Sequence(vec![s("a"), s("b")]), Span::default()),
                )]),
            )]),
        )]);

        assert_eq!(
            root.pointer("/paths/~1pets/parameters/1").and_then(Node::as_str),
            Some("b")
        );
        assert!(root.pointer("/paths/~1pets/parameters/01").is_none());
        assert!(root.pointer("/paths/pets").is_none());
        assert!(root.pointer("").is_some());
        assert!(root.entry_at("").is_none());
        assert!(root.entry_at("/paths/~1pets/parameters/0").is_none());
        assert_eq!(root.entry_at("/paths/~1pets").unwrap().key, "/pets");
    }

    #[test]
    fn walk_visits_in_document_order() {
        let root = map(vec![
            ("b", s("1")),
            ("a", map(vec![("$ref", s("#/x"))])),
        ]);
        let mut seen = Vec::new();
        root.walk(&mut |ptr, _| seen.push(ptr.to_string()));
        assert_eq!(seen, vec!["", "/b", "/a", "/a/$ref"]);
        assert_eq!(root.get("a").and_then(Node::ref_target), Some("#/x"));
    }
}
