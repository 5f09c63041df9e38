//! YAML parser that builds [`Node`] trees from yaml-rust2 marked events.

use std::collections::HashMap;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::node::{Entry, Node, Span, Value};
use crate::{Error, Result};

/// Most nodes alias expansion may add to one document. Nested anchors grow
/// geometrically, so the tree is capped rather than the input.
const ALIAS_EXPANSION_LIMIT: usize = 100_000;

/// Parse a single YAML document into a [`Node`] tree.
///
/// Only the first document of a multi-document stream is read. An input that
/// holds no document at all (empty, or only comments) parses to a null root.
///
/// # Example
///
/// ```rust
/// use oaslint_yaml::parse_yaml;
///
/// let root = parse_yaml("openapi: 3.1.0").unwrap();
/// assert_eq!(root.get("openapi").and_then(|n| n.as_str()), Some("3.1.0"));
/// ```
///
/// # Errors
///
/// Returns [`Error::Syntax`] with the scanner position when the text is not
/// well-formed YAML.
pub fn parse_yaml(text: &str) -> Result<Node> {
    let mut parser = Parser::new_from_str(text);
    let mut builder = TreeBuilder::new(text);

    parser
        .load(&mut builder, false) // false = single document only
        .map_err(|err| scan_error(text, &err))?;

    builder.finish()
}

fn scan_error(text: &str, err: &yaml_rust2::ScanError) -> Error {
    let marker = err.marker();
    Error::Syntax {
        message: err.info().to_string(),
        offset: CharOffsets::new(text).byte(marker.index()),
        line: marker.line().saturating_sub(1),
        column: marker.col(),
    }
}

/// Maps yaml-rust2 marker indices (counted in chars) to byte offsets.
struct CharOffsets {
    /// Byte offset of every char; `None` for ASCII input where both agree.
    table: Option<Vec<usize>>,
    len: usize,
}

impl CharOffsets {
    fn new(text: &str) -> Self {
        let table = (!text.is_ascii()).then(|| {
            text.char_indices()
                .map(|(idx, _)| idx)
                .chain(std::iter::once(text.len()))
                .collect()
        });
        Self {
            table,
            len: text.len(),
        }
    }

    fn byte(&self, char_index: usize) -> usize {
        match &self.table {
            None => char_index.min(self.len),
            Some(table) => table.get(char_index).copied().unwrap_or(self.len),
        }
    }
}

/// Builder that implements MarkedEventReceiver to construct the tree.
struct TreeBuilder<'a> {
    source: &'a str,
    offsets: CharOffsets,

    /// Containers under construction
    stack: Vec<Frame>,

    /// Completed anchored nodes and their node counts, by yaml-rust2 anchor id
    anchors: HashMap<usize, (Node, usize)>,

    /// Nodes added so far by alias expansion
    expanded: usize,

    root: Option<Node>,
    error: Option<Error>,
}

enum Frame {
    Sequence {
        start: usize,
        anchor: usize,
        items: Vec<Node>,
    },
    Mapping {
        start: usize,
        anchor: usize,
        entries: Vec<Entry>,
        pending_key: Option<(String, Span)>,
    },
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            offsets: CharOffsets::new(source),
            stack: Vec::new(),
            anchors: HashMap::new(),
            expanded: 0,
            root: None,
            error: None,
        }
    }

    fn finish(self) -> Result<Node> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if !self.stack.is_empty() {
            return Err(Error::InvalidStructure("unterminated collection".into()));
        }
        Ok(self.root.unwrap_or_else(|| Node::null(Span::new(0, 0))))
    }

    fn fail(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(Error::InvalidStructure(message.into()));
        }
    }

    /// Attach a finished node to its parent. `key_text` is the raw scalar
    /// text, used when the node turns out to be a mapping key.
    fn push_complete(&mut self, mut node: Node, key_text: Option<String>) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some((key, key_span)) => {
                    // `key:` with no value: anchor the empty null at the key.
                    if matches!(node.value, Value::Null) && node.span.is_empty() {
                        node.span = Span::new(key_span.end, key_span.end);
                    }
                    entries.push(Entry {
                        key,
                        key_span,
                        value: node,
                    });
                }
                None => {
                    let key = key_text
                        .or_else(|| node.scalar_text())
                        .unwrap_or_default();
                    *pending_key = Some((key, node.span));
                }
            },
        }
    }

    fn remember(&mut self, anchor: usize, node: &Node) {
        if anchor > 0 {
            self.anchors.insert(anchor, (node.clone(), node_count(node)));
        }
    }

    fn on_scalar(&mut self, value: String, style: TScalarStyle, anchor: usize, tag: Option<Tag>, marker: Marker) {
        let start = self.offsets.byte(marker.index());
        let end = scalar_end(self.source, start, style, &value);

        let is_str_tag = tag.as_ref().is_some_and(|t| t.suffix == "str");
        let parsed = if matches!(style, TScalarStyle::Plain) && !is_str_tag {
            infer_plain(&value)
        } else {
            Value::String(value.clone())
        };

        let node = Node::new(parsed, Span::new(start, end));
        self.remember(anchor, &node);
        self.push_complete(node, Some(value));
    }

    fn on_alias(&mut self, anchor: usize, marker: Marker) {
        let Some((anchored, size)) = self.anchors.get(&anchor) else {
            self.fail("alias refers to an unknown anchor");
            return;
        };
        self.expanded = self.expanded.saturating_add(*size);
        if self.expanded > ALIAS_EXPANSION_LIMIT {
            self.fail(format!("alias expansion exceeds {ALIAS_EXPANSION_LIMIT} nodes"));
            return;
        }
        let mut node = anchored.clone();
        let start = self.offsets.byte(marker.index());
        let name_len = self.source[start..]
            .char_indices()
            .skip(1)
            .find(|(_, ch)| ch.is_whitespace() || matches!(ch, ',' | ']' | '}'))
            .map_or(self.source.len() - start, |(idx, _)| idx);
        node.span = Span::new(start, start + name_len);
        self.push_complete(node, None);
    }

    fn close_collection(&mut self, marker: Marker, sequence: bool) {
        let frame = self.stack.pop();
        let marker_offset = self.offsets.byte(marker.index());
        let node_and_anchor = match frame {
            Some(Frame::Sequence {
                start,
                anchor,
                items,
            }) if sequence => {
                let last = items.last().map(|n| n.span.end);
                let end = collection_end(self.source, start, last, marker_offset);
                (Node::new(Value::Sequence(items), Span::new(start, end)), anchor)
            }
            Some(Frame::Mapping {
                start,
                anchor,
                entries,
                pending_key: None,
            }) if !sequence => {
                let last = entries.last().map(|e| e.span().end);
                let end = collection_end(self.source, start, last, marker_offset);
                (Node::new(Value::Mapping(entries), Span::new(start, end)), anchor)
            }
            _ => {
                self.fail("mismatched collection end");
                return;
            }
        };
        let (node, anchor) = node_and_anchor;
        self.remember(anchor, &node);
        self.push_complete(node, None);
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }
        match ev {
            Event::Scalar(value, style, anchor, tag) => {
                self.on_scalar(value, style, anchor, tag, marker);
            }
            Event::SequenceStart(anchor, _tag) => {
                self.stack.push(Frame::Sequence {
                    start: self.offsets.byte(marker.index()),
                    anchor,
                    items: Vec::new(),
                });
            }
            Event::SequenceEnd => self.close_collection(marker, true),
            Event::MappingStart(anchor, _tag) => {
                self.stack.push(Frame::Mapping {
                    start: self.offsets.byte(marker.index()),
                    anchor,
                    entries: Vec::new(),
                    pending_key: None,
                });
            }
            Event::MappingEnd => self.close_collection(marker, false),
            Event::Alias(anchor) => self.on_alias(anchor, marker),
            _ => {}
        }
    }
}

fn node_count(node: &Node) -> usize {
    match &node.value {
        Value::Sequence(items) => 1 + items.iter().map(node_count).sum::<usize>(),
        Value::Mapping(entries) => {
            1 + entries
                .iter()
                .map(|entry| 1 + node_count(&entry.value))
                .sum::<usize>()
        }
        _ => 1,
    }
}

/// End offset of a scalar that starts at `start`.
fn scalar_end(source: &str, start: usize, style: TScalarStyle, value: &str) -> usize {
    let rest = &source[start..];
    let bytes = rest.as_bytes();
    match style {
        TScalarStyle::SingleQuoted => {
            let mut i = 1;
            while i < bytes.len() {
                if bytes[i] == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                        continue;
                    }
                    return start + i + 1;
                }
                i += 1;
            }
            source.len()
        }
        TScalarStyle::DoubleQuoted => {
            let mut i = 1;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    b'"' => return start + i + 1,
                    _ => i += 1,
                }
            }
            source.len()
        }
        TScalarStyle::Literal | TScalarStyle::Folded => block_scalar_end(source, start),
        _ => {
            // yaml-rust2 reports a missing value as a plain "~" at the next token.
            if value == "~" && !rest.starts_with('~') {
                return start;
            }
            if rest.starts_with(value) {
                return start + value.len();
            }
            // Multi-line plain scalar: settle for the first line.
            let line = &rest[..rest.find('\n').unwrap_or(rest.len())];
            let line = line.find(" #").map_or(line, |idx| &line[..idx]);
            start + line.trim_end().len()
        }
    }
}

/// A block scalar owns every following line that is blank or indented deeper
/// than the line holding its `|` / `>` indicator.
fn block_scalar_end(source: &str, start: usize) -> usize {
    let line_start = source[..start].rfind('\n').map_or(0, |idx| idx + 1);
    let indent = indentation(&source[line_start..]);

    let mut end = start + source[start..].find('\n').unwrap_or(source.len() - start);
    let mut cursor = end;
    while cursor < source.len() {
        let next_start = cursor + 1;
        let line_len = source[next_start..]
            .find('\n')
            .unwrap_or(source.len() - next_start);
        let line = &source[next_start..next_start + line_len];
        if line.trim().is_empty() {
            cursor = next_start + line_len;
            continue;
        }
        if indentation(line) <= indent {
            break;
        }
        end = next_start + line.trim_end().len();
        cursor = next_start + line_len;
    }
    end
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// End of a collection. Flow collections end after their closing bracket;
/// block collections end with their last child.
fn collection_end(source: &str, start: usize, last_child_end: Option<usize>, marker_offset: usize) -> usize {
    let close = match source.as_bytes().get(start) {
        Some(b'{') => Some('}'),
        Some(b'[') => Some(']'),
        _ => None,
    };
    match close {
        Some(close) => {
            let from = last_child_end.unwrap_or(start + 1);
            source[from..]
                .find(close)
                .map_or(marker_offset.max(from), |idx| from + idx + 1)
        }
        None => last_child_end.unwrap_or(start),
    }
}

/// Type inference for plain scalars, following the YAML 1.2 core schema.
fn infer_plain(value: &str) -> Value {
    match value {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
        "true" | "True" | "TRUE" => return Value::Bool(true),
        "false" | "False" | "FALSE" => return Value::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return Value::Float(f64::INFINITY);
        }
        "-.inf" | "-.Inf" | "-.INF" => return Value::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return Value::Float(f64::NAN),
        _ => {}
    }

    if let Ok(i) = value.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Some(hex) = value.strip_prefix("0x") {
        if let Ok(i) = i64::from_str_radix(hex, 16) {
            return Value::Integer(i);
        }
    }
    if let Some(oct) = value.strip_prefix("0o") {
        if let Ok(i) = i64::from_str_radix(oct, 8) {
            return Value::Integer(i);
        }
    }

    let numeric_start = value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
    let only_numeric_chars = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
    if numeric_start && only_numeric_chars && value.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(f) = value.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(value.to_string())
}
