//! RFC 6901 JSON Pointer helpers.
//!
//! Pointers are plain strings: `""` addresses the root, every other pointer
//! starts with `/` and separates reference tokens with `/`. Within a token,
//! `~` is written `~0` and `/` is written `~1`.

use std::borrow::Cow;

/// Escape one reference token.
pub fn escape_token(token: &str) -> Cow<'_, str> {
    if token.contains(['~', '/']) {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Unescape one reference token.
pub fn unescape_token(token: &str) -> Cow<'_, str> {
    if token.contains('~') {
        Cow::Owned(token.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Split a pointer into its unescaped reference tokens.
///
/// Returns `None` when the pointer is not empty and does not start with `/`.
pub fn split_pointer(pointer: &str) -> Option<Vec<Cow<'_, str>>> {
    if pointer.is_empty() {
        return Some(Vec::new());
    }
    let rest = pointer.strip_prefix('/')?;
    Some(rest.split('/').map(unescape_token).collect())
}

/// Append one (unescaped) token to a pointer.
pub fn join_pointer(base: &str, token: &str) -> String {
    let token = escape_token(token);
    let mut out = String::with_capacity(base.len() + token.len() + 1);
    out.push_str(base);
    out.push('/');
    out.push_str(&token);
    out
}

/// The pointer of the parent node, or `None` for the root.
pub fn parent_pointer(pointer: &str) -> Option<&str> {
    pointer.rfind('/').map(|idx| &pointer[..idx])
}

/// The last (unescaped) token of a pointer, or `None` for the root.
pub fn last_token(pointer: &str) -> Option<Cow<'_, str>> {
    pointer.rfind('/').map(|idx| unescape_token(&pointer[idx + 1..]))
}

/// Whether `ancestor` addresses `pointer` itself or one of its ancestors.
pub fn contains(ancestor: &str, pointer: &str) -> bool {
    match pointer.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_path_templates() {
        assert_eq!(escape_token("/items/{id}"), "~1items~1{id}");
        assert_eq!(escape_token("a~b"), "a~0b");
        assert_eq!(unescape_token("~1items~1{id}"), "/items/{id}");
        // ~01 must decode to ~1, not to /
        assert_eq!(unescape_token("~01"), "~1");
    }

    #[test]
    fn splits_and_joins() {
        assert_eq!(split_pointer("").unwrap().len(), 0);
        assert!(split_pointer("paths").is_none());
        let tokens = split_pointer("/paths/~1pets/get").unwrap();
        assert_eq!(tokens, vec!["paths", "/pets", "get"]);
        assert_eq!(join_pointer("/paths", "/pets"), "/paths/~1pets");
        assert_eq!(join_pointer("", "openapi"), "/openapi");
    }

    #[test]
    fn parents_and_containment() {
        assert_eq!(parent_pointer("/a/b"), Some("/a"));
        assert_eq!(parent_pointer("/a"), Some(""));
        assert_eq!(parent_pointer(""), None);
        assert_eq!(last_token("/paths/~1pets").as_deref(), Some("/pets"));

        assert!(contains("", "/a"));
        assert!(contains("/a", "/a"));
        assert!(contains("/a", "/a/b"));
        assert!(!contains("/a", "/ab"));
        assert!(!contains("/a/b", "/a"));
    }
}
