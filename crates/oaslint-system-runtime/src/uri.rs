/*
 * uri.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Normalized document URIs.
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RuntimeError, RuntimeResult};

/// A normalized document address.
///
/// Normalization strips the fragment and query, lowercases the scheme and
/// host, and resolves `.`/`..` path segments, so two spellings of the same
/// document compare equal and hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uri(String);

/// Normalize a URI string, see [`Uri`].
///
/// ```rust
/// use oaslint_system_runtime::normalize_uri;
///
/// let a = normalize_uri("file:///a.yaml#/paths").unwrap();
/// let b = normalize_uri("file:///a.yaml?x=1").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "file:///a.yaml");
/// ```
pub fn normalize_uri(input: &str) -> RuntimeResult<Uri> {
    Uri::parse(input)
}

impl Uri {
    /// Parse an absolute URI or an absolute file path.
    pub fn parse(input: &str) -> RuntimeResult<Uri> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RuntimeError::invalid_uri(input, "empty URI"));
        }

        // Single letter schemes are Windows drive letters, not URIs.
        match Url::parse(trimmed) {
            Ok(url) if url.scheme().len() > 1 => return Ok(Self::from_url(url)),
            _ => {}
        }

        let path_part = trimmed.split(['#', '?']).next().unwrap_or(trimmed);
        let path = Path::new(path_part);
        if path.is_absolute() {
            Self::from_file_path(path)
        } else {
            Err(RuntimeError::invalid_uri(
                input,
                "relative reference without a base",
            ))
        }
    }

    /// Build a `file:` URI from an absolute path.
    pub fn from_file_path(path: impl AsRef<Path>) -> RuntimeResult<Uri> {
        let path = path.as_ref();
        let url = Url::from_file_path(path)
            .map_err(|()| RuntimeError::invalid_uri(path.display().to_string(), "not an absolute path"))?;
        // from_file_path keeps `..` segments verbatim; reparsing collapses them.
        let url = Url::parse(url.as_str())
            .map_err(|err| RuntimeError::invalid_uri(path.display().to_string(), err))?;
        Ok(Self::from_url(url))
    }

    /// Strip the parts of a parsed URL that never identify a document.
    pub fn from_url(mut url: Url) -> Uri {
        url.set_fragment(None);
        url.set_query(None);
        Uri(url.into())
    }

    /// Resolve `reference` relative to this URI, RFC 3986 style.
    ///
    /// The fragment of `reference` is discarded; callers that need the JSON
    /// Pointer part must split it off first.
    pub fn join(&self, reference: &str) -> RuntimeResult<Uri> {
        let base = self.to_url()?;
        let joined = base
            .join(reference.trim())
            .map_err(|err| RuntimeError::invalid_uri(reference, err))?;
        Ok(Self::from_url(joined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_url(&self) -> RuntimeResult<Url> {
        Url::parse(&self.0).map_err(|err| RuntimeError::invalid_uri(self.0.clone(), err))
    }

    /// Local path for `file:` URIs.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        self.to_url().ok()?.to_file_path().ok()
    }

    /// Last path segment, percent-encoded as in the URI.
    pub fn file_name(&self) -> Option<&str> {
        let path = self.0.split_once("://").map_or(self.0.as_str(), |(_, rest)| rest);
        path.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Lowercased extension of the last path segment.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name()?.rsplit_once('.')?;
        (!stem.is_empty()).then(|| ext.to_ascii_lowercase())
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Uri {
    type Err = RuntimeError;

    fn from_str(s: &str) -> RuntimeResult<Uri> {
        Uri::parse(s)
    }
}

impl TryFrom<String> for Uri {
    type Error = RuntimeError;

    fn try_from(value: String) -> RuntimeResult<Uri> {
        Uri::parse(&value)
    }
}

impl From<Uri> for String {
    fn from(uri: Uri) -> String {
        uri.0
    }
}

impl PartialEq<str> for Uri {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Uri {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_and_query_are_stripped() {
        let a = normalize_uri("file:///a.yaml#/paths").unwrap();
        let b = normalize_uri("file:///a.yaml?x=1").unwrap();
        assert_eq!(a, "file:///a.yaml");
        assert_eq!(b, "file:///a.yaml");
    }

    #[test]
    fn test_scheme_and_dot_segments_are_canonical() {
        let uri = normalize_uri("FILE:///specs/./paths/../api.yaml").unwrap();
        assert_eq!(uri, "file:///specs/api.yaml");

        let http = normalize_uri("HTTPS://Example.COM/api.json#x").unwrap();
        assert_eq!(http, "https://example.com/api.json");
    }

    #[test]
    fn test_join_relative_references() {
        let base = Uri::parse("file:///specs/paths/item.yaml").unwrap();
        assert_eq!(
            base.join("../parameters/path-id.yaml").unwrap(),
            "file:///specs/parameters/path-id.yaml"
        );
        assert_eq!(
            base.join("./other.yaml#/components").unwrap(),
            "file:///specs/paths/other.yaml"
        );
        assert_eq!(base.join("#/foo").unwrap(), base);
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_paths() {
        let uri = Uri::parse("/specs/sub/../api.yaml#/info").unwrap();
        assert_eq!(uri, "file:///specs/api.yaml");
        assert_eq!(uri.to_file_path(), Some(PathBuf::from("/specs/api.yaml")));
    }

    #[test]
    fn test_relative_path_is_rejected() {
        assert!(matches!(
            Uri::parse("api.yaml"),
            Err(RuntimeError::InvalidUri { .. })
        ));
        assert!(Uri::parse("  ").is_err());
    }

    #[test]
    fn test_file_name_and_extension() {
        let uri = Uri::parse("file:///specs/API.YML").unwrap();
        assert_eq!(uri.file_name(), Some("API.YML"));
        assert_eq!(uri.extension().as_deref(), Some("yml"));

        let dir = Uri::parse("file:///specs/").unwrap();
        assert_eq!(dir.extension(), None);
    }

    #[test]
    fn test_serde_roundtrip_normalizes() {
        let uri: Uri = serde_json::from_str("\"file:///a.yaml#frag\"").unwrap();
        assert_eq!(uri, "file:///a.yaml");
        assert_eq!(serde_json::to_string(&uri).unwrap(), "\"file:///a.yaml\"");
    }
}
