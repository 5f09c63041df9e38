//! `$ref` dereferencing.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use oaslint_system_runtime::{Uri, UriResolver};
use oaslint_yaml::Node;

use crate::document::{DocumentMap, ParsedDocument};
use crate::error::ResolutionError;

/// Longest `$ref` chain [`Resolver::follow`] walks before giving up.
pub const MAX_REF_HOPS: usize = 64;

/// Split a `$ref` into its document part and its decoded JSON Pointer.
///
/// An empty document part means "the referencing document". A missing or
/// empty fragment addresses the whole document.
///
/// # Errors
///
/// [`ResolutionError::InvalidReference`] for an empty reference, a fragment
/// that is not a JSON Pointer (plain-name anchors are not supported), or a
/// fragment that does not percent-decode to UTF-8.
pub fn split_reference(reference: &str) -> Result<(&str, String), ResolutionError> {
    let invalid = |reason: &str| ResolutionError::InvalidReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    };

    if reference.trim().is_empty() {
        return Err(invalid("empty reference"));
    }

    let (document, fragment) = reference.split_once('#').unwrap_or((reference, ""));
    let pointer = urlencoding::decode(fragment)
        .map_err(|_| invalid("fragment is not valid percent-encoded UTF-8"))?;
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(invalid("fragment is not a JSON Pointer"));
    }
    Ok((document.trim(), pointer.into_owned()))
}

/// A dereferenced location.
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    pub uri: Uri,
    pub pointer: String,
    pub document: &'a ParsedDocument,
    pub node: &'a Node,
}

/// Dereferences `$ref` strings against the loaded documents of one context.
///
/// Cross-document references are turned into URIs by the injected
/// [`UriResolver`]; documents are never loaded here.
#[derive(Clone)]
pub struct Resolver {
    documents: DocumentMap,
    uri_resolver: Arc<dyn UriResolver>,
}

impl Resolver {
    pub fn new(documents: DocumentMap, uri_resolver: Arc<dyn UriResolver>) -> Self {
        Self {
            documents,
            uri_resolver,
        }
    }

    pub fn documents(&self) -> &DocumentMap {
        &self.documents
    }

    pub fn document(&self, uri: &Uri) -> Option<&Arc<ParsedDocument>> {
        self.documents.get(uri)
    }

    pub fn uri_resolver(&self) -> &Arc<dyn UriResolver> {
        &self.uri_resolver
    }

    /// The (uri, pointer) a reference addresses, without checking that it
    /// exists.
    pub fn target(&self, origin: &Uri, reference: &str) -> Result<(Uri, String), ResolutionError> {
        let (document, pointer) = split_reference(reference)?;
        let uri = if document.is_empty() {
            origin.clone()
        } else {
            self.uri_resolver
                .resolve(origin, document)
                .map_err(|err| ResolutionError::InvalidReference {
                    reference: reference.to_string(),
                    reason: err.to_string(),
                })?
        };
        Ok((uri, pointer))
    }

    /// Dereference one reference relative to `origin`. A `$ref` found at the
    /// target is not followed.
    pub fn deref(&self, origin: &Uri, reference: &str) -> Result<Resolved<'_>, ResolutionError> {
        let (uri, pointer) = self.target(origin, reference)?;
        self.lookup(uri, pointer)
    }

    /// Look up `uri#pointer` and keep dereferencing while the node found is
    /// a reference object.
    ///
    /// # Errors
    ///
    /// Any lookup failure along the chain, [`ResolutionError::Cycle`] when a
    /// location repeats, and [`ResolutionError::TooManyHops`] past
    /// [`MAX_REF_HOPS`].
    pub fn follow(&self, uri: &Uri, pointer: &str) -> Result<Resolved<'_>, ResolutionError> {
        let mut current = self.lookup(uri.clone(), pointer.to_string())?;
        let mut seen = HashSet::new();
        seen.insert((uri.clone(), pointer.to_string()));

        for _ in 0..MAX_REF_HOPS {
            let Some(reference) = current.node.ref_target() else {
                return Ok(current);
            };
            let (next_uri, next_pointer) = self.target(&current.uri, reference)?;
            tracing::trace!(from = %current.uri, to = %next_uri, pointer = %next_pointer, "following $ref");
            if !seen.insert((next_uri.clone(), next_pointer.clone())) {
                return Err(ResolutionError::Cycle {
                    uri: next_uri,
                    pointer: next_pointer,
                });
            }
            current = self.lookup(next_uri, next_pointer)?;
        }
        Err(ResolutionError::TooManyHops(MAX_REF_HOPS))
    }

    fn lookup(&self, uri: Uri, pointer: String) -> Result<Resolved<'_>, ResolutionError> {
        let document = self
            .documents
            .get(&uri)
            .ok_or_else(|| ResolutionError::DocumentNotLoaded(uri.clone()))?;
        let root = document
            .root
            .as_ref()
            .ok_or_else(|| ResolutionError::DocumentUnparsed(uri.clone()))?;
        let node = root
            .pointer(&pointer)
            .ok_or_else(|| ResolutionError::PointerNotFound {
                uri: uri.clone(),
                pointer: pointer.clone(),
            })?;
        Ok(Resolved {
            uri,
            pointer,
            document,
            node,
        })
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("documents", &self.documents.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
