/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Defines the FileSystem and UriResolver traits consumed by the analysis
 * engine.
 *
 * The engine depends only on these abstractions:
 * - NativeFileSystem: local files via tokio, glob, notify
 * - MemoryFileSystem: in-memory documents for tests and editor overlays
 */

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::RuntimeResult;
use crate::uri::Uri;

/// The text of a document plus change-detection metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub text: String,
    /// Modification time in milliseconds since the Unix epoch, when known
    pub mtime_ms: Option<u64>,
    /// Content hash, "sha256:<hex-digest>"
    pub hash: String,
}

impl FileContent {
    pub fn new(text: impl Into<String>, mtime_ms: Option<u64>) -> Self {
        let text = text.into();
        let hash = content_hash(&text);
        Self {
            text,
            mtime_ms,
            hash,
        }
    }
}

/// Compute the SHA-256 hash of content, returning "sha256:<hex-digest>".
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    format!("sha256:{:x}", digest)
}

/// Callback invoked with the URI of a changed document.
pub type ChangeCallback = Arc<dyn Fn(&Uri) + Send + Sync>;

/// Keeps a watch subscription alive.
///
/// Dropping the handle unsubscribes; [`WatchHandle::unsubscribe`] does the
/// same explicitly.
pub struct WatchHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Turns a `$ref` string into the URI of the document it addresses.
pub trait UriResolver: Send + Sync {
    /// Resolve `reference` (with any fragment already removed or ignored)
    /// relative to the referencing document `from`.
    ///
    /// The default is RFC 3986 reference resolution.
    fn resolve(&self, from: &Uri, reference: &str) -> RuntimeResult<Uri> {
        from.join(reference)
    }
}

impl<T: UriResolver + ?Sized> UriResolver for Arc<T> {
    fn resolve(&self, from: &Uri, reference: &str) -> RuntimeResult<Uri> {
        (**self).resolve(from, reference)
    }
}

/// Plain RFC 3986 resolution with no remapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlResolver;

impl UriResolver for UrlResolver {}

/// Virtual file system consumed by the engine.
///
/// Implementations must be cheap to share: the context builder holds an
/// `Arc<dyn FileSystem>` and calls `read` concurrently within a wave.
#[async_trait]
pub trait FileSystem: UriResolver {
    /// Read a document.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotFound`](crate::RuntimeError::NotFound) when the
    /// document does not exist, other variants for I/O failures.
    async fn read(&self, uri: &Uri) -> RuntimeResult<FileContent>;

    /// Check whether a document exists.
    async fn exists(&self, uri: &Uri) -> bool;

    /// List documents matching any of the glob patterns, sorted and
    /// without duplicates.
    async fn glob(&self, patterns: &[String]) -> RuntimeResult<Vec<Uri>>;

    /// Call `on_change` whenever one of `uris` changes, until the returned
    /// handle is dropped.
    fn watch(&self, uris: &[Uri], on_change: ChangeCallback) -> RuntimeResult<WatchHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_content_hash() {
        let hash = content_hash("Hello, world!");
        assert_eq!(
            hash,
            "sha256:315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3"
        );
        assert_eq!(FileContent::new("Hello, world!", None).hash, hash);
    }

    #[test]
    fn test_watch_handle_cancels_once() {
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        let handle = WatchHandle::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        handle.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let c = count.clone();
        {
            let _handle = WatchHandle::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_default_resolver() {
        let from = Uri::parse("file:///specs/api.yaml").unwrap();
        let target = UrlResolver.resolve(&from, "./schemas/pet.yaml").unwrap();
        assert_eq!(target, "file:///specs/schemas/pet.yaml");
    }
}
