/*
 * memory.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * In-memory file system for tests and unsaved editor buffers.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{RuntimeError, RuntimeResult};
use crate::traits::{ChangeCallback, FileContent, FileSystem, UriResolver, WatchHandle};
use crate::uri::Uri;

struct Subscription {
    id: u64,
    uris: BTreeSet<Uri>,
    on_change: ChangeCallback,
}

/// A [`FileSystem`] backed by a map from URI to text.
///
/// Every write bumps a logical clock that is reported as `mtime_ms`, and
/// notifies watchers of the written URI.
#[derive(Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<Uri, FileContent>>,
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
    clock: AtomicU64,
    next_subscription: AtomicU64,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryFileSystem::insert`] for fixtures.
    pub fn with_file(self, uri: &str, text: impl Into<String>) -> RuntimeResult<Self> {
        self.insert(uri, text)?;
        Ok(self)
    }

    /// Create or replace a document and notify its watchers.
    pub fn insert(&self, uri: &str, text: impl Into<String>) -> RuntimeResult<Uri> {
        let uri = Uri::parse(uri)?;
        let mtime = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.clone(), FileContent::new(text, Some(mtime)));
        self.notify(&uri);
        Ok(uri)
    }

    /// Delete a document. Returns whether it existed.
    pub fn remove(&self, uri: &Uri) -> bool {
        let removed = self
            .files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
            .is_some();
        if removed {
            self.notify(uri);
        }
        removed
    }

    pub fn uris(&self) -> Vec<Uri> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn notify(&self, uri: &Uri) {
        // Collect first so callbacks run without the lock held.
        let callbacks: Vec<ChangeCallback> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|sub| sub.uris.contains(uri))
            .map(|sub| sub.on_change.clone())
            .collect();
        for callback in callbacks {
            callback(uri);
        }
    }
}

impl UriResolver for MemoryFileSystem {}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read(&self, uri: &Uri) -> RuntimeResult<FileContent> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(uri.to_string()))
    }

    async fn exists(&self, uri: &Uri) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(uri)
    }

    async fn glob(&self, patterns: &[String]) -> RuntimeResult<Vec<Uri>> {
        let compiled = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.strip_prefix("file://").unwrap_or(pattern);
                glob::Pattern::new(pattern).map_err(|err| RuntimeError::Glob(err.to_string()))
            })
            .collect::<RuntimeResult<Vec<_>>>()?;

        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        // BTreeMap iteration is already sorted and unique.
        Ok(files
            .keys()
            .filter(|uri| {
                let path = uri.as_str().strip_prefix("file://").unwrap_or(uri.as_str());
                compiled.iter().any(|pattern| pattern.matches(path))
            })
            .cloned()
            .collect())
    }

    fn watch(&self, uris: &[Uri], on_change: ChangeCallback) -> RuntimeResult<WatchHandle> {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id,
                uris: uris.iter().cloned().collect(),
                on_change,
            });

        let subscriptions = Arc::clone(&self.subscriptions);
        Ok(WatchHandle::new(move || {
            subscriptions
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|sub| sub.id != id);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_read_and_exists() {
        let fs = MemoryFileSystem::new()
            .with_file("file:///specs/api.yaml", "openapi: 3.1.0\n")
            .unwrap();
        let uri = Uri::parse("file:///specs/api.yaml#/info").unwrap();

        let content = fs.read(&uri).await.unwrap();
        assert_eq!(content.text, "openapi: 3.1.0\n");
        assert_eq!(content.mtime_ms, Some(1));
        assert!(fs.exists(&uri).await);

        let missing = Uri::parse("file:///specs/missing.yaml").unwrap();
        let err = fs.read(&missing).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!fs.exists(&missing).await);
    }

    #[tokio::test]
    async fn test_glob_sorted() {
        let fs = MemoryFileSystem::new();
        fs.insert("file:///specs/b.yaml", "").unwrap();
        fs.insert("file:///specs/a.yaml", "").unwrap();
        fs.insert("file:///specs/notes.txt", "").unwrap();

        let found = fs
            .glob(&["/specs/*.yaml".to_string(), "file:///specs/a.*".to_string()])
            .await
            .unwrap();
        assert_eq!(found, vec!["file:///specs/a.yaml", "file:///specs/b.yaml"]);

        assert!(matches!(
            fs.glob(&["[".to_string()]).await,
            Err(RuntimeError::Glob(_))
        ));
    }

    #[test]
    fn test_watch_and_unsubscribe() {
        let fs = MemoryFileSystem::new();
        let uri = fs.insert("file:///api.yaml", "a: 1").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let handle = fs
            .watch(
                std::slice::from_ref(&uri),
                Arc::new(move |changed: &Uri| sink.lock().unwrap().push(changed.clone())),
            )
            .unwrap();

        fs.insert("file:///api.yaml", "a: 2").unwrap();
        fs.insert("file:///other.yaml", "b: 1").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);

        handle.unsubscribe();
        fs.insert("file:///api.yaml", "a: 3").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
