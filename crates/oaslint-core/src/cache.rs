/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Shared cache of project contexts keyed by root.
 */

//! Project context cache.
//!
//! One entry per normalized root URI. Concurrent requests for the same root
//! share a single in-flight build; a failed build is reported to its caller
//! and leaves the entry empty.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use oaslint_system_runtime::{FileSystem, Uri};
use tokio::sync::OnceCell;

use crate::context::{ProjectContext, VersionCounter};
use crate::error::CacheBuildError;

type Slot = Arc<OnceCell<Arc<ProjectContext>>>;

#[derive(Debug, Default)]
pub struct ProjectContextCache {
    entries: Mutex<HashMap<Uri, Slot>>,
    versions: VersionCounter,
}

impl ProjectContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached context of `root`, building it with `builder` when absent.
    ///
    /// # Errors
    ///
    /// Whatever `builder` returns. Other callers waiting on the same root
    /// retry with their own builder.
    pub async fn get_or_build<F, Fut>(
        &self,
        root: &Uri,
        fs: Arc<dyn FileSystem>,
        builder: F,
    ) -> Result<Arc<ProjectContext>, CacheBuildError>
    where
        F: FnOnce(Uri, Arc<dyn FileSystem>) -> Fut,
        Fut: Future<Output = Result<ProjectContext, CacheBuildError>>,
    {
        let slot = self.slot(root);
        if let Some(context) = slot.get() {
            tracing::debug!(root = %root, version = context.version(), "project context cache hit");
            return Ok(Arc::clone(context));
        }

        let context = slot
            .get_or_try_init(|| async {
                tracing::debug!(root = %root, "building project context");
                builder(root.clone(), fs).await.map(Arc::new)
            })
            .await
            .inspect_err(|err| tracing::warn!(root = %root, error = %err, "project context build failed"))?;
        Ok(Arc::clone(context))
    }

    /// Counter for contexts meant for this cache. `publish` compares
    /// versions, which is only meaningful within one counter.
    pub fn versions(&self) -> &VersionCounter {
        &self.versions
    }

    pub fn get(&self, root: &Uri) -> Option<Arc<ProjectContext>> {
        self.lock().get(root)?.get().cloned()
    }

    /// Drop the entry for `root`. A build still in flight completes for its
    /// callers but is not stored.
    pub fn invalidate(&self, root: &Uri) -> bool {
        self.lock().remove(root).is_some()
    }

    /// Drop every entry whose context includes `uri`. Returns the roots
    /// invalidated, sorted.
    pub fn invalidate_uri(&self, uri: &Uri) -> Vec<Uri> {
        let mut entries = self.lock();
        let mut stale: Vec<Uri> = entries
            .iter()
            .filter(|(root, slot)| {
                *root == uri || slot.get().is_some_and(|context| context.contains(uri))
            })
            .map(|(root, _)| root.clone())
            .collect();
        stale.sort();
        for root in &stale {
            entries.remove(root);
        }
        if !stale.is_empty() {
            tracing::debug!(uri = %uri, roots = stale.len(), "invalidated project contexts");
        }
        stale
    }

    /// Drop everything, e.g. after a configuration reload.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Store a context built elsewhere, unless a newer one is already
    /// cached for `root`. Returns whether it was stored.
    pub fn publish(&self, root: &Uri, context: Arc<ProjectContext>) -> bool {
        let mut entries = self.lock();
        if let Some(current) = entries.get(root).and_then(|slot| slot.get()) {
            if current.version() >= context.version() {
                tracing::debug!(
                    root = %root,
                    cached = current.version(),
                    offered = context.version(),
                    "ignoring stale project context"
                );
                return false;
            }
        }
        entries.insert(root.clone(), Arc::new(OnceCell::from(context)));
        true
    }

    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, root: &Uri) -> Slot {
        Arc::clone(self.lock().entry(root.clone()).or_default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uri, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextOptions, build_project_context_for_root};
    use oaslint_system_runtime::MemoryFileSystem;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    fn fs() -> Arc<dyn FileSystem> {
        let fs = MemoryFileSystem::new()
            .with_file("file:///api.yaml", "openapi: 3.0.0\ncomponents:\n  schemas:\n    A:\n      $ref: './a.yaml'\n")
            .unwrap()
            .with_file("file:///a.yaml", "type: string\n")
            .unwrap();
        Arc::new(fs)
    }

    async fn build(root: Uri, fs: Arc<dyn FileSystem>) -> Result<ProjectContext, CacheBuildError> {
        Ok(build_project_context_for_root(&root, fs, ContextOptions::default()).await)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight() {
        let cache = Arc::new(ProjectContextCache::new());
        let builds = Arc::new(AtomicUsize::new(0));
        let root = uri("file:///api.yaml");
        let fs = fs();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let builds = Arc::clone(&builds);
                let root = root.clone();
                let fs = Arc::clone(&fs);
                tokio::spawn(async move {
                    cache
                        .get_or_build(&root, fs, |root, fs| async move {
                            builds.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            build(root, fs).await
                        })
                        .await
                        .map(|ctx| ctx.version())
                })
            })
            .collect();

        let mut versions = Vec::new();
        for task in tasks {
            versions.push(task.await.unwrap().unwrap());
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(versions.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_failed_build_leaves_entry_empty() {
        let cache = ProjectContextCache::new();
        let root = uri("file:///api.yaml");

        let err = cache
            .get_or_build(&root, fs(), |root, _| async move {
                Err(CacheBuildError {
                    root,
                    message: "boom".into(),
                })
            })
            .await
            .unwrap_err();
        assert_eq!(err.message, "boom");
        assert!(cache.get(&root).is_none());

        let ctx = cache.get_or_build(&root, fs(), build).await.unwrap();
        assert_eq!(ctx.documents().len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_uri_drops_dependent_roots() {
        let cache = ProjectContextCache::new();
        let root = uri("file:///api.yaml");
        cache.get_or_build(&root, fs(), build).await.unwrap();

        assert!(cache.invalidate_uri(&uri("file:///other.yaml")).is_empty());
        assert_eq!(cache.invalidate_uri(&uri("file:///a.yaml")), vec![root.clone()]);
        assert!(cache.get(&root).is_none());
    }

    #[tokio::test]
    async fn test_publish_keeps_newest_version() {
        let cache = ProjectContextCache::new();
        let root = uri("file:///api.yaml");
        let options = ContextOptions {
            versions: cache.versions().clone(),
            ..ContextOptions::default()
        };
        let older = Arc::new(build_project_context_for_root(&root, fs(), options.clone()).await);
        let newer = Arc::new(build_project_context_for_root(&root, fs(), options).await);
        assert!(newer.version() > older.version());

        assert!(cache.publish(&root, Arc::clone(&newer)));
        assert!(!cache.publish(&root, older));
        assert_eq!(cache.get(&root).unwrap().version(), newer.version());

        cache.clear();
        assert!(cache.is_empty());
    }
}
