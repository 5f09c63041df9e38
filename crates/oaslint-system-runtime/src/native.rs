/*
 * native.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * FileSystem implementation backed by the local disk.
 */

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use notify::{EventKind, RecursiveMode, Watcher};

use crate::error::{RuntimeError, RuntimeResult};
use crate::traits::{ChangeCallback, FileContent, FileSystem, UriResolver, WatchHandle};
use crate::uri::Uri;

/// Local file system access through tokio.
///
/// Relative glob patterns are interpreted against `root` (the current
/// directory unless set with [`NativeFileSystem::with_root`]).
#[derive(Debug, Clone, Default)]
pub struct NativeFileSystem {
    root: Option<PathBuf>,
}

impl NativeFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_of(uri: &Uri) -> RuntimeResult<PathBuf> {
        uri.to_file_path()
            .ok_or_else(|| RuntimeError::NotSupported(format!("not a file URI: {uri}")))
    }

    fn absolute_pattern(&self, pattern: &str) -> String {
        let pattern = pattern.strip_prefix("file://").unwrap_or(pattern);
        match &self.root {
            Some(root) if !Path::new(pattern).is_absolute() => {
                root.join(pattern).to_string_lossy().into_owned()
            }
            _ => pattern.to_string(),
        }
    }
}

impl UriResolver for NativeFileSystem {}

#[async_trait]
impl FileSystem for NativeFileSystem {
    async fn read(&self, uri: &Uri) -> RuntimeResult<FileContent> {
        let path = Self::path_of(uri)?;
        let text = tokio::fs::read_to_string(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                RuntimeError::NotFound(uri.to_string())
            } else {
                RuntimeError::Io(err)
            }
        })?;

        let mtime_ms = tokio::fs::metadata(&path)
            .await
            .ok()
            .and_then(|meta| meta.modified().ok())
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .and_then(|elapsed| u64::try_from(elapsed.as_millis()).ok());

        tracing::trace!(uri = %uri, bytes = text.len(), "read document");
        Ok(FileContent::new(text, mtime_ms))
    }

    async fn exists(&self, uri: &Uri) -> bool {
        match Self::path_of(uri) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn glob(&self, patterns: &[String]) -> RuntimeResult<Vec<Uri>> {
        let mut found = BTreeSet::new();
        for pattern in patterns {
            let pattern = self.absolute_pattern(pattern);
            let paths =
                glob::glob(&pattern).map_err(|err| RuntimeError::Glob(err.to_string()))?;
            for entry in paths {
                match entry {
                    Ok(path) if path.is_file() => {
                        found.insert(Uri::from_file_path(&path)?);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping unreadable glob match");
                    }
                }
            }
        }
        Ok(found.into_iter().collect())
    }

    fn watch(&self, uris: &[Uri], on_change: ChangeCallback) -> RuntimeResult<WatchHandle> {
        let watched: BTreeSet<Uri> = uris.iter().cloned().collect();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "file watcher error");
                    return;
                }
            };
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            for path in &event.paths {
                if let Ok(uri) = Uri::from_file_path(path) {
                    if watched.contains(&uri) {
                        on_change(&uri);
                    }
                }
            }
        })
        .map_err(|err| RuntimeError::Watch(err.to_string()))?;

        for uri in uris {
            let path = Self::path_of(uri)?;
            watcher
                .watch(&path, RecursiveMode::NonRecursive)
                .map_err(|err| RuntimeError::Watch(format!("{}: {err}", path.display())))?;
        }

        Ok(WatchHandle::new(move || drop(watcher)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_existing_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.yaml");
        std::fs::write(&path, "openapi: 3.1.0\n").unwrap();

        let fs = NativeFileSystem::new();
        let uri = Uri::from_file_path(&path).unwrap();
        let content = fs.read(&uri).await.unwrap();
        assert_eq!(content.text, "openapi: 3.1.0\n");
        assert!(content.mtime_ms.is_some());
        assert!(fs.exists(&uri).await);

        let missing = Uri::from_file_path(dir.path().join("missing.yaml")).unwrap();
        assert!(fs.read(&missing).await.unwrap_err().is_not_found());
        assert!(!fs.exists(&missing).await);
    }

    #[tokio::test]
    async fn test_glob_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("paths")).unwrap();
        std::fs::write(dir.path().join("api.yaml"), "").unwrap();
        std::fs::write(dir.path().join("paths/item.yaml"), "").unwrap();
        std::fs::write(dir.path().join("readme.md"), "").unwrap();

        let fs = NativeFileSystem::with_root(dir.path());
        let found = fs.glob(&["**/*.yaml".to_string()]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.windows(2).all(|w| w[0] < w[1]));
        assert!(found.iter().all(|uri| uri.extension().as_deref() == Some("yaml")));
    }

    #[test]
    fn test_non_file_uri_is_not_supported() {
        let fs = NativeFileSystem::new();
        let uri = Uri::parse("https://example.com/api.yaml").unwrap();
        let err = fs.watch(&[uri], std::sync::Arc::new(|_: &Uri| {})).unwrap_err();
        assert!(matches!(err, RuntimeError::NotSupported(_)));
    }
}
