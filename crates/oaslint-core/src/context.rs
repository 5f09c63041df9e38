/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Project contexts: the documents reachable from a set of roots.
 */

//! Project context building.
//!
//! A [`ProjectContext`] owns every document reachable from its roots through
//! `$ref`, together with the reference graph, the resolver and the project
//! index built over them. Contexts are immutable; an edit produces a new
//! context with a higher version via [`ProjectContext::with_document`].
//!
//! Loading proceeds in waves. Wave 0 is the roots; each wave reads all of its
//! documents concurrently, scans them for references, and queues the targets
//! that were never seen before. A document that cannot be read is recorded as
//! a load failure and does not stop the build.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use oaslint_system_runtime::{FileSystem, RuntimeResult, Uri, UriResolver};
use serde::Serialize;

use crate::cache::ProjectContextCache;
use crate::document::{ClassifierPolicy, DocumentMap, ParsedDocument, load_document};
use crate::error::{CacheBuildError, LoadError};
use crate::graph::{RefGraph, build_ref_graph, ref_sites};
use crate::index::{IndexKey, ProjectIndex, build_index};
use crate::locate;
use crate::resolver::{Resolver, split_reference};
use crate::types::Range;

/// Source of context versions. Clones share one sequence, which starts at 1.
#[derive(Debug, Clone, Default)]
pub struct VersionCounter(Arc<AtomicU64>);

impl VersionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Options for building contexts.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub classifier: ClassifierPolicy,
    /// Versions of the built context and of every context derived from it.
    pub versions: VersionCounter,
}

/// Every document reachable from a set of roots, with the derived graph and
/// index.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    roots: Vec<Uri>,
    documents: DocumentMap,
    load_failures: BTreeMap<Uri, LoadError>,
    /// Documents each document references, resolved or not.
    links: BTreeMap<Uri, BTreeSet<Uri>>,
    graph: Arc<RefGraph>,
    resolver: Arc<Resolver>,
    index: Arc<ProjectIndex>,
    version: u64,
    versions: VersionCounter,
}

/// Build the context of a single root.
pub async fn build_project_context_for_root(
    root: &Uri,
    fs: Arc<dyn FileSystem>,
    options: ContextOptions,
) -> ProjectContext {
    build_project_context(std::slice::from_ref(root), fs, options).await
}

/// Build one context holding everything reachable from all of `roots`.
pub async fn build_project_context(
    roots: &[Uri],
    fs: Arc<dyn FileSystem>,
    options: ContextOptions,
) -> ProjectContext {
    let uri_resolver: Arc<dyn UriResolver> = Arc::new(Arc::clone(&fs));

    let mut roots: Vec<Uri> = roots.to_vec();
    roots.sort();
    roots.dedup();

    let mut documents = DocumentMap::new();
    let mut load_failures = BTreeMap::new();
    let mut links = BTreeMap::new();
    let mut known: BTreeSet<Uri> = roots.iter().cloned().collect();
    let mut pending: Vec<Uri> = roots.clone();
    let mut wave = 0usize;

    while !pending.is_empty() {
        tracing::debug!(wave, documents = pending.len(), "loading wave");
        let results = join_all(
            pending
                .iter()
                .map(|uri| load_document(fs.as_ref(), uri, options.classifier)),
        )
        .await;

        let mut next = Vec::new();
        for (uri, result) in pending.iter().zip(results) {
            match result {
                Ok(doc) => {
                    let targets = linked_documents(&doc, uri_resolver.as_ref());
                    next.extend(targets.iter().filter(|t| known.insert((*t).clone())).cloned());
                    links.insert(uri.clone(), targets);
                    documents.insert(uri.clone(), Arc::new(doc));
                }
                Err(err) => {
                    tracing::warn!(uri = %uri, error = %err, "failed to load document");
                    load_failures.insert(uri.clone(), err);
                }
            }
        }
        pending = next;
        wave += 1;
    }

    ProjectContext::assemble(roots, documents, load_failures, links, uri_resolver, options.versions)
}

/// URIs of the documents `doc` references. References that cannot be
/// turned into a URI are left to the graph to report.
fn linked_documents(doc: &ParsedDocument, uri_resolver: &dyn UriResolver) -> BTreeSet<Uri> {
    ref_sites(doc)
        .iter()
        .filter_map(|site| {
            let (document, _) = split_reference(&site.reference).ok()?;
            if document.is_empty() {
                Some(doc.uri.clone())
            } else {
                uri_resolver.resolve(&doc.uri, document).ok()
            }
        })
        .collect()
}

impl ProjectContext {
    fn assemble(
        roots: Vec<Uri>,
        documents: DocumentMap,
        load_failures: BTreeMap<Uri, LoadError>,
        links: BTreeMap<Uri, BTreeSet<Uri>>,
        uri_resolver: Arc<dyn UriResolver>,
        versions: VersionCounter,
    ) -> Self {
        let (graph, resolver) = build_ref_graph(&documents, uri_resolver);
        let index = build_index(&documents, &graph, &resolver);
        let version = versions.issue();
        tracing::debug!(
            roots = roots.len(),
            documents = documents.len(),
            failures = load_failures.len(),
            version,
            "built project context"
        );
        Self {
            roots,
            documents,
            load_failures,
            links,
            graph: Arc::new(graph),
            resolver: Arc::new(resolver),
            index: Arc::new(index),
            version,
            versions,
        }
    }

    pub fn roots(&self) -> &[Uri] {
        &self.roots
    }

    pub fn documents(&self) -> &DocumentMap {
        &self.documents
    }

    pub fn document(&self, uri: &Uri) -> Option<&Arc<ParsedDocument>> {
        self.documents.get(uri)
    }

    pub fn load_failures(&self) -> &BTreeMap<Uri, LoadError> {
        &self.load_failures
    }

    pub fn load_failure(&self, uri: &Uri) -> Option<&LoadError> {
        self.load_failures.get(uri)
    }

    /// Whether `uri` was part of the build, loaded or not.
    pub fn contains(&self, uri: &Uri) -> bool {
        self.documents.contains_key(uri) || self.load_failures.contains_key(uri)
    }

    pub fn graph(&self) -> &RefGraph {
        &self.graph
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn index(&self) -> &ProjectIndex {
        &self.index
    }

    /// Increases across every context drawn from the same
    /// [`VersionCounter`], including those made by `with_document`.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Loaded documents reachable from `roots` through references, the
    /// loaded roots included.
    pub fn reachable_from(&self, roots: &[Uri]) -> BTreeSet<Uri> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&Uri> = roots.iter().collect();
        while let Some(uri) = queue.pop_front() {
            if !self.documents.contains_key(uri) || !seen.insert(uri.clone()) {
                continue;
            }
            if let Some(targets) = self.links.get(uri) {
                queue.extend(targets);
            }
        }
        seen
    }

    pub fn locate(&self, uri: &Uri, pointer: &str) -> Option<Range> {
        locate::locate(self.document(uri)?, pointer)
    }

    pub fn locate_key(&self, uri: &Uri, pointer: &str) -> Option<Range> {
        locate::locate_key(self.document(uri)?, pointer)
    }

    pub fn offset_to_range(&self, uri: &Uri, start: usize, end: usize) -> Option<Range> {
        locate::offset_to_range(self.document(uri)?, start, end)
    }

    /// A new context with `doc` replacing (or adding) one document.
    ///
    /// References the new text adds to documents outside this context are
    /// not loaded; they show up as unresolved until the next full build.
    pub fn with_document(&self, doc: ParsedDocument) -> ProjectContext {
        self.with_document_changes(doc).0
    }

    /// Like [`with_document`](Self::with_document), also returning the index
    /// lookups whose results changed.
    pub fn with_document_changes(&self, doc: ParsedDocument) -> (ProjectContext, BTreeSet<IndexKey>) {
        let uri = doc.uri.clone();
        let uri_resolver = Arc::clone(self.resolver.uri_resolver());

        let mut links = self.links.clone();
        links.insert(uri.clone(), linked_documents(&doc, uri_resolver.as_ref()));
        let mut documents = self.documents.clone();
        documents.insert(uri.clone(), Arc::new(doc));
        let mut load_failures = self.load_failures.clone();
        load_failures.remove(&uri);

        let (graph, resolver) = build_ref_graph(&documents, uri_resolver);
        let mut index = ProjectIndex::clone(&self.index);
        let changed = index.update_for_uri(&documents, &graph, &resolver, &uri);

        let version = self.versions.issue();
        tracing::debug!(uri = %uri, version, changed = changed.len(), "replaced document in project context");
        let context = ProjectContext {
            roots: self.roots.clone(),
            documents,
            load_failures,
            links,
            graph: Arc::new(graph),
            resolver: Arc::new(resolver),
            index: Arc::new(index),
            version,
            versions: self.versions.clone(),
        };
        (context, changed)
    }
}

/// One isolated context per root.
#[derive(Debug, Clone, Default)]
pub struct MultiRootContexts {
    contexts: BTreeMap<Uri, Arc<ProjectContext>>,
}

impl MultiRootContexts {
    pub fn get(&self, root: &Uri) -> Option<&Arc<ProjectContext>> {
        self.contexts.get(root)
    }

    pub fn roots(&self) -> impl Iterator<Item = &Uri> {
        self.contexts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uri, &Arc<ProjectContext>)> {
        self.contexts.iter()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Build a separate context for each root, concurrently. With a cache,
/// existing contexts are reused, new ones are stored, and versions come
/// from the cache's counter.
///
/// # Errors
///
/// Only a failing cache build is an error; unreadable roots produce a
/// context with a recorded load failure.
pub async fn resolve_multiple_roots(
    roots: &[Uri],
    fs: Arc<dyn FileSystem>,
    cache: Option<&ProjectContextCache>,
    options: ContextOptions,
) -> Result<MultiRootContexts, CacheBuildError> {
    let options = match cache {
        Some(cache) => ContextOptions {
            versions: cache.versions().clone(),
            ..options
        },
        None => options,
    };
    let unique: BTreeSet<&Uri> = roots.iter().collect();
    let builds = unique.into_iter().map(|root| {
        let fs = Arc::clone(&fs);
        let options = options.clone();
        async move {
            let context = match cache {
                Some(cache) => {
                    cache
                        .get_or_build(root, fs, |root, fs| async move {
                            Ok(build_project_context_for_root(&root, fs, options).await)
                        })
                        .await?
                }
                None => Arc::new(build_project_context_for_root(root, fs, options).await),
            };
            Ok::<_, CacheBuildError>((root.clone(), context))
        }
    });

    let contexts = join_all(builds)
        .await
        .into_iter()
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(MultiRootContexts { contexts })
}

/// A non-root document pulled in by more than one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedDocument {
    pub uri: Uri,
    pub roots: Vec<Uri>,
}

/// Documents that two or more roots reference, in URI order.
pub fn find_shared_schemas(contexts: &MultiRootContexts) -> Vec<SharedDocument> {
    let mut owners: BTreeMap<&Uri, Vec<Uri>> = BTreeMap::new();
    for (root, context) in contexts.iter() {
        for uri in context.documents().keys() {
            if !context.roots().contains(uri) {
                owners.entry(uri).or_default().push(root.clone());
            }
        }
    }
    owners
        .into_iter()
        .filter(|(_, roots)| roots.len() > 1)
        .map(|(uri, roots)| SharedDocument {
            uri: uri.clone(),
            roots,
        })
        .collect()
}

/// Glob for candidate files and keep the ones that are root documents.
///
/// # Errors
///
/// A malformed glob pattern. Files that cannot be read are skipped.
pub async fn discover_roots(
    fs: &dyn FileSystem,
    patterns: &[String],
    policy: ClassifierPolicy,
) -> RuntimeResult<Vec<Uri>> {
    let candidates = fs.glob(patterns).await?;
    let loaded = join_all(candidates.iter().map(|uri| load_document(fs, uri, policy))).await;
    let roots: Vec<Uri> = loaded
        .into_iter()
        .filter_map(Result::ok)
        .filter(|doc| doc.kind.is_root())
        .map(|doc| doc.uri)
        .collect();
    tracing::debug!(candidates = candidates.len(), roots = roots.len(), "discovered root documents");
    Ok(roots)
}
