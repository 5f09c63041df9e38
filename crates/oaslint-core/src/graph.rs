//! The `$ref` dependency graph.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]; edges are index
//! pairs. A cyclic set of schemas is therefore plain data with no ownership
//! cycles, and cycle detection is a query.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use oaslint_system_runtime::{Uri, UriResolver};
use oaslint_yaml::pointer;
use serde::Serialize;

use crate::document::{DocumentMap, ParsedDocument};
use crate::error::ResolutionError;
use crate::resolver::Resolver;

/// A (uri, JSON Pointer) pair identifying one node of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GraphNode {
    pub uri: Uri,
    pub pointer: String,
}

impl GraphNode {
    pub fn new(uri: Uri, pointer: impl Into<String>) -> Self {
        Self {
            uri,
            pointer: pointer.into(),
        }
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.uri, self.pointer)
    }
}

/// Arena index of a [`GraphNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One resolved `$ref`: `from` is the reference object, `to` its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
}

/// A reference object found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefSite {
    pub uri: Uri,
    /// Pointer of the mapping that holds the `$ref` key.
    pub pointer: String,
    pub reference: String,
}

impl RefSite {
    pub fn node(&self) -> GraphNode {
        GraphNode::new(self.uri.clone(), self.pointer.clone())
    }
}

/// A reference whose target could not be resolved. It has no edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRef {
    pub site: RefSite,
    pub error: ResolutionError,
}

#[derive(Debug, Clone, Default)]
pub struct RefGraph {
    nodes: Vec<GraphNode>,
    ids: HashMap<GraphNode, NodeId>,
    edges: Vec<GraphEdge>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    sites: Vec<RefSite>,
    unresolved: Vec<UnresolvedRef>,
}

/// Scan every parsed document for `$ref` strings and resolve them.
///
/// Documents are visited in URI order and each document in pre-order, so
/// node ids and edge order are reproducible.
pub fn build_ref_graph(
    documents: &DocumentMap,
    uri_resolver: Arc<dyn UriResolver>,
) -> (RefGraph, Resolver) {
    let resolver = Resolver::new(documents.clone(), uri_resolver);
    let mut graph = RefGraph::default();

    for doc in documents.values() {
        for site in ref_sites(doc) {
            match resolver.deref(&site.uri, &site.reference) {
                Ok(target) => {
                    let to = GraphNode::new(target.uri, target.pointer);
                    graph.add_edge(site.node(), to);
                }
                Err(error) => {
                    tracing::trace!(uri = %site.uri, pointer = %site.pointer, %error, "unresolved $ref");
                    graph.unresolved.push(UnresolvedRef {
                        site: site.clone(),
                        error,
                    });
                }
            }
            graph.sites.push(site);
        }
    }

    tracing::debug!(
        edges = graph.edges.len(),
        unresolved = graph.unresolved.len(),
        "built reference graph"
    );
    (graph, resolver)
}

/// Reference objects of one document, in document order.
///
/// A `$ref` key is skipped when it names a property in a `properties` map,
/// or when it sits inside literal data (`example`, `default`, `enum`, …).
pub fn ref_sites(doc: &ParsedDocument) -> Vec<RefSite> {
    let mut sites = Vec::new();
    if let Some(root) = &doc.root {
        root.walk(&mut |ptr, node| {
            if let Some(reference) = node.ref_target() {
                if !is_literal_position(ptr) {
                    sites.push(RefSite {
                        uri: doc.uri.clone(),
                        pointer: ptr.to_string(),
                        reference: reference.to_string(),
                    });
                }
            }
        });
    }
    sites
}

/// Keys whose children are user-chosen names rather than keywords.
const NAMED_MAPS: &[&str] = &[
    "properties",
    "patternProperties",
    "paths",
    "webhooks",
    "schemas",
    "parameters",
    "responses",
    "requestBodies",
    "securitySchemes",
    "headers",
    "examples",
    "links",
    "callbacks",
    "pathItems",
    "definitions",
    "$defs",
    "content",
    "securityDefinitions",
];

/// Keywords whose values are data, not API description.
const LITERAL_KEYWORDS: &[&str] = &["example", "default", "const", "enum", "value"];

fn is_literal_position(ptr: &str) -> bool {
    let Some(tokens) = pointer::split_pointer(ptr) else {
        return false;
    };
    let mut after_named_map = false;
    for token in &tokens {
        if !after_named_map && LITERAL_KEYWORDS.contains(&token.as_ref()) {
            return true;
        }
        after_named_map = !after_named_map && NAMED_MAPS.contains(&token.as_ref());
    }
    // The mapping itself is a `properties` map: `$ref` is a property name.
    after_named_map
        && tokens
            .last()
            .is_some_and(|last| last == "properties" || last == "patternProperties")
}

impl RefGraph {
    fn intern(&mut self, node: GraphNode) -> NodeId {
        if let Some(id) = self.ids.get(&node) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.ids.insert(node.clone(), id);
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    fn add_edge(&mut self, from: GraphNode, to: GraphNode) {
        let from = self.intern(from);
        let to = self.intern(to);
        let idx = self.edges.len();
        self.edges.push(GraphEdge { from, to });
        self.outgoing[from.0].push(idx);
        self.incoming[to.0].push(idx);
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub fn node_id(&self, node: &GraphNode) -> Option<NodeId> {
        self.ids.get(node).copied()
    }

    /// Every reference object found, resolved or not.
    pub fn ref_sites(&self) -> &[RefSite] {
        &self.sites
    }

    pub fn unresolved(&self) -> &[UnresolvedRef] {
        &self.unresolved
    }

    pub fn unresolved_in<'a>(&'a self, uri: &'a Uri) -> impl Iterator<Item = &'a UnresolvedRef> + 'a {
        self.unresolved.iter().filter(move |u| &u.site.uri == uri)
    }

    /// Targets of the reference object at `node`.
    pub fn references_from(&self, node: &GraphNode) -> Vec<&GraphNode> {
        self.node_id(node).map_or_else(Vec::new, |id| {
            self.outgoing[id.0]
                .iter()
                .map(|&e| &self.nodes[self.edges[e].to.0])
                .collect()
        })
    }

    /// Reference objects whose target is `node`.
    pub fn dependents_of(&self, node: &GraphNode) -> Vec<&GraphNode> {
        self.node_id(node).map_or_else(Vec::new, |id| {
            self.incoming[id.0]
                .iter()
                .map(|&e| &self.nodes[self.edges[e].from.0])
                .collect()
        })
    }

    /// Documents referenced from `uri`. A same-document reference makes
    /// `uri` reference itself.
    pub fn document_references(&self, uri: &Uri) -> BTreeSet<Uri> {
        self.edges
            .iter()
            .filter(|e| &self.nodes[e.from.0].uri == uri)
            .map(|e| self.nodes[e.to.0].uri.clone())
            .collect()
    }

    /// Documents holding references into `uri`.
    pub fn document_dependents(&self, uri: &Uri) -> BTreeSet<Uri> {
        self.edges
            .iter()
            .filter(|e| &self.nodes[e.to.0].uri == uri)
            .map(|e| self.nodes[e.from.0].uri.clone())
            .collect()
    }

    /// Whether following references can lead back to where it started.
    ///
    /// A reference object counts as part of every node that encloses it, so
    /// a schema that references itself from a nested property is a cycle.
    pub fn has_cycle(&self) -> bool {
        let targets: BTreeSet<NodeId> = self.edges.iter().map(|e| e.to).collect();
        let successors: HashMap<NodeId, Vec<NodeId>> = targets
            .iter()
            .map(|&target| {
                let t = &self.nodes[target.0];
                let next = self
                    .edges
                    .iter()
                    .filter(|e| {
                        let from = &self.nodes[e.from.0];
                        from.uri == t.uri && pointer::contains(&t.pointer, &from.pointer)
                    })
                    .map(|e| e.to)
                    .collect();
                (target, next)
            })
            .collect();

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }
        let mut marks: HashMap<NodeId, Mark> =
            targets.iter().map(|&t| (t, Mark::Unvisited)).collect();

        for &start in &targets {
            if marks[&start] != Mark::Unvisited {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            marks.insert(start, Mark::InProgress);
            while let Some((node, next_idx)) = stack.pop() {
                let next = &successors[&node];
                if next_idx < next.len() {
                    stack.push((node, next_idx + 1));
                    let child = next[next_idx];
                    match marks[&child] {
                        Mark::InProgress => return true,
                        Mark::Unvisited => {
                            marks.insert(child, Mark::InProgress);
                            stack.push((child, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks.insert(node, Mark::Done);
                }
            }
        }
        false
    }
}
