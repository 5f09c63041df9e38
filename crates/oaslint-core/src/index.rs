//! The project index.
//!
//! Classification is a single explicit pass. Starting from every root
//! document, an expected kind ([`Slot`]) is pushed down the structure and
//! across `$ref` edges: a `$ref` in a parameter list makes its target a
//! Parameter, a `$ref` under `paths` makes its target a PathItem, and so on.
//! Documents no root reaches get a guess from their own shape. Everything
//! downstream matches on the closed [`AtomData`] enum.
//!
//! Walk results are cached per (document, pointer, slot), which is what makes
//! [`ProjectIndex::update_for_uri`] cheap: only the changed document is
//! walked again, and propagation replays the cached walks of the others.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use oaslint_system_runtime::Uri;
use oaslint_yaml::{Node, Value, pointer};
use serde::Serialize;

use crate::document::{
    Dialect, DocumentKind, DocumentMap, HTTP_METHODS, ParsedDocument, SCHEMA_KEYWORDS,
};
use crate::graph::{GraphNode, RefGraph};
use crate::resolver::Resolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AtomKind {
    Root,
    PathItem,
    Operation,
    Parameter,
    RequestBody,
    Response,
    Schema,
    SecurityScheme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    /// Swagger 2.0 only
    Body,
    /// Swagger 2.0 only
    FormData,
}

impl ParameterLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            "body" => Some(Self::Body),
            "formData" => Some(Self::FormData),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body => "body",
            Self::FormData => "formData",
        }
    }
}

/// Composition flags of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFlags {
    pub is_ref: bool,
    pub is_array: bool,
    pub is_composition: bool,
    pub has_items: bool,
}

/// Kind-specific fields of an [`Atom`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AtomData {
    Root {
        dialect: Dialect,
        version: String,
    },
    PathItem {
        /// The template when the path item sits directly under `paths`.
        path: Option<String>,
    },
    Operation {
        method: String,
        operation_id: Option<String>,
    },
    Parameter {
        name: Option<String>,
        location: Option<ParameterLocation>,
    },
    RequestBody,
    Response {
        status: Option<String>,
    },
    Schema {
        /// Component name for `components/schemas` and `definitions` entries.
        name: Option<String>,
        flags: SchemaFlags,
    },
    SecurityScheme {
        name: Option<String>,
        scheme_type: Option<String>,
    },
}

/// A typed projection of one IR node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Atom {
    pub uri: Uri,
    pub pointer: String,
    /// Pointer of the nearest enclosing atom in the same document.
    pub parent: Option<String>,
    pub data: AtomData,
}

impl Atom {
    pub fn kind(&self) -> AtomKind {
        match self.data {
            AtomData::Root { .. } => AtomKind::Root,
            AtomData::PathItem { .. } => AtomKind::PathItem,
            AtomData::Operation { .. } => AtomKind::Operation,
            AtomData::Parameter { .. } => AtomKind::Parameter,
            AtomData::RequestBody => AtomKind::RequestBody,
            AtomData::Response { .. } => AtomKind::Response,
            AtomData::Schema { .. } => AtomKind::Schema,
            AtomData::SecurityScheme { .. } => AtomKind::SecurityScheme,
        }
    }

    pub fn node(&self) -> GraphNode {
        GraphNode::new(self.uri.clone(), self.pointer.clone())
    }

    pub fn operation_id(&self) -> Option<&str> {
        match &self.data {
            AtomData::Operation { operation_id, .. } => operation_id.as_deref(),
            _ => None,
        }
    }
}

/// A parameter that applies to an operation after merging path-item and
/// operation level lists and following refs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveParameter {
    pub name: String,
    pub location: ParameterLocation,
    /// The list item, which may be a reference object.
    pub declared_at: GraphNode,
    /// Where the parameter object itself lives.
    pub defined_at: GraphNode,
}

/// A lookup whose result changed in an incremental update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKey {
    Atom(GraphNode),
    OperationId(String),
    PathItem(GraphNode),
    SchemaFlags(GraphNode),
    OperationParameters(GraphNode),
}

/// Expected kind of a node, decided by where it sits or what references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Slot {
    Root,
    Components,
    PathItem,
    Parameter,
    RequestBody,
    Response,
    Header,
    Callback,
    Schema,
    SecurityScheme,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WalkKey {
    uri: Uri,
    pointer: String,
    slot: Slot,
}

/// Result of classifying one subtree.
#[derive(Debug, Default)]
struct EntryWalk {
    atoms: Vec<Atom>,
    /// Reference objects met, with the slot their targets inherit.
    refs: Vec<SlotRef>,
    /// Path items directly under `paths`: (pointer, template).
    paths: Vec<(String, String)>,
}

#[derive(Debug)]
struct SlotRef {
    site: String,
    slot: Slot,
    path: Option<String>,
}

#[derive(Debug, Default)]
struct Propagation {
    /// Entry points per document in arrival order.
    entries: BTreeMap<Uri, Vec<(String, Slot)>>,
    aliases: BTreeMap<GraphNode, BTreeSet<String>>,
}

/// Atom collections and reverse lookups over one set of documents.
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    atoms: BTreeMap<Uri, Vec<Atom>>,
    entries: BTreeMap<Uri, Vec<(String, Slot)>>,
    aliases: BTreeMap<GraphNode, BTreeSet<String>>,
    positions: HashMap<GraphNode, usize>,
    by_kind: BTreeMap<AtomKind, Vec<GraphNode>>,
    operation_ids: BTreeMap<String, Vec<GraphNode>>,
    schema_flags: BTreeMap<GraphNode, SchemaFlags>,
    operation_parameters: BTreeMap<GraphNode, Vec<EffectiveParameter>>,
    walks: HashMap<WalkKey, Arc<EntryWalk>>,
}

/// Build the index from scratch.
///
/// A pure function of its inputs: the same documents and graph always give
/// the same atoms in the same order.
pub fn build_index(docs: &DocumentMap, graph: &RefGraph, resolver: &Resolver) -> ProjectIndex {
    let mut index = ProjectIndex::default();
    let propagation = propagate(docs, graph, &mut index.walks);

    for (uri, entries) in &propagation.entries {
        if let Some(doc) = docs.get(uri) {
            let atoms = atomize(doc, entries, &index.walks);
            index.atoms.insert(uri.clone(), atoms);
        }
    }
    index.entries = propagation.entries;
    index.aliases = propagation.aliases;
    index.rebuild_lookups(resolver);

    tracing::debug!(
        documents = index.atoms.len(),
        atoms = index.len(),
        "built project index"
    );
    index
}

impl ProjectIndex {
    /// Bring the index up to date after `uri` changed (or was removed).
    ///
    /// Only `uri` is walked again; other documents are re-atomized only when
    /// their entry points changed. Returns every lookup whose result changed.
    /// For any document the outcome equals a full [`build_index`].
    pub fn update_for_uri(
        &mut self,
        docs: &DocumentMap,
        graph: &RefGraph,
        resolver: &Resolver,
        uri: &Uri,
    ) -> BTreeSet<IndexKey> {
        let before = self.clone();

        self.walks
            .retain(|key, _| &key.uri != uri && docs.contains_key(&key.uri));
        let propagation = propagate(docs, graph, &mut self.walks);

        let mut affected: BTreeSet<Uri> = BTreeSet::new();
        for (doc_uri, entries) in &propagation.entries {
            if doc_uri == uri || self.entries.get(doc_uri) != Some(entries) {
                affected.insert(doc_uri.clone());
            }
        }
        affected.extend(
            self.entries
                .keys()
                .filter(|u| !propagation.entries.contains_key(*u))
                .cloned(),
        );
        if self.atoms.contains_key(uri) {
            affected.insert(uri.clone());
        }

        for doc_uri in &affected {
            match (propagation.entries.get(doc_uri), docs.get(doc_uri)) {
                (Some(entries), Some(doc)) => {
                    let atoms = atomize(doc, entries, &self.walks);
                    self.atoms.insert(doc_uri.clone(), atoms);
                }
                _ => {
                    self.atoms.remove(doc_uri);
                }
            }
        }

        let live: HashSet<WalkKey> = propagation
            .entries
            .iter()
            .flat_map(|(u, entries)| {
                entries.iter().map(|(pointer, slot)| WalkKey {
                    uri: u.clone(),
                    pointer: pointer.clone(),
                    slot: *slot,
                })
            })
            .collect();
        self.walks.retain(|key, _| live.contains(key));

        self.entries = propagation.entries;
        self.aliases = propagation.aliases;
        self.rebuild_lookups(resolver);

        let mut changed = BTreeSet::new();
        for doc_uri in &affected {
            diff_atoms(
                before.atoms_in(doc_uri),
                self.atoms_in(doc_uri),
                &mut changed,
            );
        }
        for key in diff_maps(&before.operation_ids, &self.operation_ids) {
            changed.insert(IndexKey::OperationId(key));
        }
        for key in diff_maps(&before.aliases, &self.aliases) {
            changed.insert(IndexKey::PathItem(key));
        }
        for key in diff_maps(&before.schema_flags, &self.schema_flags) {
            changed.insert(IndexKey::SchemaFlags(key));
        }
        for key in diff_maps(&before.operation_parameters, &self.operation_parameters) {
            changed.insert(IndexKey::OperationParameters(key));
        }

        tracing::debug!(uri = %uri, changed = changed.len(), "updated project index");
        changed
    }

    /// Atoms of one document in document order.
    pub fn atoms_in(&self, uri: &Uri) -> &[Atom] {
        self.atoms.get(uri).map_or(&[], Vec::as_slice)
    }

    /// All atoms, by document URI and then document order.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.values().flatten()
    }

    pub fn atom(&self, node: &GraphNode) -> Option<&Atom> {
        let idx = *self.positions.get(node)?;
        self.atoms.get(&node.uri)?.get(idx)
    }

    pub fn atoms_of_kind(&self, kind: AtomKind) -> Vec<&Atom> {
        self.by_kind
            .get(&kind)
            .map(|nodes| nodes.iter().filter_map(|n| self.atom(n)).collect())
            .unwrap_or_default()
    }

    /// Every operation declaring `operation_id`.
    pub fn occurrences(&self, operation_id: &str) -> &[GraphNode] {
        self.operation_ids
            .get(operation_id)
            .map_or(&[], Vec::as_slice)
    }

    pub fn is_unique(&self, operation_id: &str) -> bool {
        self.occurrences(operation_id).len() <= 1
    }

    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.operation_ids.keys().map(String::as_str)
    }

    /// Concrete path templates a path item is mounted under. A path item
    /// shared through `$ref` has one entry per referencing path.
    pub fn paths_for(&self, path_item: &GraphNode) -> Vec<&str> {
        self.aliases
            .get(path_item)
            .map(|paths| paths.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Path templates of an operation, through its enclosing path item.
    pub fn operation_paths(&self, operation: &Atom) -> Vec<&str> {
        match &operation.parent {
            Some(parent) => self.paths_for(&GraphNode::new(operation.uri.clone(), parent.clone())),
            None => Vec::new(),
        }
    }

    pub fn schema_flags(&self, node: &GraphNode) -> Option<SchemaFlags> {
        self.schema_flags.get(node).copied()
    }

    /// Parameters in effect for an operation: path-item level first, then
    /// operation level, where an operation parameter replaces a path-item
    /// parameter with the same (name, in).
    pub fn operation_parameters(&self, operation: &GraphNode) -> &[EffectiveParameter] {
        self.operation_parameters
            .get(operation)
            .map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.atoms.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.values().all(Vec::is_empty)
    }

    fn rebuild_lookups(&mut self, resolver: &Resolver) {
        self.positions.clear();
        self.by_kind.clear();
        self.operation_ids.clear();
        self.schema_flags.clear();
        self.operation_parameters.clear();

        for atoms in self.atoms.values() {
            for (idx, atom) in atoms.iter().enumerate() {
                let node = atom.node();
                self.positions.insert(node.clone(), idx);
                self.by_kind
                    .entry(atom.kind())
                    .or_default()
                    .push(node.clone());
                match &atom.data {
                    AtomData::Operation {
                        operation_id: Some(id),
                        ..
                    } => {
                        self.operation_ids
                            .entry(id.clone())
                            .or_default()
                            .push(node.clone());
                    }
                    AtomData::Schema { flags, .. } => {
                        self.schema_flags.insert(node.clone(), *flags);
                    }
                    _ => {}
                }
                if atom.kind() == AtomKind::Operation {
                    let params = effective_parameters(atom, resolver);
                    self.operation_parameters.insert(node, params);
                }
            }
        }
    }
}

fn diff_atoms(before: &[Atom], after: &[Atom], changed: &mut BTreeSet<IndexKey>) {
    let old: HashMap<&str, &Atom> = before.iter().map(|a| (a.pointer.as_str(), a)).collect();
    let new: HashMap<&str, &Atom> = after.iter().map(|a| (a.pointer.as_str(), a)).collect();
    for atom in before.iter().chain(after) {
        if old.get(atom.pointer.as_str()) != new.get(atom.pointer.as_str()) {
            changed.insert(IndexKey::Atom(atom.node()));
        }
    }
}

fn diff_maps<K: Ord + Clone, V: PartialEq>(before: &BTreeMap<K, V>, after: &BTreeMap<K, V>) -> Vec<K> {
    let keys: BTreeSet<&K> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter(|k| before.get(*k) != after.get(*k))
        .cloned()
        .collect()
}

fn effective_parameters(operation: &Atom, resolver: &Resolver) -> Vec<EffectiveParameter> {
    let Some(doc) = resolver.document(&operation.uri) else {
        return Vec::new();
    };
    let lists = operation
        .parent
        .iter()
        .map(|parent| pointer::join_pointer(parent, "parameters"))
        .chain(std::iter::once(pointer::join_pointer(
            &operation.pointer,
            "parameters",
        )));

    let mut params: Vec<EffectiveParameter> = Vec::new();
    for list in lists {
        let Some(items) = doc.node(&list).and_then(Node::as_sequence) else {
            continue;
        };
        for idx in 0..items.len() {
            let item_ptr = pointer::join_pointer(&list, &idx.to_string());
            let Ok(resolved) = resolver.follow(&operation.uri, &item_ptr) else {
                continue;
            };
            let name = resolved.node.get("name").and_then(Node::as_str);
            let location = resolved
                .node
                .get("in")
                .and_then(Node::as_str)
                .and_then(ParameterLocation::parse);
            let (Some(name), Some(location)) = (name, location) else {
                continue;
            };
            let param = EffectiveParameter {
                name: name.to_string(),
                location,
                declared_at: GraphNode::new(operation.uri.clone(), item_ptr),
                defined_at: GraphNode::new(resolved.uri.clone(), resolved.pointer.clone()),
            };
            match params
                .iter_mut()
                .find(|p| p.name == param.name && p.location == param.location)
            {
                Some(existing) => *existing = param,
                None => params.push(param),
            }
        }
    }
    params
}

fn propagate(
    docs: &DocumentMap,
    graph: &RefGraph,
    walks: &mut HashMap<WalkKey, Arc<EntryWalk>>,
) -> Propagation {
    let mut propagation = Propagation::default();
    let mut assigned: HashSet<GraphNode> = HashSet::new();

    let mut queue: VecDeque<(GraphNode, Slot)> = docs
        .values()
        .filter(|doc| doc.kind.is_root())
        .map(|doc| (GraphNode::new(doc.uri.clone(), ""), Slot::Root))
        .collect();
    drain(docs, graph, walks, &mut queue, &mut assigned, &mut propagation);

    queue.extend(
        docs.values()
            .filter(|doc| !propagation.entries.contains_key(&doc.uri))
            .filter_map(|doc| guess_slot(doc).map(|slot| (GraphNode::new(doc.uri.clone(), ""), slot))),
    );
    drain(docs, graph, walks, &mut queue, &mut assigned, &mut propagation);

    propagation
}

fn drain(
    docs: &DocumentMap,
    graph: &RefGraph,
    walks: &mut HashMap<WalkKey, Arc<EntryWalk>>,
    queue: &mut VecDeque<(GraphNode, Slot)>,
    assigned: &mut HashSet<GraphNode>,
    propagation: &mut Propagation,
) {
    while let Some((node, slot)) = queue.pop_front() {
        if assigned.contains(&node) {
            continue;
        }
        let Some(doc) = docs.get(&node.uri) else {
            continue;
        };
        let key = WalkKey {
            uri: node.uri.clone(),
            pointer: node.pointer.clone(),
            slot,
        };
        let walk = match walks.get(&key) {
            Some(walk) => Arc::clone(walk),
            None => {
                let Some(target) = doc.node(&node.pointer) else {
                    continue;
                };
                let walk = Arc::new(walk_entry(doc, target, &node.pointer, slot));
                walks.insert(key, Arc::clone(&walk));
                walk
            }
        };
        assigned.insert(node.clone());

        propagation
            .entries
            .entry(node.uri.clone())
            .or_default()
            .push((node.pointer.clone(), slot));

        for (ptr, path) in &walk.paths {
            propagation
                .aliases
                .entry(GraphNode::new(node.uri.clone(), ptr.clone()))
                .or_default()
                .insert(path.clone());
        }
        for slot_ref in &walk.refs {
            let site = GraphNode::new(node.uri.clone(), slot_ref.site.clone());
            for target in graph.references_from(&site) {
                if let Some(path) = &slot_ref.path {
                    propagation
                        .aliases
                        .entry(target.clone())
                        .or_default()
                        .insert(path.clone());
                }
                queue.push_back((target.clone(), slot_ref.slot));
            }
        }
    }
}

/// Shape-based guess for a document no root reaches.
fn guess_slot(doc: &ParsedDocument) -> Option<Slot> {
    if doc.kind != DocumentKind::Fragment {
        return None;
    }
    let root = doc.root.as_ref()?;
    let has = |key: &str| root.contains_key(key);

    if has("name") && has("in") {
        Some(Slot::Parameter)
    } else if HTTP_METHODS.iter().any(|m| has(*m)) {
        Some(Slot::PathItem)
    } else if root.keys().eq(["$ref"]) {
        None
    } else if [
        "schemas",
        "parameters",
        "responses",
        "requestBodies",
        "securitySchemes",
        "headers",
        "callbacks",
        "pathItems",
        "definitions",
    ]
    .iter()
    .any(|k| has(*k))
    {
        Some(Slot::Components)
    } else if SCHEMA_KEYWORDS.iter().any(|k| has(*k)) {
        Some(Slot::Schema)
    } else if has("description") && (has("headers") || has("schema") || has("content")) {
        Some(Slot::Response)
    } else if has("content") {
        Some(Slot::RequestBody)
    } else {
        None
    }
}

/// Order atoms of one document by pre-order position; when two entries
/// produce an atom for the same pointer, the earlier entry wins.
fn atomize(
    doc: &ParsedDocument,
    entries: &[(String, Slot)],
    walks: &HashMap<WalkKey, Arc<EntryWalk>>,
) -> Vec<Atom> {
    let mut order: HashMap<String, usize> = HashMap::new();
    if let Some(root) = &doc.root {
        let mut next = 0;
        root.walk(&mut |ptr, _| {
            order.insert(ptr.to_string(), next);
            next += 1;
        });
    }

    let mut tagged: Vec<(usize, usize, &Atom)> = Vec::new();
    for (entry_idx, (ptr, slot)) in entries.iter().enumerate() {
        let key = WalkKey {
            uri: doc.uri.clone(),
            pointer: ptr.clone(),
            slot: *slot,
        };
        if let Some(walk) = walks.get(&key) {
            for atom in &walk.atoms {
                let pos = order.get(&atom.pointer).copied().unwrap_or(usize::MAX);
                tagged.push((pos, entry_idx, atom));
            }
        }
    }
    tagged.sort_by_key(|(pos, entry_idx, _)| (*pos, *entry_idx));

    let mut seen = HashSet::new();
    tagged
        .into_iter()
        .filter(|(_, _, atom)| seen.insert(atom.pointer.as_str()))
        .map(|(_, _, atom)| atom.clone())
        .collect()
}

fn walk_entry(doc: &ParsedDocument, node: &Node, ptr: &str, slot: Slot) -> EntryWalk {
    let mut walker = Walker {
        doc,
        out: EntryWalk::default(),
    };
    walker.visit(node, ptr, slot, None, None);
    walker.out
}

struct Walker<'a> {
    doc: &'a ParsedDocument,
    out: EntryWalk,
}

impl Walker<'_> {
    fn push(&mut self, ptr: &str, parent: Option<&str>, data: AtomData) {
        self.out.atoms.push(Atom {
            uri: self.doc.uri.clone(),
            pointer: ptr.to_string(),
            parent: parent.map(str::to_string),
            data,
        });
    }

    fn visit(&mut self, node: &Node, ptr: &str, slot: Slot, parent: Option<&str>, name: Option<&str>) {
        if node.ref_target().is_some() {
            if slot == Slot::Schema {
                let flags = SchemaFlags {
                    is_ref: true,
                    ..SchemaFlags::default()
                };
                self.push(ptr, parent, AtomData::Schema {
                    name: name.map(str::to_string),
                    flags,
                });
            }
            self.out.refs.push(SlotRef {
                site: ptr.to_string(),
                slot,
                path: None,
            });
            return;
        }
        if !node.is_mapping() {
            return;
        }

        match slot {
            Slot::Root => self.visit_root(node, ptr),
            Slot::Components => self.visit_components(node, ptr, parent),
            Slot::PathItem => self.visit_path_item(node, ptr, parent, None),
            Slot::Parameter => {
                let data = AtomData::Parameter {
                    name: node.get("name").and_then(Node::as_str).map(str::to_string),
                    location: node
                        .get("in")
                        .and_then(Node::as_str)
                        .and_then(ParameterLocation::parse),
                };
                self.push(ptr, parent, data);
                self.visit_schema_holder(node, ptr, Some(ptr));
            }
            Slot::RequestBody => {
                self.push(ptr, parent, AtomData::RequestBody);
                self.visit_schema_holder(node, ptr, Some(ptr));
            }
            Slot::Response => {
                let status = name.map(str::to_string);
                self.push(ptr, parent, AtomData::Response { status });
                self.visit_schema_holder(node, ptr, Some(ptr));
                self.visit_map(node, ptr, "headers", Slot::Header, Some(ptr));
            }
            Slot::Header => self.visit_schema_holder(node, ptr, parent),
            Slot::Callback => {
                for entry in node.as_mapping().unwrap_or_default() {
                    let child = pointer::join_pointer(ptr, &entry.key);
                    self.visit(&entry.value, &child, Slot::PathItem, parent, None);
                }
            }
            Slot::SecurityScheme => {
                let data = AtomData::SecurityScheme {
                    name: name.map(str::to_string),
                    scheme_type: node.get("type").and_then(Node::as_str).map(str::to_string),
                };
                self.push(ptr, parent, data);
            }
            Slot::Schema => self.visit_schema(node, ptr, parent, name),
        }
    }

    fn visit_root(&mut self, node: &Node, ptr: &str) {
        let (dialect, version) = match &self.doc.kind {
            DocumentKind::Root { dialect, version } => (*dialect, version.clone()),
            _ => (Dialect::OpenApi, String::new()),
        };
        self.push(ptr, None, AtomData::Root { dialect, version });
        let me = Some(ptr);

        if let Some(paths) = node.get("paths") {
            let paths_ptr = pointer::join_pointer(ptr, "paths");
            for entry in paths.as_mapping().unwrap_or_default() {
                if entry.key.starts_with("x-") {
                    continue;
                }
                let child = pointer::join_pointer(&paths_ptr, &entry.key);
                if entry.value.ref_target().is_some() {
                    self.out.refs.push(SlotRef {
                        site: child,
                        slot: Slot::PathItem,
                        path: Some(entry.key.clone()),
                    });
                } else if entry.value.is_mapping() {
                    self.out.paths.push((child.clone(), entry.key.clone()));
                    self.visit_path_item(&entry.value, &child, me, Some(&entry.key));
                }
            }
        }

        self.visit_map(node, ptr, "webhooks", Slot::PathItem, me);
        if let Some(components) = node.get("components") {
            let child = pointer::join_pointer(ptr, "components");
            self.visit_components(components, &child, me);
        }

        // Swagger 2.0 keeps reusable objects at the top level.
        self.visit_named_map(node, ptr, "definitions", Slot::Schema, me);
        self.visit_map(node, ptr, "parameters", Slot::Parameter, me);
        self.visit_named_map(node, ptr, "responses", Slot::Response, me);
        self.visit_named_map(node, ptr, "securityDefinitions", Slot::SecurityScheme, me);
    }

    fn visit_components(&mut self, node: &Node, ptr: &str, parent: Option<&str>) {
        self.visit_named_map(node, ptr, "schemas", Slot::Schema, parent);
        self.visit_named_map(node, ptr, "definitions", Slot::Schema, parent);
        self.visit_map(node, ptr, "parameters", Slot::Parameter, parent);
        self.visit_map(node, ptr, "requestBodies", Slot::RequestBody, parent);
        self.visit_named_map(node, ptr, "responses", Slot::Response, parent);
        self.visit_map(node, ptr, "headers", Slot::Header, parent);
        self.visit_named_map(node, ptr, "securitySchemes", Slot::SecurityScheme, parent);
        self.visit_map(node, ptr, "callbacks", Slot::Callback, parent);
        self.visit_map(node, ptr, "pathItems", Slot::PathItem, parent);
    }

    fn visit_path_item(&mut self, node: &Node, ptr: &str, parent: Option<&str>, path: Option<&str>) {
        self.push(ptr, parent, AtomData::PathItem {
            path: path.map(str::to_string),
        });
        let me = Some(ptr);
        self.visit_list(node, ptr, "parameters", Slot::Parameter, me);

        for entry in node.as_mapping().unwrap_or_default() {
            if HTTP_METHODS.contains(&entry.key.as_str()) && entry.value.is_mapping() {
                let child = pointer::join_pointer(ptr, &entry.key);
                self.visit_operation(&entry.value, &child, me, &entry.key);
            }
        }
    }

    fn visit_operation(&mut self, node: &Node, ptr: &str, parent: Option<&str>, method: &str) {
        let operation_id = node
            .get("operationId")
            .and_then(Node::as_str)
            .map(str::to_string);
        self.push(ptr, parent, AtomData::Operation {
            method: method.to_string(),
            operation_id,
        });
        let me = Some(ptr);

        self.visit_list(node, ptr, "parameters", Slot::Parameter, me);
        if let Some(body) = node.get("requestBody") {
            let child = pointer::join_pointer(ptr, "requestBody");
            self.visit(body, &child, Slot::RequestBody, me, None);
        }
        self.visit_named_map(node, ptr, "responses", Slot::Response, me);
        self.visit_map(node, ptr, "callbacks", Slot::Callback, me);
    }

    /// `schema` and `content.*.schema` of parameters, bodies, responses and
    /// headers.
    fn visit_schema_holder(&mut self, node: &Node, ptr: &str, parent: Option<&str>) {
        if let Some(schema) = node.get("schema") {
            let child = pointer::join_pointer(ptr, "schema");
            self.visit(schema, &child, Slot::Schema, parent, None);
        }
        if let Some(content) = node.get("content") {
            let content_ptr = pointer::join_pointer(ptr, "content");
            for media in content.as_mapping().unwrap_or_default() {
                if let Some(schema) = media.value.get("schema") {
                    let media_ptr = pointer::join_pointer(&content_ptr, &media.key);
                    let child = pointer::join_pointer(&media_ptr, "schema");
                    self.visit(schema, &child, Slot::Schema, parent, None);
                }
            }
        }
    }

    fn visit_schema(&mut self, node: &Node, ptr: &str, parent: Option<&str>, name: Option<&str>) {
        let flags = SchemaFlags {
            is_ref: false,
            is_array: is_array_schema(node),
            is_composition: ["allOf", "oneOf", "anyOf"].iter().any(|k| node.contains_key(k)),
            has_items: node.contains_key("items") || node.contains_key("prefixItems"),
        };
        self.push(ptr, parent, AtomData::Schema {
            name: name.map(str::to_string),
            flags,
        });
        let me = Some(ptr);

        for key in ["properties", "patternProperties", "$defs", "definitions", "dependentSchemas"] {
            self.visit_map(node, ptr, key, Slot::Schema, me);
        }
        for key in ["allOf", "oneOf", "anyOf", "prefixItems"] {
            self.visit_list(node, ptr, key, Slot::Schema, me);
        }
        for key in [
            "items",
            "additionalProperties",
            "additionalItems",
            "unevaluatedProperties",
            "unevaluatedItems",
            "not",
            "if",
            "then",
            "else",
            "contains",
            "propertyNames",
        ] {
            match node.get(key) {
                Some(child) if child.is_mapping() => {
                    let child_ptr = pointer::join_pointer(ptr, key);
                    self.visit(child, &child_ptr, Slot::Schema, me, None);
                }
                Some(child) if child.is_sequence() => self.visit_list(node, ptr, key, Slot::Schema, me),
                _ => {}
            }
        }
    }

    /// Visit every value of the mapping under `key`.
    fn visit_map(&mut self, node: &Node, ptr: &str, key: &str, slot: Slot, parent: Option<&str>) {
        self.visit_map_inner(node, ptr, key, slot, parent, false);
    }

    /// Like `visit_map`, passing each entry's key as the atom name.
    fn visit_named_map(&mut self, node: &Node, ptr: &str, key: &str, slot: Slot, parent: Option<&str>) {
        self.visit_map_inner(node, ptr, key, slot, parent, true);
    }

    fn visit_map_inner(
        &mut self,
        node: &Node,
        ptr: &str,
        key: &str,
        slot: Slot,
        parent: Option<&str>,
        named: bool,
    ) {
        let Some(map) = node.get(key).and_then(Node::as_mapping) else {
            return;
        };
        let map_ptr = pointer::join_pointer(ptr, key);
        for entry in map {
            if entry.key.starts_with("x-") {
                continue;
            }
            let child = pointer::join_pointer(&map_ptr, &entry.key);
            let name = named.then_some(entry.key.as_str());
            self.visit(&entry.value, &child, slot, parent, name);
        }
    }

    fn visit_list(&mut self, node: &Node, ptr: &str, key: &str, slot: Slot, parent: Option<&str>) {
        let Some(items) = node.get(key).and_then(Node::as_sequence) else {
            return;
        };
        let list_ptr = pointer::join_pointer(ptr, key);
        for (idx, item) in items.iter().enumerate() {
            let child = pointer::join_pointer(&list_ptr, &idx.to_string());
            self.visit(item, &child, slot, parent, None);
        }
    }
}

fn is_array_schema(node: &Node) -> bool {
    match node.get("type").map(|t| &t.value) {
        Some(Value::String(t)) => t == "array",
        Some(Value::Sequence(types)) => types.iter().any(|t| t.as_str() == Some("array")),
        _ => false,
    }
}
