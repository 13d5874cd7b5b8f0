//! Recursive scan of document object graphs.
//!
//! Each document is walked from its root objects down through structural
//! children. Every component of every object is either recorded as a missing
//! script (its type no longer resolves) or handed to the classifier. Counts
//! are aggregated bottom-up into a [`GraphNode`] tree that mirrors the input
//! graph, keeping only the branches that contain something missing.

use crate::classifier;
use crate::config::ScanOptions;
use crate::host::{DocumentId, ObjectId, PropertyRef, ReferenceLocator, SceneHost};
use crate::identifier::CLASS_IDENTIFIER_PATH;
use crate::salvage::{self, SalvageRequest, SalvagedMember};
use anyhow::{Result, bail};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Name used for documents that were never saved.
pub const UNTITLED_DOCUMENT: &str = "Untitled";

/// Scan result for one component or settings object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentReport {
    pub subject: ReferenceLocator,
    pub name: String,
    /// Set when the component's type could not be resolved.
    pub is_missing_script: bool,
    /// Label replacing the component name, used for settings objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_override: Option<String>,
    /// Properties holding missing references. Always empty for missing scripts.
    pub missing: Vec<PropertyRef>,
    /// Members recovered from the raw document for a missing script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salvage: Option<Vec<SalvagedMember>>,
}

impl ComponentReport {
    /// Contribution of this report to its node's count.
    pub fn count(&self) -> usize {
        if self.is_missing_script {
            1
        } else {
            self.missing.len()
        }
    }
}

/// One object of the scanned graph, or the synthetic root of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    /// `None` for a document root.
    pub object: Option<ObjectId>,
    pub name: String,
    pub components: Vec<ComponentReport>,
    pub children: Vec<GraphNode>,
    pub missing_in_components: usize,
    pub missing_in_children: usize,
    /// Set for instance roots whose source document is gone.
    pub is_missing_prefab_instance: bool,
}

impl GraphNode {
    fn new(object: Option<ObjectId>, name: String, is_missing_prefab_instance: bool) -> Self {
        Self {
            object,
            name,
            components: Vec::new(),
            children: Vec::new(),
            missing_in_components: 0,
            missing_in_children: 0,
            is_missing_prefab_instance,
        }
    }

    pub fn total_count(&self) -> usize {
        self.missing_in_components
            + self.missing_in_children
            + usize::from(self.is_missing_prefab_instance)
    }

    /// Whether this node itself, not its subtree, has something missing.
    pub fn has_own_missing(&self) -> bool {
        self.is_missing_prefab_instance || self.missing_in_components > 0
    }

    /// Whether a parent keeps this node in its child list.
    pub fn is_retained(&self) -> bool {
        self.total_count() > 0 || self.is_missing_prefab_instance
    }

    fn add_component(&mut self, report: ComponentReport) {
        self.missing_in_components += report.count();
        self.components.push(report);
    }

    fn add_child(&mut self, child: GraphNode) {
        if child.is_retained() {
            self.missing_in_children += child.total_count();
            self.children.push(child);
        }
    }
}

/// Scan result for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentResult {
    pub name: String,
    pub root: GraphNode,
}

/// Position of a node inside a [`ScanSession`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    pub document: usize,
    /// Child indices from the document root down to the node.
    pub steps: Vec<usize>,
}

/// Result of one scan over every open document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSession {
    /// Documents with at least one missing reference, in scan order.
    pub documents: Vec<DocumentResult>,
    #[serde(skip)]
    index: HashMap<ObjectId, Vec<NodePath>>,
}

impl ScanSession {
    fn new(documents: Vec<DocumentResult>) -> Self {
        let mut index: HashMap<ObjectId, Vec<NodePath>> = HashMap::new();
        for (document, result) in documents.iter().enumerate() {
            let mut steps = Vec::new();
            index_node(&result.root, document, &mut steps, &mut index);
        }
        Self { documents, index }
    }

    /// Total count over all documents.
    pub fn total_count(&self) -> usize {
        self.documents.iter().map(|d| d.root.total_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Whether `object` has any missing reference in its subtree.
    pub fn has_missing(&self, object: ObjectId) -> bool {
        self.index.contains_key(&object)
    }

    /// Nodes recorded for `object`.
    pub fn nodes_for(&self, object: ObjectId) -> impl Iterator<Item = &GraphNode> {
        self.index
            .get(&object)
            .into_iter()
            .flatten()
            .filter_map(|path| self.node(path))
    }

    pub fn node(&self, path: &NodePath) -> Option<&GraphNode> {
        let mut node = &self.documents.get(path.document)?.root;
        for &step in &path.steps {
            node = node.children.get(step)?;
        }
        Some(node)
    }

    /// Every node with a non-zero count, document roots excluded.
    pub fn flagged_nodes(&self) -> Vec<&GraphNode> {
        let mut paths: Vec<&NodePath> = self.index.values().flatten().collect();
        paths.sort_by(|a, b| (a.document, &a.steps).cmp(&(b.document, &b.steps)));
        paths.into_iter().filter_map(|p| self.node(p)).collect()
    }
}

fn index_node(
    node: &GraphNode,
    document: usize,
    steps: &mut Vec<usize>,
    index: &mut HashMap<ObjectId, Vec<NodePath>>,
) {
    if let Some(object) = node.object
        && node.total_count() > 0
    {
        index.entry(object).or_default().push(NodePath {
            document,
            steps: steps.clone(),
        });
    }
    for (i, child) in node.children.iter().enumerate() {
        steps.push(i);
        index_node(child, document, steps, index);
        steps.pop();
    }
}

/// Walks documents of a host and builds [`ScanSession`]s.
pub struct Scanner<'a, H: ?Sized> {
    host: &'a H,
    options: ScanOptions,
}

impl<'a, H> Scanner<'a, H>
where
    H: SceneHost + ?Sized,
{
    pub fn new(host: &'a H, options: ScanOptions) -> Self {
        Self { host, options }
    }

    /// Scans the isolated document (if any) followed by every open document.
    ///
    /// Fails only when the host reports it is not ready.
    pub fn run(&self) -> Result<ScanSession> {
        if !self.host.is_ready() {
            bail!("host is busy compiling or importing; retry once it settles");
        }

        let mut results = Vec::new();
        for document in scan_order(self.host) {
            let root = self.scan_document(document);
            if root.total_count() > 0 {
                results.push(DocumentResult {
                    name: root.name.clone(),
                    root,
                });
            }
        }

        let session = ScanSession::new(results);
        debug!(
            documents = session.documents.len(),
            total = session.total_count(),
            "scan finished"
        );
        Ok(session)
    }

    /// Scans one document into a root node named after it.
    pub fn scan_document(&self, document: DocumentId) -> GraphNode {
        let mut name = self.host.document_name(document);
        if name.is_empty() {
            name = UNTITLED_DOCUMENT.to_string();
        }

        let mut root = GraphNode::new(None, name, false);
        for object in self.host.root_objects(document) {
            root.add_child(self.scan_object(object));
        }

        for singleton in self.host.document_singletons(document) {
            let missing = classifier::classify(self.host, singleton, &self.options);
            if !missing.is_empty() {
                let name = self.host.object_name(singleton);
                root.add_component(ComponentReport {
                    subject: ReferenceLocator::Live { object: singleton },
                    name: name.clone(),
                    is_missing_script: false,
                    name_override: Some(name),
                    missing,
                    salvage: None,
                });
            }
        }

        root
    }

    /// Scans one object and its subtree.
    pub fn scan_object(&self, object: ObjectId) -> GraphNode {
        let host = self.host;
        let missing_prefab =
            host.is_instance_root(object) && host.is_instance_source_missing(object);
        let mut node = GraphNode::new(Some(object), host.object_name(object), missing_prefab);

        for component in host.components(object) {
            if !host.is_type_resolved(component) {
                node.add_component(self.missing_script(object, component));
                continue;
            }

            let missing = classifier::classify(host, component, &self.options);
            if !missing.is_empty() {
                node.add_component(ComponentReport {
                    subject: ReferenceLocator::Live { object: component },
                    name: host.object_name(component),
                    is_missing_script: false,
                    name_override: None,
                    missing,
                    salvage: None,
                });
            }
        }

        for child in host.children(object) {
            node.add_child(self.scan_object(child));
        }

        node
    }

    fn missing_script(&self, owner: ObjectId, component: ObjectId) -> ComponentReport {
        let identifier = self
            .host
            .find_property(component, CLASS_IDENTIFIER_PATH)
            .and_then(|p| p.as_str().map(str::to_string))
            .unwrap_or_default();

        let salvage = salvage::read_members(
            self.host,
            self.host,
            self.host,
            &SalvageRequest {
                owner: Some(owner),
                identifier: &identifier,
                subject: component,
            },
        );

        ComponentReport {
            subject: ReferenceLocator::Unresolved {
                type_name: identifier,
                location: component,
            },
            name: self.host.object_name(component),
            is_missing_script: true,
            name_override: None,
            missing: Vec::new(),
            salvage,
        }
    }
}

/// Documents in scan order: the isolated one first, then every open one.
fn scan_order<H>(host: &H) -> Vec<DocumentId>
where
    H: SceneHost + ?Sized,
{
    let isolated = host.isolated_document();
    isolated
        .into_iter()
        .chain(
            host.open_documents()
                .into_iter()
                .filter(|d| Some(*d) != isolated),
        )
        .collect()
}

/// Objects carrying at least one unresolved component.
///
/// Covers every object the host has loaded, so hidden objects that no
/// document hierarchy reaches are listed too. Each object appears once, in
/// host order.
pub fn objects_with_missing_scripts<H>(host: &H) -> Vec<ObjectId>
where
    H: SceneHost + ?Sized,
{
    let mut seen = HashSet::new();
    host.all_objects()
        .into_iter()
        .filter(|&object| seen.insert(object))
        .filter(|&object| {
            host.components(object)
                .into_iter()
                .any(|c| !host.is_type_resolved(c))
        })
        .collect()
}
