//! File-backed host built from a JSON export of editor state.
//!
//! A snapshot lists the open documents, every object reachable from them
//! (game objects, components and settings objects share one id space), and
//! the loaded assemblies. Document text is read from disk relative to the
//! snapshot file, or taken from an inline `text` field.
//!
//! ```json
//! {
//!   "documents": [{ "name": "Main", "path": "Main.unity", "roots": [1] }],
//!   "objects": [
//!     { "id": 1, "name": "Player", "type_name": "GameObject", "components": [2] },
//!     { "id": 2, "name": "Player", "properties": [] }
//!   ],
//!   "assemblies": [{ "name": "Assembly-CSharp", "types": [] }]
//! }
//! ```
//!
//! An object without `type_name` is one whose type no longer resolves.
//! Game objects must form trees: every object has at most one parent, and a
//! document root is nobody's child.

use crate::host::{
    AssemblyInfo, AssemblyUniverse, DocumentId, ObjectGraphSource, ObjectId, PropertyEntry,
    PropertyStore, PropertyValue, TextDocumentSource, TypeInfo,
};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

/// Editor state loaded from a snapshot file.
#[derive(Debug, Deserialize)]
pub struct Snapshot {
    /// False while the editor was compiling or importing.
    #[serde(default = "default_true")]
    pub ready: bool,
    pub documents: Vec<SnapshotDocument>,
    /// Name of the active document. Defaults to the first open one.
    #[serde(default)]
    pub active: Option<String>,
    /// Name of the document open in isolation, if any.
    #[serde(default)]
    pub isolated: Option<String>,
    #[serde(default)]
    pub objects: Vec<SnapshotObject>,
    #[serde(default)]
    pub assemblies: Vec<SnapshotAssembly>,
    #[serde(skip)]
    base_dir: PathBuf,
    #[serde(skip)]
    index: HashMap<ObjectId, usize>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotDocument {
    pub name: String,
    /// Path of the serialized text, relative to the snapshot file.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Inline serialized text, used instead of `path` when present.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub roots: Vec<ObjectId>,
    /// Render and lighting settings objects.
    #[serde(default)]
    pub singletons: Vec<ObjectId>,
    /// Closed documents are only referenced as prefab sources.
    #[serde(default = "default_true")]
    pub open: bool,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotObject {
    pub id: ObjectId,
    pub name: String,
    /// Assembly-qualified runtime type; absent when it no longer resolves.
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub children: Vec<ObjectId>,
    #[serde(default)]
    pub components: Vec<ObjectId>,
    #[serde(default)]
    pub properties: Vec<PropertyEntry>,
    /// Public methods of the runtime type.
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub prefab: Option<PrefabLink>,
    /// Loaded but hidden from the hierarchy; no document lists it.
    #[serde(default)]
    pub hidden: bool,
    #[serde(skip)]
    property_index: HashMap<String, usize>,
}

impl SnapshotObject {
    /// First property stored under `path`.
    pub fn property(&self, path: &str) -> Option<&PropertyEntry> {
        self.property_index
            .get(path)
            .and_then(|&i| self.properties.get(i))
    }

    fn property_mut(&mut self, path: &str) -> Option<&mut PropertyEntry> {
        let position = *self.property_index.get(path)?;
        self.properties.get_mut(position)
    }

    fn index_properties(&mut self) {
        self.property_index.clear();
        for (position, property) in self.properties.iter().enumerate() {
            self.property_index
                .entry(property.path.clone())
                .or_insert(position);
        }
    }
}

/// How an object relates to a prefab it was instantiated from.
#[derive(Debug, Deserialize)]
pub struct PrefabLink {
    /// Whether this object is the instance root.
    #[serde(default)]
    pub root: bool,
    /// Name of the source document.
    #[serde(default)]
    pub source: Option<String>,
    /// Whether the source asset is gone.
    #[serde(default)]
    pub missing: bool,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotAssembly {
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeInfo>,
    /// Dynamic assemblies cannot enumerate their exported types.
    #[serde(default)]
    pub dynamic: bool,
}

impl Snapshot {
    /// Loads a snapshot file. Relative document paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json(&raw, base_dir)
            .with_context(|| format!("Invalid snapshot {}", path.display()))
    }

    /// Parses snapshot JSON. Fails on duplicate object ids and on hierarchies
    /// that are not trees.
    pub fn from_json(raw: &str, base_dir: PathBuf) -> Result<Self> {
        let mut snapshot: Snapshot =
            serde_json::from_str(raw).context("Failed to parse snapshot JSON")?;
        snapshot.base_dir = base_dir;
        snapshot.build_index()?;
        Ok(snapshot)
    }

    fn build_index(&mut self) -> Result<()> {
        self.index.clear();
        for (position, object) in self.objects.iter_mut().enumerate() {
            if self.index.insert(object.id, position).is_some() {
                bail!("duplicate object id {}", object.id);
            }
            object.index_properties();
        }
        self.check_hierarchy()
    }

    fn check_hierarchy(&self) -> Result<()> {
        let mut parents = HashMap::new();
        for object in &self.objects {
            for &child in &object.children {
                if parents.insert(child, object.id).is_some() {
                    bail!("object {} is reachable from more than one parent", child);
                }
            }
        }

        let mut roots = HashSet::new();
        for &root in self.documents.iter().flat_map(|d| &d.roots) {
            if parents.contains_key(&root) || !roots.insert(root) {
                bail!("object {} is reachable from more than one parent", root);
            }
        }

        // With one parent each, a walk up that outlasts the map is in a loop.
        for object in &self.objects {
            let mut current = object.id;
            let mut steps = 0;
            while let Some(&parent) = parents.get(&current) {
                steps += 1;
                if parent == object.id || steps > parents.len() {
                    bail!("object {} is its own ancestor", parent);
                }
                current = parent;
            }
        }
        Ok(())
    }

    pub fn object(&self, id: ObjectId) -> Option<&SnapshotObject> {
        self.index.get(&id).map(|&i| &self.objects[i])
    }

    /// Object listing `component` among its components.
    pub fn owner_of(&self, component: ObjectId) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|o| o.components.contains(&component))
            .map(|o| o.id)
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut SnapshotObject> {
        let position = *self.index.get(&id)?;
        self.objects.get_mut(position)
    }

    fn document(&self, id: DocumentId) -> Option<&SnapshotDocument> {
        self.documents.get(id.0)
    }

    fn document_by_name(&self, name: &str) -> Option<DocumentId> {
        self.documents
            .iter()
            .position(|d| d.name == name)
            .map(DocumentId)
    }
}

impl ObjectGraphSource for Snapshot {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn all_objects(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }

    fn open_documents(&self) -> Vec<DocumentId> {
        self.documents
            .iter()
            .enumerate()
            .filter(|(_, d)| d.open)
            .map(|(i, _)| DocumentId(i))
            .collect()
    }

    fn isolated_document(&self) -> Option<DocumentId> {
        self.document_by_name(self.isolated.as_deref()?)
    }

    fn document_name(&self, document: DocumentId) -> String {
        self.document(document)
            .map(|d| d.name.clone())
            .unwrap_or_default()
    }

    fn root_objects(&self, document: DocumentId) -> Vec<ObjectId> {
        self.document(document)
            .map(|d| d.roots.clone())
            .unwrap_or_default()
    }

    fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        self.object(object)
            .map(|o| o.children.clone())
            .unwrap_or_default()
    }

    fn components(&self, object: ObjectId) -> Vec<ObjectId> {
        self.object(object)
            .map(|o| o.components.clone())
            .unwrap_or_default()
    }

    fn object_name(&self, object: ObjectId) -> String {
        self.object(object)
            .map(|o| o.name.clone())
            .unwrap_or_else(|| format!("<unknown {}>", object))
    }

    fn is_type_resolved(&self, object: ObjectId) -> bool {
        self.object(object).is_some_and(|o| o.type_name.is_some())
    }

    fn is_instance_root(&self, object: ObjectId) -> bool {
        self.object(object)
            .and_then(|o| o.prefab.as_ref())
            .is_some_and(|p| p.root)
    }

    fn is_instance_source_missing(&self, object: ObjectId) -> bool {
        self.object(object)
            .and_then(|o| o.prefab.as_ref())
            .is_some_and(|p| p.missing)
    }

    fn instance_source(&self, object: ObjectId) -> Option<DocumentId> {
        let source = self.object(object)?.prefab.as_ref()?.source.as_deref()?;
        self.document_by_name(source)
    }

    fn document_singletons(&self, document: DocumentId) -> Vec<ObjectId> {
        self.document(document)
            .map(|d| d.singletons.clone())
            .unwrap_or_default()
    }
}

impl PropertyStore for Snapshot {
    fn properties(&self, object: ObjectId) -> Vec<PropertyEntry> {
        self.object(object)
            .map(|o| o.properties.clone())
            .unwrap_or_default()
    }

    fn find_property(&self, object: ObjectId, path: &str) -> Option<PropertyEntry> {
        self.object(object)?.property(path).cloned()
    }

    fn has_method(&self, object: ObjectId, name: &str) -> Result<bool> {
        let Some(target) = self.object(object) else {
            bail!("unknown object {}", object);
        };
        if target.type_name.is_none() {
            bail!("type of object {} is not loaded", object);
        }
        Ok(target.methods.iter().any(|m| m == name))
    }

    fn set_string(&mut self, object: ObjectId, path: &str, value: &str) -> Result<()> {
        let target = self
            .object_mut(object)
            .with_context(|| format!("unknown object {}", object))?;
        let property = target
            .property_mut(path)
            .with_context(|| format!("object {} has no property '{}'", object, path))?;
        property.value = PropertyValue::String(value.to_string());
        Ok(())
    }

    fn qualified_type_name(&self, object: ObjectId) -> Option<String> {
        self.object(object)?.type_name.clone()
    }
}

impl AssemblyUniverse for Snapshot {
    fn assemblies(&self) -> Result<Vec<AssemblyInfo>> {
        Ok(self
            .assemblies
            .iter()
            .map(|a| AssemblyInfo {
                name: a.name.clone(),
            })
            .collect())
    }

    fn exported_types(&self, assembly: &AssemblyInfo) -> Result<Vec<TypeInfo>> {
        let found = self
            .assemblies
            .iter()
            .find(|a| a.name == assembly.name)
            .with_context(|| format!("assembly '{}' is not loaded", assembly.name))?;
        if found.dynamic {
            bail!("cannot enumerate types of dynamic assembly '{}'", found.name);
        }
        Ok(found.types.clone())
    }
}

impl TextDocumentSource for Snapshot {
    fn active_document(&self) -> Option<DocumentId> {
        match self.active.as_deref() {
            Some(name) => self.document_by_name(name),
            None => self.open_documents().into_iter().next(),
        }
    }

    fn document_path(&self, document: DocumentId) -> Option<PathBuf> {
        let doc = self.document(document)?;
        match (&doc.path, &doc.text) {
            (Some(path), _) => Some(self.base_dir.join(path)),
            (None, Some(_)) => Some(PathBuf::from(&doc.name)),
            (None, None) => None,
        }
    }

    fn read_lines(&self, document: DocumentId) -> Result<Vec<String>> {
        let doc = self
            .document(document)
            .with_context(|| format!("unknown document {}", document.0))?;
        if let Some(text) = &doc.text {
            return Ok(text.lines().map(str::to_string).collect());
        }
        let path = self
            .document_path(document)
            .with_context(|| format!("document '{}' has no path", doc.name))?;
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(source.lines().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{CLASS_IDENTIFIER_PATH, stamp_class_identifier};
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> Snapshot {
        Snapshot::from_json(&value.to_string(), PathBuf::new()).unwrap()
    }

    fn sample() -> Snapshot {
        snapshot(json!({
            "active": "Main",
            "documents": [
                { "name": "Main", "text": "a: 1\nb: 2", "roots": [1], "singletons": [9] },
                { "name": "Enemy", "open": false }
            ],
            "objects": [
                { "id": 1, "name": "Player", "type_name": "GameObject", "children": [3], "components": [2] },
                {
                    "id": 2, "name": "Player", "type_name": "Game.Health, Assembly-CSharp, Version=0.0.0.0",
                    "methods": ["Heal"],
                    "properties": [
                        { "path": "m_EditorClassIdentifier", "type_name": "string",
                          "value": { "kind": "string", "value": "" } }
                    ]
                },
                { "id": 3, "name": "Grunt", "prefab": { "root": true, "source": "Enemy", "missing": true } },
                { "id": 9, "name": "RenderSettings", "type_name": "RenderSettings" }
            ],
            "assemblies": [
                { "name": "Assembly-CSharp", "types": [{ "name": "Health", "full_name": "Game.Health" }] },
                { "name": "Generated", "dynamic": true }
            ]
        }))
    }

    #[test]
    fn exposes_graph_structure() {
        let s = sample();
        assert_eq!(s.open_documents(), vec![DocumentId(0)]);
        assert_eq!(s.root_objects(DocumentId(0)), vec![ObjectId(1)]);
        assert_eq!(s.children(ObjectId(1)), vec![ObjectId(3)]);
        assert_eq!(s.components(ObjectId(1)), vec![ObjectId(2)]);
        assert_eq!(s.document_singletons(DocumentId(0)), vec![ObjectId(9)]);
        assert!(s.is_type_resolved(ObjectId(2)));
        assert!(!s.is_type_resolved(ObjectId(3)));
        assert!(!s.is_type_resolved(ObjectId(404)));
        assert_eq!(s.owner_of(ObjectId(2)), Some(ObjectId(1)));
        assert_eq!(s.owner_of(ObjectId(1)), None);
    }

    #[test]
    fn exposes_prefab_links() {
        let s = sample();
        assert!(s.is_instance_root(ObjectId(3)));
        assert!(s.is_instance_source_missing(ObjectId(3)));
        assert_eq!(s.instance_source(ObjectId(3)), Some(DocumentId(1)));
        assert_eq!(s.instance_source(ObjectId(1)), None);
    }

    #[test]
    fn method_lookup_requires_loaded_type() {
        let s = sample();
        assert!(s.has_method(ObjectId(2), "Heal").unwrap());
        assert!(!s.has_method(ObjectId(2), "Explode").unwrap());
        assert!(s.has_method(ObjectId(3), "Heal").is_err());
    }

    #[test]
    fn dynamic_assemblies_fail_enumeration() {
        let s = sample();
        let assemblies = s.assemblies().unwrap();
        assert_eq!(assemblies.len(), 2);
        assert_eq!(s.exported_types(&assemblies[0]).unwrap()[0].name, "Health");
        assert!(s.exported_types(&assemblies[1]).is_err());
    }

    #[test]
    fn reads_inline_text() {
        let s = sample();
        assert_eq!(s.active_document(), Some(DocumentId(0)));
        assert_eq!(s.read_lines(DocumentId(0)).unwrap(), vec!["a: 1", "b: 2"]);
        assert_eq!(s.document_path(DocumentId(1)), None);
    }

    #[test]
    fn reads_text_relative_to_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Main.unity"), "x: 1\n---\ny: 2\n").unwrap();
        let snapshot_path = dir.path().join("snapshot.json");
        std::fs::write(
            &snapshot_path,
            json!({ "documents": [{ "name": "Main", "path": "Main.unity" }] }).to_string(),
        )
        .unwrap();

        let s = Snapshot::load(&snapshot_path).unwrap();
        assert_eq!(
            s.document_path(DocumentId(0)),
            Some(dir.path().join("Main.unity"))
        );
        assert_eq!(s.read_lines(DocumentId(0)).unwrap(), vec!["x: 1", "---", "y: 2"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let raw = json!({
            "documents": [],
            "objects": [{ "id": 1, "name": "a" }, { "id": 1, "name": "b" }]
        })
        .to_string();
        let err = Snapshot::from_json(&raw, PathBuf::new()).unwrap_err();
        assert!(err.to_string().contains("duplicate object id 1"));
    }

    #[test]
    fn rejects_cyclic_children() {
        let raw = json!({
            "documents": [],
            "objects": [
                { "id": 1, "name": "a", "children": [2] },
                { "id": 2, "name": "b", "children": [1] }
            ]
        })
        .to_string();
        let err = Snapshot::from_json(&raw, PathBuf::new()).unwrap_err();
        assert!(err.to_string().contains("is its own ancestor"));
    }

    #[test]
    fn rejects_self_parent() {
        let raw = json!({
            "documents": [],
            "objects": [{ "id": 4, "name": "loop", "children": [4] }]
        })
        .to_string();
        let err = Snapshot::from_json(&raw, PathBuf::new()).unwrap_err();
        assert!(err.to_string().contains("object 4 is its own ancestor"));
    }

    #[test]
    fn rejects_shared_child() {
        let raw = json!({
            "documents": [{ "name": "Main", "roots": [1, 2] }],
            "objects": [
                { "id": 1, "name": "a", "children": [3] },
                { "id": 2, "name": "b", "children": [3] },
                { "id": 3, "name": "shared" }
            ]
        })
        .to_string();
        let err = Snapshot::from_json(&raw, PathBuf::new()).unwrap_err();
        assert!(err.to_string().contains("object 3 is reachable from more than one parent"));
    }

    #[test]
    fn rejects_root_listed_as_child_or_twice() {
        let nested = json!({
            "documents": [{ "name": "Main", "roots": [1, 2] }],
            "objects": [
                { "id": 1, "name": "a", "children": [2] },
                { "id": 2, "name": "b" }
            ]
        })
        .to_string();
        let err = Snapshot::from_json(&nested, PathBuf::new()).unwrap_err();
        assert!(err.to_string().contains("object 2 is reachable from more than one parent"));

        let repeated = json!({
            "documents": [
                { "name": "Main", "roots": [1] },
                { "name": "Other", "roots": [1] }
            ],
            "objects": [{ "id": 1, "name": "a" }]
        })
        .to_string();
        let err = Snapshot::from_json(&repeated, PathBuf::new()).unwrap_err();
        assert!(err.to_string().contains("object 1 is reachable from more than one parent"));
    }

    #[test]
    fn lists_every_object_including_hidden_ones() {
        let s = snapshot(json!({
            "documents": [{ "name": "Main", "roots": [1] }],
            "objects": [
                { "id": 1, "name": "Visible" },
                { "id": 5, "name": "Helper", "hidden": true, "children": [6] },
                { "id": 6, "name": "HelperChild" }
            ]
        }));
        assert_eq!(s.all_objects(), vec![ObjectId(1), ObjectId(5), ObjectId(6)]);
        assert!(s.object(ObjectId(5)).is_some_and(|o| o.hidden));
        assert!(!s.object(ObjectId(1)).is_some_and(|o| o.hidden));
    }

    #[test]
    fn property_lookup_uses_first_entry_per_path() {
        let mut s = snapshot(json!({
            "documents": [],
            "objects": [{ "id": 1, "name": "a", "type_name": "Game.Relay, Game", "properties": [
                { "path": "calls.Array.data[0].m_Target", "type_name": "PPtr<$Object>",
                  "value": { "kind": "string", "value": "first" } },
                { "path": "calls.Array.data[0].m_Target", "type_name": "PPtr<$Object>",
                  "value": { "kind": "string", "value": "second" } },
                { "path": "label", "type_name": "string",
                  "value": { "kind": "string", "value": "" } }
            ]}]
        }));

        let target = s.find_property(ObjectId(1), "calls.Array.data[0].m_Target").unwrap();
        assert_eq!(target.as_str(), Some("first"));
        assert_eq!(s.find_property(ObjectId(1), "calls"), None);
        assert_eq!(s.find_property(ObjectId(2), "label"), None);

        s.set_string(ObjectId(1), "label", "relay").unwrap();
        assert_eq!(s.find_property(ObjectId(1), "label").unwrap().as_str(), Some("relay"));
        assert!(s.set_string(ObjectId(1), "missing", "x").is_err());
    }

    #[test]
    fn stamps_class_identifier_once() {
        let mut s = sample();
        let written = stamp_class_identifier(&mut s, ObjectId(2)).unwrap();
        assert_eq!(written.as_deref(), Some("Game.Health, Assembly-CSharp"));
        let stored = s.find_property(ObjectId(2), CLASS_IDENTIFIER_PATH).unwrap();
        assert_eq!(stored.as_str(), Some("Game.Health, Assembly-CSharp"));

        assert_eq!(stamp_class_identifier(&mut s, ObjectId(2)).unwrap(), None);
    }

    #[test]
    fn stamping_skips_unresolved_objects() {
        let mut s = sample();
        assert_eq!(stamp_class_identifier(&mut s, ObjectId(3)).unwrap(), None);
    }
}
