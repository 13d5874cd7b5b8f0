//! Capabilities the engine consumes from its host.
//!
//! The scanner, classifier, salvage reader and candidate search never talk to
//! an editor directly. Everything they need is expressed through the traits in
//! this module; `crate::snapshot` and `crate::project` provide file-backed
//! implementations.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Identity of a live object (game object, component or settings object).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub i64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an open document (scene or prefab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub usize);

/// A place in the graph.
///
/// Either a live object, or the stored type name plus serialized location when
/// the object's type no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceLocator {
    Live { object: ObjectId },
    Unresolved { type_name: String, location: ObjectId },
}

impl ReferenceLocator {
    /// The object id this locator points at, live or not.
    pub fn object_id(&self) -> ObjectId {
        match self {
            ReferenceLocator::Live { object } => *object,
            ReferenceLocator::Unresolved { location, .. } => *location,
        }
    }
}

/// Declared kind of a serialized property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// A plain object reference.
    Reference,
    /// A compound property with nested sub-fields.
    Generic,
    /// Anything else: numbers, strings, enums.
    Primitive,
}

/// Current value of a serialized property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    /// `target` is the resolved object, `raw_id` the stored identifier.
    Reference {
        target: Option<ObjectId>,
        raw_id: i64,
    },
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Enum(i32),
    Compound,
}

/// One entry of an object's property iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyEntry {
    /// Dotted property path, e.g. `onClick.m_PersistentCalls.m_Calls.Array.data[0]`.
    pub path: String,
    /// Declared field type name as the host reports it.
    pub type_name: String,
    /// Declared type of the referenced object, for reference properties.
    ///
    /// Hosts that cannot expose it leave this empty and diagnostics fall back
    /// to `type_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
    pub value: PropertyValue,
}

impl PropertyEntry {
    pub fn kind(&self) -> PropertyKind {
        match self.value {
            PropertyValue::Reference { .. } => PropertyKind::Reference,
            PropertyValue::Compound => PropertyKind::Generic,
            _ => PropertyKind::Primitive,
        }
    }

    /// Resolved target of a reference property.
    pub fn reference_target(&self) -> Option<ObjectId> {
        match self.value {
            PropertyValue::Reference { target, .. } => target,
            _ => None,
        }
    }

    /// Stored raw identifier of a reference property, zero otherwise.
    pub fn raw_target_id(&self) -> i64 {
        match self.value {
            PropertyValue::Reference { raw_id, .. } => raw_id,
            _ => 0,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn enum_index(&self) -> Option<i32> {
        match self.value {
            PropertyValue::Enum(i) => Some(i),
            PropertyValue::Integer(i) => i32::try_from(i).ok(),
            _ => None,
        }
    }

    /// Label used by diagnostics: the referenced type for references, the
    /// declared type otherwise.
    pub fn display_type(&self) -> &str {
        match (self.kind(), &self.reference_type) {
            (PropertyKind::Reference, Some(t)) => t,
            _ => &self.type_name,
        }
    }
}

/// Handle to a property of an object, held by scan results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRef {
    pub owner: ReferenceLocator,
    pub path: String,
    pub kind: PropertyKind,
    pub type_name: String,
}

impl PropertyRef {
    pub fn new(owner: ReferenceLocator, entry: &PropertyEntry) -> Self {
        Self {
            owner,
            path: entry.path.clone(),
            kind: entry.kind(),
            type_name: entry.display_type().to_string(),
        }
    }
}

/// Enumeration of documents and their structural object graph.
pub trait ObjectGraphSource {
    /// Whether the host is in a stable state. Scans refuse to run otherwise.
    fn is_ready(&self) -> bool {
        true
    }

    /// Documents currently open, in host order.
    fn open_documents(&self) -> Vec<DocumentId>;

    /// Document being edited in isolation, if any.
    fn isolated_document(&self) -> Option<DocumentId> {
        None
    }

    fn document_name(&self, document: DocumentId) -> String;

    fn root_objects(&self, document: DocumentId) -> Vec<ObjectId>;

    fn children(&self, object: ObjectId) -> Vec<ObjectId>;

    fn components(&self, object: ObjectId) -> Vec<ObjectId>;

    fn object_name(&self, object: ObjectId) -> String;

    /// False when the object's backing type could not be resolved.
    fn is_type_resolved(&self, object: ObjectId) -> bool;

    /// Whether the object is the root of an instantiated external document.
    fn is_instance_root(&self, _object: ObjectId) -> bool {
        false
    }

    /// Whether an instance root's source document can no longer be found.
    fn is_instance_source_missing(&self, _object: ObjectId) -> bool {
        false
    }

    /// Nested document the object was instantiated from, if any.
    fn instance_source(&self, _object: ObjectId) -> Option<DocumentId> {
        None
    }

    /// Document-wide settings objects (render settings, lighting settings).
    fn document_singletons(&self, _document: DocumentId) -> Vec<ObjectId> {
        Vec::new()
    }

    /// Every loaded object, including hidden ones outside any hierarchy.
    ///
    /// The default only sees what hangs off the roots of the isolated and
    /// open documents, each object once.
    fn all_objects(&self) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        let mut pending = Vec::new();
        let documents = self.isolated_document().into_iter().chain(self.open_documents());
        for document in documents {
            pending.extend(self.root_objects(document).into_iter().rev());
            while let Some(object) = pending.pop() {
                if seen.insert(object) {
                    found.push(object);
                    pending.extend(self.children(object).into_iter().rev());
                }
            }
        }
        found
    }
}

/// Serialized property access for live objects.
pub trait PropertyStore {
    /// All properties of `object` in iteration order, nested sub-fields included.
    fn properties(&self, object: ObjectId) -> Vec<PropertyEntry>;

    fn find_property(&self, object: ObjectId, path: &str) -> Option<PropertyEntry>;

    /// Whether the runtime type of `object` exposes a public method `name`.
    fn has_method(&self, object: ObjectId, name: &str) -> Result<bool>;

    /// Writes a string property.
    fn set_string(&mut self, object: ObjectId, path: &str, value: &str) -> Result<()>;

    /// Runtime type name of a live object, assembly-qualified.
    fn qualified_type_name(&self, object: ObjectId) -> Option<String>;
}

/// A loaded assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssemblyInfo {
    pub name: String,
}

/// A type exported by an assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Simple name, e.g. `Health`.
    pub name: String,
    /// Namespace-qualified name, e.g. `Game.Combat.Health`.
    pub full_name: String,
}

/// The set of currently loaded assemblies.
pub trait AssemblyUniverse {
    fn assemblies(&self) -> Result<Vec<AssemblyInfo>>;

    /// Exported types of one assembly. Dynamic assemblies fail.
    fn exported_types(&self, assembly: &AssemblyInfo) -> Result<Vec<TypeInfo>>;
}

/// A resolved asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetHandle {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

/// Lookup of project assets.
pub trait AssetIndex {
    /// Asset paths whose file stem equals `simple_name`, `/`-separated.
    fn find_by_name(&self, simple_name: &str) -> Vec<String>;

    fn load(&self, path: &str) -> Result<AssetHandle>;
}

/// Raw serialized text of documents.
pub trait TextDocumentSource {
    /// The active top-level document.
    fn active_document(&self) -> Option<DocumentId>;

    fn document_path(&self, document: DocumentId) -> Option<PathBuf>;

    fn read_lines(&self, document: DocumentId) -> Result<Vec<String>>;
}

/// Everything a scan needs from one host.
pub trait SceneHost: ObjectGraphSource + PropertyStore + TextDocumentSource {}

impl<T> SceneHost for T where T: ObjectGraphSource + PropertyStore + TextDocumentSource + ?Sized {}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(target: Option<i64>, raw_id: i64) -> PropertyEntry {
        PropertyEntry {
            path: "target".to_string(),
            type_name: "PPtr<$GameObject>".to_string(),
            reference_type: Some("GameObject".to_string()),
            value: PropertyValue::Reference {
                target: target.map(ObjectId),
                raw_id,
            },
        }
    }

    #[test]
    fn kind_follows_value() {
        assert_eq!(reference(None, 0).kind(), PropertyKind::Reference);
        let compound = PropertyEntry {
            path: "onClick".to_string(),
            type_name: "ButtonClickedEvent".to_string(),
            reference_type: None,
            value: PropertyValue::Compound,
        };
        assert_eq!(compound.kind(), PropertyKind::Generic);
        let number = PropertyEntry {
            value: PropertyValue::Integer(3),
            ..compound
        };
        assert_eq!(number.kind(), PropertyKind::Primitive);
        assert_eq!(number.enum_index(), Some(3));
    }

    #[test]
    fn display_type_prefers_reference_type() {
        assert_eq!(reference(None, 7).display_type(), "GameObject");
        let mut entry = reference(None, 7);
        entry.reference_type = None;
        assert_eq!(entry.display_type(), "PPtr<$GameObject>");
    }

    /// Two documents sharing object 2, with a child loop back to the root.
    struct Looped;

    impl ObjectGraphSource for Looped {
        fn open_documents(&self) -> Vec<DocumentId> {
            vec![DocumentId(0), DocumentId(1)]
        }

        fn document_name(&self, document: DocumentId) -> String {
            format!("doc{}", document.0)
        }

        fn root_objects(&self, document: DocumentId) -> Vec<ObjectId> {
            match document.0 {
                0 => vec![ObjectId(1)],
                _ => vec![ObjectId(2)],
            }
        }

        fn children(&self, object: ObjectId) -> Vec<ObjectId> {
            match object.0 {
                1 => vec![ObjectId(2), ObjectId(3)],
                2 => vec![ObjectId(1)],
                _ => Vec::new(),
            }
        }

        fn components(&self, _object: ObjectId) -> Vec<ObjectId> {
            Vec::new()
        }

        fn object_name(&self, object: ObjectId) -> String {
            object.to_string()
        }

        fn is_type_resolved(&self, _object: ObjectId) -> bool {
            true
        }
    }

    #[test]
    fn default_object_walk_visits_each_object_once() {
        assert_eq!(
            Looped.all_objects(),
            vec![ObjectId(1), ObjectId(2), ObjectId(3)]
        );
    }

    #[test]
    fn property_value_deserializes_tagged() {
        let value: PropertyValue =
            serde_json::from_str(r#"{"kind":"reference","value":{"target":null,"raw_id":42}}"#)
                .unwrap();
        assert_eq!(
            value,
            PropertyValue::Reference {
                target: None,
                raw_id: 42
            }
        );
    }
}
