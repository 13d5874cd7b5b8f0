//! Type identifiers stored on serialized objects.
//!
//! A resolved object remembers its own type as `"TypeName, AssemblyName"` in
//! the `m_EditorClassIdentifier` property. Once the type is gone, that string
//! is all that is left to search candidates and salvage data with.

use crate::host::{ObjectId, PropertyStore};
use anyhow::Result;

/// Property holding the stored type identifier.
pub const CLASS_IDENTIFIER_PATH: &str = "m_EditorClassIdentifier";

/// A parsed `"TypeName, AssemblyName[, ...]"` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub type_name: String,
    pub assembly_name: String,
}

impl TypeDescriptor {
    /// Parses a descriptor. Returns `None` with fewer than two tokens or when
    /// either of the first two is blank. Extra tokens are ignored.
    pub fn parse(descriptor: &str) -> Option<Self> {
        let mut tokens = descriptor.split(',').map(str::trim);
        let type_name = tokens.next()?;
        let assembly_name = tokens.next()?;
        if type_name.is_empty() || assembly_name.is_empty() {
            return None;
        }
        Some(Self {
            type_name: type_name.to_string(),
            assembly_name: assembly_name.to_string(),
        })
    }

    /// Last segment of a namespace-qualified type name.
    pub fn simple_name(&self) -> &str {
        self.type_name.rsplit('.').next().unwrap_or(&self.type_name)
    }
}

/// Truncates an assembly-qualified name to `"TypeName, AssemblyName"`.
pub fn class_identifier(qualified_name: &str) -> String {
    qualified_name
        .split(',')
        .take(2)
        .collect::<Vec<_>>()
        .join(",")
}

/// Stores the runtime type identifier of `object` in its class identifier
/// property.
///
/// Returns the written identifier, or `None` when the object has no runtime
/// type, no identifier property, or already stores a matching value.
pub fn stamp_class_identifier<S>(store: &mut S, object: ObjectId) -> Result<Option<String>>
where
    S: PropertyStore + ?Sized,
{
    let Some(qualified) = store.qualified_type_name(object) else {
        return Ok(None);
    };
    let Some(property) = store.find_property(object, CLASS_IDENTIFIER_PATH) else {
        return Ok(None);
    };
    let identifier = class_identifier(&qualified);
    if property.as_str().is_some_and(|s| s.starts_with(&identifier)) {
        return Ok(None);
    }
    store.set_string(object, CLASS_IDENTIFIER_PATH, &identifier)?;
    Ok(Some(identifier))
}
