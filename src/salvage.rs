//! Salvage reads of records whose type no longer resolves.
//!
//! When a component's script is gone the host can no longer show its fields,
//! but the raw serialized document still holds them. This module finds the
//! record by its stored type identifier and recovers `name: value` pairs.
//!
//! The match is textual: the first line containing the identifier starts the
//! record, and the record runs to the next `---` separator. Several components
//! of the same vanished type on one object are not told apart, and the owning
//! object's record is not located first.

use crate::host::{
    DocumentId, ObjectGraphSource, ObjectId, PropertyRef, PropertyStore, ReferenceLocator,
    TextDocumentSource,
};
use serde::Serialize;
use tracing::{debug, warn};

/// Lines starting with this token separate records.
pub const RECORD_SEPARATOR: &str = "---";

/// A recovered `name: value` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalvagedMember {
    pub name: String,
    pub value: String,
    /// Live property with the same name, when the store still knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyRef>,
}

/// What to salvage and where to resolve recovered names.
#[derive(Debug, Clone)]
pub struct SalvageRequest<'a> {
    /// Object owning the record, used for the nested-instance check.
    pub owner: Option<ObjectId>,
    /// Stored type identifier (or identifier plus instance token) to search for.
    pub identifier: &'a str,
    /// Object whose property store resolves recovered names.
    pub subject: ObjectId,
}

/// Recovers the members of the record matching `request.identifier`.
///
/// Returns `None` when the read does not apply (empty identifier, owner
/// instantiated from a nested document that is not open in isolation, no
/// document path, unreadable document, identifier not found).
pub fn read_members<G, S, T>(
    graph: &G,
    store: &S,
    text: &T,
    request: &SalvageRequest<'_>,
) -> Option<Vec<SalvagedMember>>
where
    G: ObjectGraphSource + ?Sized,
    S: PropertyStore + ?Sized,
    T: TextDocumentSource + ?Sized,
{
    if request.identifier.is_empty() {
        return None;
    }

    let isolated = graph.isolated_document();

    // Override records of an instance do not contain the base record.
    if let Some(owner) = request.owner
        && let Some(source) = graph.instance_source(owner)
        && isolated != Some(source)
    {
        debug!(%owner, "skipping salvage for nested instance");
        return None;
    }

    let document = source_document(isolated, text)?;
    let lines = match text.read_lines(document) {
        Ok(lines) => lines,
        Err(err) => {
            warn!("salvage read failed: {err:#}");
            return None;
        }
    };

    let mut members = parse_record(&lines, request.identifier)?;
    for member in &mut members {
        member.property = store
            .find_property(request.subject, &member.name)
            .map(|entry| PropertyRef::new(ReferenceLocator::Live { object: request.subject }, &entry));
    }
    Some(members)
}

fn source_document<T>(isolated: Option<DocumentId>, text: &T) -> Option<DocumentId>
where
    T: TextDocumentSource + ?Sized,
{
    let document = isolated.or_else(|| text.active_document())?;
    text.document_path(document)?;
    Some(document)
}

/// Parses the record that starts after the first line containing `identifier`.
///
/// Returns `None` if no line contains the identifier.
pub fn parse_record<L>(lines: &[L], identifier: &str) -> Option<Vec<SalvagedMember>>
where
    L: AsRef<str>,
{
    let start = lines
        .iter()
        .position(|line| AsRef::<str>::as_ref(line).contains(identifier))?;

    let members = lines[start + 1..]
        .iter()
        .map(AsRef::<str>::as_ref)
        .take_while(|line| !line.starts_with(RECORD_SEPARATOR))
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some(SalvagedMember {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
                property: None,
            })
        })
        .collect();

    Some(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &[&str] = &[
        "%YAML 1.1",
        "--- !u!1 &100",
        "GameObject:",
        "  m_Name: Player",
        "--- !u!114 &200",
        "MonoBehaviour:",
        "  m_GameObject: {fileID: 100}",
        "  m_EditorClassIdentifier: Game.Health, Assembly-CSharp",
        "  maxHealth: 100",
        "  regen: 2.5",
        "  - orphan list item",
        "  target: {fileID: 0}",
        "--- !u!114 &300",
        "MonoBehaviour:",
        "  unrelated: 1",
    ];

    fn pairs(members: &[SalvagedMember]) -> Vec<(&str, &str)> {
        members
            .iter()
            .map(|m| (m.name.as_str(), m.value.as_str()))
            .collect()
    }

    #[test]
    fn recovers_members_until_next_record() {
        let members = parse_record(SCENE, "Game.Health, Assembly-CSharp").unwrap();
        assert_eq!(
            pairs(&members),
            vec![
                ("maxHealth", "100"),
                ("regen", "2.5"),
                ("target", "{fileID: 0}"),
            ]
        );
    }

    #[test]
    fn lines_without_colon_are_skipped() {
        let members = parse_record(SCENE, "Game.Health").unwrap();
        assert!(members.iter().all(|m| !m.name.contains("orphan")));
    }

    #[test]
    fn splits_on_first_colon_only() {
        let lines = ["id: X", "url: http://example.com:8080"];
        let members = parse_record(&lines, "id").unwrap();
        assert_eq!(pairs(&members), vec![("url", "http://example.com:8080")]);
    }

    #[test]
    fn unknown_identifier_yields_none() {
        assert_eq!(parse_record(SCENE, "Game.Missing"), None);
    }

    #[test]
    fn record_at_end_of_document_runs_to_end() {
        let lines = ["--- !u!114 &1", "  m_EditorClassIdentifier: Foo, Bar", "  a: 1", "  b: 2"];
        let members = parse_record(&lines, "Foo, Bar").unwrap();
        assert_eq!(pairs(&members), vec![("a", "1"), ("b", "2")]);
    }

    #[test]
    fn empty_record_yields_empty_members() {
        let lines = ["  m_EditorClassIdentifier: Foo, Bar", "--- !u!1 &2"];
        assert_eq!(parse_record(&lines, "Foo, Bar"), Some(Vec::new()));
    }
}
