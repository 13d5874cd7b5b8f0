//! Per-object missing reference classification.
//!
//! Walks every serialized property of one object and decides, per property,
//! whether it is a missing reference. Two kinds of property can be flagged:
//!
//! - plain object references that once pointed somewhere (non-zero raw id)
//!   but no longer resolve,
//! - persisted event calls whose target is empty, whose method is unset, or
//!   whose method does not exist on the target's type.
//!
//! Classification never fails. Method lookup errors are logged and the call
//! is treated as missing.

use crate::config::ScanOptions;
use crate::host::{ObjectId, PropertyEntry, PropertyKind, PropertyRef, PropertyStore, ReferenceLocator};
use tracing::warn;

/// Path fragment identifying elements of a persisted call list.
pub const PERSISTENT_CALLS_MARKER: &str = "m_PersistentCalls.m_Calls.Array.data[";
const TARGET_FIELD: &str = "m_Target";
const METHOD_NAME_FIELD: &str = "m_MethodName";
const CALL_STATE_FIELD: &str = "m_CallState";

/// Call state index meaning "off".
const CALL_STATE_OFF: i32 = 0;

/// Returns the properties of `object` that hold missing references, in
/// property iteration order.
pub fn classify<S>(store: &S, object: ObjectId, options: &ScanOptions) -> Vec<PropertyRef>
where
    S: PropertyStore + ?Sized,
{
    store
        .properties(object)
        .iter()
        .filter(|entry| is_missing(store, object, entry, options))
        .map(|entry| PropertyRef::new(ReferenceLocator::Live { object }, entry))
        .collect()
}

/// Decides whether a single property of `object` is a missing reference.
pub fn is_missing<S>(store: &S, object: ObjectId, entry: &PropertyEntry, options: &ScanOptions) -> bool
where
    S: PropertyStore + ?Sized,
{
    match entry.kind() {
        // A null value with a zero raw id is an intentionally unset field.
        PropertyKind::Reference => entry.reference_target().is_none() && entry.raw_target_id() != 0,
        PropertyKind::Generic if entry.path.contains(PERSISTENT_CALLS_MARKER) => {
            options.any_event_checks() && is_missing_event_call(store, object, &entry.path, options)
        }
        _ => false,
    }
}

fn is_missing_event_call<S>(store: &S, object: ObjectId, path: &str, options: &ScanOptions) -> bool
where
    S: PropertyStore + ?Sized,
{
    let relative = |field: &str| store.find_property(object, &format!("{}.{}", path, field));

    let (Some(target), Some(method)) = (relative(TARGET_FIELD), relative(METHOD_NAME_FIELD)) else {
        return false;
    };

    if relative(CALL_STATE_FIELD).and_then(|s| s.enum_index()) == Some(CALL_STATE_OFF) {
        return false;
    }

    let Some(target_object) = target.reference_target() else {
        // A dangling target is reported through the target field itself.
        if target.raw_target_id() != 0 {
            return false;
        }
        return options.include_empty_events;
    };

    let method_name = method.as_str().unwrap_or_default();
    if method_name.is_empty() {
        return options.include_unset_methods;
    }

    if !options.include_missing_methods {
        return false;
    }

    match store.has_method(target_object, method_name) {
        Ok(found) => !found,
        Err(err) => {
            warn!(
                path,
                method = method_name,
                "method lookup failed, treating as missing: {err:#}"
            );
            true
        }
    }
}
