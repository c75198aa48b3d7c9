//! Document parser: exported template -> typed resource table.
//!
//! Only the structure needed to identify resources is mandatory. Everything else
//! is read leniently: unknown fields stay in the payload, malformed non-essential
//! fields become notes on the resource.

pub mod activities;
pub mod names;
pub mod references;

use log::debug;
use serde_json::{Map, Value};

use crate::error::{LintError, Result};
use crate::model::{Resource, ResourceKind, ResourceSet};

pub use activities::parse_activities;
pub use names::{clean_name, parse_dependency_id, type_segment};
pub use references::extract_references;

/// Parse a decoded template into a resource table.
///
/// Fails only when the `resources` list is absent, an entry is not an object,
/// an entry lacks `type` or `name`, or a `(kind, name)` pair repeats.
pub fn parse_document(document: &Value) -> Result<ResourceSet> {
    let entries = document
        .get("resources")
        .and_then(Value::as_array)
        .ok_or_else(|| LintError::malformed("template has no top-level 'resources' array"))?;

    let mut set = ResourceSet::new();
    for (index, entry) in entries.iter().enumerate() {
        if let Some(resource) = parse_resource(entry, index)? {
            set.insert(resource)?;
        }
    }

    debug!("Parsed {} resources from {} template entries", set.len(), entries.len());
    Ok(set)
}

/// Parse one entry of the `resources` list; entries of kinds the linter does not
/// model are skipped.
pub fn parse_resource(entry: &Value, index: usize) -> Result<Option<Resource>> {
    let object = entry
        .as_object()
        .ok_or_else(|| LintError::malformed(format!("resource #{} is not an object", index)))?;

    let raw_type = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| LintError::malformed(format!("resource #{} has no 'type'", index)))?;
    let raw_name = object
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| LintError::malformed(format!("resource #{} has no 'name'", index)))?;

    let Some(kind) = ResourceKind::from_segment(type_segment(raw_type)) else {
        debug!("Skipping resource #{} of unmodelled type {}", index, raw_type);
        return Ok(None);
    };

    let name = clean_name(raw_name);
    if name.is_empty() {
        return Err(LintError::malformed(format!(
            "resource #{} has an empty name ({})",
            index, raw_name
        )));
    }

    let empty = Value::Object(Map::new());
    let properties = object.get("properties").unwrap_or(&empty);

    let mut notes = Vec::new();
    if !properties.is_object() {
        notes.push("properties is not an object".to_string());
    }

    let mut resource = Resource::new(kind, name).with_payload(properties.clone());

    if let Some(description) = activities::non_empty_str(properties.get("description")) {
        resource = resource.with_description(description);
    }
    if let Some(folder) = activities::non_empty_str(properties.get("folder").and_then(|f| f.get("name"))) {
        resource = resource.with_folder(folder);
    }
    resource = resource.with_annotations(parse_annotations(properties.get("annotations"), &mut notes));

    if kind == ResourceKind::Pipeline
        && let Some(list) = properties.get("activities")
    {
        resource = resource.with_activities(parse_activities(list, "", &mut notes));
    }

    for reference in extract_references(kind, properties, object.get("dependsOn")) {
        resource = resource.with_reference(reference);
    }

    for note in notes {
        resource = resource.with_note(note);
    }

    Ok(Some(resource))
}

fn parse_annotations(value: Option<&Value>, notes: &mut Vec<String>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(_) => {
            notes.push("annotations is not a list".to_string());
            Vec::new()
        }
    }
}
