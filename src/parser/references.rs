//! Reference extraction from resource bodies.
//!
//! Two patterns are recognised:
//! - reference objects anywhere in `properties`: `{ "referenceName": "X", "type": "DatasetReference" }`
//! - `dependsOn` entries naming another factory resource

use serde_json::Value;

use crate::model::{ResourceId, ResourceKind};

use super::names::parse_dependency_id;

/// Collect every resource named by `properties` and `dependsOn` that a resource of
/// `owner` kind may reference. Order is discovery order; duplicates are kept here and
/// dropped when attached to the resource.
pub fn extract_references(owner: ResourceKind, properties: &Value, depends_on: Option<&Value>) -> Vec<ResourceId> {
    let mut found = Vec::new();
    collect_reference_objects(properties, &mut found);

    if let Some(Value::Array(entries)) = depends_on {
        found.extend(entries.iter().filter_map(Value::as_str).filter_map(parse_dependency_id));
    }

    found.retain(|id| owner.can_reference(id.kind));
    found
}

fn collect_reference_objects(value: &Value, found: &mut Vec<ResourceId>) {
    match value {
        Value::Object(map) => {
            if let (Some(Value::String(name)), Some(Value::String(reference_type))) =
                (map.get("referenceName"), map.get("type"))
                && let Some(kind) = ResourceKind::from_reference_type(reference_type)
            {
                found.push(ResourceId::new(kind, name.as_str()));
            }
            for child in map.values() {
                collect_reference_objects(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_reference_objects(item, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_nested_reference_objects() {
        let properties = json!({
            "activities": [{
                "name": "Copy",
                "type": "Copy",
                "inputs": [{ "referenceName": "DS_In", "type": "DatasetReference" }],
                "outputs": [{ "referenceName": "DS_Out", "type": "DatasetReference" }],
                "linkedServiceName": { "referenceName": "LS_Func", "type": "LinkedServiceReference" }
            }]
        });

        let refs = extract_references(ResourceKind::Pipeline, &properties, None);
        assert!(refs.contains(&ResourceId::new(ResourceKind::Dataset, "DS_In")));
        assert!(refs.contains(&ResourceId::new(ResourceKind::Dataset, "DS_Out")));
        assert!(refs.contains(&ResourceId::new(ResourceKind::LinkedService, "LS_Func")));
        assert_eq!(refs.len(), 3);
    }

    #[test]
    fn test_ignores_expression_reference_names() {
        let properties = json!({
            "pipeline": {
                "referenceName": { "value": "@pipeline().parameters.child", "type": "Expression" },
                "type": "PipelineReference"
            }
        });

        let refs = extract_references(ResourceKind::Pipeline, &properties, None);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_depends_on_entries_are_references() {
        let depends_on = json!([
            "[concat(variables('factoryId'), '/pipelines/PL_Main')]",
            "[concat(variables('factoryId'), '/integrationRuntimes/IR')]"
        ]);

        let refs = extract_references(ResourceKind::Trigger, &json!({}), Some(&depends_on));
        assert_eq!(refs, vec![ResourceId::new(ResourceKind::Pipeline, "PL_Main")]);
    }

    #[test]
    fn test_filters_kinds_owner_cannot_reference() {
        let properties = json!({
            "linkedServiceName": { "referenceName": "LS", "type": "LinkedServiceReference" },
            "other": { "referenceName": "PL", "type": "PipelineReference" }
        });

        let refs = extract_references(ResourceKind::Dataset, &properties, None);
        assert_eq!(refs, vec![ResourceId::new(ResourceKind::LinkedService, "LS")]);
    }

    #[test]
    fn test_data_flow_flowlet_reference() {
        let properties = json!({
            "type": "MappingDataFlow",
            "typeProperties": {
                "sources": [{ "dataset": { "referenceName": "DS_Raw", "type": "DatasetReference" } }],
                "transformations": [{
                    "name": "Clean",
                    "flowlet": { "referenceName": "FL_Clean", "type": "DataFlowReference" }
                }]
            }
        });
        let depends_on = json!(["[concat(variables('factoryId'), '/dataflows/FL_Clean')]"]);

        let refs = extract_references(ResourceKind::DataFlow, &properties, Some(&depends_on));
        assert_eq!(
            refs,
            vec![
                ResourceId::new(ResourceKind::Dataset, "DS_Raw"),
                ResourceId::new(ResourceKind::DataFlow, "FL_Clean"),
                ResourceId::new(ResourceKind::DataFlow, "FL_Clean"),
            ]
        );
    }
}
