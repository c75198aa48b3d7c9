//! Reading exported templates from disk and running the full lint pass.

use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use serde_json::Value;

use crate::error::Result;
use crate::finding::Finding;
use crate::graph::ReferenceGraph;
use crate::model::ResourceSet;
use crate::parser::parse_document;
use crate::rules::RuleEngine;

/// Read and parse an exported ARM template
pub fn load_template<P: AsRef<Path>>(path: P) -> Result<ResourceSet> {
    let path = path.as_ref();
    debug!("Reading template from {}", path.display());

    let content = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;
    let resources = parse_document(&document)?;

    info!("Loaded {} resources from {}", resources.len(), path.display());
    Ok(resources)
}

/// Build the reference graph and run every rule in `engine`
pub fn lint_resources(resources: &ResourceSet, engine: &RuleEngine) -> Vec<Finding> {
    let graph = ReferenceGraph::build(resources);
    debug!("Reference graph has {} edges", graph.edge_count());
    for missing in graph.all_missing() {
        warn!("{} references undeclared {}", missing.from, missing.to);
    }
    engine.run_all(resources, &graph)
}

/// Parse an already decoded document and lint it
pub fn lint_document(document: &Value, engine: &RuleEngine) -> Result<Vec<Finding>> {
    let resources = parse_document(document)?;
    Ok(lint_resources(&resources, engine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LintError;
    use crate::rules::RuleSettings;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_template(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_template_reads_resources() {
        let file = write_template(
            &json!({
                "resources": [
                    {
                        "name": "[concat(parameters('factoryName'), '/PL_Load')]",
                        "type": "Microsoft.DataFactory/factories/pipelines",
                        "properties": { "activities": [] }
                    }
                ]
            })
            .to_string(),
        );

        let resources = load_template(file.path()).unwrap();
        assert_eq!(resources.len(), 1);
    }

    #[test]
    fn test_load_template_missing_file() {
        let result = load_template("/definitely/not/here.json");
        assert!(matches!(result, Err(LintError::Io(_))));
    }

    #[test]
    fn test_load_template_invalid_json() {
        let file = write_template("{ not json");
        assert!(matches!(load_template(file.path()), Err(LintError::Json(_))));
    }

    #[test]
    fn test_load_template_without_resources() {
        let file = write_template(r#"{"parameters": {}}"#);
        assert!(matches!(
            load_template(file.path()),
            Err(LintError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_lint_document_empty_template_has_no_findings() {
        let engine = RuleEngine::with_defaults(RuleSettings::default());
        let findings = lint_document(&json!({ "resources": [] }), &engine).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_lint_document_reports_undeclared_reference() {
        let engine = RuleEngine::with_defaults(RuleSettings::default())
            .select(&["dangling-reference".to_string()])
            .unwrap();
        let document = json!({
            "resources": [{
                "name": "[concat(parameters('factoryName'), '/DS_Sales')]",
                "type": "Microsoft.DataFactory/factories/datasets",
                "properties": {
                    "linkedServiceName": { "referenceName": "LS_Gone", "type": "LinkedServiceReference" }
                }
            }]
        });

        let findings = lint_document(&document, &engine).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].resource, "DS_Sales");
        assert!(findings[0].message.contains("LS_Gone"));
    }
}
