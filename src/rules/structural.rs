//! Checks that look beyond a single field: the reference graph, credentials
//! spread over several properties, parse notes.

use serde_json::Value;

use crate::error::{LintError, Result};
use crate::finding::Severity;
use crate::model::ResourceKind;

use super::{PIPELINES, Rule, RuleContext, Scope, Subject};

const LINKED_SERVICES: &[ResourceKind] = &[ResourceKind::LinkedService];

/// Pipelines nothing starts: no trigger reaches them and no other pipeline calls them
pub struct MasterPipelineRule;

impl Rule for MasterPipelineRule {
    fn id(&self) -> &str {
        "master-pipeline-without-trigger"
    }

    fn description(&self) -> &str {
        "Master Pipeline(s) without any triggers attached. Directly or indirectly."
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn scope(&self) -> Scope {
        Scope::Kinds(PIPELINES)
    }

    fn evaluate(&self, subject: Subject<'_>, ctx: &RuleContext<'_>) -> Result<Vec<String>> {
        let Some(pipeline) = subject.resource() else {
            return Ok(Vec::new());
        };
        let id = pipeline.id();
        if ctx.graph.is_trigger_reachable(id) || !ctx.graph.is_call_root(id) {
            // Child pipelines are reported through the master that calls them
            return Ok(Vec::new());
        }

        if ctx.graph.pipeline_callers(id).next().is_none() {
            Ok(vec!["Does not have any triggers attached.".to_string()])
        } else {
            Ok(vec![
                "Does not have any triggers attached; only called from its own pipeline call cycle.".to_string(),
            ])
        }
    }
}

/// Resources of one kind that nothing uses
pub struct OrphanRule {
    kind: ResourceKind,
    id: String,
    description: String,
    kinds: &'static [ResourceKind],
}

impl OrphanRule {
    pub fn new(kind: ResourceKind) -> Self {
        let (slug, plural, kinds): (&str, &str, &'static [ResourceKind]) = match kind {
            ResourceKind::Pipeline => ("pipeline", "Pipeline(s)", &[ResourceKind::Pipeline]),
            ResourceKind::Dataset => ("dataset", "Dataset(s)", &[ResourceKind::Dataset]),
            ResourceKind::LinkedService => ("linked-service", "Linked Service(s)", &[ResourceKind::LinkedService]),
            ResourceKind::Trigger => ("trigger", "Trigger(s)", &[ResourceKind::Trigger]),
            ResourceKind::DataFlow => ("data-flow", "Data Flow(s)", &[ResourceKind::DataFlow]),
        };

        let description = match kind {
            ResourceKind::Trigger => format!("{} not attached to any pipeline.", plural),
            _ => format!("{} not used by any other resource.", plural),
        };

        Self {
            kind,
            id: format!("orphaned-{}", slug),
            description,
            kinds,
        }
    }
}

impl Rule for OrphanRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn scope(&self) -> Scope {
        Scope::Kinds(self.kinds)
    }

    fn evaluate(&self, subject: Subject<'_>, ctx: &RuleContext<'_>) -> Result<Vec<String>> {
        let Some(resource) = subject.resource() else {
            return Ok(Vec::new());
        };
        if resource.kind() != self.kind || !ctx.graph.is_orphaned(resource.id()) {
            return Ok(Vec::new());
        }

        let message = match self.kind {
            ResourceKind::Trigger => "Not attached to any pipeline.",
            _ => "Not used by any other resource.",
        };
        Ok(vec![message.to_string()])
    }
}

/// Credentials held inline in a linked service instead of in Key Vault
pub struct KeyVaultRule;

impl KeyVaultRule {
    /// Whether a property value pulls its secret from Key Vault
    fn is_key_vault_secret(value: &Value) -> bool {
        match value {
            Value::Object(map) => {
                map.get("type").and_then(Value::as_str) == Some("AzureKeyVaultSecret")
                    || map.contains_key("secretName")
            }
            other => other.to_string().contains("secretName"),
        }
    }
}

impl Rule for KeyVaultRule {
    fn id(&self) -> &str {
        "linked-service-key-vault"
    }

    fn description(&self) -> &str {
        "Linked Service(s) not using Azure Key Vault to store credentials."
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn scope(&self) -> Scope {
        Scope::Kinds(LINKED_SERVICES)
    }

    fn evaluate(&self, subject: Subject<'_>, ctx: &RuleContext<'_>) -> Result<Vec<String>> {
        let Some(service) = subject.resource() else {
            return Ok(Vec::new());
        };
        if service.declared_type() == Some("AzureKeyVault") {
            return Ok(Vec::new());
        }

        let properties = match service.payload().get("typeProperties") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(LintError::rule(self.id(), "typeProperties is not an object"));
            }
        };

        Ok(properties
            .iter()
            .filter(|(name, value)| ctx.settings.is_sensitive_property(name) && !Self::is_key_vault_secret(value))
            .map(|(name, _)| format!("Property '{}' is not stored in Key Vault.", name))
            .collect())
    }
}

/// References to resources that are not in the document
pub struct DanglingReferenceRule;

impl Rule for DanglingReferenceRule {
    fn id(&self) -> &str {
        "dangling-reference"
    }

    fn description(&self) -> &str {
        "Resource(s) referencing a resource that is not declared in the template."
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn scope(&self) -> Scope {
        Scope::ALL_KINDS
    }

    fn evaluate(&self, subject: Subject<'_>, ctx: &RuleContext<'_>) -> Result<Vec<String>> {
        let Some(resource) = subject.resource() else {
            return Ok(Vec::new());
        };
        Ok(ctx
            .graph
            .missing_references(resource.id())
            .map(|missing| format!("References {}, which is not declared in the template.", missing))
            .collect())
    }
}

/// Non-fatal problems the parser found inside a resource
pub struct MissingFieldRule;

impl Rule for MissingFieldRule {
    fn id(&self) -> &str {
        "missing-field"
    }

    fn description(&self) -> &str {
        "Resource(s) with malformed or missing fields that were ignored."
    }

    fn severity(&self) -> Severity {
        Severity::Low
    }

    fn scope(&self) -> Scope {
        Scope::ALL_KINDS
    }

    fn evaluate(&self, subject: Subject<'_>, _ctx: &RuleContext<'_>) -> Result<Vec<String>> {
        Ok(subject
            .resource()
            .map(|resource| resource.notes().to_vec())
            .unwrap_or_default())
    }
}
