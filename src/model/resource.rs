//! Resource declarations and the by-kind resource table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LintError, Result};

use super::activity::{Activity, ActivityScope, collect_scopes};

/// The resource kinds the linter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Pipeline,
    Dataset,
    LinkedService,
    Trigger,
    DataFlow,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Pipeline,
        ResourceKind::Dataset,
        ResourceKind::LinkedService,
        ResourceKind::Trigger,
        ResourceKind::DataFlow,
    ];

    /// Parse the plural path segment used in template types and `dependsOn` ids,
    /// e.g. `pipelines` or `linkedServices`.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "pipelines" => Some(Self::Pipeline),
            "datasets" => Some(Self::Dataset),
            "linkedservices" => Some(Self::LinkedService),
            "triggers" => Some(Self::Trigger),
            "dataflows" => Some(Self::DataFlow),
            _ => None,
        }
    }

    /// Parse the `type` of a reference object, e.g. `DatasetReference`.
    pub fn from_reference_type(reference_type: &str) -> Option<Self> {
        match reference_type {
            "PipelineReference" => Some(Self::Pipeline),
            "DatasetReference" => Some(Self::Dataset),
            "LinkedServiceReference" => Some(Self::LinkedService),
            "DataFlowReference" => Some(Self::DataFlow),
            _ => None,
        }
    }

    /// Whether a resource of this kind may legitimately name a resource of `target` kind.
    pub fn can_reference(self, target: ResourceKind) -> bool {
        use ResourceKind::*;
        match self {
            Pipeline => matches!(target, Pipeline | Dataset | LinkedService | DataFlow),
            Dataset => matches!(target, LinkedService),
            LinkedService => matches!(target, LinkedService),
            Trigger => matches!(target, Pipeline),
            DataFlow => matches!(target, Dataset | LinkedService | DataFlow),
        }
    }

    /// Human readable label used in reports
    pub fn label(self) -> &'static str {
        match self {
            Self::Pipeline => "Pipeline",
            Self::Dataset => "Dataset",
            Self::LinkedService => "Linked Service",
            Self::Trigger => "Trigger",
            Self::DataFlow => "Data Flow",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of a resource: names are unique within a kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

/// A single declared resource.
///
/// Built once by the parser; read-only afterwards, so fields are exposed
/// through accessors only.
#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    folder: Option<String>,
    description: Option<String>,
    annotations: Vec<String>,
    payload: Value,
    references: Vec<ResourceId>,
    notes: Vec<String>,
    activities: Vec<Activity>,
}

impl Resource {
    /// Create a resource with an empty payload
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(kind, name),
            folder: None,
            description: None,
            annotations: Vec::new(),
            payload: Value::Null,
            references: Vec::new(),
            notes: Vec::new(),
            activities: Vec::new(),
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<String>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_activities(mut self, activities: Vec<Activity>) -> Self {
        self.activities = activities;
        self
    }

    /// Add a reference, skipping self references and duplicates
    pub fn with_reference(mut self, target: ResourceId) -> Self {
        if target != self.id && !self.references.contains(&target) {
            self.references.push(target);
        }
        self
    }

    /// Record a non-fatal problem found while parsing this resource
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.id.kind
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    /// The full `properties` object as declared
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Resources named in this resource's body, in discovery order
    pub fn references(&self) -> &[ResourceId] {
        &self.references
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Top-level activities (pipelines only)
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    /// Every activity of the pipeline, nested branches included, depth first
    pub fn all_activities(&self) -> Vec<&Activity> {
        let mut out = Vec::new();
        let mut stack: Vec<&Activity> = self.activities.iter().rev().collect();
        while let Some(activity) = stack.pop() {
            out.push(activity);
            for branch in activity.branches.iter().rev() {
                stack.extend(branch.activities.iter().rev());
            }
        }
        out
    }

    /// Every independent dependency scope of the pipeline
    pub fn activity_scopes(&self) -> Vec<ActivityScope<'_>> {
        collect_scopes(&self.activities)
    }

    /// Look up a string field of `typeProperties`
    pub fn type_property(&self, key: &str) -> Option<&Value> {
        self.payload.get("typeProperties").and_then(|props| props.get(key))
    }

    /// The declared service type (e.g. `AzureKeyVault`), from `properties.type`
    pub fn declared_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }
}

/// All parsed resources keyed by `(kind, name)`.
///
/// Backed by an ordered map so every iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    resources: BTreeMap<ResourceId, Resource>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource; names must be unique within a kind
    pub fn insert(&mut self, resource: Resource) -> Result<()> {
        if self.resources.contains_key(resource.id()) {
            return Err(LintError::malformed(format!(
                "duplicate resource {}",
                resource.id()
            )));
        }
        self.resources.insert(resource.id().clone(), resource);
        Ok(())
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resources.contains_key(id)
    }

    /// Resources of one kind, ordered by name
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(move |r| r.kind() == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Count of resources per kind, for run summaries
    pub fn count_by_kind(&self) -> BTreeMap<ResourceKind, usize> {
        let mut counts = BTreeMap::new();
        for resource in self.resources.values() {
            *counts.entry(resource.kind()).or_insert(0) += 1;
        }
        counts
    }
}
