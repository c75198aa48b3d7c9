//! Simple single-subject checks.
//!
//! Each check is one small predicate function plus metadata. A predicate returns
//! `Some(message)` when the subject violates the check.

use serde_json::Value;

use crate::error::Result;
use crate::finding::Severity;
use crate::model::ResourceKind;

use super::{PIPELINES, Rule, RuleContext, Scope, Subject};

/// Signature shared by every simple check
pub type Predicate = fn(Subject<'_>, &RuleContext<'_>) -> Option<String>;

/// A check defined entirely by a predicate function
#[derive(Clone, Copy)]
pub struct PredicateRule {
    pub id: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub scope: Scope,
    pub predicate: Predicate,
}

impl Rule for PredicateRule {
    fn id(&self) -> &str {
        self.id
    }

    fn description(&self) -> &str {
        self.description
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn evaluate(&self, subject: Subject<'_>, ctx: &RuleContext<'_>) -> Result<Vec<String>> {
        Ok((self.predicate)(subject, ctx).into_iter().collect())
    }
}

const DATASETS: &[ResourceKind] = &[ResourceKind::Dataset];
const LINKED_SERVICES: &[ResourceKind] = &[ResourceKind::LinkedService];
const TRIGGERS: &[ResourceKind] = &[ResourceKind::Trigger];
const DATA_FLOWS: &[ResourceKind] = &[ResourceKind::DataFlow];

/// The simple checks, in catalog order
pub fn catalog() -> Vec<PredicateRule> {
    use Severity::*;

    vec![
        PredicateRule {
            id: "pipeline-description",
            description: "Pipeline(s) without a description value.",
            severity: Low,
            scope: Scope::Kinds(PIPELINES),
            predicate: missing_description,
        },
        PredicateRule {
            id: "pipeline-folder",
            description: "Pipeline(s) not organised into folders.",
            severity: Low,
            scope: Scope::Kinds(PIPELINES),
            predicate: missing_folder,
        },
        PredicateRule {
            id: "pipeline-annotations",
            description: "Pipeline(s) without annotations.",
            severity: Low,
            scope: Scope::Kinds(PIPELINES),
            predicate: missing_annotations,
        },
        PredicateRule {
            id: "data-flow-description",
            description: "Data Flow(s) without a description value.",
            severity: Low,
            scope: Scope::Kinds(DATA_FLOWS),
            predicate: missing_description,
        },
        PredicateRule {
            id: "activity-timeout-default",
            description: "Activities with timeout values still set to the service default value of 7 days.",
            severity: High,
            scope: Scope::Activities,
            predicate: default_timeout,
        },
        PredicateRule {
            id: "copy-activity-diu-auto",
            description: "Copy activities with DIU (Data Integration Units) still set to the service default value of 'Auto'.",
            severity: High,
            scope: Scope::Activities,
            predicate: copy_diu_auto,
        },
        PredicateRule {
            id: "activity-description",
            description: "Activities without a description value.",
            severity: Low,
            scope: Scope::Activities,
            predicate: activity_missing_description,
        },
        PredicateRule {
            id: "foreach-batch-count-unset",
            description: "ForEach activities running in parallel without a batch count value set.",
            severity: High,
            scope: Scope::Activities,
            predicate: foreach_batch_unset,
        },
        PredicateRule {
            id: "foreach-batch-count-below-max",
            description: "ForEach activities with a batch count below the service maximum.",
            severity: Medium,
            scope: Scope::Activities,
            predicate: foreach_batch_below_max,
        },
        PredicateRule {
            id: "linked-service-description",
            description: "Linked Service(s) without a description value.",
            severity: Low,
            scope: Scope::Kinds(LINKED_SERVICES),
            predicate: missing_description,
        },
        PredicateRule {
            id: "linked-service-annotations",
            description: "Linked Service(s) without annotations.",
            severity: Low,
            scope: Scope::Kinds(LINKED_SERVICES),
            predicate: missing_annotations,
        },
        PredicateRule {
            id: "dataset-description",
            description: "Dataset(s) without a description value.",
            severity: Low,
            scope: Scope::Kinds(DATASETS),
            predicate: missing_description,
        },
        PredicateRule {
            id: "dataset-folder",
            description: "Dataset(s) not organised into folders.",
            severity: Low,
            scope: Scope::Kinds(DATASETS),
            predicate: missing_folder,
        },
        PredicateRule {
            id: "dataset-annotations",
            description: "Dataset(s) without annotations.",
            severity: Low,
            scope: Scope::Kinds(DATASETS),
            predicate: missing_annotations,
        },
        PredicateRule {
            id: "trigger-description",
            description: "Trigger(s) without a description value.",
            severity: Low,
            scope: Scope::Kinds(TRIGGERS),
            predicate: missing_description,
        },
        PredicateRule {
            id: "trigger-annotations",
            description: "Trigger(s) without annotations.",
            severity: Low,
            scope: Scope::Kinds(TRIGGERS),
            predicate: missing_annotations,
        },
    ]
}

fn missing_description(subject: Subject<'_>, _ctx: &RuleContext<'_>) -> Option<String> {
    let resource = subject.resource()?;
    resource
        .description()
        .is_none()
        .then(|| "Does not have a description.".to_string())
}

fn missing_folder(subject: Subject<'_>, _ctx: &RuleContext<'_>) -> Option<String> {
    let resource = subject.resource()?;
    resource
        .folder()
        .is_none()
        .then(|| "Not organised into a folder.".to_string())
}

fn missing_annotations(subject: Subject<'_>, _ctx: &RuleContext<'_>) -> Option<String> {
    let resource = subject.resource()?;
    resource
        .annotations()
        .is_empty()
        .then(|| "Does not have any annotations.".to_string())
}

fn default_timeout(subject: Subject<'_>, ctx: &RuleContext<'_>) -> Option<String> {
    let activity = subject.activity()?;
    let default = ctx.settings.default_timeout.as_str();
    (activity.timeout.as_deref() == Some(default))
        .then(|| format!("Timeout policy still set to the service default value of {}.", default))
}

fn copy_diu_auto(subject: Subject<'_>, _ctx: &RuleContext<'_>) -> Option<String> {
    let activity = subject.activity()?;
    if !activity.is_type("Copy") || !activity.has_policy {
        return None;
    }
    match activity.type_property("dataIntegrationUnits") {
        None | Some(Value::Null) => Some("DIU still set to the service default value of 'Auto'.".to_string()),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("auto") => {
            Some("DIU still set to the service default value of 'Auto'.".to_string())
        }
        _ => None,
    }
}

fn activity_missing_description(subject: Subject<'_>, _ctx: &RuleContext<'_>) -> Option<String> {
    let activity = subject.activity()?;
    activity
        .description
        .is_none()
        .then(|| "Does not have a description.".to_string())
}

fn foreach_batch_unset(subject: Subject<'_>, _ctx: &RuleContext<'_>) -> Option<String> {
    let activity = subject.activity()?;
    if !activity.is_type("ForEach") || is_sequential(activity.type_property("isSequential")) {
        return None;
    }
    let unset = match activity.type_property("batchCount") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    };
    unset.then(|| "ForEach does not have a batch count value set.".to_string())
}

fn foreach_batch_below_max(subject: Subject<'_>, ctx: &RuleContext<'_>) -> Option<String> {
    let activity = subject.activity()?;
    if !activity.is_type("ForEach") || is_sequential(activity.type_property("isSequential")) {
        return None;
    }
    let batch_count = match activity.type_property("batchCount")? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    (batch_count < ctx.settings.foreach_batch_max).then(|| {
        format!(
            "ForEach batch count {} is less than the service maximum of {}.",
            batch_count, ctx.settings.foreach_batch_max
        )
    })
}

fn is_sequential(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
