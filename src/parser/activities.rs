//! Activity parsing for pipeline bodies.
//!
//! Problems inside an activity never fail the document; they are returned as notes
//! and attached to the owning pipeline.

use serde_json::Value;

use crate::model::{Activity, ActivityBranch, DependencyCondition, Outcome, OutcomeSet};

/// `typeProperties` keys holding a nested activity list
const BRANCH_KEYS: [&str; 4] = ["activities", "ifTrueActivities", "ifFalseActivities", "defaultActivities"];

/// Parse an `activities` array. Entries without a name are dropped with a note.
pub fn parse_activities(value: &Value, scope: &str, notes: &mut Vec<String>) -> Vec<Activity> {
    let Some(entries) = value.as_array() else {
        notes.push(format!("{} is not a list of activities", describe_scope(scope)));
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| parse_activity(entry, index, scope, notes))
        .collect()
}

fn parse_activity(entry: &Value, index: usize, scope: &str, notes: &mut Vec<String>) -> Option<Activity> {
    let Some(name) = entry.get("name").and_then(Value::as_str).filter(|n| !n.is_empty()) else {
        notes.push(format!("activity #{} in {} has no name", index, describe_scope(scope)));
        return None;
    };

    let activity_type = match entry.get("type").and_then(Value::as_str) {
        Some(t) => t.to_string(),
        None => {
            notes.push(format!("activity '{}' has no type", name));
            String::new()
        }
    };

    let mut activity = Activity::new(name, activity_type);
    activity.description = non_empty_str(entry.get("description"));

    if let Some(policy) = entry.get("policy").filter(|p| p.is_object()) {
        activity.has_policy = true;
        activity.timeout = non_empty_str(policy.get("timeout"));
    }

    if let Some(type_properties) = entry.get("typeProperties") {
        activity.type_properties = type_properties.clone();
    }

    if let Some(depends_on) = entry.get("dependsOn") {
        activity.depends_on = parse_conditions(name, depends_on, notes);
    }

    activity.branches = parse_branches(name, &activity.type_properties, notes);
    Some(activity)
}

fn parse_conditions(owner: &str, value: &Value, notes: &mut Vec<String>) -> Vec<DependencyCondition> {
    let Some(entries) = value.as_array() else {
        notes.push(format!("activity '{}' has a dependsOn that is not a list", owner));
        return Vec::new();
    };

    let mut conditions = Vec::new();
    for entry in entries {
        let Some(source) = entry.get("activity").and_then(Value::as_str) else {
            notes.push(format!("activity '{}' has a dependency without an activity name", owner));
            continue;
        };

        let mut outcomes = OutcomeSet::EMPTY;
        for raw in entry
            .get("dependencyConditions")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            match Outcome::parse(raw) {
                Some(outcome) => outcomes = outcomes.union(OutcomeSet::of(outcome)),
                None => notes.push(format!(
                    "activity '{}' depends on '{}' with unknown condition '{}'",
                    owner, source, raw
                )),
            }
        }

        if outcomes.is_empty() {
            notes.push(format!(
                "activity '{}' depends on '{}' without any dependency condition",
                owner, source
            ));
            continue;
        }

        conditions.push(DependencyCondition {
            activity: source.to_string(),
            outcomes,
        });
    }
    conditions
}

fn parse_branches(owner: &str, type_properties: &Value, notes: &mut Vec<String>) -> Vec<ActivityBranch> {
    let mut branches = Vec::new();

    for key in BRANCH_KEYS {
        if let Some(list) = type_properties.get(key) {
            let label = format!("{}/{}", owner, key);
            let activities = parse_activities(list, &label, notes);
            branches.push(ActivityBranch { label, activities });
        }
    }

    if let Some(cases) = type_properties.get("cases").and_then(Value::as_array) {
        for case in cases {
            let value = case
                .get("value")
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .unwrap_or_default();
            let label = format!("{}/cases[{}]", owner, value);
            let activities = case
                .get("activities")
                .map(|list| parse_activities(list, &label, notes))
                .unwrap_or_default();
            branches.push(ActivityBranch { label, activities });
        }
    }

    branches
}

/// A string field, with empty or whitespace-only values treated as absent
pub(crate) fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn describe_scope(scope: &str) -> String {
    if scope.is_empty() {
        "pipeline".to_string()
    } else {
        format!("'{}'", scope)
    }
}
