//! Pipeline activities and their dependency conditions.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome named in a dependency condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Succeeded,
    Failed,
    Skipped,
    /// Matches any realized outcome
    Completed,
}

impl Outcome {
    /// Parse an outcome name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
            Self::Completed => "Completed",
        };
        f.write_str(s)
    }
}

/// A set of realized outcomes (`Succeeded`, `Failed`, `Skipped`) packed into bits.
///
/// `Completed` expands to all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutcomeSet(u8);

impl OutcomeSet {
    const SUCCEEDED: u8 = 0b001;
    const FAILED: u8 = 0b010;
    const SKIPPED: u8 = 0b100;

    pub const EMPTY: OutcomeSet = OutcomeSet(0);
    pub const ANY: OutcomeSet = OutcomeSet(Self::SUCCEEDED | Self::FAILED | Self::SKIPPED);
    /// The activity actually executed
    pub const RAN: OutcomeSet = OutcomeSet(Self::SUCCEEDED | Self::FAILED);

    pub fn of(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => Self(Self::SUCCEEDED),
            Outcome::Failed => Self(Self::FAILED),
            Outcome::Skipped => Self(Self::SKIPPED),
            Outcome::Completed => Self::ANY,
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether a skipped activity satisfies this set
    pub fn allows_skipped(self) -> bool {
        self.0 & Self::SKIPPED != 0
    }

    pub fn contains(self, outcome: Outcome) -> bool {
        let other = Self::of(outcome);
        self.0 & other.0 == other.0
    }
}

impl FromIterator<Outcome> for OutcomeSet {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::EMPTY, |set, outcome| set.union(Self::of(outcome)))
    }
}

impl fmt::Display for OutcomeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ANY {
            return f.write_str("Completed");
        }
        if self.is_empty() {
            return f.write_str("nothing");
        }
        let names: Vec<&str> = [
            (Self::SUCCEEDED, "Succeeded"),
            (Self::FAILED, "Failed"),
            (Self::SKIPPED, "Skipped"),
        ]
        .iter()
        .filter(|(bit, _)| self.0 & bit != 0)
        .map(|(_, name)| *name)
        .collect();
        f.write_str(&names.join(" or "))
    }
}

/// One `dependsOn` entry of an activity.
///
/// Entries are AND-ed together; the outcomes inside one entry are alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCondition {
    pub activity: String,
    pub outcomes: OutcomeSet,
}

impl DependencyCondition {
    pub fn new(activity: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            activity: activity.into(),
            outcomes: OutcomeSet::of(outcome),
        }
    }

    pub fn any_of(activity: impl Into<String>, outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            activity: activity.into(),
            outcomes: outcomes.into_iter().collect(),
        }
    }
}

/// A nested list of activities inside a container activity (ForEach body, If branch, ...)
#[derive(Debug, Clone)]
pub struct ActivityBranch {
    pub label: String,
    pub activities: Vec<Activity>,
}

/// A unit of work inside a pipeline
#[derive(Debug, Clone)]
pub struct Activity {
    pub name: String,
    pub activity_type: String,
    pub description: Option<String>,
    /// Whether a `policy` object was declared at all
    pub has_policy: bool,
    pub timeout: Option<String>,
    pub type_properties: Value,
    pub depends_on: Vec<DependencyCondition>,
    pub branches: Vec<ActivityBranch>,
}

impl Activity {
    pub fn new(name: impl Into<String>, activity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            activity_type: activity_type.into(),
            description: None,
            has_policy: false,
            timeout: None,
            type_properties: Value::Null,
            depends_on: Vec::new(),
            branches: Vec::new(),
        }
    }

    pub fn depends_on(mut self, condition: DependencyCondition) -> Self {
        self.depends_on.push(condition);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.has_policy = true;
        self.timeout = Some(timeout.into());
        self
    }

    pub fn with_type_properties(mut self, type_properties: Value) -> Self {
        self.type_properties = type_properties;
        self
    }

    pub fn with_branch(mut self, label: impl Into<String>, activities: Vec<Activity>) -> Self {
        self.branches.push(ActivityBranch {
            label: label.into(),
            activities,
        });
        self
    }

    pub fn is_type(&self, activity_type: &str) -> bool {
        self.activity_type.eq_ignore_ascii_case(activity_type)
    }

    pub fn type_property(&self, key: &str) -> Option<&Value> {
        self.type_properties.get(key)
    }
}

/// A list of sibling activities whose `dependsOn` entries refer to each other.
#[derive(Debug, Clone, Copy)]
pub struct ActivityScope<'a> {
    /// Empty for the pipeline's top level, `Outer/branch` for nested lists
    pub path: &'a str,
    pub activities: &'a [Activity],
}

/// Collect the top-level scope and every nested branch scope, depth first.
pub(crate) fn collect_scopes(activities: &[Activity]) -> Vec<ActivityScope<'_>> {
    let mut scopes = vec![ActivityScope { path: "", activities }];
    let mut stack: Vec<&Activity> = activities.iter().rev().collect();
    while let Some(activity) = stack.pop() {
        for branch in &activity.branches {
            scopes.push(ActivityScope {
                path: &branch.label,
                activities: &branch.activities,
            });
            stack.extend(branch.activities.iter().rev());
        }
    }
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_parse() {
        assert_eq!(Outcome::parse("Succeeded"), Some(Outcome::Succeeded));
        assert_eq!(Outcome::parse("failed"), Some(Outcome::Failed));
        assert_eq!(Outcome::parse("COMPLETED"), Some(Outcome::Completed));
        assert_eq!(Outcome::parse("Cancelled"), None);
    }

    #[test]
    fn test_completed_is_wildcard() {
        let completed = OutcomeSet::of(Outcome::Completed);
        assert!(completed.contains(Outcome::Succeeded));
        assert!(completed.contains(Outcome::Failed));
        assert!(completed.contains(Outcome::Skipped));
        assert_eq!(completed, OutcomeSet::ANY);
    }

    #[test]
    fn test_outcome_set_intersection() {
        let succeeded = OutcomeSet::of(Outcome::Succeeded);
        let failed = OutcomeSet::of(Outcome::Failed);

        assert!(succeeded.intersect(failed).is_empty());
        assert_eq!(OutcomeSet::RAN.intersect(succeeded), succeeded);
        assert!(!OutcomeSet::RAN.allows_skipped());
        assert!(OutcomeSet::ANY.allows_skipped());
    }

    #[test]
    fn test_outcome_set_display() {
        assert_eq!(OutcomeSet::of(Outcome::Failed).to_string(), "Failed");
        assert_eq!(OutcomeSet::RAN.to_string(), "Succeeded or Failed");
        assert_eq!(OutcomeSet::ANY.to_string(), "Completed");
        assert_eq!(OutcomeSet::EMPTY.to_string(), "nothing");
    }

    #[test]
    fn test_dependency_condition_any_of() {
        let cond = DependencyCondition::any_of("Copy", [Outcome::Succeeded, Outcome::Skipped]);
        assert!(cond.outcomes.contains(Outcome::Succeeded));
        assert!(cond.outcomes.contains(Outcome::Skipped));
        assert!(!cond.outcomes.contains(Outcome::Failed));
    }

    #[test]
    fn test_activity_is_type_case_insensitive() {
        let activity = Activity::new("loop", "ForEach");
        assert!(activity.is_type("foreach"));
        assert!(!activity.is_type("Copy"));
    }

    #[test]
    fn test_collect_scopes_includes_nested_branches() {
        let inner = Activity::new("inner", "Copy");
        let activities = vec![
            Activity::new("loop", "ForEach").with_branch("loop/activities", vec![inner]),
            Activity::new("after", "Wait")
                .with_type_properties(json!({ "waitTimeInSeconds": 1 })),
        ];

        let scopes = collect_scopes(&activities);
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].path, "");
        assert_eq!(scopes[0].activities.len(), 2);
        assert_eq!(scopes[1].path, "loop/activities");
        assert_eq!(scopes[1].activities[0].name, "inner");
    }
}
