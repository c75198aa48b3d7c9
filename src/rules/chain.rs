//! Impossible execution chain detection.
//!
//! Every activity ends a pipeline run with exactly one realized outcome
//! (`Succeeded`, `Failed` or `Skipped`). For a target activity to run, each of its
//! dependency conditions must hold, and each source that is required to have run
//! must in turn have had its own conditions hold. Walking these requirements
//! backwards from the target and intersecting the outcome sets demanded of each
//! activity exposes chains no single run can satisfy.
//!
//! Requirements are kept per activity index as an [`OutcomeSet`]. An activity is
//! revisited only when its requirement strictly narrows, and a set of three bits can
//! narrow at most three times, so cyclic dependencies terminate.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::error::Result;
use crate::finding::Severity;
use crate::model::{Activity, ActivityScope, OutcomeSet};

use super::{PIPELINES, Rule, RuleContext, Scope, Subject};


/// Two incompatible requirements on the same activity, found from `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConflict {
    pub target: String,
    pub activity: String,
    pub first: OutcomeSet,
    pub second: OutcomeSet,
    /// Activities from the target to the conflicting activity along the second path
    pub chain: Vec<String>,
}

impl fmt::Display for ChainConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Activity '{}' can never run: '{}' must be {} and {} in the same run (chain: {})",
            self.target,
            self.activity,
            self.first,
            self.second,
            self.chain.join(" -> ")
        )
    }
}

/// A condition naming an activity that is not in the same scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingDependency<'a> {
    pub activity: &'a str,
    pub missing: &'a str,
}

/// Dependency graph of one activity scope, indexed by position
pub struct ChainValidator<'a> {
    activities: &'a [Activity],
    /// Resolved condition edges per activity: (source index, accepted outcomes)
    edges: Vec<Vec<(usize, OutcomeSet)>>,
}

impl<'a> ChainValidator<'a> {
    pub fn new(activities: &'a [Activity]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(activities.len());
        for (i, activity) in activities.iter().enumerate() {
            index.entry(activity.name.as_str()).or_insert(i);
        }

        let edges = activities
            .iter()
            .map(|activity| {
                activity
                    .depends_on
                    .iter()
                    .filter_map(|cond| index.get(cond.activity.as_str()).map(|&i| (i, cond.outcomes)))
                    .collect()
            })
            .collect();

        Self { activities, edges }
    }

    /// Conditions that name no activity in this scope
    pub fn dangling(&self) -> Vec<DanglingDependency<'a>> {
        let known: std::collections::HashSet<&str> = self.activities.iter().map(|a| a.name.as_str()).collect();
        self.activities
            .iter()
            .flat_map(|activity| {
                activity
                    .depends_on
                    .iter()
                    .filter(|cond| !known.contains(cond.activity.as_str()))
                    .map(move |cond| DanglingDependency {
                        activity: activity.name.as_str(),
                        missing: cond.activity.as_str(),
                    })
            })
            .collect()
    }

    /// The first contradiction on the way back from every activity, in declaration order
    pub fn conflicts(&self) -> Vec<ChainConflict> {
        (0..self.activities.len())
            .filter_map(|target| self.check(target))
            .collect()
    }

    /// Check whether the activity at `target` can ever become eligible to run
    pub fn check(&self, target: usize) -> Option<ChainConflict> {
        if self.edges.get(target)?.is_empty() {
            return None;
        }

        let n = self.activities.len();
        let mut required: Vec<Option<OutcomeSet>> = vec![None; n];
        let mut reached_from: Vec<Option<usize>> = vec![None; n];
        let mut expanded = vec![false; n];

        // The target itself has to run
        required[target] = Some(OutcomeSet::RAN);
        expanded[target] = true;

        let mut queue: VecDeque<(usize, OutcomeSet, usize)> = self.edges[target]
            .iter()
            .map(|&(source, outcomes)| (source, outcomes, target))
            .collect();

        while let Some((node, wanted, from)) = queue.pop_front() {
            let narrowed = match required[node] {
                None => {
                    reached_from[node] = Some(from);
                    wanted
                }
                Some(have) => {
                    let merged = have.intersect(wanted);
                    if merged.is_empty() {
                        return Some(self.conflict(target, node, have, wanted, from, &reached_from));
                    }
                    if merged == have {
                        continue;
                    }
                    merged
                }
            };
            required[node] = Some(narrowed);

            // A source that may be skipped puts no constraint on its own predecessors
            if !expanded[node] && !narrowed.allows_skipped() {
                expanded[node] = true;
                queue.extend(
                    self.edges[node]
                        .iter()
                        .map(|&(source, outcomes)| (source, outcomes, node)),
                );
            }
        }

        None
    }

    fn conflict(
        &self,
        target: usize,
        node: usize,
        first: OutcomeSet,
        second: OutcomeSet,
        from: usize,
        reached_from: &[Option<usize>],
    ) -> ChainConflict {
        let mut path = vec![node, from];
        let mut current = from;
        while current != target {
            match reached_from[current] {
                Some(prev) => {
                    path.push(prev);
                    current = prev;
                }
                None => break,
            }
        }
        path.reverse();
        if path.first() != Some(&target) {
            path.insert(0, target);
        }
        path.dedup();

        ChainConflict {
            target: self.activities[target].name.clone(),
            activity: self.activities[node].name.clone(),
            first,
            second,
            chain: path.into_iter().map(|i| self.activities[i].name.clone()).collect(),
        }
    }
}

fn scope_prefix(scope: &ActivityScope<'_>) -> String {
    if scope.path.is_empty() {
        String::new()
    } else {
        format!("In '{}': ", scope.path)
    }
}

/// Reports activities whose dependency conditions can never all hold in one run
pub struct ImpossibleChainRule;

impl Rule for ImpossibleChainRule {
    fn id(&self) -> &str {
        "impossible-execution-chain"
    }

    fn description(&self) -> &str {
        "Pipeline(s) with an impossible AND/OR activity execution chain."
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn scope(&self) -> Scope {
        Scope::Kinds(PIPELINES)
    }

    fn evaluate(&self, subject: Subject<'_>, _ctx: &RuleContext<'_>) -> Result<Vec<String>> {
        let Some(pipeline) = subject.resource() else {
            return Ok(Vec::new());
        };

        let mut messages = Vec::new();
        for scope in pipeline.activity_scopes() {
            let prefix = scope_prefix(&scope);
            messages.extend(
                ChainValidator::new(scope.activities)
                    .conflicts()
                    .into_iter()
                    .map(|conflict| format!("{}{}", prefix, conflict)),
            );
        }
        Ok(messages)
    }
}

/// Reports dependency conditions naming an activity that does not exist
pub struct DanglingDependencyRule;

impl Rule for DanglingDependencyRule {
    fn id(&self) -> &str {
        "dangling-activity-dependency"
    }

    fn description(&self) -> &str {
        "Activities depending on an activity that does not exist in the same pipeline scope."
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn scope(&self) -> Scope {
        Scope::Kinds(PIPELINES)
    }

    fn evaluate(&self, subject: Subject<'_>, _ctx: &RuleContext<'_>) -> Result<Vec<String>> {
        let Some(pipeline) = subject.resource() else {
            return Ok(Vec::new());
        };

        let mut messages = Vec::new();
        for scope in pipeline.activity_scopes() {
            let prefix = scope_prefix(&scope);
            messages.extend(ChainValidator::new(scope.activities).dangling().into_iter().map(|d| {
                format!(
                    "{}Activity '{}' depends on '{}', which does not exist.",
                    prefix, d.activity, d.missing
                )
            }));
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ReferenceGraph;
    use crate::model::{DependencyCondition, Outcome, Resource, ResourceKind, ResourceSet};
    use crate::rules::RuleSettings;

    fn on(name: &str, outcome: Outcome) -> DependencyCondition {
        DependencyCondition::new(name, outcome)
    }

    fn wait(name: &str) -> Activity {
        Activity::new(name, "Wait")
    }

    fn index_of(activities: &[Activity], name: &str) -> usize {
        activities.iter().position(|a| a.name == name).unwrap()
    }

    #[test]
    fn test_activity_without_conditions_is_never_flagged() {
        let activities = vec![wait("A"), wait("B"), wait("C")];
        let validator = ChainValidator::new(&activities);
        assert!(validator.conflicts().is_empty());
    }

    #[test]
    fn test_transitive_contradiction_is_flagged() {
        // T needs A=Succeeded directly and A=Failed through B
        let activities = vec![
            wait("A"),
            wait("B").depends_on(on("A", Outcome::Failed)),
            wait("T")
                .depends_on(on("A", Outcome::Succeeded))
                .depends_on(on("B", Outcome::Succeeded)),
        ];

        let validator = ChainValidator::new(&activities);
        let conflict = validator.check(index_of(&activities, "T")).unwrap();

        assert_eq!(conflict.target, "T");
        assert_eq!(conflict.activity, "A");
        assert_eq!(conflict.first, OutcomeSet::of(Outcome::Succeeded));
        assert_eq!(conflict.second, OutcomeSet::of(Outcome::Failed));
        assert_eq!(conflict.chain, vec!["T", "B", "A"]);

        let message = conflict.to_string();
        assert!(message.contains("'A'"));
        assert!(message.contains("Succeeded"));
        assert!(message.contains("Failed"));
    }

    #[test]
    fn test_direct_contradiction_is_flagged() {
        let activities = vec![
            wait("A"),
            wait("T")
                .depends_on(on("A", Outcome::Succeeded))
                .depends_on(on("A", Outcome::Failed)),
        ];

        let conflict = ChainValidator::new(&activities).check(1).unwrap();
        assert_eq!(conflict.activity, "A");
        assert_eq!(conflict.chain, vec!["T", "A"]);
    }

    #[test]
    fn test_independent_successes_are_fine() {
        let activities = vec![
            wait("A"),
            wait("B"),
            wait("T")
                .depends_on(on("A", Outcome::Succeeded))
                .depends_on(on("B", Outcome::Succeeded)),
        ];

        assert!(ChainValidator::new(&activities).conflicts().is_empty());
    }

    #[test]
    fn test_self_consistent_cycle_terminates() {
        let activities = vec![
            wait("X").depends_on(on("Y", Outcome::Succeeded)),
            wait("Y").depends_on(on("X", Outcome::Succeeded)),
        ];

        assert!(ChainValidator::new(&activities).conflicts().is_empty());
    }

    #[test]
    fn test_completed_matches_any_outcome() {
        let activities = vec![
            wait("A"),
            wait("B").depends_on(on("A", Outcome::Completed)),
            wait("T")
                .depends_on(on("A", Outcome::Failed))
                .depends_on(on("B", Outcome::Succeeded)),
        ];

        assert!(ChainValidator::new(&activities).conflicts().is_empty());
    }

    #[test]
    fn test_or_condition_is_satisfiable() {
        let activities = vec![
            wait("A"),
            wait("B").depends_on(DependencyCondition::any_of("A", [Outcome::Succeeded, Outcome::Failed])),
            wait("T")
                .depends_on(on("A", Outcome::Failed))
                .depends_on(on("B", Outcome::Succeeded)),
        ];

        assert!(ChainValidator::new(&activities).conflicts().is_empty());
    }

    #[test]
    fn test_skipped_source_does_not_constrain_predecessors() {
        // B may be skipped, so B's own dependency on A=Failed is irrelevant to T
        let activities = vec![
            wait("A"),
            wait("B").depends_on(on("A", Outcome::Failed)),
            wait("T")
                .depends_on(on("A", Outcome::Succeeded))
                .depends_on(on("B", Outcome::Skipped)),
        ];

        assert!(ChainValidator::new(&activities).conflicts().is_empty());
    }

    #[test]
    fn test_skipped_and_ran_conflict() {
        let activities = vec![
            wait("A"),
            wait("B").depends_on(on("A", Outcome::Succeeded)),
            wait("T")
                .depends_on(on("A", Outcome::Skipped))
                .depends_on(on("B", Outcome::Succeeded)),
        ];

        let conflict = ChainValidator::new(&activities).check(2).unwrap();
        assert_eq!(conflict.activity, "A");
        assert_eq!(conflict.first, OutcomeSet::of(Outcome::Skipped));
        assert_eq!(conflict.second, OutcomeSet::of(Outcome::Succeeded));
    }

    #[test]
    fn test_conflict_in_contradictory_cycle() {
        // X and Y each need the other to have failed and succeeded
        let activities = vec![
            wait("X").depends_on(on("Y", Outcome::Failed)),
            wait("Y").depends_on(on("X", Outcome::Succeeded)),
            wait("T")
                .depends_on(on("X", Outcome::Failed))
                .depends_on(on("Y", Outcome::Failed)),
        ];

        let conflict = ChainValidator::new(&activities).check(2).unwrap();
        assert_eq!(conflict.activity, "X");
    }

    #[test]
    fn test_downstream_of_impossible_activity_is_flagged_too() {
        let activities = vec![
            wait("A"),
            wait("B").depends_on(on("A", Outcome::Failed)),
            wait("T")
                .depends_on(on("A", Outcome::Succeeded))
                .depends_on(on("B", Outcome::Succeeded)),
            wait("U").depends_on(on("T", Outcome::Succeeded)),
        ];

        let conflicts = ChainValidator::new(&activities).conflicts();
        let targets: Vec<&str> = conflicts.iter().map(|c| c.target.as_str()).collect();
        assert_eq!(targets, vec!["T", "U"]);
    }

    #[test]
    fn test_dangling_dependencies_are_ignored_for_satisfiability() {
        let activities = vec![
            wait("A"),
            wait("T")
                .depends_on(on("A", Outcome::Succeeded))
                .depends_on(on("Ghost", Outcome::Failed)),
        ];

        let validator = ChainValidator::new(&activities);
        assert!(validator.conflicts().is_empty());
        assert_eq!(
            validator.dangling(),
            vec![DanglingDependency {
                activity: "T",
                missing: "Ghost"
            }]
        );
    }

    #[test]
    fn test_large_cycle_terminates() {
        let n = 200;
        let activities: Vec<Activity> = (0..n)
            .map(|i| wait(&format!("a{}", i)).depends_on(on(&format!("a{}", (i + 1) % n), Outcome::Succeeded)))
            .collect();

        assert!(ChainValidator::new(&activities).conflicts().is_empty());
    }

    fn evaluate(rule: &dyn Rule, pipeline: &Resource) -> Vec<String> {
        let resources = ResourceSet::new();
        let graph = ReferenceGraph::default();
        let settings = RuleSettings::default();
        let ctx = RuleContext {
            resources: &resources,
            graph: &graph,
            settings: &settings,
        };
        rule.evaluate(Subject::Resource(pipeline), &ctx).unwrap()
    }

    #[test]
    fn test_rule_reports_one_finding_per_target() {
        let pipeline = Resource::new(ResourceKind::Pipeline, "PL").with_activities(vec![
            wait("A"),
            wait("B").depends_on(on("A", Outcome::Failed)),
            wait("T")
                .depends_on(on("A", Outcome::Succeeded))
                .depends_on(on("A", Outcome::Failed))
                .depends_on(on("B", Outcome::Succeeded)),
        ]);

        let messages = evaluate(&ImpossibleChainRule, &pipeline);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Activity 'T' can never run"));
    }

    #[test]
    fn test_rule_checks_nested_scopes() {
        let body = vec![
            wait("A"),
            wait("T")
                .depends_on(on("A", Outcome::Succeeded))
                .depends_on(on("A", Outcome::Failed)),
        ];
        let pipeline = Resource::new(ResourceKind::Pipeline, "PL")
            .with_activities(vec![Activity::new("Loop", "ForEach").with_branch("Loop/activities", body)]);

        let messages = evaluate(&ImpossibleChainRule, &pipeline);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("In 'Loop/activities': Activity 'T'"));
    }

    #[test]
    fn test_dangling_rule_message() {
        let pipeline = Resource::new(ResourceKind::Pipeline, "PL")
            .with_activities(vec![wait("T").depends_on(on("Ghost", Outcome::Succeeded))]);

        let messages = evaluate(&DanglingDependencyRule, &pipeline);
        assert_eq!(messages, vec!["Activity 'T' depends on 'Ghost', which does not exist."]);
    }
}
