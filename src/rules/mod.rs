//! Rule interface and the built-in check catalog.
//!
//! Every check is a [`Rule`]: it declares which subjects it applies to and returns
//! zero or more messages per subject. Simple field checks are [`PredicateRule`]
//! values; checks that need the reference graph or the activity dependency graph
//! implement the trait directly.

pub mod chain;
pub mod engine;
pub mod predicates;
pub mod settings;
pub mod structural;

use crate::error::Result;
use crate::finding::{Component, Severity};
use crate::graph::ReferenceGraph;
use crate::model::{Activity, Resource, ResourceKind, ResourceSet};

pub use chain::{ChainConflict, ChainValidator, DanglingDependencyRule, ImpossibleChainRule};
pub use engine::{RULE_EXECUTION_ERROR, RuleEngine};
pub use predicates::{Predicate, PredicateRule};
pub use settings::RuleSettings;
pub use structural::{DanglingReferenceRule, KeyVaultRule, MasterPipelineRule, MissingFieldRule, OrphanRule};

/// Which subjects a rule is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Once per resource of the listed kinds
    Kinds(&'static [ResourceKind]),
    /// Once per activity of every pipeline, nested activities included
    Activities,
}

impl Scope {
    pub const ALL_KINDS: Scope = Scope::Kinds(&ResourceKind::ALL);
}

pub(crate) const PIPELINES: &[ResourceKind] = &[ResourceKind::Pipeline];

/// The thing a rule is looking at
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    Resource(&'a Resource),
    Activity {
        pipeline: &'a Resource,
        activity: &'a Activity,
    },
}

impl<'a> Subject<'a> {
    pub fn component(&self) -> Component {
        match self {
            Self::Resource(resource) => Component::Resource(resource.kind()),
            Self::Activity { .. } => Component::Activity,
        }
    }

    /// Name used in findings: the resource name, or `pipeline/activity`
    pub fn display_name(&self) -> String {
        match self {
            Self::Resource(resource) => resource.name().to_string(),
            Self::Activity { pipeline, activity } => format!("{}/{}", pipeline.name(), activity.name),
        }
    }

    pub fn resource(&self) -> Option<&'a Resource> {
        match *self {
            Self::Resource(resource) => Some(resource),
            Self::Activity { .. } => None,
        }
    }

    pub fn activity(&self) -> Option<&'a Activity> {
        match *self {
            Self::Resource(_) => None,
            Self::Activity { activity, .. } => Some(activity),
        }
    }
}

/// Shared read-only state handed to every rule call
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub resources: &'a ResourceSet,
    pub graph: &'a ReferenceGraph,
    pub settings: &'a RuleSettings,
}

/// A single check
pub trait Rule: Send + Sync {
    /// Stable identifier, used to select checks and to group findings
    fn id(&self) -> &str;

    /// One-line summary of what the check reports
    fn description(&self) -> &str;

    fn severity(&self) -> Severity;

    fn scope(&self) -> Scope;

    /// Evaluate one subject, returning a message per violation
    fn evaluate(&self, subject: Subject<'_>, ctx: &RuleContext<'_>) -> Result<Vec<String>>;
}

/// Every built-in check, in catalog order
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    let mut rules: Vec<Box<dyn Rule>> = vec![
        Box::new(MasterPipelineRule),
        Box::new(ImpossibleChainRule),
        Box::new(DanglingDependencyRule),
    ];

    rules.extend(
        predicates::catalog()
            .into_iter()
            .map(|rule| Box::new(rule) as Box<dyn Rule>),
    );

    rules.push(Box::new(KeyVaultRule));
    rules.push(Box::new(OrphanRule::new(ResourceKind::LinkedService)));
    rules.push(Box::new(OrphanRule::new(ResourceKind::Dataset)));
    rules.push(Box::new(OrphanRule::new(ResourceKind::DataFlow)));
    rules.push(Box::new(OrphanRule::new(ResourceKind::Trigger)));
    rules.push(Box::new(DanglingReferenceRule));
    rules.push(Box::new(MissingFieldRule));
    rules
}
