//! Rule registry and evaluation loop.
//!
//! A failing rule never aborts the run: an `Err` or a panic inside a rule becomes
//! a `rule-execution-error` finding naming the rule, and the remaining rules keep
//! going. Panics raised inside a rule go to the log instead of stderr.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use log::{debug, info, warn};

use crate::error::{LintError, Result};
use crate::finding::{Finding, FindingCollector, Severity};
use crate::graph::ReferenceGraph;
use crate::model::{ResourceKind, ResourceSet};

use super::{Rule, RuleContext, RuleSettings, Scope, Subject, default_rules};

/// Check id used for findings produced by a failing rule
pub const RULE_EXECUTION_ERROR: &str = "rule-execution-error";

static PANIC_HOOK: Once = Once::new();

thread_local! {
    static IN_RULE: Cell<bool> = const { Cell::new(false) };
}

/// Registry of rules plus the settings they run with
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
    settings: RuleSettings,
}

impl RuleEngine {
    /// Create an engine with no rules
    pub fn new(settings: RuleSettings) -> Self {
        Self {
            rules: Vec::new(),
            settings,
        }
    }

    /// Create an engine with every built-in rule registered
    pub fn with_defaults(settings: RuleSettings) -> Self {
        let mut engine = Self::new(settings);
        for rule in default_rules() {
            engine.register_boxed(rule);
        }
        engine
    }

    /// Add a rule to the registry
    pub fn register(&mut self, rule: impl Rule + 'static) {
        self.register_boxed(Box::new(rule));
    }

    /// Add a boxed rule to the registry
    pub fn register_boxed(&mut self, rule: Box<dyn Rule>) {
        debug!("Registering rule {}", rule.id());
        self.rules.push(rule);
    }

    /// Add a rule (builder pattern)
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.register(rule);
        self
    }

    /// Keep only the rules named in `ids`; an empty list keeps everything
    pub fn select(mut self, ids: &[String]) -> Result<Self> {
        if ids.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = ids.iter().find(|id| !self.contains(id)) {
            return Err(LintError::UnknownCheck(unknown.clone()));
        }
        self.rules.retain(|rule| ids.iter().any(|id| id == rule.id()));
        Ok(self)
    }

    /// Drop the rules named in `ids`; unknown ids are logged and ignored
    pub fn disable(mut self, ids: &[String]) -> Self {
        for id in ids {
            if !self.contains(id) {
                warn!("Cannot disable unknown check {}", id);
            }
        }
        self.rules.retain(|rule| !ids.iter().any(|id| id == rule.id()));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.iter().any(|rule| rule.id() == id)
    }

    /// Registered rule ids in registration order
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every registered rule over every subject it applies to.
    ///
    /// Findings are returned grouped by check id, then resource name.
    pub fn run_all(&self, resources: &ResourceSet, graph: &ReferenceGraph) -> Vec<Finding> {
        let ctx = RuleContext {
            resources,
            graph,
            settings: &self.settings,
        };

        let mut collector = FindingCollector::new();
        for rule in &self.rules {
            let before = collector.len();
            for subject in subjects(rule.scope(), resources) {
                collector.extend(evaluate_guarded(rule.as_ref(), subject, &ctx));
            }
            debug!("Rule {} produced {} findings", rule.id(), collector.len() - before);
        }

        info!(
            "Ran {} rules over {} resources: {} findings",
            self.rules.len(),
            resources.len(),
            collector.len()
        );
        collector.into_sorted()
    }
}

/// Every subject a scope covers, in resource order
fn subjects<'a>(scope: Scope, resources: &'a ResourceSet) -> Vec<Subject<'a>> {
    match scope {
        Scope::Kinds(kinds) => resources
            .iter()
            .filter(|resource| kinds.contains(&resource.kind()))
            .map(Subject::Resource)
            .collect(),
        Scope::Activities => resources
            .of_kind(ResourceKind::Pipeline)
            .flat_map(|pipeline| {
                pipeline
                    .all_activities()
                    .into_iter()
                    .map(move |activity| Subject::Activity { pipeline, activity })
            })
            .collect(),
    }
}

/// Route panics raised while a rule runs to the log; every other panic still
/// reaches the previously installed hook
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            if IN_RULE.with(Cell::get) {
                debug!("Rule panicked: {}", panic_info);
            } else {
                original_hook(panic_info);
            }
        }));
    });
}

fn evaluate_guarded(rule: &dyn Rule, subject: Subject<'_>, ctx: &RuleContext<'_>) -> Vec<Finding> {
    install_panic_hook();
    IN_RULE.with(|flag| flag.set(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(subject, ctx)));
    IN_RULE.with(|flag| flag.set(false));

    let failure = match outcome {
        Ok(Ok(messages)) => {
            return messages
                .into_iter()
                .map(|message| {
                    Finding::new(
                        rule.id(),
                        subject.component(),
                        subject.display_name(),
                        message,
                        rule.severity(),
                    )
                })
                .collect();
        }
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };

    warn!("Rule {} failed on {}: {}", rule.id(), subject.display_name(), failure);
    vec![
        Finding::new(
            RULE_EXECUTION_ERROR,
            subject.component(),
            subject.display_name(),
            format!("Check '{}' could not be evaluated: {}", rule.id(), failure),
            Severity::High,
        )
        .with_failed_rule(rule.id()),
    ]
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
