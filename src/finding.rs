//! Findings and the collector that orders them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ResourceKind;

/// How much a finding matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(s)
    }
}

/// What a finding is about: a declared resource, or an activity inside a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Resource(ResourceKind),
    Activity,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(kind) => write!(f, "{}", kind),
            Self::Activity => f.write_str("Activity"),
        }
    }
}

/// One reported violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub check: String,
    pub component: Component,
    pub resource: String,
    pub message: String,
    pub severity: Severity,
    /// Id of the check that could not be evaluated, for rule execution errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_rule: Option<String>,
}

impl Finding {
    pub fn new(
        check: impl Into<String>,
        component: Component,
        resource: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            check: check.into(),
            component,
            resource: resource.into(),
            message: message.into(),
            severity,
            failed_rule: None,
        }
    }

    pub fn with_failed_rule(mut self, rule: impl Into<String>) -> Self {
        self.failed_rule = Some(rule.into());
        self
    }
}

/// Append-only accumulator of findings
#[derive(Debug, Default)]
pub struct FindingCollector {
    findings: Vec<Finding>,
}

impl FindingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings grouped by check id, then resource name.
    ///
    /// The sort is stable: findings with equal keys keep insertion order.
    pub fn into_sorted(self) -> Vec<Finding> {
        let mut findings = self.findings;
        findings.sort_by(|a, b| a.check.cmp(&b.check).then_with(|| a.resource.cmp(&b.resource)));
        findings
    }
}
