//! adflint - A governance linter for exported Azure Data Factory templates
//!
//! The template is parsed into a typed resource model, references between resources
//! are resolved into a graph, and a registry of independent checks runs over every
//! resource and activity. Checks report findings instead of failing the run.

pub mod error;
pub mod finding;
pub mod graph;
pub mod loader;
pub mod model;
pub mod parser;
pub mod report;
pub mod rules;

pub use error::{LintError, Result};
pub use finding::{Component, Finding, FindingCollector, Severity};
pub use loader::{lint_document, lint_resources, load_template};
pub use rules::{RuleEngine, RuleSettings};
