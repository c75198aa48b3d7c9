//! Typed resource model for exported data factory templates.

pub mod activity;
pub mod resource;

pub use activity::{Activity, ActivityBranch, ActivityScope, DependencyCondition, Outcome, OutcomeSet};
pub use resource::{Resource, ResourceId, ResourceKind, ResourceSet};
