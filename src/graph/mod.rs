//! Reference graph between resources.
//!
//! Built once from a complete [`ResourceSet`]; read-only afterwards. Edges point from
//! the resource whose body names another resource to the named resource.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::debug;

use crate::model::{ResourceId, ResourceKind, ResourceSet};

/// A reference to a resource that is not declared in the document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MissingReference {
    pub from: ResourceId,
    pub to: ResourceId,
}

/// Who-uses-whom graph plus its transpose
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    forward: BTreeMap<ResourceId, BTreeSet<ResourceId>>,
    reverse: BTreeMap<ResourceId, BTreeSet<ResourceId>>,
    missing: BTreeMap<ResourceId, BTreeSet<ResourceId>>,
    triggered: BTreeSet<ResourceId>,
}

impl ReferenceGraph {
    /// Resolve every resource's reference list against the set
    pub fn build(resources: &ResourceSet) -> Self {
        let mut graph = Self::default();

        for resource in resources.iter() {
            let from = resource.id().clone();
            graph.forward.entry(from.clone()).or_default();
            graph.reverse.entry(from.clone()).or_default();

            for to in resource.references() {
                if resources.contains(to) {
                    graph.forward.entry(from.clone()).or_default().insert(to.clone());
                    graph.reverse.entry(to.clone()).or_default().insert(from.clone());
                } else {
                    graph.missing.entry(from.clone()).or_default().insert(to.clone());
                }
            }
        }

        graph.triggered = graph.compute_triggered();
        debug!(
            "Built reference graph: {} nodes, {} edges, {} missing references",
            graph.forward.len(),
            graph.edge_count(),
            graph.missing.values().map(BTreeSet::len).sum::<usize>()
        );
        graph
    }

    /// Resources whose definitions name `id`
    pub fn used_by(&self, id: &ResourceId) -> impl Iterator<Item = &ResourceId> {
        self.reverse.get(id).into_iter().flatten()
    }

    /// Resources named by `id`'s definition
    pub fn references(&self, id: &ResourceId) -> impl Iterator<Item = &ResourceId> {
        self.forward.get(id).into_iter().flatten()
    }

    /// Names in `id`'s definition that resolve to nothing
    pub fn missing_references(&self, id: &ResourceId) -> impl Iterator<Item = &ResourceId> {
        self.missing.get(id).into_iter().flatten()
    }

    /// Every dangling reference in the document, ordered by source then target
    pub fn all_missing(&self) -> Vec<MissingReference> {
        self.missing
            .iter()
            .flat_map(|(from, targets)| {
                targets.iter().map(move |to| MissingReference {
                    from: from.clone(),
                    to: to.clone(),
                })
            })
            .collect()
    }

    /// Whether nothing references `id`.
    ///
    /// Triggers are roots of the graph, so a trigger is orphaned when it
    /// references no pipeline rather than when nothing references it.
    pub fn is_orphaned(&self, id: &ResourceId) -> bool {
        match id.kind {
            ResourceKind::Trigger => !self
                .references(id)
                .any(|target| target.kind == ResourceKind::Pipeline),
            _ => self.used_by(id).next().is_none(),
        }
    }

    /// Pipelines that invoke `id` through an ExecutePipeline-style reference
    pub fn pipeline_callers(&self, id: &ResourceId) -> impl Iterator<Item = &ResourceId> {
        self.used_by(id).filter(|caller| caller.kind == ResourceKind::Pipeline)
    }

    /// Whether a trigger starts this pipeline directly or through a chain of
    /// pipeline invocations
    pub fn is_trigger_reachable(&self, id: &ResourceId) -> bool {
        self.triggered.contains(id)
    }

    /// Pipelines `id` invokes directly or through other pipelines, `id` included
    /// when it calls itself back
    pub fn pipeline_descendants(&self, id: &ResourceId) -> BTreeSet<&ResourceId> {
        walk(self.pipeline_targets(id), |pipeline| self.pipeline_targets(pipeline))
    }

    /// Pipelines that invoke `id` directly or through other pipelines
    pub fn pipeline_ancestors(&self, id: &ResourceId) -> BTreeSet<&ResourceId> {
        walk(self.pipeline_callers(id), |pipeline| self.pipeline_callers(pipeline))
    }

    /// Whether `id` is where a pipeline run would have to start.
    ///
    /// True when no pipeline calls it, or when it sits in a call cycle that no
    /// pipeline outside the cycle enters: every ancestor is also a descendant.
    pub fn is_call_root(&self, id: &ResourceId) -> bool {
        let ancestors = self.pipeline_ancestors(id);
        if ancestors.is_empty() {
            return true;
        }
        let descendants = self.pipeline_descendants(id);
        ancestors.iter().all(|ancestor| descendants.contains(ancestor))
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }

    fn pipeline_targets<'a>(&'a self, id: &ResourceId) -> impl Iterator<Item = &'a ResourceId> + use<'a> {
        self.forward
            .get(id)
            .into_iter()
            .flatten()
            .filter(|target| target.kind == ResourceKind::Pipeline)
    }

    fn compute_triggered(&self) -> BTreeSet<ResourceId> {
        let mut reached = BTreeSet::new();
        let mut queue: VecDeque<&ResourceId> = self
            .forward
            .iter()
            .filter(|(from, _)| from.kind == ResourceKind::Trigger)
            .flat_map(|(_, targets)| targets.iter())
            .filter(|target| target.kind == ResourceKind::Pipeline)
            .collect();

        while let Some(pipeline) = queue.pop_front() {
            if !reached.insert(pipeline.clone()) {
                continue;
            }
            queue.extend(self.pipeline_targets(pipeline));
        }

        reached
    }
}

/// Breadth-first closure over `next`, starting from `start`
fn walk<'a, I, F>(start: impl Iterator<Item = &'a ResourceId>, next: F) -> BTreeSet<&'a ResourceId>
where
    I: Iterator<Item = &'a ResourceId>,
    F: Fn(&'a ResourceId) -> I,
{
    let mut reached = BTreeSet::new();
    let mut queue: VecDeque<&ResourceId> = start.collect();

    while let Some(node) = queue.pop_front() {
        if reached.insert(node) {
            queue.extend(next(node));
        }
    }
    reached
}
