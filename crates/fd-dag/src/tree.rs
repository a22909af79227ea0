//! StepTree: the recursive, lazily-resolved dependency DAG rooted at one
//! final step.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::instrument;

use crate::error::{PlannerError, Result};
use crate::production_map::ProductionMap;
use crate::step::StepFactory;

/// One resolved node in a step's dependency tree. Immutable once built —
/// every node is assembled bottom-up from its already-built children rather
/// than mutated in place after construction.
pub struct StepTreeNode {
    pub step_class: Arc<dyn StepFactory>,
    pub children: Vec<Arc<StepTreeNode>>,
}

impl StepTreeNode {
    pub fn name(&self) -> &str {
        self.step_class.qualified_name()
    }
}

/// Build the tree rooted at `step_class`. `candidate_set` is every class
/// name still eligible to serve as a producer for this node's
/// dependencies — callers pass the full catalog for the root; recursive
/// calls pass a copy with each visited ancestor removed, which is what
/// turns a true cycle into an `UnresolvedDependency` rather than a
/// distinct cycle error.
///
/// `cache` memoizes already-built subtrees by class name so a class
/// reachable from more than one place in the union of trees is resolved
/// once.
#[instrument(skip(candidate_set, production_map, cache), fields(step = step_class.qualified_name()))]
pub fn build_tree(
    step_class: Arc<dyn StepFactory>,
    candidate_set: &HashSet<String>,
    production_map: &ProductionMap,
    cache: &mut HashMap<String, Arc<StepTreeNode>>,
) -> Result<Arc<StepTreeNode>> {
    let name = step_class.qualified_name().to_string();

    if let Some(cached) = cache.get(&name) {
        return Ok(cached.clone());
    }

    // Step 1: remove step_class from the candidate set available to its
    // children. Combined with the ancestor-membership check below, this
    // makes every cycle surface as a missing producer.
    let mut child_candidates = candidate_set.clone();
    child_candidates.remove(&name);

    let mut children: Vec<Arc<StepTreeNode>> = Vec::new();
    let mut seen_producers: HashSet<String> = HashSet::new();

    for dep in step_class.dependencies() {
        let producer = production_map
            .resolve(&dep.name)
            .ok_or_else(|| PlannerError::UnresolvedDependency {
                step: name.clone(),
                dependency: dep.name.clone(),
            })?;

        let producer_name = producer.qualified_name().to_string();

        if producer_name == name {
            return Err(PlannerError::SelfDependency { step: name.clone() });
        }

        if !child_candidates.contains(&producer_name) {
            // The producer exists globally but has already been visited as
            // an ancestor of this node — i.e. a cycle.
            return Err(PlannerError::UnresolvedDependency {
                step: name.clone(),
                dependency: dep.name.clone(),
            });
        }

        if !seen_producers.insert(producer_name.clone()) {
            // Same producer already satisfies another dependency name of
            // this node; dedup rather than add a second child.
            continue;
        }

        let child = build_tree(producer.clone(), &child_candidates, production_map, cache)?;
        children.push(child);
    }

    children.sort_by(|a, b| a.name().cmp(b.name()));

    tracing::debug!(children = children.len(), "resolved step node");

    let node = Arc::new(StepTreeNode { step_class, children });
    cache.insert(name, node.clone());
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StaticEnumerator, StepCatalog};
    use crate::test_support::make_factory;

    fn catalog_of(factories: Vec<Arc<dyn StepFactory>>) -> StepCatalog {
        let mut enumerator = StaticEnumerator::new();
        for f in factories {
            enumerator.register("Demo", f);
        }
        StepCatalog::build(&["Demo".to_string()], &enumerator).unwrap()
    }

    #[test]
    fn linear_chain_resolves_in_dependency_order() {
        let a = make_factory("A", &[], &["a"]);
        let b = make_factory("B", &["a"], &["b"]);
        let c = make_factory("C", &["b"], &["c"]);
        let catalog = catalog_of(vec![a, b, c]);
        let map = ProductionMap::build(&catalog);

        let all: HashSet<String> = catalog.ordered().iter().map(|f| f.qualified_name().to_string()).collect();
        let mut cache = HashMap::new();
        let root = build_tree(catalog.get("C").unwrap().clone(), &all, &map, &mut cache).unwrap();

        assert_eq!(root.name(), "C");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name(), "B");
        assert_eq!(root.children[0].children[0].name(), "A");
    }

    #[test]
    fn cycle_manifests_as_unresolved_dependency() {
        let x = make_factory("X", &["y"], &["x"]);
        let y = make_factory("Y", &["x"], &["y"]);
        let catalog = catalog_of(vec![x, y]);
        let map = ProductionMap::build(&catalog);

        let all: HashSet<String> = catalog.ordered().iter().map(|f| f.qualified_name().to_string()).collect();
        let mut cache = HashMap::new();
        let err = build_tree(catalog.get("X").unwrap().clone(), &all, &map, &mut cache).unwrap_err();

        assert!(matches!(err, PlannerError::UnresolvedDependency { .. }));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let a = make_factory("A", &["a"], &["a"]);
        let catalog = catalog_of(vec![a]);
        let map = ProductionMap::build(&catalog);

        let all: HashSet<String> = catalog.ordered().iter().map(|f| f.qualified_name().to_string()).collect();
        let mut cache = HashMap::new();
        let err = build_tree(catalog.get("A").unwrap().clone(), &all, &map, &mut cache).unwrap_err();

        assert!(matches!(err, PlannerError::SelfDependency { .. }));
    }

    #[test]
    fn duplicate_dependency_on_same_producer_yields_one_child() {
        let a = make_factory("A", &[], &["a1", "a2"]);
        let b = make_factory("B", &["a1", "a2"], &["b"]);
        let catalog = catalog_of(vec![a, b]);
        let map = ProductionMap::build(&catalog);

        let all: HashSet<String> = catalog.ordered().iter().map(|f| f.qualified_name().to_string()).collect();
        let mut cache = HashMap::new();
        let root = build_tree(catalog.get("B").unwrap().clone(), &all, &map, &mut cache).unwrap();

        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name(), "A");
    }

    #[test]
    fn unresolved_dependency_names_are_explicit() {
        let a = make_factory("A", &["nonexistent"], &["a"]);
        let catalog = catalog_of(vec![a]);
        let map = ProductionMap::build(&catalog);

        let all: HashSet<String> = catalog.ordered().iter().map(|f| f.qualified_name().to_string()).collect();
        let mut cache = HashMap::new();
        let err = build_tree(catalog.get("A").unwrap().clone(), &all, &map, &mut cache).unwrap_err();

        match err {
            PlannerError::UnresolvedDependency { step, dependency } => {
                assert_eq!(step, "A");
                assert_eq!(dependency, "nonexistent");
            }
            other => panic!("expected UnresolvedDependency, got {other:?}"),
        }
    }
}
