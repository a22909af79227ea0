//! Planner: layered topological partition of the union of StepTrees for a
//! set of final steps.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::catalog::StepCatalog;
use crate::error::{PlannerError, Result};
use crate::production_map::ProductionMap;
use crate::step::StepFactory;
use crate::tree::{build_tree, StepTreeNode};

/// A reference to one of the catalog's final steps, as accepted by
/// `Planner::run`. Either a step class reference or its classname string is
/// acceptable at the call site; in Rust a step class has no runtime identity
/// apart from its registered name, so both collapse to the same
/// representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalStep(pub String);

impl From<&str> for FinalStep {
    fn from(name: &str) -> Self {
        FinalStep(name.to_string())
    }
}

impl From<String> for FinalStep {
    fn from(name: String) -> Self {
        FinalStep(name)
    }
}

/// An ordered sequence of step sets. Set ⟨i⟩'s members depend only on
/// classes in sets ⟨0..i-1⟩; within a set, order is unobservable.
#[derive(Clone)]
pub struct Plan {
    pub sets: Vec<Vec<Arc<dyn StepFactory>>>,
}

impl Plan {
    pub fn step_count(&self) -> usize {
        self.sets.iter().map(|s| s.len()).sum()
    }
}

/// Build a plan for `final_steps` against `catalog`/`production_map`.
#[instrument(skip(catalog, production_map, final_steps))]
pub fn build_plan(
    catalog: &StepCatalog,
    production_map: &ProductionMap,
    final_steps: &[FinalStep],
) -> Result<Plan> {
    if final_steps.is_empty() {
        return Err(PlannerError::ArgumentInvalid(
            "final_steps must not be empty".to_string(),
        ));
    }

    let all_names: HashSet<String> = catalog
        .ordered()
        .iter()
        .map(|f| f.qualified_name().to_string())
        .collect();

    let mut cache: HashMap<String, Arc<StepTreeNode>> = HashMap::new();
    let mut roots = Vec::with_capacity(final_steps.len());

    for final_step in final_steps {
        let factory = catalog.get(&final_step.0).cloned().ok_or_else(|| {
            PlannerError::ArgumentInvalid(format!("unknown final step class '{}'", final_step.0))
        })?;
        let root = build_tree(factory, &all_names, production_map, &mut cache)?;
        roots.push(root);
    }

    // A production colliding with its own class's dependency name is a
    // structural defect of every reachable class, not just the roots.
    for node in cache.values() {
        if let Some(colliding) = node.step_class.has_production_dependency_collision() {
            return Err(PlannerError::CatalogMalformed {
                class: node.name().to_string(),
                reason: format!(
                    "production '{colliding}' collides with a dependency of the same name"
                ),
            });
        }
    }

    let mut layer_of: HashMap<String, usize> = HashMap::new();
    let mut classes: HashMap<String, Arc<dyn StepFactory>> = HashMap::new();

    for root in &roots {
        assign_layer(root, &mut layer_of, &mut classes);
    }

    let max_layer = layer_of.values().copied().max().unwrap_or(0);
    let mut sets: Vec<Vec<Arc<dyn StepFactory>>> = vec![Vec::new(); max_layer + 1];
    for (name, layer) in &layer_of {
        sets[*layer].push(classes.get(name).expect("tracked alongside layer").clone());
    }
    for set in &mut sets {
        set.sort_by(|a, b| a.qualified_name().cmp(b.qualified_name()));
    }

    debug!(sets = sets.len(), "built execution plan");

    Ok(Plan { sets })
}

/// `layer(n) = 0` if `n` has no children, else `1 + max(layer(child))`.
/// Memoized by class name so a class shared by multiple final steps'
/// trees is assigned exactly once, at the layer consistent with every
/// path that reaches it (its layer is a pure function of its own
/// children, so there is no ambiguity to resolve between call sites).
fn assign_layer(
    node: &Arc<StepTreeNode>,
    layer_of: &mut HashMap<String, usize>,
    classes: &mut HashMap<String, Arc<dyn StepFactory>>,
) -> usize {
    if let Some(&layer) = layer_of.get(node.name()) {
        return layer;
    }

    let layer = if node.children.is_empty() {
        0
    } else {
        1 + node
            .children
            .iter()
            .map(|child| assign_layer(child, layer_of, classes))
            .max()
            .expect("children is non-empty")
    };

    layer_of.insert(node.name().to_string(), layer);
    classes.insert(node.name().to_string(), node.step_class.clone());
    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticEnumerator;
    use crate::test_support::make_factory;

    fn catalog_of(factories: Vec<Arc<dyn StepFactory>>) -> StepCatalog {
        let mut enumerator = StaticEnumerator::new();
        for f in factories {
            enumerator.register("Demo", f);
        }
        StepCatalog::build(&["Demo".to_string()], &enumerator).unwrap()
    }

    fn names(set: &[Arc<dyn StepFactory>]) -> Vec<&str> {
        set.iter().map(|f| f.qualified_name()).collect()
    }

    #[test]
    fn linear_chain_plans_one_step_per_set_in_order() {
        let a = make_factory("A", &[], &["a"]);
        let b = make_factory("B", &["a"], &["b"]);
        let c = make_factory("C", &["b"], &["c"]);
        let catalog = catalog_of(vec![a, b, c]);
        let map = ProductionMap::build(&catalog);

        let plan = build_plan(&catalog, &map, &[FinalStep::from("C")]).unwrap();

        assert_eq!(plan.sets.len(), 3);
        assert_eq!(names(&plan.sets[0]), vec!["A"]);
        assert_eq!(names(&plan.sets[1]), vec!["B"]);
        assert_eq!(names(&plan.sets[2]), vec!["C"]);
    }

    #[test]
    fn diamond_puts_independent_steps_in_the_same_set() {
        let a = make_factory("A", &[], &["a"]);
        let b = make_factory("B", &["a"], &["b"]);
        let c = make_factory("C", &["a"], &["c"]);
        let d = make_factory("D", &["b", "c"], &["d"]);
        let catalog = catalog_of(vec![a, b, c, d]);
        let map = ProductionMap::build(&catalog);

        let plan = build_plan(&catalog, &map, &[FinalStep::from("D")]).unwrap();

        assert_eq!(plan.sets.len(), 3);
        assert_eq!(names(&plan.sets[0]), vec!["A"]);
        assert_eq!(names(&plan.sets[1]), vec!["B", "C"]);
        assert_eq!(names(&plan.sets[2]), vec!["D"]);
    }

    #[test]
    fn no_class_appears_in_two_sets() {
        let a = make_factory("A", &[], &["a"]);
        let b = make_factory("B", &["a"], &["b"]);
        let c = make_factory("C", &["a"], &["c"]);
        let d = make_factory("D", &["b", "c"], &["d"]);
        let catalog = catalog_of(vec![a, b, c, d]);
        let map = ProductionMap::build(&catalog);

        let plan = build_plan(&catalog, &map, &[FinalStep::from("D")]).unwrap();

        let mut seen = HashSet::new();
        for set in &plan.sets {
            for class in set {
                assert!(seen.insert(class.qualified_name().to_string()), "class appeared twice");
            }
        }
    }

    #[test]
    fn empty_final_steps_is_an_argument_error() {
        let catalog = catalog_of(vec![make_factory("A", &[], &["a"])]);
        let map = ProductionMap::build(&catalog);

        let err = build_plan(&catalog, &map, &[]).unwrap_err();
        assert!(matches!(err, PlannerError::ArgumentInvalid(_)));
    }

    #[test]
    fn unknown_final_step_is_an_argument_error() {
        let catalog = catalog_of(vec![make_factory("A", &[], &["a"])]);
        let map = ProductionMap::build(&catalog);

        let err = build_plan(&catalog, &map, &[FinalStep::from("Nope")]).unwrap_err();
        assert!(matches!(err, PlannerError::ArgumentInvalid(_)));
    }

    #[test]
    fn production_colliding_with_own_dependency_is_rejected() {
        // "AProducer" sorts first alphabetically, so it wins as the
        // producer of "x" in ProductionMap — "ZBad"'s dependency on "x"
        // resolves to AProducer, not to itself. The collision we're
        // testing is structural (ZBad declares "x" as both one of its own
        // dependencies and one of its own productions), independent of
        // who actually supplies it.
        let producer = make_factory("AProducer", &[], &["x"]);
        let bad = make_factory("ZBad", &["x"], &["x"]);
        let catalog = catalog_of(vec![producer, bad]);
        let map = ProductionMap::build(&catalog);

        let err = build_plan(&catalog, &map, &[FinalStep::from("ZBad")]).unwrap_err();
        assert!(matches!(err, PlannerError::CatalogMalformed { .. }));
    }
}
