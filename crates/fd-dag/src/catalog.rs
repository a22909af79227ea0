//! Catalog discovery and validation.
//!
//! Class discovery mechanics are deliberately kept outside the core — it
//! only consumes whatever a `NamespaceEnumerator` hands it. Since Rust has
//! no runtime class reflection or namespace scanning, the built-in
//! enumerator is an explicit registry the embedder populates up front.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{PlannerError, Result};
use crate::step::StepFactory;

/// Given a namespace prefix, returns the candidate step factories declared
/// under it. Implementations may return factories in any order; the
/// catalog re-sorts them deterministically.
pub trait NamespaceEnumerator: Send + Sync {
    fn enumerate(&self, namespace: &str) -> Vec<Arc<dyn StepFactory>>;
}

/// An enumerator backed by an explicit, in-memory registration table. This
/// is the "class discovery" every demo/embedder in this workspace uses;
/// a host application could swap in a different `NamespaceEnumerator`
/// (e.g. one backed by a plugin-loading mechanism) without touching the
/// planner.
#[derive(Default)]
pub struct StaticEnumerator {
    registrations: HashMap<String, Vec<Arc<dyn StepFactory>>>,
}

impl StaticEnumerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step factory under a namespace. A factory may be
    /// registered under more than one namespace if desired; ordering among
    /// factories registered under the same namespace does not matter, the
    /// catalog sorts by class name.
    pub fn register(&mut self, namespace: impl Into<String>, factory: Arc<dyn StepFactory>) -> &mut Self {
        self.registrations
            .entry(namespace.into())
            .or_default()
            .push(factory);
        self
    }
}

impl NamespaceEnumerator for StaticEnumerator {
    fn enumerate(&self, namespace: &str) -> Vec<Arc<dyn StepFactory>> {
        self.registrations.get(namespace).cloned().unwrap_or_default()
    }
}

/// The ordered, validated set of known step classes.
pub struct StepCatalog {
    /// Sorted by (namespace-prefix index, qualified class name ascending).
    ordered: Vec<Arc<dyn StepFactory>>,
    by_name: HashMap<String, Arc<dyn StepFactory>>,
}

impl StepCatalog {
    /// Enumerate every namespace in declared order, validate each
    /// candidate satisfies the Step capability, and produce a
    /// deterministically ordered catalog.
    #[instrument(skip(enumerator))]
    pub fn build(namespaces: &[String], enumerator: &dyn NamespaceEnumerator) -> Result<Self> {
        let mut by_name: HashMap<String, Arc<dyn StepFactory>> = HashMap::new();
        let mut indexed: Vec<(usize, String)> = Vec::new();

        for (ns_index, namespace) in namespaces.iter().enumerate() {
            for factory in enumerator.enumerate(namespace) {
                Self::validate_conformance(factory.as_ref())?;

                let name = factory.qualified_name().to_string();
                if by_name.contains_key(&name) {
                    return Err(PlannerError::CatalogMalformed {
                        class: name,
                        reason: "duplicate class name registered in catalog".to_string(),
                    });
                }
                indexed.push((ns_index, name.clone()));
                by_name.insert(name, factory);
            }
        }

        indexed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let ordered: Vec<Arc<dyn StepFactory>> = indexed
            .into_iter()
            .map(|(_, name)| by_name.get(&name).expect("just inserted").clone())
            .collect();

        debug!(classes = ordered.len(), "built step catalog");

        Ok(Self { ordered, by_name })
    }

    /// Structural validation of a single class: no duplicate dependency
    /// names, no duplicate production names. (A production name colliding
    /// with the class's own dependency name is checked later, by
    /// `Planner`, once the full reachable set of classes is known.)
    fn validate_conformance(factory: &dyn StepFactory) -> Result<()> {
        let mut seen_deps = HashSet::new();
        for dep in factory.dependencies() {
            if !seen_deps.insert(dep.name.as_str()) {
                return Err(PlannerError::CatalogMalformed {
                    class: factory.qualified_name().to_string(),
                    reason: format!("dependency '{}' declared more than once", dep.name),
                });
            }
        }

        let mut seen_prods = HashSet::new();
        for prod in factory.productions() {
            if !seen_prods.insert(prod.name.as_str()) {
                return Err(PlannerError::CatalogMalformed {
                    class: factory.qualified_name().to_string(),
                    reason: format!("production '{}' declared more than once", prod.name),
                });
            }
        }

        Ok(())
    }

    /// The catalog in deterministic (namespace, name) order.
    pub fn ordered(&self) -> &[Arc<dyn StepFactory>] {
        &self.ordered
    }

    /// Look a class up by its fully qualified name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn StepFactory>> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
