//! The Step capability: the fixed interface the core consumes user-authored
//! steps through. Rust has no runtime class reflection, so the "declared
//! init-arg names" piece of the contract is an explicit method rather than
//! introspection.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::error::{PlannerError, Result};
use crate::logger::Logger;
use crate::value::{Timestamp, Value, ValueKind};

/// A named dependency a step requires as a constructor argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub name: String,
    pub kind: ValueKind,
}

impl DependencyDescriptor {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A named value a step makes available after running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionDescriptor {
    pub name: String,
    pub kind: ValueKind,
}

impl ProductionDescriptor {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Constructor-argument mapping: keys are init names, values are either
/// projected config or upstream productions (productions win, see
/// `RunData::make_step_object`).
pub type ArgMap = HashMap<String, Value>;

/// production-name -> produced value.
pub type ProductionsMap = HashMap<String, Value>;

/// An instantiated step. Built by a `StepFactory`; discarded once its
/// observables have been read (in the worker case, it never leaves the
/// worker process at all).
pub trait Step: Send {
    /// Perform the step's side effect.
    fn run(&mut self);

    /// The timestamp of this step's most recent run, or `None` if it has
    /// never run. Must be defined after `run()` returns.
    fn last_run_time(&self) -> Option<Timestamp>;

    /// The values this step produced. May be called before `run()` for a
    /// step that is being treated as already up to date, in which case it
    /// must reflect the *previous* run's outputs.
    fn productions(&self) -> ProductionsMap;
}

/// Catalog-time metadata for a step class, plus its constructor. One
/// `StepFactory` per step class; `StepCatalog` holds a list of these,
/// keyed by `qualified_name()`.
pub trait StepFactory: Send + Sync {
    /// Fully qualified name; this is the class's identity throughout the
    /// planner. Nothing else distinguishes two instances of the same class.
    fn qualified_name(&self) -> &str;

    /// Ordered list of dependency descriptors.
    fn dependencies(&self) -> &[DependencyDescriptor];

    /// Ordered list of production descriptors.
    fn productions(&self) -> &[ProductionDescriptor];

    /// The set of named constructor parameters this class accepts,
    /// expressed as external init names. Dependencies and config entries
    /// are bound to these by matching names.
    fn init_arg_names(&self) -> &[String];

    /// Build an instance. `args` contains exactly the keys returned by
    /// `init_arg_names()` that were resolvable (config ∪ productions);
    /// absent keys are a defensive/unreachable condition by the time
    /// planning has succeeded.
    fn construct(&self, args: &ArgMap, logger: Arc<dyn Logger>) -> Result<Box<dyn Step>>;
}

impl dyn StepFactory {
    /// `true` if this class declares a production whose name collides
    /// with one of its own dependency names — such a class could never be
    /// satisfied, since its own output would shadow what it needs as input.
    pub fn has_production_dependency_collision(&self) -> Option<&str> {
        let dep_names: std::collections::HashSet<&str> =
            self.dependencies().iter().map(|d| d.name.as_str()).collect();
        self.productions()
            .iter()
            .map(|p| p.name.as_str())
            .find(|name| dep_names.contains(name))
    }
}

/// Project the subset of `config` whose keys match `init_arg_names`, then
/// overlay `productions` for every declared dependency name (productions
/// win over config where both exist). Returns an error if a dependency
/// name the factory needs isn't present in either map — this should be
/// unreachable once planning has succeeded (`MissingProductionAtConstruct`).
#[instrument(skip(factory, config, productions), fields(step = factory.qualified_name()))]
pub fn build_args(
    factory: &dyn StepFactory,
    config: &HashMap<String, Value>,
    productions: &HashMap<String, Value>,
) -> Result<ArgMap> {
    let mut args = ArgMap::new();

    for name in factory.init_arg_names() {
        if let Some(v) = config.get(name) {
            args.insert(name.clone(), v.clone());
        }
    }

    for dep in factory.dependencies() {
        match productions.get(&dep.name) {
            Some(v) => {
                args.insert(dep.name.clone(), v.clone());
            }
            None => {
                if !args.contains_key(&dep.name) {
                    return Err(PlannerError::MissingProductionAtConstruct {
                        step: factory.qualified_name().to_string(),
                        production: dep.name.clone(),
                    });
                }
            }
        }
    }

    Ok(args)
}
