//! Dependency-driven step runner.
//!
//! Step classes declare named dependencies (values they consume) and
//! productions (values they supply). Given a set of final steps to
//! satisfy, the planner resolves the transitive dependency tree against a
//! global production map, partitions it into a layered `Plan`, and
//! executes it — skipping any step whose last-run timestamp is already
//! newer than everything it depends on.

pub mod catalog;
pub mod error;
pub mod executor;
pub mod logger;
pub mod plan;
pub mod planner;
pub mod production_map;
pub mod run_data;
pub mod step;
pub mod tree;
pub mod value;

#[cfg(test)]
mod test_support;

pub use catalog::{NamespaceEnumerator, StaticEnumerator, StepCatalog};
pub use error::{PlannerError, Result};
pub use executor::{execute, ExecutionMode};
pub use logger::{Logger, NullLogger, TracingLogger};
pub use plan::{build_plan, FinalStep, Plan};
pub use planner::{Planner, PlannerOptions};
pub use production_map::ProductionMap;
pub use run_data::RunData;
pub use step::{
    build_args, ArgMap, DependencyDescriptor, ProductionDescriptor, ProductionsMap, Step, StepFactory,
};
pub use tree::{build_tree, StepTreeNode};
pub use value::{Timestamp, Value, ValueKind};
