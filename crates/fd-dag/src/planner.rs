//! Planner: the public facade combining catalog discovery, production
//! resolution, planning, and execution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::catalog::{NamespaceEnumerator, StepCatalog};
use crate::error::Result;
use crate::executor::{execute, ExecutionMode};
use crate::logger::{Logger, TracingLogger};
use crate::plan::{build_plan, FinalStep, Plan};
use crate::production_map::ProductionMap;
use crate::value::Value;

/// Construction parameters for a `Planner`.
pub struct PlannerOptions {
    /// Namespaces to enumerate, in precedence order: the first namespace
    /// to declare a given production wins it.
    pub step_namespaces: Vec<String>,
    /// Worker-process width. `1` (the default) selects sequential
    /// execution; anything higher selects the parallel executor.
    pub jobs: usize,
    /// Logging sink handed to every constructed step. Defaults to a
    /// `TracingLogger` if not supplied.
    pub logger: Option<Arc<dyn Logger>>,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            step_namespaces: Vec::new(),
            jobs: 1,
            logger: None,
        }
    }
}

/// Discovers a step catalog once, then plans and executes runs against it.
pub struct Planner {
    catalog: StepCatalog,
    production_map: ProductionMap,
    logger: Arc<dyn Logger>,
    mode: ExecutionMode,
}

impl Planner {
    /// Enumerate `options.step_namespaces` through `enumerator` and build
    /// the catalog and production map once, up front.
    #[instrument(skip(options, enumerator), fields(jobs = options.jobs))]
    pub fn new(options: PlannerOptions, enumerator: &dyn NamespaceEnumerator) -> Result<Self> {
        let catalog = StepCatalog::build(&options.step_namespaces, enumerator)?;
        let production_map = ProductionMap::build(&catalog);
        let logger = options.logger.unwrap_or_else(|| Arc::new(TracingLogger));
        let mode = if options.jobs <= 1 {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Parallel { width: options.jobs }
        };

        Ok(Self {
            catalog,
            production_map,
            logger,
            mode,
        })
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    /// Build a `Plan` for `final_steps` without executing it.
    pub fn plan(&self, final_steps: &[FinalStep]) -> Result<Plan> {
        build_plan(&self.catalog, &self.production_map, final_steps)
    }

    /// Plan and execute `final_steps` against `config`, returning every
    /// production accumulated across the run.
    #[instrument(skip(self, final_steps, config), fields(final_steps = final_steps.len()))]
    pub fn run(
        &self,
        final_steps: &[FinalStep],
        config: &HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>> {
        let plan = self.plan(final_steps)?;
        execute(&plan, config, &self.mode, self.logger.clone())
    }
}
