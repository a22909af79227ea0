//! Execution of a `Plan` against a fresh `RunData`.

pub mod parallel;
pub mod sequential;
pub mod worker;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::error::Result;
use crate::logger::Logger;
use crate::plan::Plan;
use crate::run_data::RunData;
use crate::value::Value;

/// How a `Planner::run` call should execute a built `Plan`.
#[derive(Debug, Clone)]
pub enum ExecutionMode {
    /// Run every step in-process, one at a time, in the Plan's set order.
    Sequential,
    /// Run each set's not-yet-up-to-date steps across up to `width`
    /// concurrent worker processes.
    Parallel { width: usize },
}

/// Run `plan` to completion against `config`, returning the productions
/// accumulated over the whole run.
#[instrument(skip(plan, config, logger), fields(steps = plan.step_count()))]
pub fn execute(
    plan: &Plan,
    config: &HashMap<String, Value>,
    mode: &ExecutionMode,
    logger: Arc<dyn Logger>,
) -> Result<HashMap<String, Value>> {
    let mut run_data = RunData::new();

    match mode {
        ExecutionMode::Sequential => sequential::run(plan, config, &mut run_data, logger)?,
        ExecutionMode::Parallel { width } => {
            parallel::run(plan, config, &mut run_data, *width, logger)?
        }
    }

    Ok(run_data.into_productions())
}
