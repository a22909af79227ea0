//! Multi-process parallel executor: within a set, up to `width` steps run
//! concurrently as worker processes. Unlike a batched approach, the pool is
//! continuous — as soon as one worker finishes, the next queued step (if
//! any) is dispatched immediately, rather than waiting for every member of
//! a fixed-size chunk to finish first. A slow step no longer stalls its
//! siblings' slots. If any worker fails, the rest of the in-flight set is
//! still drained (so no child is left running unreaped) but no further
//! steps are dispatched, and every production gathered for this set —
//! successes included — is discarded; the whole run then aborts.

use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;

use tracing::instrument;

use crate::error::{PlannerError, Result};
use crate::logger::Logger;
use crate::plan::Plan;
use crate::run_data::RunData;
use crate::step::{build_args, ArgMap, StepFactory};
use crate::value::Value;

use super::worker;

#[instrument(skip(plan, config, run_data, logger), fields(sets = plan.sets.len(), width))]
pub fn run(
    plan: &Plan,
    config: &HashMap<String, Value>,
    run_data: &mut RunData,
    width: usize,
    logger: Arc<dyn Logger>,
) -> Result<()> {
    let width = width.max(1);

    for set in &plan.sets {
        run_data.start_step_set();

        let mut to_run: Vec<(Arc<dyn StepFactory>, ArgMap)> = Vec::new();

        for factory in set {
            let args = build_args(factory.as_ref(), config, run_data.productions())?;
            let mut step = factory.construct(&args, logger.clone())?;

            if run_data.step_is_up_to_date(step.last_run_time()) {
                logger.debug(&format!("{} is up to date, skipping", factory.qualified_name()));
                run_data.record_run_time(step.last_run_time());
                run_data.record_productions(step.productions());
            } else {
                to_run.push((factory.clone(), args));
            }
        }

        run_batches(&to_run, width, run_data, logger.clone())?;
    }

    Ok(())
}

/// Each in-flight worker is collected on its own thread, which blocks on the
/// child the way `worker::collect` always has; the thread's only job is to
/// report back over `tx` so this function can react to whichever worker
/// finishes first instead of waiting on a fixed batch. That's what gives a
/// width-`N` pool without needing an async runtime: `N` blocking collectors
/// running concurrently, racing into one channel.
#[instrument(skip(to_run, run_data, logger), fields(steps = to_run.len(), width))]
fn run_batches(
    to_run: &[(Arc<dyn StepFactory>, ArgMap)],
    width: usize,
    run_data: &mut RunData,
    logger: Arc<dyn Logger>,
) -> Result<()> {
    if to_run.is_empty() {
        return Ok(());
    }

    let (tx, rx) = mpsc::channel::<(usize, Result<worker::WorkerOutcome>)>();
    let mut pending_outcomes: Vec<Option<worker::WorkerOutcome>> =
        (0..to_run.len()).map(|_| None).collect();
    let mut first_failure: Option<PlannerError> = None;
    let mut next_index = 0;
    let mut in_flight = 0;

    while next_index < to_run.len() && in_flight < width {
        match spawn_one(next_index, to_run, tx.clone(), logger.clone()) {
            Ok(()) => in_flight += 1,
            Err(e) => {
                first_failure = Some(e);
                next_index += 1;
                break;
            }
        }
        next_index += 1;
    }

    while in_flight > 0 {
        let (index, result) = rx.recv().expect("worker collector thread hung up without reporting");
        in_flight -= 1;

        match result {
            Ok(outcome) => {
                if first_failure.is_none() {
                    pending_outcomes[index] = Some(outcome);
                }
            }
            Err(e) => {
                logger.error(&format!(
                    "worker for {} failed: {e}",
                    to_run[index].0.qualified_name()
                ));
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }

        if first_failure.is_none() && next_index < to_run.len() {
            match spawn_one(next_index, to_run, tx.clone(), logger.clone()) {
                Ok(()) => in_flight += 1,
                Err(e) => first_failure = Some(e),
            }
            next_index += 1;
        }
    }

    if let Some(err) = first_failure {
        return Err(err);
    }

    for outcome in pending_outcomes.into_iter().flatten() {
        run_data.record_run_time(outcome.last_run_time);
        run_data.record_productions(outcome.productions);
    }

    Ok(())
}

/// Spawn `to_run[index]` and hand its collection off to a dedicated thread,
/// which reports `(index, outcome)` back over `tx` once the worker exits.
fn spawn_one(
    index: usize,
    to_run: &[(Arc<dyn StepFactory>, ArgMap)],
    tx: mpsc::Sender<(usize, Result<worker::WorkerOutcome>)>,
    logger: Arc<dyn Logger>,
) -> Result<()> {
    let (factory, args) = &to_run[index];
    logger.info(&format!("spawning worker for {}", factory.qualified_name()));
    let handle = worker::spawn(factory.qualified_name(), args)?;

    thread::spawn(move || {
        let outcome = worker::collect(handle);
        let _ = tx.send((index, outcome));
    });

    Ok(())
}
