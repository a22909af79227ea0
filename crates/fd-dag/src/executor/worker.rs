//! Worker re-exec protocol. Rust has no cross-platform `fork()` that's safe
//! to call from a multi-threaded process, so instead of forking, the parent
//! spawns a fresh copy of its own executable with a sentinel environment
//! variable set. The child checks for that sentinel at the top of its own
//! `main()` and, if present, behaves as a worker: read one job as JSON on
//! stdin, run it, write one result as JSON on stdout, exit.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::StepCatalog;
use crate::error::{PlannerError, Result};
use crate::logger::{Logger, TracingLogger};
use crate::step::ArgMap;
use crate::value::{Timestamp, Value};

/// Presence of this environment variable (any value) marks a process as a
/// worker rather than a fresh top-level invocation.
pub const WORKER_SENTINEL_ENV: &str = "FD_DAG_WORKER";

#[derive(Serialize, Deserialize)]
struct WorkerJob {
    class: String,
    args: ArgMap,
}

#[derive(Serialize, Deserialize)]
struct WorkerResult {
    last_run_time: Option<Timestamp>,
    productions: HashMap<String, Value>,
}

/// A spawned-but-not-yet-collected worker process.
pub struct Handle {
    child: Child,
    class: String,
}

/// Whether the current process was launched as a worker.
pub fn is_worker_process() -> bool {
    std::env::var(WORKER_SENTINEL_ENV).is_ok()
}

/// Spawn a fresh copy of the current executable as a worker and hand it
/// `class`'s already-resolved constructor args over stdin. Does not block
/// waiting for the step to finish; call `collect` for that.
pub fn spawn(class: &str, args: &ArgMap) -> Result<Handle> {
    let exe = std::env::current_exe().map_err(|e| PlannerError::WorkerFailure {
        pid: 0,
        class: class.to_string(),
        reason: format!("cannot locate current executable: {e}"),
    })?;

    let mut child = Command::new(exe)
        .env(WORKER_SENTINEL_ENV, "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| PlannerError::WorkerFailure {
            pid: 0,
            class: class.to_string(),
            reason: format!("failed to spawn worker process: {e}"),
        })?;

    let job = WorkerJob {
        class: class.to_string(),
        args: args.clone(),
    };
    let payload = serde_json::to_vec(&job).map_err(|e| PlannerError::WorkerFailure {
        pid: child.id(),
        class: class.to_string(),
        reason: format!("failed to encode job: {e}"),
    })?;

    child
        .stdin
        .take()
        .expect("stdin was piped")
        .write_all(&payload)
        .map_err(|e| PlannerError::WorkerFailure {
            pid: child.id(),
            class: class.to_string(),
            reason: format!("failed to write job to worker stdin: {e}"),
        })?;

    Ok(Handle {
        child,
        class: class.to_string(),
    })
}

/// The observables a worker reported back for one step run.
pub struct WorkerOutcome {
    pub last_run_time: Option<Timestamp>,
    pub productions: HashMap<String, Value>,
}

/// Block until `handle`'s process exits, decode its reported outcome, and
/// turn a non-zero exit or undecodable output into `WorkerFailure`.
pub fn collect(mut handle: Handle) -> Result<WorkerOutcome> {
    let pid = handle.child.id();
    let output = handle
        .child
        .wait_with_output()
        .map_err(|e| PlannerError::WorkerFailure {
            pid,
            class: handle.class.clone(),
            reason: format!("failed to wait for worker: {e}"),
        })?;

    if !output.status.success() {
        return Err(PlannerError::WorkerFailure {
            pid,
            class: handle.class.clone(),
            reason: format!("worker exited with {}", output.status),
        });
    }

    let result: WorkerResult =
        serde_json::from_slice(&output.stdout).map_err(|e| PlannerError::WorkerFailure {
            pid,
            class: handle.class.clone(),
            reason: format!("failed to decode worker output: {e}"),
        })?;

    Ok(WorkerOutcome {
        last_run_time: result.last_run_time,
        productions: result.productions,
    })
}

/// Worker-side entry point. Embedders call `is_worker_process()` at the
/// very top of their own `main()` and, if true, call this instead of
/// proceeding with normal startup. Never returns.
pub fn run_worker(catalog: &StepCatalog) -> ! {
    let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
    match run_worker_inner(catalog, std::io::stdin(), logger) {
        Ok(bytes) => {
            let _ = std::io::stdout().write_all(&bytes);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("worker failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Reads one job from `input`, runs it against `catalog`, and returns the
/// encoded result. Takes `input` as `impl Read` rather than reaching for
/// `std::io::stdin()` directly so the job/result round trip can be
/// exercised in tests without real process stdio.
fn run_worker_inner(
    catalog: &StepCatalog,
    mut input: impl Read,
    logger: Arc<dyn Logger>,
) -> Result<Vec<u8>> {
    let mut payload = String::new();
    input
        .read_to_string(&mut payload)
        .map_err(|e| PlannerError::WorkerFailure {
            pid: std::process::id(),
            class: "<unknown>".to_string(),
            reason: format!("failed to read job from stdin: {e}"),
        })?;

    let job: WorkerJob = serde_json::from_str(&payload).map_err(|e| PlannerError::WorkerFailure {
        pid: std::process::id(),
        class: "<unknown>".to_string(),
        reason: format!("failed to decode job: {e}"),
    })?;

    let factory = catalog.get(&job.class).ok_or_else(|| PlannerError::WorkerFailure {
        pid: std::process::id(),
        class: job.class.clone(),
        reason: "class not present in this worker's catalog".to_string(),
    })?;

    let mut step = factory.construct(&job.args, logger)?;
    step.run();

    let result = WorkerResult {
        last_run_time: step.last_run_time(),
        productions: step.productions(),
    };

    serde_json::to_vec(&result).map_err(|e| PlannerError::WorkerFailure {
        pid: std::process::id(),
        class: job.class.clone(),
        reason: format!("failed to encode result: {e}"),
    })
}
