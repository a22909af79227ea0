//! Error kinds raised by the planner and executor.

use thiserror::Error;

/// All failure modes the core surfaces to callers. None of these are
/// retried internally — the first one aborts the run.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// A candidate class exists under a declared step namespace but does
    /// not satisfy the Step capability.
    #[error("class '{class}' does not satisfy the Step capability: {reason}")]
    CatalogMalformed { class: String, reason: String },

    /// A step's declared dependency has no producer in the ProductionMap.
    /// This is also how a true cycle manifests: the ancestor that would
    /// close the loop was stripped from the candidate set before the
    /// lookup, so it never resolves.
    #[error(
        "cannot resolve dependency '{dependency}' of step '{step}': no step produces it. \
         Do you have a cyclic dependency?"
    )]
    UnresolvedDependency { step: String, dependency: String },

    /// A step's dependency resolved to the step itself.
    #[error("a dependency of '{step}' resolved to the same step")]
    SelfDependency { step: String },

    /// Defensive: plan-time checks should have made this unreachable.
    #[error("missing production '{production}' while constructing '{step}' (should be unreachable)")]
    MissingProductionAtConstruct { step: String, production: String },

    /// A worker process exited with a non-zero status, or its output
    /// could not be decoded.
    #[error("child process {pid} failed while running step '{class}': {reason}")]
    WorkerFailure {
        pid: u32,
        class: String,
        reason: String,
    },

    /// Caller supplied malformed `final_steps` or `config`.
    #[error("invalid argument: {0}")]
    ArgumentInvalid(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PlannerError>;
