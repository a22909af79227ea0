//! Value representation carried across dependency/production edges and
//! across the worker-process boundary.

use serde::{Deserialize, Serialize};

/// A production or config value. Steps are free to stash any JSON-shaped
/// data here; the planner never inspects the payload itself, only the
/// names attached to it.
pub type Value = serde_json::Value;

/// Declared shape of a dependency or production value. Purely
/// documentation/validation metadata — the planner does not enforce that a
/// produced value actually matches its declared kind; the contract it
/// enforces is round-trip fidelity across the worker boundary, not type
/// checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Bool,
    List,
    Map,
    Any,
}

/// A monotonically comparable "last ran at" timestamp. Equal timestamps
/// are *not* considered up to date — a dependency that ran in the same
/// instant as its consumer still forces a rerun, since we can't prove it
/// ran first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Build a timestamp from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
