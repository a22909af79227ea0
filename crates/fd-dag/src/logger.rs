//! The injected logging sink. The core never assumes a particular logging
//! backend; it only ever calls through this trait.

/// Five-level logging sink, per the Step capability contract. Message text
/// is illustrative, not contractual — callers may redirect it anywhere.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn notice(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default adapter onto the `tracing` crate, used by the demo CLI and by
/// any embedder that doesn't want to write its own sink.
///
/// `tracing` has no `notice` level; it is forwarded to `info!` with a
/// structured `notice = true` field rather than silently downgraded to
/// `debug!`, so a filter on that field can still recover it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn notice(&self, message: &str) {
        tracing::info!(notice = true, "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// A sink that discards everything, useful in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn notice(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
