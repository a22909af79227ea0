//! Error types for the CLI/config layer

/// Result type alias using this crate's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the ambient layer (config loading, CLI argument
/// handling) that surrounds the `fd-dag` core. Scheduling errors proper
/// live in `fd_dag::PlannerError`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
