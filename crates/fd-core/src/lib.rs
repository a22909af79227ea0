//! Core primitives for the fd-dag workspace
//!
//! - ID types (`RunId`)
//! - Error types for the CLI/config layer
//! - Configuration loading

pub mod config;
pub mod error;
pub mod id;

pub use config::RunnerConfig;
pub use error::{Error, Result};
pub use id::RunId;
