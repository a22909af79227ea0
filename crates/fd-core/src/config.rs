//! Configuration for the fd-dag CLI/demo layer

use serde::Deserialize;

/// Top-level configuration for a runner invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Environment (development, staging, production)
    #[serde(default = "default_env")]
    pub env: String,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Step runner configuration
    #[serde(default)]
    pub runner: RunnerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Namespace prefixes to search for step classes, in precedence order.
    #[serde(default)]
    pub step_namespaces: Vec<String>,

    /// Worker-pool width. 1 means sequential execution.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            step_namespaces: Vec::new(),
            jobs: default_jobs(),
        }
    }
}

fn default_env() -> String {
    "development".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_jobs() -> usize {
    1
}

impl RunnerConfig {
    /// Load configuration from environment and optional `.env` file.
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .set_default("env", "development")?
            .set_default("runner.jobs", 1i64)?
            .add_source(
                config::Environment::with_prefix("FDDAG")
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
