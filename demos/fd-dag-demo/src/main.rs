//! Demo CLI for the `fd-dag` step runner. Doubles as the worker re-exec
//! entry point for parallel mode: the same executable is re-invoked with
//! `FD_DAG_WORKER` set to actually run one step in a child process.

mod steps;

use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use fd_core::RunnerConfig;
use fd_dag::{FinalStep, Planner, PlannerOptions, StaticEnumerator, StepCatalog, TracingLogger};

#[derive(Parser)]
#[command(name = "fd-dag-demo", about = "Run a small demo step catalog through the fd-dag planner")]
struct Cli {
    /// Final step to resolve and build.
    #[arg(long, default_value = "Demo::BuildReport")]
    r#final: String,

    /// Worker process width. Overrides `runner.jobs` from config/env when
    /// given; 1 runs sequentially in-process, anything higher spawns
    /// worker processes up to that width.
    #[arg(long)]
    jobs: Option<usize>,

    /// Text fed into the first step of the demo pipeline.
    #[arg(long, default_value = "the quick brown fox jumps over the lazy dog")]
    raw_text: String,

    #[arg(long)]
    verbose: bool,
}

fn build_catalog() -> StepCatalog {
    let mut enumerator = StaticEnumerator::new();
    steps::register(&mut enumerator);
    StepCatalog::build(&["Demo".to_string()], &enumerator).expect("demo catalog is well-formed")
}

fn main() -> anyhow::Result<()> {
    let catalog = build_catalog();

    if fd_dag::executor::worker::is_worker_process() {
        fd_dag::executor::worker::run_worker(&catalog);
    }

    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    let runner_config = RunnerConfig::load().unwrap_or_else(|e| {
        tracing::warn!("falling back to default runner config: {e}");
        RunnerConfig {
            env: "development".to_string(),
            log: Default::default(),
            runner: Default::default(),
        }
    });

    let step_namespaces = if runner_config.runner.step_namespaces.is_empty() {
        vec!["Demo".to_string()]
    } else {
        runner_config.runner.step_namespaces.clone()
    };
    let jobs = cli.jobs.unwrap_or(runner_config.runner.jobs);

    let mut enumerator = StaticEnumerator::new();
    steps::register(&mut enumerator);

    let planner = Planner::new(
        PlannerOptions {
            step_namespaces,
            jobs,
            logger: Some(Arc::new(TracingLogger)),
        },
        &enumerator,
    )?;

    let mut config = HashMap::new();
    config.insert("raw_text".to_string(), serde_json::json!(cli.raw_text));

    let productions = planner.run(&[FinalStep::from(cli.r#final.as_str())], &config)?;

    for (name, value) in &productions {
        println!("{name} = {value}");
    }

    Ok(())
}
