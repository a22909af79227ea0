//! Shared test doubles for the planner/executor test suites.
//! Not part of the public API.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::logger::Logger;
use crate::step::{ArgMap, DependencyDescriptor, ProductionDescriptor, ProductionsMap, Step, StepFactory};
use crate::value::{Timestamp, ValueKind};

static CLOCK: AtomicI64 = AtomicI64::new(1);

/// Hand out a strictly increasing timestamp, so tests don't depend on
/// wall-clock resolution.
pub fn tick() -> Timestamp {
    Timestamp::from_millis(CLOCK.fetch_add(1, Ordering::SeqCst))
}

#[derive(Default)]
struct StepState {
    last_run: Option<Timestamp>,
    productions: ProductionsMap,
}

/// A step factory whose constructed instances share persistent state, so
/// that a second `run()` invocation against the same factory observes the
/// first invocation's `last_run_time` (simulating a real step whose
/// timestamp is backed by, say, a file mtime).
pub struct MockFactory {
    name: String,
    deps: Vec<DependencyDescriptor>,
    prods: Vec<ProductionDescriptor>,
    init_args: Vec<String>,
    state: Arc<Mutex<StepState>>,
    run_log: Option<Arc<Mutex<Vec<String>>>>,
}

impl MockFactory {
    pub fn new(name: &str, deps: &[&str], prods: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            deps: deps
                .iter()
                .map(|d| DependencyDescriptor::new(*d, ValueKind::Any))
                .collect(),
            prods: prods
                .iter()
                .map(|p| ProductionDescriptor::new(*p, ValueKind::Any))
                .collect(),
            init_args: deps.iter().map(|d| d.to_string()).collect(),
            state: Arc::new(Mutex::new(StepState::default())),
            run_log: None,
        })
    }

    pub fn with_run_log(self: Arc<Self>, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name: self.name.clone(),
            deps: self.deps.clone(),
            prods: self.prods.clone(),
            init_args: self.init_args.clone(),
            state: self.state.clone(),
            run_log: Some(log),
        })
    }

    /// Seed this factory's persistent state as if it had already run at
    /// the given millisecond timestamp, producing the given values.
    pub fn seed(self: Arc<Self>, last_run_ms: i64, productions: ProductionsMap) -> Arc<Self> {
        {
            let mut state = self.state.lock().unwrap();
            state.last_run = Some(Timestamp::from_millis(last_run_ms));
            state.productions = productions;
        }
        self
    }

    pub fn has_run(&self) -> bool {
        self.state.lock().unwrap().last_run.is_some()
    }
}

impl StepFactory for MockFactory {
    fn qualified_name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[DependencyDescriptor] {
        &self.deps
    }

    fn productions(&self) -> &[ProductionDescriptor] {
        &self.prods
    }

    fn init_arg_names(&self) -> &[String] {
        &self.init_args
    }

    fn construct(&self, _args: &ArgMap, _logger: Arc<dyn Logger>) -> Result<Box<dyn Step>> {
        Ok(Box::new(MockStep {
            name: self.name.clone(),
            prod_names: self.prods.iter().map(|p| p.name.clone()).collect(),
            state: self.state.clone(),
            run_log: self.run_log.clone(),
        }))
    }
}

struct MockStep {
    name: String,
    prod_names: Vec<String>,
    state: Arc<Mutex<StepState>>,
    run_log: Option<Arc<Mutex<Vec<String>>>>,
}

impl Step for MockStep {
    fn run(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.last_run = Some(tick());
        for name in &self.prod_names {
            state
                .productions
                .insert(name.clone(), serde_json::json!(format!("{}::{}", self.name, name)));
        }
        drop(state);

        if let Some(log) = &self.run_log {
            log.lock().unwrap().push(self.name.clone());
        }
    }

    fn last_run_time(&self) -> Option<Timestamp> {
        self.state.lock().unwrap().last_run
    }

    fn productions(&self) -> ProductionsMap {
        self.state.lock().unwrap().productions.clone()
    }
}

/// Shorthand for constructing a factory with no persistent seed.
pub fn make_factory(name: &str, deps: &[&str], prods: &[&str]) -> Arc<dyn StepFactory> {
    MockFactory::new(name, deps, prods)
}
