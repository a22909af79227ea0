//! A tiny illustrative step catalog: three classes chained end to end by
//! productions, just enough to exercise discovery, planning, and
//! execution (sequential or multi-process parallel) against a real
//! `fd_dag::Planner`.

use std::sync::Arc;

use fd_dag::{
    ArgMap, DependencyDescriptor, Logger, ProductionDescriptor, ProductionsMap, Step, StepFactory,
    Timestamp, ValueKind,
};

/// Produces `source_text` from the `raw_text` config value. Has no
/// dependencies, so it always lands in the plan's first set.
pub struct LoadSourceFactory {
    deps: Vec<DependencyDescriptor>,
    prods: Vec<ProductionDescriptor>,
    init_args: Vec<String>,
}

impl LoadSourceFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            deps: Vec::new(),
            prods: vec![ProductionDescriptor::new("source_text", ValueKind::String)],
            init_args: vec!["raw_text".to_string()],
        })
    }
}

impl StepFactory for LoadSourceFactory {
    fn qualified_name(&self) -> &str {
        "Demo::LoadSource"
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

    fn construct(&self, args: &ArgMap, logger: Arc<dyn Logger>) -> fd_dag::Result<Box<dyn Step>> {
        let raw_text = args
            .get("raw_text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        logger.debug("loading source text from config");
        Ok(Box::new(LoadSourceStep {
            raw_text,
            last_run: None,
        }))
    }
}

struct LoadSourceStep {
    raw_text: String,
    last_run: Option<Timestamp>,
}

impl Step for LoadSourceStep {
    fn run(&mut self) {
        self.last_run = Some(Timestamp::now());
    }

    fn last_run_time(&self) -> Option<Timestamp> {
        self.last_run
    }

    fn productions(&self) -> ProductionsMap {
        ProductionsMap::from([("source_text".to_string(), serde_json::json!(self.raw_text))])
    }
}

/// Depends on `source_text`, produces `word_count`.
pub struct CountWordsFactory {
    deps: Vec<DependencyDescriptor>,
    prods: Vec<ProductionDescriptor>,
    init_args: Vec<String>,
}

impl CountWordsFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            deps: vec![DependencyDescriptor::new("source_text", ValueKind::String)],
            prods: vec![ProductionDescriptor::new("word_count", ValueKind::Integer)],
            init_args: vec!["source_text".to_string()],
        })
    }
}

impl StepFactory for CountWordsFactory {
    fn qualified_name(&self) -> &str {
        "Demo::CountWords"
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

    fn construct(&self, args: &ArgMap, _logger: Arc<dyn Logger>) -> fd_dag::Result<Box<dyn Step>> {
        let text = args
            .get("source_text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(Box::new(CountWordsStep {
            text,
            last_run: None,
        }))
    }
}

struct CountWordsStep {
    text: String,
    last_run: Option<Timestamp>,
}

impl Step for CountWordsStep {
    fn run(&mut self) {
        self.last_run = Some(Timestamp::now());
    }

    fn last_run_time(&self) -> Option<Timestamp> {
        self.last_run
    }

    fn productions(&self) -> ProductionsMap {
        let count = self.text.split_whitespace().count();
        ProductionsMap::from([("word_count".to_string(), serde_json::json!(count))])
    }
}

/// Depends on `word_count`, produces `report`. The final step of the demo.
pub struct BuildReportFactory {
    deps: Vec<DependencyDescriptor>,
    prods: Vec<ProductionDescriptor>,
    init_args: Vec<String>,
}

impl BuildReportFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            deps: vec![DependencyDescriptor::new("word_count", ValueKind::Integer)],
            prods: vec![ProductionDescriptor::new("report", ValueKind::String)],
            init_args: vec!["word_count".to_string()],
        })
    }
}

impl StepFactory for BuildReportFactory {
    fn qualified_name(&self) -> &str {
        "Demo::BuildReport"
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

    fn construct(&self, args: &ArgMap, _logger: Arc<dyn Logger>) -> fd_dag::Result<Box<dyn Step>> {
        let word_count = args.get("word_count").and_then(|v| v.as_u64()).unwrap_or(0);
        Ok(Box::new(BuildReportStep {
            word_count,
            last_run: None,
        }))
    }
}

struct BuildReportStep {
    word_count: u64,
    last_run: Option<Timestamp>,
}

impl Step for BuildReportStep {
    fn run(&mut self) {
        self.last_run = Some(Timestamp::now());
    }

    fn last_run_time(&self) -> Option<Timestamp> {
        self.last_run
    }

    fn productions(&self) -> ProductionsMap {
        let report = format!("source contains {} word(s)", self.word_count);
        ProductionsMap::from([("report".to_string(), serde_json::json!(report))])
    }
}

/// Always panics when run. Not part of the `BuildReport` chain — exists so
/// worker-failure handling can be exercised against a real child process by
/// passing `--final Demo::AlwaysFail`.
pub struct AlwaysFailFactory {
    deps: Vec<DependencyDescriptor>,
    prods: Vec<ProductionDescriptor>,
    init_args: Vec<String>,
}

impl AlwaysFailFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            deps: Vec::new(),
            prods: vec![ProductionDescriptor::new("never_produced", ValueKind::Any)],
            init_args: Vec::new(),
        })
    }
}

impl StepFactory for AlwaysFailFactory {
    fn qualified_name(&self) -> &str {
        "Demo::AlwaysFail"
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

    fn construct(&self, _args: &ArgMap, _logger: Arc<dyn Logger>) -> fd_dag::Result<Box<dyn Step>> {
        Ok(Box::new(AlwaysFailStep))
    }
}

struct AlwaysFailStep;

impl Step for AlwaysFailStep {
    fn run(&mut self) {
        panic!("Demo::AlwaysFail deliberately panics");
    }

    fn last_run_time(&self) -> Option<Timestamp> {
        None
    }

    fn productions(&self) -> ProductionsMap {
        ProductionsMap::new()
    }
}

/// Register every demo step class under the `Demo` namespace.
pub fn register(enumerator: &mut fd_dag::StaticEnumerator) {
    enumerator.register("Demo", LoadSourceFactory::new());
    enumerator.register("Demo", CountWordsFactory::new());
    enumerator.register("Demo", BuildReportFactory::new());
    enumerator.register("Demo", AlwaysFailFactory::new());
}
