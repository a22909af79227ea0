//! Sequential executor: every step runs in-process, one at a time, set by
//! set in the order `Plan` lays out.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::error::Result;
use crate::logger::Logger;
use crate::plan::Plan;
use crate::run_data::RunData;
use crate::step::build_args;
use crate::value::Value;

#[instrument(skip(plan, config, run_data, logger), fields(sets = plan.sets.len()))]
pub fn run(
    plan: &Plan,
    config: &HashMap<String, Value>,
    run_data: &mut RunData,
    logger: Arc<dyn Logger>,
) -> Result<()> {
    for set in &plan.sets {
        run_data.start_step_set();

        for factory in set {
            let args = build_args(factory.as_ref(), config, run_data.productions())?;
            let mut step = factory.construct(&args, logger.clone())?;

            if run_data.step_is_up_to_date(step.last_run_time()) {
                logger.debug(&format!("{} is up to date, skipping", factory.qualified_name()));
            } else {
                logger.info(&format!("running {}", factory.qualified_name()));
                step.run();
            }

            run_data.record_run_time(step.last_run_time());
            run_data.record_productions(step.productions());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StaticEnumerator, StepCatalog};
    use crate::logger::NullLogger;
    use crate::production_map::ProductionMap;
    use crate::test_support::MockFactory;
    use std::sync::Mutex;

    fn catalog_of(factories: Vec<Arc<dyn crate::step::StepFactory>>) -> StepCatalog {
        let mut enumerator = StaticEnumerator::new();
        for f in factories {
            enumerator.register("Demo", f);
        }
        StepCatalog::build(&["Demo".to_string()], &enumerator).unwrap()
    }

    #[test]
    fn runs_every_step_once_in_dependency_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = MockFactory::new("A", &[], &["a"]).with_run_log(log.clone());
        let b = MockFactory::new("B", &["a"], &["b"]).with_run_log(log.clone());
        let catalog = catalog_of(vec![a, b]);
        let map = ProductionMap::build(&catalog);
        let plan = crate::plan::build_plan(&catalog, &map, &[crate::plan::FinalStep::from("B")]).unwrap();

        let mut run_data = RunData::new();
        run(&plan, &HashMap::new(), &mut run_data, Arc::new(NullLogger)).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["A".to_string(), "B".to_string()]);
        assert!(run_data.productions().contains_key("a"));
        assert!(run_data.productions().contains_key("b"));
    }

    #[test]
    fn a_step_already_up_to_date_is_not_rerun() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = MockFactory::new("A", &[], &["a"])
            .seed(1_000_000, crate::step::ProductionsMap::from([("a".to_string(), serde_json::json!(1))]))
            .with_run_log(log.clone());
        let catalog = catalog_of(vec![a.clone()]);
        let map = ProductionMap::build(&catalog);
        let plan = crate::plan::build_plan(&catalog, &map, &[crate::plan::FinalStep::from("A")]).unwrap();

        let mut run_data = RunData::new();
        run(&plan, &HashMap::new(), &mut run_data, Arc::new(NullLogger)).unwrap();

        assert!(log.lock().unwrap().is_empty(), "a step seeded with a last-run time should be skipped");
        assert_eq!(run_data.productions().get("a"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn a_second_run_of_the_same_plan_reruns_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = MockFactory::new("A", &[], &["a"]).with_run_log(log.clone());
        let b = MockFactory::new("B", &["a"], &["b"]).with_run_log(log.clone());
        let catalog = catalog_of(vec![a, b]);
        let map = ProductionMap::build(&catalog);
        let plan = crate::plan::build_plan(&catalog, &map, &[crate::plan::FinalStep::from("B")]).unwrap();

        let mut first = RunData::new();
        run(&plan, &HashMap::new(), &mut first, Arc::new(NullLogger)).unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);

        let mut second = RunData::new();
        run(&plan, &HashMap::new(), &mut second, Arc::new(NullLogger)).unwrap();
        assert_eq!(log.lock().unwrap().len(), 2, "neither step should have run a second time");
    }
}
