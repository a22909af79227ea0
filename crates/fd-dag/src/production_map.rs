//! ProductionMap: production name -> the one step class that supplies it.
//! First-declaring-namespace wins, which in catalog order simply means
//! "first in `StepCatalog::ordered()` wins".

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::catalog::StepCatalog;
use crate::step::StepFactory;

pub struct ProductionMap {
    producer: HashMap<String, Arc<dyn StepFactory>>,
}

impl ProductionMap {
    /// Walk the catalog once, in its deterministic order, mapping each
    /// production name to the first class that declares it.
    #[instrument(skip(catalog))]
    pub fn build(catalog: &StepCatalog) -> Self {
        let mut producer: HashMap<String, Arc<dyn StepFactory>> = HashMap::new();

        for factory in catalog.ordered() {
            for production in factory.productions() {
                producer
                    .entry(production.name.clone())
                    .or_insert_with(|| factory.clone());
            }
        }

        tracing::debug!(productions = producer.len(), "built production map");

        Self { producer }
    }

    /// The class that supplies `production_name`, if any.
    pub fn resolve(&self, production_name: &str) -> Option<&Arc<dyn StepFactory>> {
        self.producer.get(production_name)
    }
}
