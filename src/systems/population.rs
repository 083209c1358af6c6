use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    world::Map,
};

/// Census: population is the accommodation of every placed building.
pub struct PopulationSystem;

impl PopulationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PopulationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PopulationSystem {
    fn name(&self) -> &str {
        "population"
    }

    fn run(&mut self, _ctx: &SystemContext, map: &mut Map) {
        let residents: u64 = map
            .anchors()
            .into_iter()
            .filter_map(|id| map.instance(id))
            .map(|instance| instance.residents())
            .sum();
        map.population = residents as i64;
        debug!(population = map.population, "census updated");
    }
}
