use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    world::Map,
};

/// Scores every instance and stores the weighted area average on the map.
pub struct HappinessSystem;

impl HappinessSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HappinessSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for HappinessSystem {
    fn name(&self) -> &str {
        "happiness"
    }

    fn run(&mut self, _ctx: &SystemContext, map: &mut Map) {
        let mut total = 0.0;
        let mut weight = 0.0;
        for id in map.anchors() {
            let Some(instance) = map.instance_mut(id) else {
                continue;
            };
            instance.happiness = instance.compute_happiness();
            total += instance.happiness;
            weight += instance.happiness_multiplier();
        }
        map.happiness = area_happiness(total, weight);
        debug!(happiness = map.happiness, weight, "area happiness recomputed");
    }
}

/// Weighted mean, defined as 0 when nothing carries weight.
pub fn area_happiness(total: f64, weight: f64) -> f64 {
    if weight > 0.0 {
        total / weight
    } else {
        0.0
    }
}
