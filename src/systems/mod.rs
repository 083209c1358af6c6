mod economy;
mod happiness;
mod population;
mod resources;
mod topology;

pub use economy::{Ledger, BASE_TAX_INCOME, TAX_PER_HAPPY_RESIDENT};
pub use happiness::{area_happiness, HappinessSystem};
pub use population::PopulationSystem;
pub use resources::ResourceFlowSystem;
pub use topology::{road_mask, TopologySystem};
