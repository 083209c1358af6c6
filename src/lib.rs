pub mod catalog;
pub mod clock;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod world;

pub use catalog::{BuildingSpec, Catalog, CatalogLoader, Template, TemplateKind};
pub use clock::{Clock, GameDate};
pub use components::{Instance, InstanceId, InstanceKind, Size, TilePos};
pub use config::Config;
pub use engine::{Engine, EngineBuilder, EngineSettings, SystemRunReport};
pub use error::{CatalogError, PlacementError, RestoreError, SaveError};
pub use scenario::{Scenario, ScenarioLoader, ScenarioReport};
pub use world::Map;
