use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    catalog::Catalog,
    components::TilePos,
    config::MapConfig,
    engine::{Engine, EngineSettings},
    world::Map,
};

/// A scripted play session run headlessly against an engine.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub map: Option<MapConfig>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Place { template: String, x: i32, y: i32 },
    Remove { x: i32, y: i32 },
    Advance { elapsed: f32 },
    CollectTaxes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub placed: usize,
    pub rejected: usize,
    pub removed: usize,
    pub days_elapsed: u32,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario = Scenario::from_yaml_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(text)?;
        if let Some(map) = &scenario.map {
            ensure!(
                Map::size_is_supported(map.width, map.height),
                "unsupported map size {}x{}",
                map.width,
                map.height
            );
        }
        Ok(scenario)
    }

    /// The scenario's own map size wins over `fallback`.
    pub fn settings(&self, fallback: EngineSettings) -> EngineSettings {
        match &self.map {
            Some(map) => EngineSettings {
                width: map.width,
                height: map.height,
            },
            None => fallback,
        }
    }

    /// Rejected placements are counted and skipped. A template missing from
    /// the catalog means the script itself is broken and aborts the run.
    pub fn run(&self, engine: &mut Engine, catalog: &Catalog) -> Result<ScenarioReport> {
        let mut report = ScenarioReport::default();
        for (step, action) in self.actions.iter().enumerate() {
            match action {
                Action::Place { template, x, y } => {
                    let template = catalog.get(template).with_context(|| {
                        format!("step {step}: template '{template}' is not in the catalog")
                    })?;
                    match engine.place(template, TilePos::new(*x, *y)) {
                        Ok(_) => report.placed += 1,
                        Err(err) => {
                            warn!(step, template = %template.name, %err, "placement skipped");
                            report.rejected += 1;
                        }
                    }
                }
                Action::Remove { x, y } => {
                    if engine.remove(TilePos::new(*x, *y)).is_some() {
                        report.removed += 1;
                    }
                }
                Action::Advance { elapsed } => {
                    report.days_elapsed += engine.advance(*elapsed);
                }
                Action::CollectTaxes => {
                    engine.collect_taxes();
                }
            }
        }
        info!(
            scenario = %self.name,
            placed = report.placed,
            rejected = report.rejected,
            removed = report.removed,
            days = report.days_elapsed,
            "scenario finished"
        );
        Ok(report)
    }
}
