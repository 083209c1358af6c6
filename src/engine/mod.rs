use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
    time::Instant,
};

use tracing::{debug, info, trace};

use crate::{
    catalog::{Catalog, Template},
    clock::{Clock, GameDate},
    components::{Instance, InstanceId, TilePos},
    config::Config,
    error::{PlacementError, RestoreError, SaveError},
    snapshot::SaveState,
    systems::{HappinessSystem, PopulationSystem, ResourceFlowSystem, TopologySystem},
    world::{Map, DEFAULT_MAP_SIZE},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub width: u32,
    pub height: u32,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            width: config.map.width,
            height: config.map.height,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_MAP_SIZE,
            height: DEFAULT_MAP_SIZE,
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    /// Topology, resource flow, happiness and census, in that order.
    pub fn standard(settings: EngineSettings) -> Self {
        Self::new(settings)
            .with_system(TopologySystem::new())
            .with_system(ResourceFlowSystem::new())
            .with_system(HappinessSystem::new())
            .with_system(PopulationSystem::new())
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        let mut clock = Clock::new();
        subscribe_taxes(&mut clock);
        Engine {
            map: Map::new(self.settings.width, self.settings.height),
            clock,
            systems: self.systems,
            settings: self.settings,
        }
    }
}

/// Single entry point for mutating the city. Every placement or removal runs
/// the recompute pipeline to completion before returning.
pub struct Engine {
    map: Map,
    clock: Clock,
    systems: Vec<Box<dyn System>>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        EngineBuilder::standard(settings).build()
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn date(&self) -> GameDate {
        self.clock.date()
    }

    pub fn money(&self) -> i64 {
        self.map.money()
    }

    pub fn population(&self) -> i64 {
        self.map.population()
    }

    pub fn happiness(&self) -> f64 {
        self.map.happiness()
    }

    pub fn can_place(&self, template: &Template, pos: TilePos) -> bool {
        self.map.can_place(template, pos)
    }

    pub fn place(
        &mut self,
        template: &Template,
        pos: TilePos,
    ) -> Result<InstanceId, PlacementError> {
        if let Err(err) = self.map.check_placement(template, pos) {
            debug!(template = %template.name, %pos, %err, "placement rejected");
            return Err(err);
        }
        let id = self.map.insert(Instance::from_template(template, pos));
        run_pipeline(&mut self.systems, &mut self.map, &SystemContext::changed_at(pos));
        self.map.ledger.debit(template.cost);
        self.map.record_placement(id);
        info!(
            template = %template.name,
            %pos,
            cost = template.cost,
            money = self.map.money(),
            "placed"
        );
        Ok(id)
    }

    /// Removes whatever covers `pos`. Demolition is free and pays nothing back,
    /// except when undoing the placement made immediately before.
    pub fn remove(&mut self, pos: TilePos) -> Option<Instance> {
        let id = self.map.instance_id_at(pos)?;
        let undo = self.map.take_undo(id);
        let instance = self.map.take(id)?;
        run_pipeline(
            &mut self.systems,
            &mut self.map,
            &SystemContext::changed_at(instance.anchor),
        );
        if undo {
            self.map.ledger.credit(instance.cost);
        }
        info!(
            template = %instance.name,
            anchor = %instance.anchor,
            refunded = undo,
            "removed"
        );
        Some(instance)
    }

    /// Empties the map and restores the starting balance and date.
    pub fn reset(&mut self) {
        self.map.clear();
        self.clock = Clock::new();
        subscribe_taxes(&mut self.clock);
        info!("map reset");
    }

    /// Moves the calendar forward; taxes are collected on every new day.
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        self.clock.advance(elapsed, &mut self.map)
    }

    pub fn collect_taxes(&mut self) -> i64 {
        let income = self.map.collect_taxes();
        info!(income, money = self.map.money(), "collected taxes");
        income
    }

    /// Runs every system over the whole map.
    pub fn recompute(&mut self) -> Vec<SystemRunReport> {
        run_pipeline(&mut self.systems, &mut self.map, &SystemContext::full_rebuild())
    }

    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        let state = SaveState::capture(&self.map, self.clock.date());
        state.write_to(writer)?;
        info!(
            instances = state.instances.len(),
            date = %state.date,
            "saved game"
        );
        Ok(())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Replaces the current game with a saved one. The new map is built and
    /// recomputed on the side; on any error the engine keeps its current state.
    pub fn load<R: Read>(&mut self, catalog: &Catalog, reader: R) -> Result<(), RestoreError> {
        let state = SaveState::read_from(reader)?;
        let mut map = state.restore(catalog)?;
        run_pipeline(&mut self.systems, &mut map, &SystemContext::full_rebuild());

        let mut clock = Clock::starting_at(state.date);
        subscribe_taxes(&mut clock);
        self.map = map;
        self.clock = clock;
        info!(
            instances = self.map.instance_count(),
            date = %state.date,
            money = self.map.money(),
            "loaded game"
        );
        Ok(())
    }

    pub fn load_from_path(
        &mut self,
        catalog: &Catalog,
        path: impl AsRef<Path>,
    ) -> Result<(), RestoreError> {
        let file = File::open(path.as_ref())?;
        self.load(catalog, BufReader::new(file))
    }
}

fn subscribe_taxes(clock: &mut Clock) {
    clock.subscribe(|map, date| {
        let income = map.collect_taxes();
        debug!(%date, income, money = map.money(), "daily taxes");
    });
}

fn run_pipeline(
    systems: &mut [Box<dyn System>],
    map: &mut Map,
    ctx: &SystemContext,
) -> Vec<SystemRunReport> {
    let mut reports = Vec::with_capacity(systems.len());
    for system in systems.iter_mut() {
        let started = Instant::now();
        system.run(ctx, map);
        let report = SystemRunReport {
            name: system.name().to_string(),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        trace!(system = %report.name, duration_ms = report.duration_ms, "system run");
        reports.push(report);
    }
    reports
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemRunReport {
    pub name: String,
    pub duration_ms: f64,
}

/// What changed since the last run. `None` asks for a full rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemContext {
    pub changed: Option<TilePos>,
}

impl SystemContext {
    pub fn changed_at(pos: TilePos) -> Self {
        Self { changed: Some(pos) }
    }

    pub fn full_rebuild() -> Self {
        Self { changed: None }
    }
}

pub trait System {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &SystemContext, map: &mut Map);
}
