use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{Template, TemplateKind};

/// Edge length of one tile in sub-tile (world) units.
pub const TILE_SIZE: i64 = 16;

/// Cardinal offsets in N, W, S, E order. Road masks use the same bit order.
pub const CARDINALS: [(i32, i32); 4] = [(0, -1), (-1, 0), (0, 1), (1, 0)];

const DECOR_SATURATION: f64 = 100.0;
const UNSATISFIED_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Sub-tile coordinate of the tile's top-left corner.
    pub fn origin(self) -> (i64, i64) {
        (self.x as i64 * TILE_SIZE, self.y as i64 * TILE_SIZE)
    }

    pub fn cardinal_neighbours(self) -> [TilePos; 4] {
        CARDINALS.map(|(dx, dy)| self.offset(dx, dy))
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const UNIT: Size = Size::new(1, 1);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Index into the map's instance arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(usize);

impl InstanceId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tile {
    instance: Option<InstanceId>,
}

impl Tile {
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    pub fn is_empty(&self) -> bool {
        self.instance.is_none()
    }

    pub(crate) fn set(&mut self, instance: Option<InstanceId>) {
        self.instance = instance;
    }
}

/// Production values copied from the template plus what the last resource pass delivered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingState {
    pub workplaces: u64,
    pub accommodation: u64,
    /// Positive produces, negative consumes.
    pub water_produced: i64,
    /// Positive produces waste, negative is handling capacity.
    pub waste_produced: i64,
    pub electricity_produced: i64,
    pub water_received: i64,
    pub waste_handled: i64,
    pub electricity_provided: bool,
}

impl BuildingState {
    fn water_need(&self) -> i64 {
        (-self.water_produced).max(0)
    }

    fn waste_output(&self) -> i64 {
        self.waste_produced.max(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstanceKind {
    /// `mask` is render-only: bit i set when the i-th cardinal neighbour is a road.
    Road { mask: u8 },
    Building(BuildingState),
}

/// A template placed on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub name: String,
    pub size: Size,
    pub anchor: TilePos,
    pub cost: i64,
    pub decor_provided: i64,
    pub decor_received: i64,
    pub happiness: f64,
    pub kind: InstanceKind,
}

impl Instance {
    pub fn from_template(template: &Template, anchor: TilePos) -> Self {
        let kind = match &template.kind {
            TemplateKind::Road => InstanceKind::Road { mask: 0 },
            TemplateKind::Building(spec) => InstanceKind::Building(BuildingState {
                workplaces: spec.workplaces,
                accommodation: spec.accommodation,
                water_produced: spec.water,
                waste_produced: spec.waste,
                electricity_produced: spec.electricity,
                ..BuildingState::default()
            }),
        };
        let size = template.size();
        assert!(
            size.width > 0 && size.height > 0,
            "template '{}' has an empty footprint",
            template.name
        );
        Self {
            name: template.name.clone(),
            size,
            anchor,
            cost: template.cost,
            decor_provided: template.decor,
            decor_received: 0,
            happiness: 0.0,
            kind,
        }
    }

    /// Rebuilds an instance from a saved `(name, anchor)` pair. Derived state starts
    /// zeroed and is only valid once the recompute pipeline has run over the map.
    pub fn restore_from(template: &Template, anchor: TilePos) -> Self {
        Self::from_template(template, anchor)
    }

    pub fn is_road(&self) -> bool {
        matches!(self.kind, InstanceKind::Road { .. })
    }

    pub fn road_mask(&self) -> Option<u8> {
        match self.kind {
            InstanceKind::Road { mask } => Some(mask),
            InstanceKind::Building(_) => None,
        }
    }

    pub(crate) fn set_road_mask(&mut self, value: u8) {
        if let InstanceKind::Road { mask } = &mut self.kind {
            *mask = value;
        }
    }

    pub fn building(&self) -> Option<&BuildingState> {
        match &self.kind {
            InstanceKind::Building(state) => Some(state),
            InstanceKind::Road { .. } => None,
        }
    }

    pub fn footprint(&self) -> impl Iterator<Item = TilePos> + '_ {
        (0..self.size.height as i32).flat_map(move |dy| {
            (0..self.size.width as i32).map(move |dx| self.anchor.offset(dx, dy))
        })
    }

    pub fn covers(&self, pos: TilePos) -> bool {
        pos.x >= self.anchor.x
            && pos.y >= self.anchor.y
            && ((pos.x - self.anchor.x) as u32) < self.size.width
            && ((pos.y - self.anchor.y) as u32) < self.size.height
    }

    /// Tiles bordering the footprint: top row, left column, bottom row, right column.
    pub fn neighbours(&self) -> Vec<TilePos> {
        let w = self.size.width as i32;
        let h = self.size.height as i32;
        let mut out = Vec::with_capacity(2 * (w + h) as usize);
        out.extend((0..w).map(|i| self.anchor.offset(i, -1)));
        out.extend((0..h).map(|i| self.anchor.offset(-1, i)));
        out.extend((0..w).map(|i| self.anchor.offset(i, h)));
        out.extend((0..h).map(|i| self.anchor.offset(w, i)));
        out
    }

    /// Centre of the footprint in sub-tile units.
    pub fn center(&self) -> (i64, i64) {
        let (x, y) = self.anchor.origin();
        (
            x + self.size.width as i64 * TILE_SIZE / 2,
            y + self.size.height as i64 * TILE_SIZE / 2,
        )
    }

    pub fn water_production(&self) -> i64 {
        self.building().map_or(0, |b| b.water_produced)
    }

    pub fn waste_production(&self) -> i64 {
        self.building().map_or(0, |b| b.waste_produced)
    }

    pub fn electricity_production(&self) -> i64 {
        self.building().map_or(0, |b| b.electricity_produced)
    }

    pub fn residents(&self) -> u64 {
        self.building().map_or(0, |b| b.accommodation)
    }

    pub fn is_resource_source(&self) -> bool {
        self.water_production() > 0 || self.waste_production() < 0
    }

    pub(crate) fn reset_resources(&mut self) {
        if let InstanceKind::Building(state) = &mut self.kind {
            state.water_received = 0;
            state.waste_handled = 0;
            state.electricity_provided = false;
        }
    }

    /// Takes what this instance still needs from a water budget and returns the rest.
    pub(crate) fn pipe_water(&mut self, budget: i64) -> i64 {
        let InstanceKind::Building(state) = &mut self.kind else {
            return budget;
        };
        if budget <= 0 {
            return budget;
        }
        let take = (state.water_need() - state.water_received).clamp(0, budget);
        state.water_received += take;
        budget - take
    }

    /// Waste budgets are negative: they carry free handling capacity.
    pub(crate) fn handle_waste(&mut self, budget: i64) -> i64 {
        let InstanceKind::Building(state) = &mut self.kind else {
            return budget;
        };
        if budget >= 0 {
            return budget;
        }
        let take = (state.waste_output() - state.waste_handled).clamp(0, -budget);
        state.waste_handled += take;
        budget + take
    }

    pub(crate) fn set_electricity_provided(&mut self, provided: bool) {
        if let InstanceKind::Building(state) = &mut self.kind {
            state.electricity_provided = provided;
        }
    }

    pub fn base_happiness(&self) -> f64 {
        1.0
    }

    pub fn electricity_factor(&self) -> f64 {
        match self.building() {
            Some(b) if b.electricity_produced < 0 && !b.electricity_provided => UNSATISFIED_FACTOR,
            _ => 1.0,
        }
    }

    pub fn water_factor(&self) -> f64 {
        match self.building() {
            Some(b) if b.water_need() > 0 => {
                satisfaction(b.water_received as f64 / b.water_need() as f64)
            }
            _ => 1.0,
        }
    }

    pub fn waste_factor(&self) -> f64 {
        match self.building() {
            Some(b) if b.waste_output() > 0 => {
                satisfaction(b.waste_handled as f64 / b.waste_output() as f64)
            }
            _ => 1.0,
        }
    }

    pub fn decor_factor(&self) -> f64 {
        if self.is_road() {
            return 1.0;
        }
        let received = self.decor_received.max(0) as f64;
        satisfaction(1.0 - (-received / DECOR_SATURATION).exp())
    }

    /// Weight in the area average. Roads are excluded.
    pub fn happiness_multiplier(&self) -> f64 {
        match self.building() {
            Some(b) => b.accommodation.max(1) as f64,
            None => 0.0,
        }
    }

    pub fn compute_happiness(&self) -> f64 {
        self.base_happiness()
            * self.electricity_factor()
            * self.waste_factor()
            * self.water_factor()
            * self.decor_factor()
            * self.happiness_multiplier()
    }
}

fn satisfaction(ratio: f64) -> f64 {
    UNSATISFIED_FACTOR + (1.0 - UNSATISFIED_FACTOR) * ratio.clamp(0.0, 1.0)
}

/// `floor(D * exp(-d / 2D))` for a source providing `D`, with no influence when `D <= 0`.
pub fn decor_influence(provided: i64, distance_sq: i64) -> i64 {
    if provided <= 0 {
        return 0;
    }
    let provided = provided as f64;
    (provided * (-(distance_sq as f64) / (2.0 * provided)).exp()).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BuildingSpec, Template};

    fn house() -> Template {
        Template::building(
            "House",
            100,
            BuildingSpec {
                size: Size::new(2, 2),
                accommodation: 4,
                water: -6,
                waste: 4,
                electricity: -1,
                ..BuildingSpec::default()
            },
        )
    }

    #[test]
    fn from_template_copies_definition() {
        let template = house().with_decor(5);
        let instance = Instance::from_template(&template, TilePos::new(1, 1));
        assert_eq!(instance.name, "House");
        assert_eq!(instance.size, Size::new(2, 2));
        assert_eq!(instance.cost, 100);
        assert_eq!(instance.decor_provided, 5);
        assert_eq!(instance.residents(), 4);
        assert!(!instance.is_road());
        assert_eq!(
            Instance::restore_from(&template, TilePos::new(1, 1)),
            instance
        );
    }

    #[test]
    fn road_is_a_unit_tile_with_mask() {
        let road = Instance::from_template(&Template::road("Road", 10), TilePos::new(3, 3));
        assert!(road.is_road());
        assert_eq!(road.road_mask(), Some(0));
        assert_eq!(road.size, Size::UNIT);
        assert_eq!(road.happiness_multiplier(), 0.0);
        assert_eq!(road.compute_happiness(), 0.0);
    }

    #[test]
    fn footprint_and_cover() {
        let instance = Instance::from_template(&house(), TilePos::new(2, 3));
        let tiles: Vec<_> = instance.footprint().collect();
        assert_eq!(
            tiles,
            vec![
                TilePos::new(2, 3),
                TilePos::new(3, 3),
                TilePos::new(2, 4),
                TilePos::new(3, 4)
            ]
        );
        assert!(instance.covers(TilePos::new(3, 4)));
        assert!(!instance.covers(TilePos::new(4, 4)));
        assert!(!instance.covers(TilePos::new(1, 3)));
    }

    #[test]
    fn neighbours_ring_the_footprint() {
        let instance = Instance::from_template(&house(), TilePos::new(2, 3));
        let ring = instance.neighbours();
        assert_eq!(ring.len(), 8);
        assert_eq!(ring[0], TilePos::new(2, 2));
        assert_eq!(ring[2], TilePos::new(1, 3));
        assert_eq!(ring[4], TilePos::new(2, 5));
        assert_eq!(ring[7], TilePos::new(4, 4));
        assert!(ring.iter().all(|p| !instance.covers(*p)));
    }

    #[test]
    fn road_neighbours_follow_cardinal_order() {
        let road = Instance::from_template(&Template::road("Road", 10), TilePos::new(5, 5));
        assert_eq!(road.neighbours(), road.anchor.cardinal_neighbours().to_vec());
    }

    #[test]
    fn center_uses_sub_tile_units() {
        let instance = Instance::from_template(&house(), TilePos::new(1, 2));
        assert_eq!(instance.center(), (32, 48));
    }

    #[test]
    fn decor_falls_off_with_distance() {
        assert_eq!(decor_influence(50, 0), 50);
        let expected = (1000.0_f64 * (-1024.0_f64 / 2000.0).exp()).floor() as i64;
        assert_eq!(decor_influence(1000, 1024), expected);
        assert!(decor_influence(1000, 4096) < expected);
    }

    #[test]
    fn zero_or_negative_decor_has_no_influence() {
        assert_eq!(decor_influence(0, 0), 0);
        assert_eq!(decor_influence(0, 12345), 0);
        assert_eq!(decor_influence(-20, 0), 0);
    }

    #[test]
    fn consumer_takes_only_its_need() {
        let mut instance = Instance::from_template(&house(), TilePos::new(1, 1));
        assert_eq!(instance.pipe_water(4), 0);
        assert_eq!(instance.pipe_water(10), 8);
        assert_eq!(instance.pipe_water(10), 10);
        assert_eq!(instance.building().unwrap().water_received, 6);
        assert_eq!(instance.water_factor(), 1.0);
    }

    #[test]
    fn waste_budget_is_capacity() {
        let mut instance = Instance::from_template(&house(), TilePos::new(1, 1));
        assert_eq!(instance.handle_waste(5), 5);
        assert_eq!(instance.handle_waste(-3), 0);
        assert_eq!(instance.handle_waste(-3), -2);
        assert_eq!(instance.building().unwrap().waste_handled, 4);
    }

    #[test]
    fn roads_pass_budgets_through() {
        let mut road = Instance::from_template(&Template::road("Road", 10), TilePos::new(1, 1));
        assert_eq!(road.pipe_water(7), 7);
        assert_eq!(road.handle_waste(-7), -7);
    }

    #[test]
    fn unserved_building_is_unhappy_but_bounded() {
        let instance = Instance::from_template(&house(), TilePos::new(1, 1));
        assert_eq!(instance.water_factor(), 0.5);
        assert_eq!(instance.waste_factor(), 0.5);
        assert_eq!(instance.electricity_factor(), 0.5);
        assert_eq!(instance.decor_factor(), 0.5);
        let happiness = instance.compute_happiness();
        assert!((happiness - 4.0 * 0.0625).abs() < 1e-12);
    }

    #[test]
    fn reset_clears_delivered_resources() {
        let mut instance = Instance::from_template(&house(), TilePos::new(1, 1));
        instance.pipe_water(3);
        instance.handle_waste(-3);
        instance.set_electricity_provided(true);
        instance.reset_resources();
        let state = instance.building().unwrap();
        assert_eq!(state.water_received, 0);
        assert_eq!(state.waste_handled, 0);
        assert!(!state.electricity_provided);
    }
}
