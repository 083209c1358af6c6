use crate::{
    catalog::Template,
    components::{Instance, InstanceId, Size, Tile, TilePos, TILE_SIZE},
    error::PlacementError,
    systems::Ledger,
};

pub const DEFAULT_MAP_SIZE: u32 = 100;
pub const STARTING_MONEY: i64 = 1000;
/// Largest tile count a map may have (4096 x 4096).
pub const MAX_MAP_TILES: u64 = 1 << 24;

/// The tile grid plus the instance arena and the city-wide aggregates.
///
/// Tiles store arena indices; every tile of a footprint points at the same
/// instance, whose `anchor` is the footprint's top-left tile.
#[derive(Debug, Clone)]
pub struct Map {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    instances: Vec<Option<Instance>>,
    free_slots: Vec<usize>,
    pub(crate) ledger: Ledger,
    pub(crate) population: i64,
    pub(crate) happiness: f64,
    last_placed: Option<InstanceId>,
}

impl Default for Map {
    fn default() -> Self {
        Self::new(DEFAULT_MAP_SIZE, DEFAULT_MAP_SIZE)
    }
}

impl Map {
    pub fn new(width: u32, height: u32) -> Self {
        assert!(
            Self::size_is_supported(width, height),
            "unsupported map size {width}x{height}"
        );
        Self {
            width,
            height,
            tiles: vec![Tile::default(); width as usize * height as usize],
            instances: Vec::new(),
            free_slots: Vec::new(),
            ledger: Ledger::new(STARTING_MONEY),
            population: 0,
            happiness: 0.0,
            last_placed: None,
        }
    }

    /// True when a `width` x `height` map has at least one tile and no more than
    /// [`MAX_MAP_TILES`].
    pub fn size_is_supported(width: u32, height: u32) -> bool {
        let tiles = width as u64 * height as u64;
        tiles > 0 && tiles <= MAX_MAP_TILES
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn money(&self) -> i64 {
        self.ledger.money()
    }

    pub fn population(&self) -> i64 {
        self.population
    }

    pub fn happiness(&self) -> f64 {
        self.happiness
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    pub(crate) fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub(crate) fn tile_index(&self, pos: TilePos) -> Option<usize> {
        self.contains(pos)
            .then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }

    pub fn tile(&self, pos: TilePos) -> Option<&Tile> {
        self.tile_index(pos).map(|idx| &self.tiles[idx])
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn instance_id_at(&self, pos: TilePos) -> Option<InstanceId> {
        self.tile(pos).and_then(Tile::instance)
    }

    pub fn instance_at(&self, pos: TilePos) -> Option<&Instance> {
        self.instance_id_at(pos).and_then(|id| self.instance(id))
    }

    pub fn is_road(&self, pos: TilePos) -> bool {
        self.instance_at(pos).is_some_and(Instance::is_road)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len() - self.free_slots.len()
    }

    /// Every placed instance, once, in row-major order of its anchor.
    pub fn anchors(&self) -> Vec<InstanceId> {
        let mut ids = Vec::with_capacity(self.instance_count());
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pos = TilePos::new(x, y);
                if let Some(id) = self.instance_id_at(pos) {
                    if self.instance(id).is_some_and(|inst| inst.anchor == pos) {
                        ids.push(id);
                    }
                }
            }
        }
        ids
    }

    pub fn occupied_tiles(&self) -> Vec<TilePos> {
        (0..self.height as i32)
            .flat_map(|y| (0..self.width as i32).map(move |x| TilePos::new(x, y)))
            .filter(|pos| self.instance_id_at(*pos).is_some())
            .collect()
    }

    pub fn can_place(&self, template: &Template, pos: TilePos) -> bool {
        self.check_placement(template, pos).is_ok()
    }

    pub fn check_placement(
        &self,
        template: &Template,
        pos: TilePos,
    ) -> Result<(), PlacementError> {
        self.check_footprint(template.size(), pos)?;
        if !self.ledger.can_afford(template.cost) {
            return Err(PlacementError::InsufficientFunds {
                cost: template.cost,
                money: self.money(),
            });
        }
        Ok(())
    }

    /// The footprint may never touch the last row or column.
    pub(crate) fn check_footprint(&self, size: Size, pos: TilePos) -> Result<(), PlacementError> {
        let fits = pos.x >= 0
            && pos.y >= 0
            && (pos.x as i64 + size.width as i64) < self.width as i64
            && (pos.y as i64 + size.height as i64) < self.height as i64;
        if !fits {
            return Err(PlacementError::OutOfBounds {
                pos,
                width: self.width,
                height: self.height,
            });
        }
        for dy in 0..size.height as i32 {
            for dx in 0..size.width as i32 {
                let tile = pos.offset(dx, dy);
                if self.instance_id_at(tile).is_some() {
                    return Err(PlacementError::Occupied { pos: tile });
                }
            }
        }
        Ok(())
    }

    /// Writes `instance` into the arena and its footprint. Callers validate first.
    pub(crate) fn insert(&mut self, instance: Instance) -> InstanceId {
        debug_assert!(self.check_footprint(instance.size, instance.anchor).is_ok());
        let footprint: Vec<TilePos> = instance.footprint().collect();
        let id = match self.free_slots.pop() {
            Some(slot) => {
                self.instances[slot] = Some(instance);
                InstanceId::new(slot)
            }
            None => {
                self.instances.push(Some(instance));
                InstanceId::new(self.instances.len() - 1)
            }
        };
        for pos in footprint {
            let idx = self
                .tile_index(pos)
                .expect("validated footprint lies inside the map");
            self.tiles[idx].set(Some(id));
        }
        id
    }

    /// Clears the whole footprint of `id` and frees its arena slot.
    pub(crate) fn take(&mut self, id: InstanceId) -> Option<Instance> {
        let instance = self.instances.get_mut(id.index())?.take()?;
        for pos in instance.footprint() {
            let idx = self
                .tile_index(pos)
                .expect("placed footprint lies inside the map");
            assert_eq!(
                self.tiles[idx].instance(),
                Some(id),
                "tile {pos} does not belong to the instance being removed"
            );
            self.tiles[idx].set(None);
        }
        self.free_slots.push(id.index());
        Some(instance)
    }

    pub(crate) fn clear(&mut self) {
        for tile in &mut self.tiles {
            tile.set(None);
        }
        self.instances.clear();
        self.free_slots.clear();
        self.ledger = Ledger::new(STARTING_MONEY);
        self.population = 0;
        self.happiness = 0.0;
        self.last_placed = None;
    }

    pub(crate) fn record_placement(&mut self, id: InstanceId) {
        self.last_placed = Some(id);
    }

    /// True when `id` is the most recent placement and nothing has happened since.
    pub(crate) fn take_undo(&mut self, id: InstanceId) -> bool {
        self.last_placed.take() == Some(id)
    }

    pub(crate) fn set_money(&mut self, money: i64) {
        self.ledger = Ledger::new(money);
    }

    /// Daily tax income; returns what was collected.
    pub fn collect_taxes(&mut self) -> i64 {
        self.last_placed = None;
        self.ledger.collect_taxes(self.population, self.happiness)
    }

    /// True when every tile points at a live instance that covers it, and every
    /// instance covers exactly the tiles that point at it.
    pub fn footprints_consistent(&self) -> bool {
        let mut covered = 0usize;
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pos = TilePos::new(x, y);
                if let Some(id) = self.instance_id_at(pos) {
                    match self.instance(id) {
                        Some(inst) if inst.covers(pos) => covered += 1,
                        _ => return false,
                    }
                }
            }
        }
        let expected: usize = self
            .instances
            .iter()
            .flatten()
            .map(|inst| inst.size.width as usize * inst.size.height as usize)
            .sum();
        covered == expected
    }

    /// Maps a world-space point to the tile containing it.
    pub fn world_to_tile(world_x: i64, world_y: i64) -> TilePos {
        TilePos::new(
            world_x.div_euclid(TILE_SIZE) as i32,
            world_y.div_euclid(TILE_SIZE) as i32,
        )
    }
}
