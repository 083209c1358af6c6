use crate::{
    components::{TilePos, CARDINALS},
    engine::{System, SystemContext},
    world::Map,
};

/// Refreshes the render masks of roads around the changed tile.
pub struct TopologySystem;

impl TopologySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TopologySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for TopologySystem {
    fn name(&self) -> &str {
        "topology"
    }

    fn run(&mut self, ctx: &SystemContext, map: &mut Map) {
        match ctx.changed {
            Some(pos) => {
                refresh(map, pos);
                for (dx, dy) in CARDINALS {
                    refresh(map, pos.offset(dx, dy));
                }
            }
            None => {
                for id in map.anchors() {
                    if let Some(anchor) = map.instance(id).map(|inst| inst.anchor) {
                        refresh(map, anchor);
                    }
                }
            }
        }
    }
}

/// Bit i is set when the i-th cardinal neighbour (N, W, S, E) holds a road.
pub fn road_mask(map: &Map, pos: TilePos) -> u8 {
    CARDINALS
        .iter()
        .enumerate()
        .filter(|(_, (dx, dy))| map.is_road(pos.offset(*dx, *dy)))
        .fold(0, |mask, (bit, _)| mask | (1 << bit))
}

fn refresh(map: &mut Map, pos: TilePos) {
    if !map.is_road(pos) {
        return;
    }
    let mask = road_mask(map, pos);
    if let Some(road) = map.instance_id_at(pos).and_then(|id| map.instance_mut(id)) {
        road.set_road_mask(mask);
    }
}
