//! Decor, water, waste and electricity distribution.
//!
//! Every run recomputes everything from scratch: decor is summed pairwise
//! between anchors, water and waste are flooded out of each source along the
//! road graph, and electricity is settled per connected road network.

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::{
    components::{decor_influence, InstanceId, TilePos},
    engine::{System, SystemContext},
    world::Map,
};

pub struct ResourceFlowSystem;

impl ResourceFlowSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ResourceFlowSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ResourceFlowSystem {
    fn name(&self) -> &str {
        "resource_flow"
    }

    fn run(&mut self, _ctx: &SystemContext, map: &mut Map) {
        let anchors = map.anchors();
        apply_decor(map, &anchors);
        for &id in &anchors {
            if let Some(instance) = map.instance_mut(id) {
                instance.reset_resources();
            }
        }
        let sources = spread_utilities(map, &anchors);
        let networks = distribute_electricity(map);
        debug!(
            instances = anchors.len(),
            sources, networks, "resource flow recomputed"
        );
    }
}

fn apply_decor(map: &mut Map, anchors: &[InstanceId]) {
    let centres: Vec<(InstanceId, i64, (i64, i64))> = anchors
        .iter()
        .filter_map(|&id| {
            map.instance(id)
                .map(|inst| (id, inst.decor_provided, inst.center()))
        })
        .collect();
    // Non-positive decor never reaches anyone.
    let emitters: Vec<_> = centres
        .iter()
        .filter(|(_, provided, _)| *provided > 0)
        .collect();

    for &(target, _, (tx, ty)) in &centres {
        let received: i64 = emitters
            .iter()
            .filter(|(source, _, _)| *source != target)
            .map(|&&(_, provided, (sx, sy))| {
                let (dx, dy) = (tx - sx, ty - sy);
                decor_influence(provided, dx * dx + dy * dy)
            })
            .sum();
        if let Some(instance) = map.instance_mut(target) {
            instance.decor_received = received;
        }
    }
}

/// Returns how many sources were spread.
fn spread_utilities(map: &mut Map, anchors: &[InstanceId]) -> usize {
    let mut spread = 0;
    for &id in anchors {
        let Some(source) = map.instance(id) else {
            continue;
        };
        if !source.is_resource_source() {
            continue;
        }
        let water = source.water_production();
        let waste = source.waste_production();
        let roads: Vec<TilePos> = source
            .neighbours()
            .into_iter()
            .filter(|pos| map.is_road(*pos))
            .collect();
        if roads.is_empty() {
            continue;
        }
        let branches = roads.len() as i64;
        for road in roads {
            flood(map, road, water / branches, waste / branches);
        }
        spread += 1;
    }
    spread
}

/// Breadth-first walk over roads from `start`, offering the budgets to every
/// tile bordering a visited road until both are spent.
fn flood(map: &mut Map, start: TilePos, mut water_left: i64, mut waste_left: i64) {
    let mut visited = vec![false; map.tile_count()];
    let mut queue = VecDeque::from([start]);

    while water_left > 0 || waste_left < 0 {
        let Some(current) = queue.pop_front() else {
            break;
        };
        let Some(idx) = map.tile_index(current) else {
            continue;
        };
        if visited[idx] || !map.is_road(current) {
            continue;
        }
        visited[idx] = true;

        for neighbour in current.cardinal_neighbours() {
            if !map.contains(neighbour) {
                continue;
            }
            let target = map.instance_id_at(neighbour);
            if let Some(instance) = target.and_then(|id| map.instance_mut(id)) {
                water_left = instance.pipe_water(water_left);
                waste_left = instance.handle_waste(waste_left);
            }
            queue.push_back(neighbour);
        }
    }
}

/// Settles each connected road network; returns the number of networks.
fn distribute_electricity(map: &mut Map) -> usize {
    let mut visited = vec![false; map.tile_count()];
    let mut networks = 0;

    for y in 0..map.height() as i32 {
        for x in 0..map.width() as i32 {
            let start = TilePos::new(x, y);
            let Some(idx) = map.tile_index(start) else {
                continue;
            };
            if visited[idx] || !map.is_road(start) {
                continue;
            }

            let network = collect_network(map, start, &mut visited);
            let production: i64 = network
                .frontage
                .iter()
                .filter_map(|&pos| map.instance_at(pos))
                .map(|inst| inst.electricity_production())
                .sum();
            if production >= 0 {
                for &id in &network.members {
                    if let Some(instance) = map.instance_mut(id) {
                        instance.set_electricity_provided(true);
                    }
                }
            }
            networks += 1;
        }
    }
    networks
}

struct RoadNetwork {
    /// Roads plus every instance bordering one of them.
    members: BTreeSet<InstanceId>,
    /// Non-road tiles bordering the roads, each counted once.
    frontage: BTreeSet<TilePos>,
}

fn collect_network(map: &Map, start: TilePos, visited: &mut [bool]) -> RoadNetwork {
    let mut network = RoadNetwork {
        members: BTreeSet::new(),
        frontage: BTreeSet::new(),
    };
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        let Some(idx) = map.tile_index(current) else {
            continue;
        };
        if visited[idx] || !map.is_road(current) {
            continue;
        }
        visited[idx] = true;
        network.members.extend(map.instance_id_at(current));

        for neighbour in current.cardinal_neighbours() {
            let Some(id) = map.instance_id_at(neighbour) else {
                continue;
            };
            network.members.insert(id);
            if map.is_road(neighbour) {
                queue.push_back(neighbour);
            } else {
                network.frontage.insert(neighbour);
            }
        }
    }
    network
}
