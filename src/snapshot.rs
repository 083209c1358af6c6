//! Save files: map size, balance, date and the `(template, anchor)` of every
//! placed instance. Derived state is never written; it is recomputed on load.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::Catalog,
    clock::GameDate,
    components::{Instance, TilePos},
    error::{RestoreError, SaveError},
    world::Map,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedInstance {
    pub template: String,
    pub x: i32,
    pub y: i32,
}

impl SavedInstance {
    pub fn anchor(&self) -> TilePos {
        TilePos::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    pub width: u32,
    pub height: u32,
    pub money: i64,
    pub date: GameDate,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    pub instances: Vec<SavedInstance>,
}

impl SaveState {
    /// Anchors are recorded in row-major order.
    pub fn capture(map: &Map, date: GameDate) -> Self {
        let instances = map
            .anchors()
            .into_iter()
            .filter_map(|id| map.instance(id))
            .map(|instance| SavedInstance {
                template: instance.name.clone(),
                x: instance.anchor.x,
                y: instance.anchor.y,
            })
            .collect();
        Self {
            width: map.width(),
            height: map.height(),
            money: map.money(),
            date,
            saved_at: Some(Utc::now()),
            instances,
        }
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self, RestoreError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Rebuilds the occupancy of a fresh map. Aggregates other than money are
    /// left for the recompute pipeline.
    pub fn restore(&self, catalog: &Catalog) -> Result<Map, RestoreError> {
        if !Map::size_is_supported(self.width, self.height) {
            return Err(RestoreError::Corrupt(format!(
                "unsupported map size {}x{}",
                self.width, self.height
            )));
        }
        if !self.date.is_valid() {
            return Err(RestoreError::Corrupt(format!("invalid date {}", self.date)));
        }

        let mut map = Map::new(self.width, self.height);
        for saved in &self.instances {
            let pos = saved.anchor();
            let template =
                catalog
                    .get(&saved.template)
                    .ok_or_else(|| RestoreError::UnknownTemplate {
                        name: saved.template.clone(),
                        pos,
                    })?;
            map.check_footprint(template.size(), pos).map_err(|err| {
                RestoreError::Corrupt(format!("'{}' at {pos}: {err}", saved.template))
            })?;
            map.insert(Instance::restore_from(template, pos));
        }
        map.set_money(self.money);
        Ok(map)
    }
}
