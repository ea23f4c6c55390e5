use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of linear infrastructure a vehicle travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum WayKind {
    Road,
    Rail,
    /// Open water; needs no construction.
    Water,
    /// Flight corridors; needs no construction.
    Air,
}

impl WayKind {
    /// Whether the way has to be laid tile by tile before use.
    pub fn is_built(self) -> bool {
        matches!(self, WayKind::Road | WayKind::Rail)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct WayTypeId(pub u32);

/// A buildable way (a particular road or track standard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WayType {
    pub id: WayTypeId,
    pub name: String,
    pub kind: WayKind,
    pub max_speed: u32,
    pub cost_per_tile: i64,
    /// Upkeep per tile per month.
    pub maintenance_per_tile: i64,
    pub electrified: bool,
}

/// A way segment lying on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WayTile {
    pub kind: WayKind,
    pub way_type: WayTypeId,
    /// `None` for public ways such as city streets.
    pub owner: Option<Entity>,
}

impl WayTile {
    /// Whether `owner` may run vehicles of `kind` over this segment.
    pub fn usable_by(&self, kind: WayKind, owner: Entity) -> bool {
        self.kind == kind && self.owner.is_none_or(|o| o == owner)
    }
}
