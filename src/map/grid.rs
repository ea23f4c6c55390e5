use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::error::{CommitError, RouteError};
use crate::constants::{DEFAULT_MAP_HEIGHT, DEFAULT_MAP_WIDTH};
use crate::map::pathfinding;
use crate::map::reservation::{ReservationId, ReservationTable};
use crate::map::tile_pos::{TilePos, TileRect};
use crate::map::ways::{WayKind, WayTile, WayType, WayTypeId};
use crate::services::{
    CommittedWay, PlannedRoute, RouteRequest, StationBuilder, TerrainQuery, WayBuilder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ground {
    #[default]
    Land,
    Water,
    /// Passable for ways only by tunnel.
    Mountain,
}

/// Kind of stop a player can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum StationKind {
    RailStation,
    TruckStop,
    BusStop,
    Harbour,
    Airport,
}

impl StationKind {
    /// Way the station must sit on, if any.
    pub fn required_way(self) -> Option<WayKind> {
        match self {
            StationKind::RailStation => Some(WayKind::Rail),
            StationKind::TruckStop | StationKind::BusStop => Some(WayKind::Road),
            StationKind::Harbour | StationKind::Airport => None,
        }
    }

    /// Price of one station tile.
    pub fn build_cost(self) -> i64 {
        match self {
            StationKind::RailStation => 1_500,
            StationKind::TruckStop | StationKind::BusStop => 400,
            StationKind::Harbour => 3_000,
            StationKind::Airport => 6_000,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StationKind::RailStation => "rail station",
            StationKind::TruckStop => "truck stop",
            StationKind::BusStop => "bus stop",
            StationKind::Harbour => "harbour",
            StationKind::Airport => "airport",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationTile {
    pub kind: StationKind,
    pub owner: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    pub height: i8,
    pub ground: Ground,
    /// Houses, industry buildings and other things no way can cross.
    pub obstacle: bool,
    pub way: Option<WayTile>,
    pub station: Option<StationTile>,
}

impl Tile {
    pub fn is_land(&self) -> bool {
        self.ground == Ground::Land
    }

    /// Free land a station or way could be placed on.
    pub fn is_clear(&self) -> bool {
        self.is_land() && !self.obstacle && self.station.is_none()
    }
}

/// Hex tile map with ways, stations and site reservations.
///
/// Tiles are addressed with axial coordinates in `0..width` × `0..height`.
#[derive(Resource, Debug)]
pub struct GameMap {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    way_types: Vec<WayType>,
    pub reservations: ReservationTable,
}

impl Default for GameMap {
    fn default() -> Self {
        Self::new(DEFAULT_MAP_WIDTH, DEFAULT_MAP_HEIGHT)
    }
}

impl GameMap {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            tiles: vec![Tile::default(); (width * height) as usize],
            way_types: Vec::new(),
            reservations: ReservationTable::default(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    pub fn get(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub fn get_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index(pos).map(|i| &mut self.tiles[i])
    }

    pub fn register_way_type(&mut self, mut way: WayType) -> WayTypeId {
        let id = WayTypeId(self.way_types.len() as u32);
        way.id = id;
        self.way_types.push(way);
        id
    }

    pub fn set_ground(&mut self, pos: TilePos, ground: Ground) {
        if let Some(tile) = self.get_mut(pos) {
            tile.ground = ground;
        }
    }

    pub fn set_height(&mut self, pos: TilePos, height: i8) {
        if let Some(tile) = self.get_mut(pos) {
            tile.height = height;
        }
    }

    pub fn place_obstacle(&mut self, pos: TilePos) {
        if let Some(tile) = self.get_mut(pos) {
            tile.obstacle = true;
        }
    }

    /// Lay way directly, bypassing planning (map setup, city streets).
    pub fn place_way(&mut self, pos: TilePos, way: WayTile) {
        if let Some(tile) = self.get_mut(pos) {
            tile.way = Some(way);
        }
    }

    /// Number of way tiles owned by `owner`.
    pub fn way_count(&self, owner: Entity) -> usize {
        self.tiles
            .iter()
            .filter(|t| t.way.is_some_and(|w| w.owner == Some(owner)))
            .count()
    }

    pub fn station_count(&self, owner: Entity) -> usize {
        self.tiles
            .iter()
            .filter(|t| t.station.is_some_and(|s| s.owner == owner))
            .count()
    }

    fn all_positions(&self) -> impl Iterator<Item = TilePos> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| TilePos::new(x, y)))
    }
}

impl TerrainQuery for GameMap {
    fn tile(&self, pos: TilePos) -> Option<&Tile> {
        self.get(pos)
    }

    fn is_shore(&self, pos: TilePos) -> bool {
        self.get(pos).is_some_and(Tile::is_land)
            && pos
                .neighbors()
                .any(|n| self.get(n).is_some_and(|t| t.ground == Ground::Water))
    }

    fn reservation_owner(&self, pos: TilePos) -> Option<Entity> {
        self.reservations.owner_at(pos)
    }
}

impl WayBuilder for GameMap {
    fn best_way(&self, kind: WayKind, min_speed: u32) -> Option<&WayType> {
        let candidates = self.way_types.iter().filter(|w| w.kind == kind);
        // Cheapest way that is fast enough, otherwise the fastest there is.
        candidates
            .clone()
            .filter(|w| w.max_speed >= min_speed)
            .min_by_key(|w| (w.cost_per_tile, w.maintenance_per_tile, w.id))
            .or_else(|| candidates.max_by_key(|w| (w.max_speed, std::cmp::Reverse(w.id))))
    }

    fn way_type(&self, id: WayTypeId) -> Option<&WayType> {
        self.way_types.get(id.0 as usize)
    }

    fn plan_route(&self, request: &RouteRequest) -> Result<PlannedRoute, RouteError> {
        pathfinding::plan_route(self, request)
    }

    fn commit(&mut self, route: &PlannedRoute, owner: Entity) -> Result<CommittedWay, CommitError> {
        if !route.kind.is_built() {
            return Ok(CommittedWay::default());
        }
        let way_type = route.way.ok_or(CommitError::MissingWayType)?;

        // Validate everything first so a failed commit leaves nothing behind.
        for &pos in &route.tiles {
            let Some(tile) = self.get(pos) else {
                return Err(CommitError::Blocked {
                    at: pos,
                    built: Vec::new(),
                });
            };
            let way_ok = tile.way.is_none_or(|w| w.usable_by(route.kind, owner));
            let station_ok = tile.station.is_none_or(|s| {
                s.owner == owner && s.kind.required_way() == Some(route.kind)
            });
            let reserved_ok = self
                .reservations
                .owner_at(pos)
                .is_none_or(|holder| holder == owner);
            if tile.obstacle || !way_ok || !station_ok || !reserved_ok {
                return Err(CommitError::Blocked {
                    at: pos,
                    built: Vec::new(),
                });
            }
        }

        let mut levelled = Vec::with_capacity(route.terraform.len());
        for &(pos, target) in &route.terraform {
            if let Some(tile) = self.get_mut(pos) {
                levelled.push((pos, tile.height));
                tile.height = target;
            }
        }

        let mut built = Vec::new();
        for &pos in &route.tiles {
            if let Some(tile) = self.get_mut(pos) {
                if tile.way.is_none() {
                    tile.way = Some(WayTile {
                        kind: route.kind,
                        way_type,
                        owner: Some(owner),
                    });
                    built.push(pos);
                }
            }
        }

        debug!(
            "Committed {:?} route of {} tiles ({} new) for {}",
            route.kind,
            route.tiles.len(),
            built.len(),
            route.cost
        );
        Ok(CommittedWay {
            cost: route.cost,
            built,
            levelled,
        })
    }

    fn remove(&mut self, tiles: &[TilePos], owner: Entity) -> usize {
        let mut removed = 0;
        for &pos in tiles {
            if let Some(tile) = self.get_mut(pos) {
                let owned = tile.way.is_some_and(|w| w.owner == Some(owner));
                if owned && tile.station.is_none() {
                    tile.way = None;
                    removed += 1;
                }
            }
        }
        removed
    }

    fn restore_heights(&mut self, levelled: &[(TilePos, i8)]) -> usize {
        let mut restored = 0;
        for &(pos, height) in levelled {
            if let Some(tile) = self.get_mut(pos) {
                if tile.way.is_none() && tile.station.is_none() && tile.height != height {
                    tile.height = height;
                    restored += 1;
                }
            }
        }
        restored
    }
}

impl StationBuilder for GameMap {
    fn build_station(&mut self, pos: TilePos, kind: StationKind, owner: Entity) -> bool {
        let reserved_by_other = self
            .reservations
            .owner_at(pos)
            .is_some_and(|holder| holder != owner);
        let shore = self.is_shore(pos);
        let Some(tile) = self.get_mut(pos) else {
            return false;
        };
        if reserved_by_other || !tile.is_clear() {
            return false;
        }
        let placeable = match kind.required_way() {
            Some(way_kind) => tile.way.is_some_and(|w| w.usable_by(way_kind, owner)),
            None => tile.way.is_none() && (kind != StationKind::Harbour || shore),
        };
        if !placeable {
            return false;
        }
        tile.station = Some(StationTile { kind, owner });
        true
    }

    fn remove_station(&mut self, pos: TilePos, owner: Entity) -> bool {
        match self.get_mut(pos) {
            Some(tile) if tile.station.is_some_and(|s| s.owner == owner) => {
                tile.station = None;
                true
            }
            _ => false,
        }
    }

    fn stations_near(
        &self,
        center: TilePos,
        radius: u32,
        kind: StationKind,
        owner: Entity,
    ) -> Vec<TilePos> {
        let mut found: Vec<TilePos> = self
            .all_positions()
            .filter(|pos| pos.distance_to(center) <= radius)
            .filter(|pos| {
                self.get(*pos)
                    .and_then(|t| t.station)
                    .is_some_and(|s| s.kind == kind && s.owner == owner)
            })
            .collect();
        found.sort_by_key(|pos| (pos.distance_to(center), *pos));
        found
    }

    fn reserve(&mut self, rect: TileRect, owner: Entity) -> Option<ReservationId> {
        self.reservations.try_reserve(rect, owner)
    }

    fn release(&mut self, id: ReservationId) -> bool {
        self.reservations.release(id)
    }

    fn has_reservation(&self, id: ReservationId) -> bool {
        self.reservations.contains(id)
    }
}
