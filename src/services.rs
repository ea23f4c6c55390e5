//! Contracts between the AI automaton and the subsystems it drives.
//!
//! The automaton never touches map tiles, vehicles or factories directly; it
//! calls through these traits. [`crate::map::GameMap`], [`crate::economy::NodeRegistry`],
//! [`crate::vehicles::VehicleCatalog`] and [`crate::fleet::FleetRegistry`] are
//! the in-crate implementations.

use bevy::prelude::*;

use crate::ai::error::{CommitError, FleetError, RouteError};
use crate::economy::goods::{GoodDescriptor, GoodId};
use crate::economy::nodes::{ConnectionKey, EconomicNode, MissingLink, NodeId};
use crate::fleet::{Convoy, ConvoyId, ConvoyProblem, Line, LineId, NewLine};
use crate::map::grid::{StationKind, Tile};
use crate::map::reservation::ReservationId;
use crate::map::tile_pos::{TilePos, TileRect};
use crate::map::ways::{WayKind, WayType, WayTypeId};
use crate::vehicles::{VehicleQuery, VehicleType, VehicleTypeId};

/// Request for a way between two tile sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub start: Vec<TilePos>,
    pub end: Vec<TilePos>,
    pub kind: WayKind,
    /// Way standard to lay. `None` for water probes, which build nothing.
    pub way: Option<WayTypeId>,
    pub allow_terraform: bool,
    pub owner: Entity,
}

/// A route found by the way planner, not yet built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRoute {
    pub tiles: Vec<TilePos>,
    pub kind: WayKind,
    pub way: Option<WayTypeId>,
    /// Construction cost including bridges, tunnels and terraforming.
    pub cost: i64,
    /// Tiles that need new way (the rest reuse existing way).
    pub new_tiles: usize,
    /// Tiles whose height must change, with the target height.
    pub terraform: Vec<(TilePos, i8)>,
}

impl PlannedRoute {
    /// Length used to compare plain and terraformed candidates.
    pub fn weighted_len(&self, terraform_weight: u32) -> u64 {
        self.tiles.len() as u64 + self.terraform.len() as u64 * u64::from(terraform_weight)
    }
}

/// What a successful commit built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommittedWay {
    pub cost: i64,
    /// Tiles that received new way; reused tiles are not listed.
    pub built: Vec<TilePos>,
    /// Terraformed tiles with their height before the commit.
    pub levelled: Vec<(TilePos, i8)>,
}

pub trait TerrainQuery {
    fn tile(&self, pos: TilePos) -> Option<&Tile>;

    /// Land tile with at least one water neighbour.
    fn is_shore(&self, pos: TilePos) -> bool;

    fn reservation_owner(&self, pos: TilePos) -> Option<Entity>;
}

/// Way-building service.
pub trait WayBuilder {
    fn best_way(&self, kind: WayKind, min_speed: u32) -> Option<&WayType>;

    fn way_type(&self, id: WayTypeId) -> Option<&WayType>;

    fn plan_route(&self, request: &RouteRequest) -> Result<PlannedRoute, RouteError>;

    fn commit(&mut self, route: &PlannedRoute, owner: Entity) -> Result<CommittedWay, CommitError>;

    /// Remove way owned by `owner` from `tiles`. Tiles carrying a station are skipped.
    fn remove(&mut self, tiles: &[TilePos], owner: Entity) -> usize;

    /// Give terraformed tiles their old height back. Tiles that still carry
    /// way or a station keep the levelled height.
    fn restore_heights(&mut self, levelled: &[(TilePos, i8)]) -> usize;
}

/// Station-building tool plus the site bookkeeping that goes with it.
pub trait StationBuilder {
    fn build_station(&mut self, pos: TilePos, kind: StationKind, owner: Entity) -> bool;

    fn remove_station(&mut self, pos: TilePos, owner: Entity) -> bool;

    /// Stations of `kind` owned by `owner` within `radius` of `center`, nearest first.
    fn stations_near(
        &self,
        center: TilePos,
        radius: u32,
        kind: StationKind,
        owner: Entity,
    ) -> Vec<TilePos>;

    fn reserve(&mut self, rect: TileRect, owner: Entity) -> Option<ReservationId>;

    fn release(&mut self, id: ReservationId) -> bool;

    fn has_reservation(&self, id: ReservationId) -> bool;
}

/// Everything the AI needs from the map.
pub trait WorldMap: TerrainQuery + WayBuilder + StationBuilder {}

impl<T: TerrainQuery + WayBuilder + StationBuilder> WorldMap for T {}

pub trait VehicleRegistry {
    fn find_best_vehicle(&self, query: &VehicleQuery) -> Option<&VehicleType>;

    fn vehicle(&self, id: VehicleTypeId) -> Option<&VehicleType>;
}

/// Read-only view of factories, cities and goods.
pub trait EconomyRegistry {
    fn node(&self, id: NodeId) -> Option<&EconomicNode>;

    fn nodes(&self) -> Box<dyn Iterator<Item = &EconomicNode> + '_>;

    fn good(&self, id: GoodId) -> Option<&GoodDescriptor>;

    fn passenger_good(&self) -> Option<GoodId>;

    /// Inputs of `consumer` that no connected supplier delivers.
    fn missing_links(
        &self,
        consumer: NodeId,
        is_connected: &dyn Fn(&ConnectionKey) -> bool,
    ) -> Vec<MissingLink>;

    /// Monthly output of `good` at `node`.
    fn output_rate(&self, node: NodeId, good: GoodId) -> u32;
}

/// Lines, convoys and their statistics.
pub trait FleetService {
    /// Whether any line, of any owner, already serves `key`.
    fn is_connected(&self, key: &ConnectionKey) -> bool;

    fn convoy_count(&self) -> u32;

    /// Global ceiling of simultaneously existing convoys.
    fn max_convoys(&self) -> u32;

    /// Number of addressable convoy handles.
    fn convoy_handle_space(&self) -> u32;

    fn create_line(&mut self, line: NewLine) -> LineId;

    fn create_convoy(
        &mut self,
        owner: Entity,
        line: LineId,
        vehicles: Vec<VehicleTypeId>,
        value: i64,
    ) -> Result<ConvoyId, FleetError>;

    fn start_convoy(&mut self, convoy: ConvoyId) -> bool;

    fn line(&self, id: LineId) -> Option<&Line>;

    fn convoy(&self, id: ConvoyId) -> Option<&Convoy>;

    fn lines_of(&self, owner: Entity) -> Vec<LineId>;

    fn convoys_of(&self, owner: Entity) -> Vec<ConvoyId>;

    /// Sell and remove a convoy. Returns its resale value.
    fn self_destruct(&mut self, convoy: ConvoyId) -> Option<i64>;

    fn delete_line(&mut self, line: LineId) -> Option<Line>;

    /// Whether a tile of `line`'s infrastructure is also used by another line.
    fn infrastructure_shared(&self, pos: TilePos, except: LineId) -> bool;

    /// Resale value of everything `owner` runs.
    fn fleet_value(&self, owner: Entity) -> i64;

    fn problem_convoys(&self, owner: Entity) -> Vec<(ConvoyId, ConvoyProblem)>;
}

/// Borrowed view of all collaborators for one construction step.
pub struct AiWorld<'w> {
    pub map: &'w mut dyn WorldMap,
    pub economy: &'w dyn EconomyRegistry,
    pub vehicles: &'w dyn VehicleRegistry,
    pub fleet: &'w mut dyn FleetService,
}
