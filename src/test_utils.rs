//! Testing utilities shared by the unit tests.
//!
//! Small catalogs of way and vehicle types plus a flat map, enough to run
//! the construction automaton without a full game around it.

use bevy::prelude::*;

use crate::ai::markers::AiPlayer;
use crate::economy::goods::{FreightCategory, GoodCatalog, GoodId};
use crate::economy::nodes::{NodeId, NodeRegistry, Production};
use crate::economy::treasury::Treasury;
use crate::map::grid::{GameMap, Ground};
use crate::map::tile_pos::TilePos;
use crate::map::ways::{WayKind, WayType, WayTypeId};
use crate::vehicles::{VehicleCatalog, VehicleType, VehicleTypeId};

pub fn gravel_road() -> WayType {
    WayType {
        id: WayTypeId::default(),
        name: "Gravel Road".into(),
        kind: WayKind::Road,
        max_speed: 80,
        cost_per_tile: 200,
        maintenance_per_tile: 2,
        electrified: false,
    }
}

pub fn dump_truck() -> VehicleType {
    VehicleType {
        id: VehicleTypeId::default(),
        name: "Dump Truck".into(),
        way_kind: WayKind::Road,
        power_kw: 150,
        speed_kmh: 70,
        capacity: 20,
        cargo: Some(FreightCategory::Bulk),
        weight_t: 8,
        price: 4_000,
        running_cost: 1,
        electric: false,
    }
}

/// Flat land map with a gravel road type registered.
pub fn road_map(width: i32, height: i32) -> GameMap {
    let mut map = GameMap::new(width, height);
    map.register_way_type(gravel_road());
    map
}

/// Road map whose first `water_rows` rows are open sea.
pub fn coastal_map(width: i32, height: i32, water_rows: i32) -> GameMap {
    let mut map = road_map(width, height);
    for y in 0..water_rows {
        for x in 0..width {
            map.set_ground(TilePos::new(x, y), Ground::Water);
        }
    }
    map
}

pub fn collier() -> VehicleType {
    VehicleType {
        id: VehicleTypeId::default(),
        name: "Collier".into(),
        way_kind: WayKind::Water,
        power_kw: 800,
        speed_kmh: 50,
        capacity: 400,
        cargo: Some(FreightCategory::Bulk),
        weight_t: 300,
        price: 20_000,
        running_cost: 2,
        electric: false,
    }
}

pub fn truck_catalog() -> VehicleCatalog {
    let mut vehicles = VehicleCatalog::default();
    vehicles.register(dump_truck());
    vehicles
}

/// A coal mine at `mine` supplying a power station at `plant`.
pub struct CoalChain {
    pub economy: NodeRegistry,
    pub coal: GoodId,
    pub mine: NodeId,
    pub plant: NodeId,
}

pub fn coal_chain(mine: TilePos, plant: TilePos) -> CoalChain {
    let mut goods = GoodCatalog::default();
    let coal = goods.register("Coal", FreightCategory::Bulk, 6, 10);
    let mut economy = NodeRegistry::with_goods(goods);
    let mine = economy.add_factory(
        "Coal Mine",
        mine,
        vec![],
        vec![Production {
            good: coal,
            per_month: 80,
        }],
    );
    let plant = economy.add_factory("Power Station", plant, vec![coal], vec![]);
    CoalChain {
        economy,
        coal,
        mine,
        plant,
    }
}

/// Spawn a freight AI player with the given cash.
pub fn spawn_freight_player(world: &mut World, name: &str, cash: i64) -> Entity {
    world
        .spawn((AiPlayer::freight(), Name::new(name.to_string()), Treasury::new(cash)))
        .id()
}
