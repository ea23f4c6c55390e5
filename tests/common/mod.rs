#![allow(dead_code)]

use bevy::prelude::*;
use rust_tycoon_ai::LogicPlugins;
use rust_tycoon_ai::ai::{AiConfig, AiPlayer, ConstructionState, PlayerStats};
use rust_tycoon_ai::economy::{
    ConnectionKey, FreightCategory, GoodCatalog, GoodId, NodeId, NodeRegistry, Production,
    Treasury,
};
use rust_tycoon_ai::map::{GameMap, Ground, TilePos, WayKind, WayType, WayTypeId};
use rust_tycoon_ai::vehicles::{VehicleCatalog, VehicleType, VehicleTypeId};

pub fn way(name: &str, kind: WayKind, max_speed: u32, cost_per_tile: i64) -> WayType {
    WayType {
        id: WayTypeId::default(),
        name: name.into(),
        kind,
        max_speed,
        cost_per_tile,
        maintenance_per_tile: 2,
        electrified: false,
    }
}

pub fn vehicle(
    name: &str,
    way_kind: WayKind,
    power_kw: u32,
    speed_kmh: u32,
    capacity: u32,
    cargo: Option<FreightCategory>,
    price: i64,
) -> VehicleType {
    VehicleType {
        id: VehicleTypeId::default(),
        name: name.into(),
        way_kind,
        power_kw,
        speed_kmh,
        capacity,
        cargo,
        weight_t: if capacity == 0 { 80 } else { 15 },
        price,
        running_cost: 1,
        electric: false,
    }
}

/// Headless app with the AI stepping every tick.
pub fn headless_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins).add_plugins(LogicPlugins);
    app.insert_resource(AiConfig {
        step_interval: 1,
        ..default()
    });
    app
}

/// A coal mine and the power plant it should supply.
pub struct CoalWorld {
    pub map: GameMap,
    pub economy: NodeRegistry,
    pub vehicles: VehicleCatalog,
    pub coal: GoodId,
    pub mine: NodeId,
    pub plant: NodeId,
}

impl CoalWorld {
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(self.mine, self.plant, self.coal)
    }

    /// Move map, economy and catalog into `app` and return the connection key.
    pub fn install(self, app: &mut App) -> ConnectionKey {
        let key = self.key();
        app.insert_resource(self.map)
            .insert_resource(self.economy)
            .insert_resource(self.vehicles);
        key
    }
}

fn coal_economy(mine: TilePos, plant: TilePos, per_month: u32) -> (NodeRegistry, GoodId, NodeId, NodeId) {
    let mut goods = GoodCatalog::default();
    let coal = goods.register("Coal", FreightCategory::Bulk, 6, 10);
    let mut economy = NodeRegistry::with_goods(goods);
    let mine = economy.add_factory(
        "Coal Mine",
        mine,
        vec![],
        vec![Production {
            good: coal,
            per_month,
        }],
    );
    let plant = economy.add_factory("Power Plant", plant, vec![coal], vec![]);
    (economy, coal, mine, plant)
}

/// Thirty tiles of flat land that only trains can serve.
pub fn rail_world() -> CoalWorld {
    let mut map = GameMap::new(40, 10);
    map.register_way_type(way("Track", WayKind::Rail, 120, 1_000));
    let (economy, coal, mine, plant) =
        coal_economy(TilePos::new(2, 5), TilePos::new(32, 5), 400);
    let mut vehicles = VehicleCatalog::default();
    vehicles.register(vehicle("Steam Engine", WayKind::Rail, 2_000, 100, 0, None, 10_000));
    vehicles.register(vehicle(
        "Hopper",
        WayKind::Rail,
        0,
        100,
        30,
        Some(FreightCategory::Bulk),
        2_000,
    ));
    CoalWorld {
        map,
        economy,
        vehicles,
        coal,
        mine,
        plant,
    }
}

/// Ten tiles of flat land served by trucks.
pub fn road_world() -> CoalWorld {
    let mut map = GameMap::new(24, 12);
    map.register_way_type(way("Gravel Road", WayKind::Road, 80, 200));
    let (economy, coal, mine, plant) =
        coal_economy(TilePos::new(4, 6), TilePos::new(14, 6), 80);
    let mut vehicles = VehicleCatalog::default();
    vehicles.register(vehicle(
        "Dump Truck",
        WayKind::Road,
        150,
        70,
        20,
        Some(FreightCategory::Bulk),
        4_000,
    ));
    CoalWorld {
        map,
        economy,
        vehicles,
        coal,
        mine,
        plant,
    }
}

/// Mine and plant five rows inland from a sea strip along the north edge.
/// Ships carry the coal, light trucks bring it to and from the shore.
pub fn harbour_world() -> CoalWorld {
    let mut map = GameMap::new(40, 14);
    for y in 0..4 {
        for x in 0..40 {
            map.set_ground(TilePos::new(x, y), Ground::Water);
        }
    }
    map.register_way_type(way("Gravel Road", WayKind::Road, 80, 100));
    let (economy, coal, mine, plant) =
        coal_economy(TilePos::new(8, 9), TilePos::new(30, 9), 400);
    let mut vehicles = VehicleCatalog::default();
    vehicles.register(vehicle(
        "Light Truck",
        WayKind::Road,
        150,
        60,
        4,
        Some(FreightCategory::Bulk),
        3_000,
    ));
    vehicles.register(vehicle(
        "Collier",
        WayKind::Water,
        1_000,
        50,
        400,
        Some(FreightCategory::Bulk),
        20_000,
    ));
    CoalWorld {
        map,
        economy,
        vehicles,
        coal,
        mine,
        plant,
    }
}

/// Two towns thirty tiles apart with buses and roads available.
pub struct TownWorld {
    pub map: GameMap,
    pub economy: NodeRegistry,
    pub vehicles: VehicleCatalog,
    pub passengers: GoodId,
    pub west: NodeId,
    pub east: NodeId,
}

impl TownWorld {
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(self.west, self.east, self.passengers)
    }

    pub fn install(self, app: &mut App) -> ConnectionKey {
        let key = self.key();
        app.insert_resource(self.map)
            .insert_resource(self.economy)
            .insert_resource(self.vehicles);
        key
    }
}

pub fn town_world() -> TownWorld {
    let mut map = GameMap::new(40, 12);
    map.register_way_type(way("Paved Road", WayKind::Road, 80, 300));
    let mut goods = GoodCatalog::default();
    let passengers = goods.register("Passengers", FreightCategory::Passengers, 4, 20);
    let mut economy = NodeRegistry::with_goods(goods);
    let west = economy.add_city("Westfield", TilePos::new(4, 6), 2_400);
    let east = economy.add_city("Eastbury", TilePos::new(34, 6), 2_400);
    let mut vehicles = VehicleCatalog::default();
    vehicles.register(vehicle(
        "Omnibus",
        WayKind::Road,
        90,
        60,
        30,
        Some(FreightCategory::Passengers),
        5_000,
    ));
    TownWorld {
        map,
        economy,
        vehicles,
        passengers,
        west,
        east,
    }
}

/// Two towns far enough apart for an air service, with no way types at all.
pub fn air_world() -> TownWorld {
    let map = GameMap::new(60, 12);
    let mut goods = GoodCatalog::default();
    let passengers = goods.register("Passengers", FreightCategory::Passengers, 4, 20);
    let mut economy = NodeRegistry::with_goods(goods);
    let west = economy.add_city("Westfield", TilePos::new(4, 6), 2_400);
    let east = economy.add_city("Eastbury", TilePos::new(52, 6), 2_400);
    let mut vehicles = VehicleCatalog::default();
    vehicles.register(vehicle(
        "Airliner",
        WayKind::Air,
        2_000,
        400,
        40,
        Some(FreightCategory::Passengers),
        30_000,
    ));
    TownWorld {
        map,
        economy,
        vehicles,
        passengers,
        west,
        east,
    }
}

pub fn spawn_player(app: &mut App, player: AiPlayer, name: &str, cash: i64) -> Entity {
    app.world_mut()
        .spawn((player, Name::new(name.to_string()), Treasury::new(cash)))
        .id()
}

pub fn state(app: &App, player: Entity) -> ConstructionState {
    *app.world().get::<ConstructionState>(player).unwrap()
}

pub fn stats(app: &App, player: Entity) -> PlayerStats {
    *app.world().get::<PlayerStats>(player).unwrap()
}

/// Update until `done` holds or `max_updates` passed. Returns whether it held.
pub fn run_until(app: &mut App, max_updates: usize, mut done: impl FnMut(&App) -> bool) -> bool {
    for _ in 0..max_updates {
        app.update();
        if done(app) {
            return true;
        }
    }
    false
}
