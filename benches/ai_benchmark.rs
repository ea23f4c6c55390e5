use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_tycoon_ai::ai::evaluator::{EvaluationView, evaluate_modes};
use rust_tycoon_ai::ai::selector::{SelectionView, select_target};
use rust_tycoon_ai::ai::{AiConfig, AiKind, ForbiddenConnections, PassengerFocus, Target};
use rust_tycoon_ai::economy::{FreightCategory, GoodCatalog, GoodId, NodeRegistry, Production};
use rust_tycoon_ai::fleet::FleetRegistry;
use rust_tycoon_ai::map::{GameMap, TilePos, WayKind, WayType, WayTypeId};
use rust_tycoon_ai::vehicles::{VehicleCatalog, VehicleType, VehicleTypeId};

/// Supply chains of raw producers, processors and consumers spread over a
/// large map, plus a ring of towns.
fn create_test_economy() -> (GameMap, NodeRegistry, VehicleCatalog, Vec<GoodId>) {
    let mut map = GameMap::new(256, 256);
    for (name, kind, speed, cost) in [
        ("Track", WayKind::Rail, 120, 1_000),
        ("Road", WayKind::Road, 80, 300),
    ] {
        map.register_way_type(WayType {
            id: WayTypeId::default(),
            name: name.into(),
            kind,
            max_speed: speed,
            cost_per_tile: cost,
            maintenance_per_tile: 5,
            electrified: false,
        });
    }

    let mut goods = GoodCatalog::default();
    let ore = goods.register("Iron Ore", FreightCategory::Bulk, 5, 10);
    let coal = goods.register("Coal", FreightCategory::Bulk, 6, 10);
    let steel = goods.register("Steel", FreightCategory::Piece, 14, 20);
    let pax = goods.register("Passengers", FreightCategory::Passengers, 4, 60);
    let mut nodes = NodeRegistry::with_goods(goods);

    for i in 0..40 {
        let x = (i * 37) % 240 + 8;
        let y = (i * 53) % 240 + 8;
        nodes.add_factory(
            format!("Mine {i}"),
            TilePos::new(x, y),
            vec![],
            vec![Production {
                good: if i % 2 == 0 { ore } else { coal },
                per_month: 120,
            }],
        );
        nodes.add_factory(
            format!("Steel Works {i}"),
            TilePos::new((x + 20) % 248, (y + 30) % 248),
            vec![ore, coal],
            vec![Production {
                good: steel,
                per_month: 60,
            }],
        );
        nodes.add_factory(
            format!("Factory {i}"),
            TilePos::new((x + 60) % 248, (y + 10) % 248),
            vec![steel],
            vec![],
        );
        nodes.add_city(
            format!("Town {i}"),
            TilePos::new((x + 90) % 248, (y + 70) % 248),
            800 + 50 * i as u32,
        );
    }

    let mut catalog = VehicleCatalog::default();
    let vehicle = |name: &str, kind, power, capacity, cargo| VehicleType {
        id: VehicleTypeId::default(),
        name: name.into(),
        way_kind: kind,
        power_kw: power,
        speed_kmh: 90,
        capacity,
        cargo,
        weight_t: 20,
        price: 8_000,
        running_cost: 2,
        electric: false,
    };
    catalog.register(vehicle("Mogul", WayKind::Rail, 2_500, 0, None));
    catalog.register(vehicle("Hopper", WayKind::Rail, 0, 30, Some(FreightCategory::Bulk)));
    catalog.register(vehicle("Box Car", WayKind::Rail, 0, 25, Some(FreightCategory::Piece)));
    catalog.register(vehicle("Coach", WayKind::Rail, 0, 40, Some(FreightCategory::Passengers)));
    catalog.register(vehicle("Tipper", WayKind::Road, 150, 12, Some(FreightCategory::Bulk)));
    catalog.register(vehicle("Lorry", WayKind::Road, 150, 10, Some(FreightCategory::Piece)));
    catalog.register(vehicle("Bus", WayKind::Road, 120, 35, Some(FreightCategory::Passengers)));

    (map, nodes, catalog, vec![ore, coal, steel, pax])
}

fn bench_select_target(c: &mut Criterion) {
    let (_, nodes, _, _) = create_test_economy();
    let fleet = FleetRegistry::default();
    let ledger = ForbiddenConnections::default();
    let config = AiConfig::default();
    let view = SelectionView {
        economy: &nodes,
        fleet: &fleet,
        ledger: &ledger,
    };

    c.bench_function("select_freight_target", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        let mut focus = PassengerFocus::default();
        b.iter(|| select_target(AiKind::Freight, &mut focus, black_box(&view), &mut rng, &config))
    });
    c.bench_function("select_passenger_target", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        let mut focus = PassengerFocus::default();
        b.iter(|| select_target(AiKind::Passenger, &mut focus, black_box(&view), &mut rng, &config))
    });
}

fn bench_evaluate_modes(c: &mut Criterion) {
    let (map, nodes, catalog, goods) = create_test_economy();
    let fleet = FleetRegistry::default();
    let config = AiConfig::default();
    let view = EvaluationView {
        map: &map,
        economy: &nodes,
        vehicles: &catalog,
        fleet: &fleet,
        ticks_per_month: 64,
    };
    let mut rng = StdRng::seed_from_u64(3);
    let ledger = ForbiddenConnections::default();
    let selection = SelectionView {
        economy: &nodes,
        fleet: &fleet,
        ledger: &ledger,
    };
    let mut focus = PassengerFocus::default();
    let target = select_target(AiKind::Freight, &mut focus, &selection, &mut rng, &config)
        .unwrap_or_else(|| Target::new(Default::default(), Default::default(), goods[0]));

    c.bench_function("evaluate_modes", |b| {
        b.iter(|| evaluate_modes(black_box(&target), black_box(&view), &config))
    });
}

criterion_group!(benches, bench_select_target, bench_evaluate_modes);
criterion_main!(benches);
