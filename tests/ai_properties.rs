mod common;

use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_tycoon_ai::ai::machine::{PlayerState, StepContext, step};
use rust_tycoon_ai::ai::route::{BuildOutcome, build_connection};
use rust_tycoon_ai::ai::{
    AiConfig, AiKind, AiPlayer, AiSchedule, AttemptSlot, ConstructionAttempt, ConstructionState,
    ForbiddenConnections, PlayerStats, Target, TransportMode,
};
use rust_tycoon_ai::economy::{NodeRegistry, Treasury};
use rust_tycoon_ai::fleet::FleetRegistry;
use rust_tycoon_ai::map::GameMap;
use rust_tycoon_ai::messages::AiAnnouncement;
use rust_tycoon_ai::services::{AiWorld, FleetService};
use rust_tycoon_ai::sim_clock::SimClock;
use rust_tycoon_ai::vehicles::VehicleCatalog;

use common::{CoalWorld, headless_app, rail_world, road_world, run_until, spawn_player};

/// One freight player driven step by step outside of an app.
struct Harness {
    map: GameMap,
    economy: NodeRegistry,
    vehicles: VehicleCatalog,
    fleet: FleetRegistry,
    target: Target,
    owner: Entity,
    treasury: Treasury,
    ledger: ForbiddenConnections,
    slot: AttemptSlot,
    schedule: AiSchedule,
    stats: PlayerStats,
    rng: StdRng,
    config: AiConfig,
}

impl Harness {
    fn new(world: CoalWorld, cash: i64) -> Self {
        let target = Target::new(world.mine, world.plant, world.coal);
        Self {
            map: world.map,
            economy: world.economy,
            vehicles: world.vehicles,
            fleet: FleetRegistry::default(),
            target,
            owner: World::new().spawn_empty().id(),
            treasury: Treasury::new(cash),
            ledger: ForbiddenConnections::default(),
            slot: AttemptSlot::default(),
            schedule: AiSchedule::default(),
            stats: PlayerStats::default(),
            rng: StdRng::seed_from_u64(7),
            config: AiConfig::default(),
        }
    }

    fn world(&mut self) -> AiWorld<'_> {
        AiWorld {
            map: &mut self.map,
            economy: &self.economy,
            vehicles: &self.vehicles,
            fleet: &mut self.fleet,
        }
    }

    fn step(&mut self, state: ConstructionState) -> (ConstructionState, Vec<AiAnnouncement>) {
        let mut player = PlayerState {
            entity: self.owner,
            name: "Harness Freight",
            kind: AiKind::Freight,
            treasury: &mut self.treasury,
            ledger: &mut self.ledger,
            attempt: &mut self.slot,
            schedule: &mut self.schedule,
            stats: &mut self.stats,
        };
        let mut world = AiWorld {
            map: &mut self.map,
            economy: &self.economy,
            vehicles: &self.vehicles,
            fleet: &mut self.fleet,
        };
        let mut ctx = StepContext {
            config: &self.config,
            year: 1930,
            ticks_per_month: 64,
            rng: &mut self.rng,
            announcements: Vec::new(),
        };
        let next = step(state, &mut player, &mut world, &mut ctx);
        (next, ctx.announcements)
    }

    /// Step from `Idle` until `done` accepts a state, at most `max` steps.
    fn run_until(&mut self, max: usize, done: impl Fn(ConstructionState) -> bool) -> Option<ConstructionState> {
        let mut state = ConstructionState::Idle;
        for _ in 0..max {
            state = self.step(state).0;
            if done(state) {
                return Some(state);
            }
        }
        None
    }
}

#[test]
fn forbidden_key_waits_for_the_ledger_to_age() {
    let mut app = headless_app();
    let key = road_world().install(&mut app);
    app.insert_resource(SimClock::new(2));
    let mut ledger = ForbiddenConnections::default();
    ledger.push(key, 1930);
    let player = app
        .world_mut()
        .spawn((
            AiPlayer::freight(),
            Name::new("Haulage"),
            Treasury::new(200_000),
            ledger,
        ))
        .id();

    // Two ticks a month: the entry from 1930 ages out when 1933 begins.
    for _ in 0..71 {
        app.update();
        assert!(!app.world().resource::<FleetRegistry>().is_connected(&key));
        let slot = app.world().get::<AttemptSlot>(player).unwrap();
        assert!(slot.get().is_none_or(|a| a.target.key != key));
    }

    let built = run_until(&mut app, 20, |app| {
        app.world().resource::<FleetRegistry>().is_connected(&key)
    });
    assert!(built);
    assert!(!app.world().get::<ForbiddenConnections>(player).unwrap().contains(&key));
}

#[test]
fn building_an_existing_connection_changes_nothing() {
    let mut h = Harness::new(road_world(), 200_000);
    let done = h.run_until(10, |s| matches!(s, ConstructionState::ConstructionSucceeded(_)));
    assert_eq!(done, Some(ConstructionState::ConstructionSucceeded(TransportMode::Road)));

    let owner = h.owner;
    let ways = h.map.way_count(owner);
    let stations = h.map.station_count(owner);
    let cash = h.treasury.cash();
    let lines = h.fleet.lines_of(owner).len();

    let mut attempt = ConstructionAttempt::new(h.target);
    let config = h.config.clone();
    let mut treasury = h.treasury.clone();
    let outcome = build_connection(&mut attempt, owner, &mut treasury, &mut h.world(), &config);
    assert_eq!(outcome, Ok(BuildOutcome::AlreadyConnected));

    // The same through the state machine.
    h.slot.0 = Some(ConstructionAttempt::new(h.target));
    let (next, _) = h.step(ConstructionState::BuildingRoadRoute);
    assert_eq!(next, ConstructionState::Idle);

    assert_eq!(h.map.way_count(owner), ways);
    assert_eq!(h.map.station_count(owner), stations);
    assert_eq!(h.treasury.cash(), cash);
    assert_eq!(treasury.cash(), cash);
    assert_eq!(h.fleet.lines_of(owner).len(), lines);
}

#[test]
fn construction_never_spends_beyond_net_worth() {
    // Track alone costs 30 000 in this world.
    for cash in [21_000, 35_000, 45_000, 80_000, 1_000_000] {
        let mut h = Harness::new(rail_world(), cash);
        h.config.min_construction_funds = 20_000;
        let mut state = ConstructionState::Idle;
        for _ in 0..12 {
            state = h.step(state).0;
            assert!(
                h.treasury.cash() >= 0,
                "cash {} went negative starting from {}",
                h.treasury.cash(),
                cash
            );
        }
        if h.map.way_count(h.owner) == 0 {
            assert_eq!(h.map.station_count(h.owner), 0, "stations left without a way at {cash}");
        }
    }
}

#[test]
fn every_state_reaches_a_resting_state() {
    let states = [
        ConstructionState::Idle,
        ConstructionState::SelectingTarget,
        ConstructionState::EvaluatingModes,
        ConstructionState::BuildingRailRoute,
        ConstructionState::BuildingRoadRoute,
        ConstructionState::BuildingWaterRoute,
        ConstructionState::BuildingAirRoute,
        ConstructionState::CleaningUpFailedAttempt,
        ConstructionState::ConstructionSucceeded(TransportMode::Road),
        ConstructionState::ReviewingFleet,
    ];
    for start in states {
        for with_attempt in [false, true] {
            let mut h = Harness::new(road_world(), 200_000);
            if with_attempt {
                h.slot.0 = Some(ConstructionAttempt::new(h.target));
            }
            let mut state = start;
            let mut rested = start.is_resting();
            for _ in 0..8 {
                state = h.step(state).0;
                if state.is_resting() {
                    rested = true;
                    break;
                }
            }
            assert!(rested, "{start:?} (attempt: {with_attempt}) never rested, ended in {state:?}");
        }
    }
}

#[test]
fn poor_players_build_nothing_but_keep_stepping() {
    let mut app = headless_app();
    rail_world().install(&mut app);
    let player = spawn_player(&mut app, AiPlayer::freight(), "Shoestring", 1_000);

    for _ in 0..12 {
        app.update();
    }
    let state = common::state(&app, player);
    assert!(state.is_resting());
    assert_eq!(common::stats(&app, player).steps, 12);
    assert_eq!(app.world().resource::<GameMap>().way_count(player), 0);
}
