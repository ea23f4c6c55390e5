mod common;

use bevy::prelude::*;
use common::{headless_app, rail_world, run_until, spawn_player, state};
use rust_tycoon_ai::ai::{
    AiConfig, AiPlayer, AiSchedule, AttemptSlot, ConstructionState, ForbiddenConnections,
    PlayerStats, TransportMode,
};
use rust_tycoon_ai::economy::{ConnectionKey, GoodId, NodeId};
use rust_tycoon_ai::map::GameMap;
use rust_tycoon_ai::save::attempt_still_valid;

#[test]
fn attempt_in_progress_survives_json_round_trip() {
    let mut app = headless_app();
    rail_world().install(&mut app);
    let player = spawn_player(&mut app, AiPlayer::freight(), "Northern Rail", 1_000_000);
    assert!(run_until(&mut app, 10, |app| state(app, player).building_mode().is_some()));

    let world = app.world();
    let slot = world.get::<AttemptSlot>(player).unwrap();
    let json = serde_json::to_string(slot).unwrap();
    let restored: AttemptSlot = serde_json::from_str(&json).unwrap();
    assert_eq!(&restored, slot);
    let attempt = restored.get().unwrap();
    assert_eq!(attempt.mode(), Some(TransportMode::Rail));
    assert!(attempt_still_valid(attempt, world.resource::<GameMap>()));

    let state = *world.get::<ConstructionState>(player).unwrap();
    let json = serde_json::to_string(&state).unwrap();
    assert_eq!(serde_json::from_str::<ConstructionState>(&json).unwrap(), state);
}

#[test]
fn stale_attempt_is_detected_after_reservations_vanish() {
    let mut app = headless_app();
    rail_world().install(&mut app);
    let player = spawn_player(&mut app, AiPlayer::freight(), "Northern Rail", 1_000_000);
    assert!(run_until(&mut app, 10, |app| state(app, player).building_mode().is_some()));

    let saved = app.world().get::<AttemptSlot>(player).unwrap().clone();
    app.world_mut()
        .resource_mut::<GameMap>()
        .reservations
        .release_all(player);

    let attempt = saved.get().unwrap();
    assert!(!attempt_still_valid(attempt, app.world().resource::<GameMap>()));
}

#[test]
fn ledger_and_counters_round_trip() {
    let mut ledger = ForbiddenConnections::with_capacity(4);
    ledger.push(ConnectionKey::new(NodeId(3), NodeId(1), GoodId(2)), 1931);
    ledger.push(ConnectionKey::new(NodeId(5), NodeId(6), GoodId(0)), 1932);
    let json = serde_json::to_string(&ledger).unwrap();
    let restored: ForbiddenConnections = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, ledger);
    assert!(restored.contains(&ConnectionKey::new(NodeId(1), NodeId(3), GoodId(2))));

    let stats = PlayerStats {
        connections_built: 2,
        attempts_failed: 5,
        convoys_retired: 1,
        lines_removed: 1,
        steps: 400,
    };
    let json = serde_json::to_string(&stats).unwrap();
    assert_eq!(serde_json::from_str::<PlayerStats>(&json).unwrap(), stats);
}

#[test]
fn missing_fields_default_and_unknown_fields_are_ignored() {
    let config: AiConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, AiConfig::default());

    let config: AiConfig =
        serde_json::from_str(r#"{"step_interval": 3, "colour_scheme": "teal"}"#).unwrap();
    assert_eq!(config.step_interval, 3);
    assert_eq!(config.ledger_capacity, AiConfig::default().ledger_capacity);

    let schedule: AiSchedule = serde_json::from_str(r#"{"next_step_tick": 90}"#).unwrap();
    assert_eq!(schedule.next_step_tick, 90);

    let ledger: ForbiddenConnections = serde_json::from_str("{}").unwrap();
    assert!(ledger.is_empty());
}
