use std::path::PathBuf;

use bevy::prelude::*;
use moonshine_save::prelude::*;

use crate::ai::config::AiConfig;
use crate::ai::ledger::{ForbiddenConnections, ForbiddenEntry};
use crate::ai::machine::abandon_attempt;
use crate::ai::markers::{AiKind, AiPlayer};
use crate::ai::plan::{
    AttemptSlot, ConstructionAttempt, FeederPlan, FeederStock, ModeEstimate, PlannedSite,
    SitePair, Target,
};
use crate::ai::state::{AiSchedule, ConstructionState, PassengerFocus, PlayerStats, TransportMode};
use crate::economy::goods::GoodId;
use crate::economy::nodes::{ConnectionKey, NodeId};
use crate::economy::treasury::Treasury;
use crate::fleet::{Infrastructure, LineId};
use crate::map::grid::{GameMap, StationKind};
use crate::map::reservation::ReservationId;
use crate::map::tile_pos::TilePos;
use crate::map::ways::{WayKind, WayTypeId};
use crate::sim_clock::SimClock;
use crate::vehicles::VehicleTypeId;

/// Saves and restores the AI players and the clock through moonshine-save.
pub struct GameSavePlugin;

/// Used when a request names no file.
pub const DEFAULT_SAVE_PATH: &str = "saves/autosave.ron";

/// Request to write the AI state to disk.
#[derive(Message, Clone, Default)]
pub struct SaveGameRequest {
    pub path: Option<PathBuf>,
}

/// Request to load a saved AI state from disk.
#[derive(Message, Clone, Default)]
pub struct LoadGameRequest {
    pub path: Option<PathBuf>,
}

impl Plugin for GameSavePlugin {
    fn build(&self, app: &mut App) {
        register_reflect_types(app);

        app.add_message::<SaveGameRequest>()
            .add_message::<LoadGameRequest>()
            .add_observer(save_on_default_event)
            .add_observer(load_on_default_event)
            .add_observer(rebuild_ai_runtime_state)
            .add_systems(Update, process_requests);
    }
}

fn register_reflect_types(app: &mut App) {
    app.register_type::<TilePos>()
        .register_type::<NodeId>()
        .register_type::<GoodId>()
        .register_type::<ConnectionKey>()
        .register_type::<WayKind>()
        .register_type::<WayTypeId>()
        .register_type::<VehicleTypeId>()
        .register_type::<StationKind>()
        .register_type::<ReservationId>()
        .register_type::<LineId>()
        .register_type::<Infrastructure>()
        .register_type::<Treasury>()
        .register_type::<SimClock>()
        .register_type::<AiConfig>()
        .register_type::<AiKind>()
        .register_type::<AiPlayer>()
        .register_type::<TransportMode>()
        .register_type::<ConstructionState>()
        .register_type::<PassengerFocus>()
        .register_type::<AiSchedule>()
        .register_type::<PlayerStats>()
        .register_type::<ForbiddenEntry>()
        .register_type::<ForbiddenConnections>()
        .register_type::<Target>()
        .register_type::<FeederStock>()
        .register_type::<ModeEstimate>()
        .register_type::<PlannedSite>()
        .register_type::<FeederPlan>()
        .register_type::<SitePair>()
        .register_type::<ConstructionAttempt>()
        .register_type::<AttemptSlot>();
}

fn process_requests(
    mut commands: Commands,
    mut saves: MessageReader<SaveGameRequest>,
    mut loads: MessageReader<LoadGameRequest>,
) {
    let resolve = |requested: &Option<PathBuf>| {
        requested
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_PATH))
    };
    for request in saves.read() {
        let path = resolve(&request.path);
        info!("Saving AI state to {}", path.display());
        commands.trigger_save(
            SaveWorld::default_into_file(path)
                .include_resource::<SimClock>()
                .include_resource::<AiConfig>(),
        );
    }
    for request in loads.read() {
        let path = resolve(&request.path);
        info!("Loading AI state from {}", path.display());
        commands.trigger_load(LoadWorld::default_from_file(path));
    }
}

/// Whether every site reservation of `attempt` still exists on `map`.
pub fn attempt_still_valid(attempt: &ConstructionAttempt, map: &GameMap) -> bool {
    attempt
        .reservations()
        .into_iter()
        .all(|id| map.reservations.contains(id))
}

fn rebuild_ai_runtime_state(_: On<Loaded>, mut commands: Commands) {
    commands.queue(repair_loaded_players);
}

/// Give loaded AI players the runtime components the save left out and
/// drop attempts whose reservations did not survive.
pub fn repair_loaded_players(world: &mut World) {
    let players: Vec<Entity> = world
        .query_filtered::<Entity, With<AiPlayer>>()
        .iter(world)
        .collect();
    for entity in players {
        let mut player = world.entity_mut(entity);
        if !player.contains::<Name>() {
            player.insert(Name::new(format!("AI {}", entity.index())));
        }
        if !player.contains::<Treasury>() {
            player.insert(Treasury::default());
        }
        if !player.contains::<ForbiddenConnections>() {
            player.insert(ForbiddenConnections::default());
        }
        if !player.contains::<AiSchedule>() {
            player.insert(AiSchedule::default());
        }
        if !player.contains::<PlayerStats>() {
            player.insert(PlayerStats::default());
        }
        if !player.contains::<AttemptSlot>() {
            player.insert((AttemptSlot::default(), ConstructionState::Idle));
            continue;
        }

        let stale = match (world.get::<AttemptSlot>(entity), world.get_resource::<GameMap>()) {
            (Some(slot), Some(map)) => slot
                .get()
                .is_some_and(|attempt| !attempt_still_valid(attempt, map)),
            _ => false,
        };
        if stale {
            world.resource_scope(|world, mut map: Mut<GameMap>| {
                if let Some(mut slot) = world.get_mut::<AttemptSlot>(entity) {
                    abandon_attempt(&mut slot, entity, &mut *map);
                }
            });
            warn!("Dropped a construction attempt whose sites were lost on load");
            world.entity_mut(entity).insert(ConstructionState::Idle);
        } else if !world.entity(entity).contains::<ConstructionState>() {
            world.entity_mut(entity).insert(ConstructionState::Idle);
        }
    }
}
