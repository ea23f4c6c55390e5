use bevy::prelude::*;

use crate::ai::config::{AiConfig, AiRng};
use crate::ai::ledger::ForbiddenConnections;
use crate::ai::machine::{PlayerState, StepContext, abandon_attempt, step};
use crate::ai::markers::{AiPlayer, PlayerInstance};
use crate::ai::plan::AttemptSlot;
use crate::ai::state::{AiSchedule, ConstructionState, PlayerStats};
use crate::economy::nodes::{NodeId, NodeRegistry};
use crate::economy::treasury::Treasury;
use crate::fleet::{ConvoyProblem, FleetRegistry};
use crate::map::grid::GameMap;
use crate::messages::{AiAnnouncement, MessageCategory, NodeRemoved};
use crate::services::{AiWorld, FleetService};
use crate::sim_clock::SimClock;
use crate::vehicles::VehicleCatalog;

/// Apply the configured ledger size to new players and after config changes.
pub fn sync_ledger_capacity(
    config: Res<AiConfig>,
    mut players: Query<(Ref<AiPlayer>, &mut ForbiddenConnections)>,
) {
    for (player, mut ledger) in &mut players {
        if config.is_changed() || player.is_added() {
            ledger.set_capacity(config.ledger_capacity);
        }
    }
}

/// Turn deletions recorded by the node registry into [`NodeRemoved`] messages.
pub fn broadcast_node_removals(
    mut economy: ResMut<NodeRegistry>,
    mut removed: MessageWriter<NodeRemoved>,
) {
    for node in economy.take_removals() {
        removed.write(NodeRemoved { node });
    }
}

/// Forget deleted nodes and abort attempts that depended on them.
pub fn handle_node_removals(
    mut removals: MessageReader<NodeRemoved>,
    mut map: ResMut<GameMap>,
    mut players: Query<(
        Entity,
        &Name,
        &mut ConstructionState,
        &mut ForbiddenConnections,
        &mut AttemptSlot,
    )>,
) {
    let removed: Vec<NodeId> = removals.read().map(|m| m.node).collect();
    if removed.is_empty() {
        return;
    }

    for (entity, name, mut state, mut ledger, mut slot) in &mut players {
        for &node in &removed {
            ledger.purge_node(node);
        }
        let affected = slot
            .get()
            .is_some_and(|a| removed.iter().any(|&n| a.target.key.involves(n)));
        if affected {
            abandon_attempt(&mut slot, entity, map.as_mut());
            *state = ConstructionState::Idle;
            info!("{} abandoned its construction site after a node vanished", name);
        }
    }
}

/// Scrap convoys that cannot reach their next stop.
pub fn handle_convoy_problems(
    mut fleet: ResMut<FleetRegistry>,
    mut players: Query<(PlayerInstance, &Name, &mut Treasury)>,
    mut announcements: MessageWriter<AiAnnouncement>,
) {
    for (player, name, mut treasury) in &mut players {
        let entity = player.entity();
        for (convoy, problem) in fleet.problem_convoys(entity) {
            match problem {
                ConvoyProblem::NoRoute => {
                    let Some(refund) = fleet.self_destruct(convoy) else {
                        continue;
                    };
                    treasury.add(refund);
                    warn!("{} scrapped stuck convoy {:?}", name, convoy);
                    announcements.write(AiAnnouncement {
                        player: entity,
                        text: format!("{} scrapped a vehicle that could not find its way", name),
                        location: None,
                        category: MessageCategory::Problem,
                    });
                }
            }
        }
    }
}

/// Drop ledger entries old enough to be worth another try.
pub fn age_ledgers(
    clock: Res<SimClock>,
    config: Res<AiConfig>,
    mut ledgers: Query<(&Name, &mut ForbiddenConnections), With<AiPlayer>>,
) {
    for (name, mut ledger) in &mut ledgers {
        let dropped = ledger.age(clock.year, config.ledger_retention_years);
        if dropped > 0 {
            debug!("{} reconsiders {} connections in {}", name, dropped, clock.year);
        }
    }
}

/// Advance the automaton of every player whose turn has come.
#[allow(clippy::type_complexity)]
pub fn run_construction_steps(
    clock: Res<SimClock>,
    config: Res<AiConfig>,
    mut rng: ResMut<AiRng>,
    mut map: ResMut<GameMap>,
    economy: Res<NodeRegistry>,
    vehicles: Res<VehicleCatalog>,
    mut fleet: ResMut<FleetRegistry>,
    mut players: Query<(
        Entity,
        &AiPlayer,
        &Name,
        &mut ConstructionState,
        &mut Treasury,
        &mut ForbiddenConnections,
        &mut AttemptSlot,
        &mut AiSchedule,
        &mut PlayerStats,
    )>,
    mut announcements: MessageWriter<AiAnnouncement>,
) {
    let mut world = AiWorld {
        map: map.as_mut(),
        economy: economy.as_ref(),
        vehicles: vehicles.as_ref(),
        fleet: fleet.as_mut(),
    };
    let mut ctx = StepContext {
        config: &config,
        year: clock.year,
        ticks_per_month: clock.ticks_per_month,
        rng: &mut rng.0,
        announcements: Vec::new(),
    };

    for (entity, player, name, mut state, mut treasury, mut ledger, mut slot, mut schedule, mut stats) in
        &mut players
    {
        if !schedule.is_due(clock.tick) {
            continue;
        }
        schedule.next_step_tick = clock.tick + config.step_interval.max(1);

        let mut player_state = PlayerState {
            entity,
            name: name.as_str(),
            kind: player.kind,
            treasury: &mut treasury,
            ledger: &mut ledger,
            attempt: &mut slot,
            schedule: &mut schedule,
            stats: &mut stats,
        };
        let next = step(*state, &mut player_state, &mut world, &mut ctx);
        if *state != next {
            *state = next;
        }
    }

    announcements.write_batch(ctx.announcements);
}
