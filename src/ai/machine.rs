//! The construction automaton: one handler per [`ConstructionState`].
//!
//! Every handler does a bounded amount of work and returns the next state,
//! so a step never blocks the simulation and a save taken between steps
//! always finds the player in a well-defined state.

use bevy::prelude::*;
use rand::rngs::StdRng;

use crate::ai::config::AiConfig;
use crate::ai::error::{ConstructionFailure, FailureClass, PlanningError};
use crate::ai::evaluator::{EvaluationView, evaluate_modes};
use crate::ai::ledger::ForbiddenConnections;
use crate::ai::maintenance::review_fleet;
use crate::ai::markers::AiKind;
use crate::ai::plan::{AttemptSlot, ConstructionAttempt};
use crate::ai::route::{BuildOutcome, build_connection, remove_attempt_infrastructure};
use crate::ai::selector::{SelectionView, select_target};
use crate::ai::sites::{plan_sites, release_sites};
use crate::ai::state::{AiSchedule, ConstructionState, PlayerStats};
use crate::economy::treasury::Treasury;
use crate::messages::{AiAnnouncement, MessageCategory};
use crate::services::{AiWorld, WorldMap};

/// Mutable view of one player's components for a single step.
pub struct PlayerState<'a> {
    pub entity: Entity,
    pub name: &'a str,
    pub kind: AiKind,
    pub treasury: &'a mut Treasury,
    pub ledger: &'a mut ForbiddenConnections,
    pub attempt: &'a mut AttemptSlot,
    pub schedule: &'a mut AiSchedule,
    pub stats: &'a mut PlayerStats,
}

/// Shared inputs of a step plus the news it produced.
pub struct StepContext<'a> {
    pub config: &'a AiConfig,
    pub year: u32,
    pub ticks_per_month: u32,
    pub rng: &'a mut StdRng,
    pub announcements: Vec<AiAnnouncement>,
}

pub type Handler = fn(&mut PlayerState, &mut AiWorld, &mut StepContext) -> ConstructionState;

pub fn handler_for(state: ConstructionState) -> Handler {
    match state {
        ConstructionState::Idle => idle,
        ConstructionState::SelectingTarget => select,
        ConstructionState::EvaluatingModes => evaluate,
        ConstructionState::BuildingRailRoute
        | ConstructionState::BuildingRoadRoute
        | ConstructionState::BuildingWaterRoute
        | ConstructionState::BuildingAirRoute => build,
        ConstructionState::CleaningUpFailedAttempt => clean_up,
        ConstructionState::ConstructionSucceeded(_) => announce_success,
        ConstructionState::ReviewingFleet => review,
    }
}

/// Run the handler of `state` once.
pub fn step(
    state: ConstructionState,
    player: &mut PlayerState,
    world: &mut AiWorld,
    ctx: &mut StepContext,
) -> ConstructionState {
    let next = handler_for(state)(player, world, ctx);
    player.stats.steps += 1;
    if next != state {
        debug!("{}: {:?} -> {:?}", player.name, state, next);
    }
    next
}

/// Release the claims of an unfinished attempt and remove what it built.
/// The connection is not blacklisted.
pub fn abandon_attempt(slot: &mut AttemptSlot, owner: Entity, map: &mut dyn WorldMap) -> Option<ConstructionAttempt> {
    let mut attempt = slot.clear()?;
    if let Some(sites) = attempt.sites.as_mut() {
        release_sites(map, sites.all_mut());
    }
    remove_attempt_infrastructure(&mut attempt.built, owner, map);
    Some(attempt)
}

fn idle(player: &mut PlayerState, world: &mut AiWorld, ctx: &mut StepContext) -> ConstructionState {
    if player.attempt.get().is_some() {
        // Left over from an interrupted cycle.
        abandon_attempt(player.attempt, player.entity, world.map);
    }
    if player.treasury.cash() < ctx.config.min_construction_funds {
        debug!(
            "{} keeps its {} in reserve",
            player.name,
            player.treasury.cash()
        );
        return ConstructionState::ReviewingFleet;
    }
    ConstructionState::SelectingTarget
}

fn select(player: &mut PlayerState, world: &mut AiWorld, ctx: &mut StepContext) -> ConstructionState {
    let view = SelectionView {
        economy: world.economy,
        fleet: &*world.fleet,
        ledger: &*player.ledger,
    };
    let target = select_target(
        player.kind,
        &mut player.schedule.passenger_focus,
        &view,
        &mut *ctx.rng,
        ctx.config,
    );
    match target {
        Some(target) => {
            debug!("{} considers {:?}", player.name, target.key);
            player.attempt.0 = Some(ConstructionAttempt::new(target));
            ConstructionState::EvaluatingModes
        }
        None => ConstructionState::ReviewingFleet,
    }
}

fn evaluate(player: &mut PlayerState, world: &mut AiWorld, ctx: &mut StepContext) -> ConstructionState {
    let Some(attempt) = player.attempt.0.as_mut() else {
        return ConstructionState::Idle;
    };
    let view = EvaluationView {
        map: &*world.map,
        economy: world.economy,
        vehicles: world.vehicles,
        fleet: &*world.fleet,
        ticks_per_month: ctx.ticks_per_month,
    };
    let report = evaluate_modes(&attempt.target, &view, ctx.config);
    let Some(best) = report.best().cloned() else {
        info!(
            "{} found no viable transport for {:?}",
            player.name, attempt.target.key
        );
        player.ledger.push(attempt.target.key, ctx.year);
        player.stats.attempts_failed += 1;
        player.attempt.clear();
        return ConstructionState::Idle;
    };

    let sites = plan_sites(&attempt.target, &best, player.entity, world);
    let mode = best.mode;
    attempt.estimate = Some(best);
    match sites {
        Ok(sites) => {
            attempt.sites = Some(sites);
            mode.building_state()
        }
        Err(err) => {
            warn!("{} cannot place {} stations: {}", player.name, mode, err);
            attempt.blacklist = !matches!(err, PlanningError::NodeVanished(_));
            ConstructionState::CleaningUpFailedAttempt
        }
    }
}

fn build(player: &mut PlayerState, world: &mut AiWorld, ctx: &mut StepContext) -> ConstructionState {
    let Some(attempt) = player.attempt.0.as_mut() else {
        return ConstructionState::Idle;
    };
    let Some(mode) = attempt.mode() else {
        return ConstructionState::CleaningUpFailedAttempt;
    };

    match build_connection(attempt, player.entity, player.treasury, world, ctx.config) {
        Ok(BuildOutcome::AlreadyConnected) => {
            debug!("{:?} got connected meanwhile", attempt.target.key);
            abandon_attempt(player.attempt, player.entity, world.map);
            ConstructionState::Idle
        }
        Ok(BuildOutcome::Opened { convoys, .. }) => {
            info!(
                "{} opened {} service with {} convoys",
                player.name, mode, convoys
            );
            player.stats.connections_built += 1;
            ConstructionState::ConstructionSucceeded(mode)
        }
        Err(err) => {
            warn!("{} failed to build {} route: {}", player.name, mode, err);
            attempt.blacklist = err.class() == FailureClass::Infeasible
                && !matches!(
                    err,
                    ConstructionFailure::Planning(PlanningError::NodeVanished(_))
                );
            ConstructionState::CleaningUpFailedAttempt
        }
    }
}

fn clean_up(player: &mut PlayerState, world: &mut AiWorld, ctx: &mut StepContext) -> ConstructionState {
    if let Some(attempt) = abandon_attempt(player.attempt, player.entity, world.map) {
        player.stats.attempts_failed += 1;
        if attempt.blacklist && player.ledger.push(attempt.target.key, ctx.year) {
            info!(
                "{} gives up on {:?} for now",
                player.name, attempt.target.key
            );
        }
    }
    match player.kind {
        AiKind::Freight => ConstructionState::Idle,
        AiKind::Passenger => ConstructionState::ReviewingFleet,
    }
}

fn announce_success(
    player: &mut PlayerState,
    world: &mut AiWorld,
    ctx: &mut StepContext,
) -> ConstructionState {
    let Some(attempt) = player.attempt.clear() else {
        return ConstructionState::ReviewingFleet;
    };
    let node_name = |id| {
        world
            .economy
            .node(id)
            .map_or_else(|| "somewhere".to_string(), |n| n.name.clone())
    };
    let good = world
        .economy
        .good(attempt.target.good)
        .map_or_else(|| "goods".to_string(), |g| g.name.to_lowercase());
    let mode = attempt
        .mode()
        .map_or_else(|| "new".to_string(), |m| m.to_string());
    ctx.announcements.push(AiAnnouncement {
        player: player.entity,
        text: format!(
            "{} opened a {} connection carrying {} from {} to {}",
            player.name,
            mode,
            good,
            node_name(attempt.target.start),
            node_name(attempt.target.end)
        ),
        location: attempt.sites.as_ref().map(|s| s.start.anchor()),
        category: MessageCategory::Construction,
    });
    ConstructionState::ReviewingFleet
}

fn review(player: &mut PlayerState, world: &mut AiWorld, ctx: &mut StepContext) -> ConstructionState {
    let report = review_fleet(player.entity, world, player.treasury, ctx.config);
    player.stats.convoys_retired += report.retired.len() as u32;
    player.stats.lines_removed += report.removed_lines.len() as u32;

    if !report.retired.is_empty() {
        ctx.announcements.push(AiAnnouncement {
            player: player.entity,
            text: format!(
                "{} sold {} unprofitable vehicles",
                player.name,
                report.retired.len()
            ),
            location: None,
            category: MessageCategory::Retirement,
        });
    }
    for line in &report.removed_lines {
        ctx.announcements.push(AiAnnouncement {
            player: player.entity,
            text: format!("{} closed the line {}", player.name, line),
            location: None,
            category: MessageCategory::Retirement,
        });
    }
    ConstructionState::Idle
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::ai::state::TransportMode;
    use crate::economy::nodes::{ConnectionKey, NodeRegistry};
    use crate::fleet::FleetRegistry;
    use crate::map::grid::GameMap;
    use crate::map::tile_pos::TilePos;
    use crate::services::FleetService;
    use crate::test_utils::{coal_chain, road_map, truck_catalog};
    use crate::vehicles::VehicleCatalog;

    struct Fixture {
        map: GameMap,
        economy: NodeRegistry,
        vehicles: VehicleCatalog,
        fleet: FleetRegistry,
        owner: Entity,
        treasury: Treasury,
        ledger: ForbiddenConnections,
        attempt: AttemptSlot,
        schedule: AiSchedule,
        stats: PlayerStats,
        rng: StdRng,
        config: AiConfig,
    }

    impl Fixture {
        /// Coal mine and power station 10 tiles apart on flat land.
        fn new(cash: i64) -> Self {
            let mut world = World::new();
            let map = road_map(24, 12);
            let economy = coal_chain(TilePos::new(4, 6), TilePos::new(14, 6)).economy;
            let vehicles = truck_catalog();
            Self {
                map,
                economy,
                vehicles,
                fleet: FleetRegistry::default(),
                owner: world.spawn_empty().id(),
                treasury: Treasury::new(cash),
                ledger: ForbiddenConnections::default(),
                attempt: AttemptSlot::default(),
                schedule: AiSchedule::default(),
                stats: PlayerStats::default(),
                rng: StdRng::seed_from_u64(11),
                config: AiConfig::default(),
            }
        }

        fn run(&mut self, state: ConstructionState) -> (ConstructionState, Vec<AiAnnouncement>) {
            let mut player = PlayerState {
                entity: self.owner,
                name: "Test Freight Co",
                kind: AiKind::Freight,
                treasury: &mut self.treasury,
                ledger: &mut self.ledger,
                attempt: &mut self.attempt,
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
    }

    #[test]
    fn handlers_without_attempt_fall_back() {
        let expected = [
            (ConstructionState::EvaluatingModes, ConstructionState::Idle),
            (ConstructionState::BuildingRailRoute, ConstructionState::Idle),
            (ConstructionState::BuildingRoadRoute, ConstructionState::Idle),
            (ConstructionState::BuildingWaterRoute, ConstructionState::Idle),
            (ConstructionState::BuildingAirRoute, ConstructionState::Idle),
            (ConstructionState::CleaningUpFailedAttempt, ConstructionState::Idle),
            (
                ConstructionState::ConstructionSucceeded(TransportMode::Rail),
                ConstructionState::ReviewingFleet,
            ),
            (ConstructionState::ReviewingFleet, ConstructionState::Idle),
            (ConstructionState::Idle, ConstructionState::SelectingTarget),
        ];
        let mut fx = Fixture::new(500_000);
        for (state, next) in expected {
            assert_eq!(fx.run(state).0, next, "from {:?}", state);
        }
        assert_eq!(fx.stats.steps, expected.len() as u64);
        assert_eq!(fx.stats.attempts_failed, 0);
    }

    #[test]
    fn poor_player_only_reviews() {
        let mut fx = Fixture::new(1_000);
        let (next, _) = fx.run(ConstructionState::Idle);
        assert_eq!(next, ConstructionState::ReviewingFleet);
        let (next, _) = fx.run(next);
        assert_eq!(next, ConstructionState::Idle);
        assert!(fx.fleet.lines_of(fx.owner).is_empty());
    }

    #[test]
    fn full_cycle_builds_a_road_connection() {
        let mut fx = Fixture::new(500_000);
        let mut state = ConstructionState::Idle;
        let mut news = Vec::new();
        for _ in 0..6 {
            let (next, mut announcements) = fx.run(state);
            news.append(&mut announcements);
            state = next;
            if state == ConstructionState::ReviewingFleet {
                break;
            }
        }

        assert_eq!(state, ConstructionState::ReviewingFleet);
        assert_eq!(fx.stats.connections_built, 1);
        assert!(fx.attempt.get().is_none());
        let key = ConnectionKey::new(
            crate::economy::nodes::NodeId(0),
            crate::economy::nodes::NodeId(1),
            crate::economy::goods::GoodId(0),
        );
        assert!(fx.fleet.is_connected(&key));
        assert_eq!(news.len(), 1);
        assert!(news[0].text.contains("Coal Mine"));
        assert!(news[0].text.contains("Power Station"));
        assert!(news[0].text.contains("road"));
        assert!(fx.map.reservations.count() == 0);
    }

    #[test]
    fn failed_attempt_is_blacklisted_and_cleaned() {
        let mut fx = Fixture::new(500_000);
        let (state, _) = fx.run(ConstructionState::Idle);
        let (state, _) = fx.run(state);
        assert_eq!(state, ConstructionState::EvaluatingModes);
        let (state, _) = fx.run(state);
        assert_eq!(state, ConstructionState::BuildingRoadRoute);
        let key = fx.attempt.get().unwrap().target.key;

        // Too poor to pay for the road by now.
        fx.treasury = Treasury::new(500);
        let (state, _) = fx.run(state);
        assert_eq!(state, ConstructionState::CleaningUpFailedAttempt);
        let (state, _) = fx.run(state);
        assert_eq!(state, ConstructionState::Idle);

        assert!(fx.ledger.contains(&key));
        assert!(fx.attempt.get().is_none());
        assert!(fx.map.reservations.count() == 0);
        assert_eq!(fx.map.way_count(fx.owner), 0);
        assert_eq!(fx.map.station_count(fx.owner), 0);
        assert_eq!(fx.stats.attempts_failed, 1);
    }
}
