//! Way, station and fleet construction for a planned connection.

use bevy::prelude::*;

use crate::ai::config::AiConfig;
use crate::ai::error::{ConstructionFailure, PlanningError, RouteError};
use crate::ai::plan::{ConstructionAttempt, FeederPlan, ModeEstimate, PlannedSite, SitePair, Target};
use crate::ai::provision::{FleetOrder, provision_fleet};
use crate::ai::state::TransportMode;
use crate::constants::FEEDER_CONVOYS;
use crate::economy::nodes::NodeId;
use crate::economy::treasury::Treasury;
use crate::fleet::{Infrastructure, LineId, Schedule};
use crate::map::tile_pos::TilePos;
use crate::map::ways::{WayKind, WayTypeId};
use crate::services::{AiWorld, FleetService, PlannedRoute, RouteRequest, TerrainQuery, WayBuilder, WorldMap};

/// Ways of finding a route, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStrategy {
    /// Bridges and tunnels allowed, terrain left as is.
    Plain,
    /// May level steep slopes.
    Terraform,
}

pub const ROUTE_STRATEGIES: [RouteStrategy; 2] = [RouteStrategy::Plain, RouteStrategy::Terraform];

impl RouteStrategy {
    pub fn plan<B: WayBuilder + ?Sized>(
        self,
        request: &RouteRequest,
        builder: &B,
    ) -> Result<PlannedRoute, RouteError> {
        let request = RouteRequest {
            allow_terraform: self == RouteStrategy::Terraform,
            ..request.clone()
        };
        builder.plan_route(&request)
    }

    /// Whether `route` may be built. A terraformed route must beat the plain
    /// candidate, if there is one, on weighted length.
    pub fn accept(
        self,
        route: &PlannedRoute,
        plain: Option<&PlannedRoute>,
        budget: i64,
        terraform_weight: u32,
    ) -> Result<(), RouteError> {
        if route.cost > budget {
            return Err(RouteError::OverBudget {
                cost: route.cost,
                budget,
            });
        }
        if self == RouteStrategy::Terraform
            && plain.is_some_and(|p| {
                route.weighted_len(terraform_weight) >= p.weighted_len(terraform_weight)
            })
        {
            return Err(RouteError::NotShorter);
        }
        Ok(())
    }
}

/// Add the station footprints to a route so their tiles get way too.
fn with_footprints<M: WayBuilder + TerrainQuery + ?Sized>(
    mut route: PlannedRoute,
    footprints: &[&[TilePos]],
    map: &M,
) -> PlannedRoute {
    let cost_per_tile = route
        .way
        .and_then(|id| map.way_type(id))
        .map_or(0, |w| w.cost_per_tile);
    for &pos in footprints.iter().flat_map(|f| f.iter()) {
        if route.tiles.contains(&pos) {
            continue;
        }
        route.tiles.push(pos);
        if map.tile(pos).is_some_and(|t| t.way.is_none()) {
            route.cost += cost_per_tile;
            route.new_tiles += 1;
        }
    }
    route
}

/// First route of [`ROUTE_STRATEGIES`] that is accepted.
pub fn choose_route<M: WayBuilder + TerrainQuery + ?Sized>(
    request: &RouteRequest,
    map: &M,
    budget: i64,
    terraform_weight: u32,
) -> Result<PlannedRoute, RouteError> {
    let footprints = [request.start.as_slice(), request.end.as_slice()];
    let mut plain = None;
    let mut last_err = RouteError::NoPath(request.kind);

    for strategy in ROUTE_STRATEGIES {
        let route = match strategy.plan(request, map) {
            Ok(route) => with_footprints(route, &footprints, map),
            Err(err) => {
                debug!("{:?} route strategy failed: {}", strategy, err);
                last_err = err;
                continue;
            }
        };
        match strategy.accept(&route, plain.as_ref(), budget, terraform_weight) {
            Ok(()) => return Ok(route),
            Err(err) => {
                debug!("{:?} route rejected: {}", strategy, err);
                last_err = err;
                if strategy == RouteStrategy::Plain {
                    plain = Some(route);
                }
            }
        }
    }
    Err(last_err)
}

/// Money a player may put into one connection.
pub fn spending_limit(treasury: &Treasury, fleet: &dyn FleetService, owner: Entity) -> i64 {
    treasury
        .cash()
        .min(treasury.net_worth(fleet.fleet_value(owner)))
}

fn site_cost(site: &PlannedSite) -> i64 {
    if site.reused {
        0
    } else {
        site.kind.build_cost() * site.footprint.len() as i64
    }
}

fn sites_cost(sites: &SitePair) -> i64 {
    sites.all().map(site_cost).sum()
}

/// Infrastructure of one connection while it is being built.
struct Works<'a> {
    owner: Entity,
    /// New construction, removed again if the attempt fails.
    built: &'a mut Infrastructure,
    /// Everything the line will use, including reused way and stations.
    used: Infrastructure,
    /// Money left for way after all planned stations are paid for.
    remaining: i64,
}

impl Works<'_> {
    #[allow(clippy::too_many_arguments)]
    fn lay_way(
        &mut self,
        from: &[TilePos],
        to: &[TilePos],
        kind: WayKind,
        way: Option<WayTypeId>,
        map: &mut dyn WorldMap,
        treasury: &mut Treasury,
        config: &AiConfig,
    ) -> Result<Infrastructure, ConstructionFailure> {
        let request = RouteRequest {
            start: from.to_vec(),
            end: to.to_vec(),
            kind,
            way,
            allow_terraform: false,
            owner: self.owner,
        };
        let route = choose_route(&request, &*map, self.remaining, config.terraform_length_weight)?;
        let committed = map.commit(&route, self.owner)?;
        treasury.subtract(committed.cost);
        self.remaining -= committed.cost;
        self.built.ways.extend(committed.built);
        self.built.levelled.extend(committed.levelled.iter().copied());
        let segment = Infrastructure {
            ways: route.tiles,
            stations: Vec::new(),
            levelled: committed.levelled,
        };
        self.used.extend(segment.clone());
        Ok(segment)
    }

    fn build_station(
        &mut self,
        site: &mut PlannedSite,
        map: &mut dyn WorldMap,
        treasury: &mut Treasury,
    ) -> Result<(), ConstructionFailure> {
        self.used.stations.extend(site.footprint.iter().copied());
        if site.reused {
            return Ok(());
        }
        for &pos in &site.footprint {
            treasury.try_spend(site.kind.build_cost())?;
            if !map.build_station(pos, site.kind, self.owner) {
                treasury.add(site.kind.build_cost());
                return Err(PlanningError::StationRefused {
                    at: pos,
                    kind: site.kind.name(),
                }
                .into());
            }
            self.built.stations.push(pos);
        }
        if let Some(reservation) = site.reservation.take() {
            map.release(reservation);
        }
        Ok(())
    }
}

/// What a building step achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Someone served the connection in the meantime; nothing was built.
    AlreadyConnected,
    Opened { line: LineId, convoys: usize },
}

/// Check that the attempt still makes sense in the current world.
fn revalidate(
    attempt: &ConstructionAttempt,
    owner: Entity,
    world: &AiWorld,
) -> Result<bool, PlanningError> {
    for node in [attempt.target.start, attempt.target.end] {
        if world.economy.node(node).is_none() {
            return Err(PlanningError::NodeVanished(node));
        }
    }
    if world.fleet.is_connected(&attempt.target.key) {
        return Ok(false);
    }
    let sites = attempt.sites.as_ref().ok_or(PlanningError::NoViableMode)?;
    for site in sites.all() {
        let held = match site.reservation {
            Some(reservation) => world.map.has_reservation(reservation),
            None if site.reused => world
                .map
                .tile(site.anchor())
                .and_then(|t| t.station)
                .is_some_and(|s| s.owner == owner && s.kind == site.kind),
            None => true,
        };
        if !held {
            return Err(PlanningError::SiteLost(site.anchor()));
        }
    }
    Ok(true)
}

fn node_name(world: &AiWorld, id: NodeId) -> String {
    world
        .economy
        .node(id)
        .map_or_else(|| format!("#{}", id.0), |n| n.name.clone())
}

/// Build the chosen mode's infrastructure and open the line.
///
/// On failure everything built so far stays listed in `attempt.built` for
/// cleanup. On success it is handed to the new line.
pub fn build_connection(
    attempt: &mut ConstructionAttempt,
    owner: Entity,
    treasury: &mut Treasury,
    world: &mut AiWorld,
    config: &AiConfig,
) -> Result<BuildOutcome, ConstructionFailure> {
    if !revalidate(attempt, owner, world)? {
        return Ok(BuildOutcome::AlreadyConnected);
    }

    let ConstructionAttempt {
        target,
        estimate,
        sites,
        built,
        line,
        ..
    } = attempt;
    let estimate = estimate.as_ref().ok_or(PlanningError::NoViableMode)?;
    let sites = sites.as_mut().ok_or(PlanningError::NoViableMode)?;
    let passengers = world
        .economy
        .good(target.good)
        .is_some_and(|g| g.is_passengers());

    let mut works = Works {
        owner,
        built,
        used: Infrastructure::default(),
        remaining: spending_limit(treasury, &*world.fleet, owner) - sites_cost(sites),
    };

    let mut feeders = Vec::new();
    match estimate.mode {
        TransportMode::Rail | TransportMode::Road => {
            works.lay_way(
                &sites.start.footprint,
                &sites.end.footprint,
                estimate.mode.way_kind(),
                estimate.way,
                world.map,
                treasury,
                config,
            )?;
            works.build_station(&mut sites.start, world.map, treasury)?;
            works.build_station(&mut sites.end, world.map, treasury)?;
        }
        TransportMode::Water => {
            works.build_station(&mut sites.start, world.map, treasury)?;
            works.build_station(&mut sites.end, world.map, treasury)?;
            let sea_route = RouteRequest {
                start: sites.start.footprint.clone(),
                end: sites.end.footprint.clone(),
                kind: WayKind::Water,
                way: None,
                allow_terraform: false,
                owner,
            };
            world
                .map
                .plan_route(&sea_route)
                .map_err(|_| PlanningError::WaterUnreachable)?;
            feeders = build_feeders(&mut sites.feeders, estimate, &mut works, world, treasury, config)?;
        }
        TransportMode::Air => {
            works.build_station(&mut sites.start, world.map, treasury)?;
            works.build_station(&mut sites.end, world.map, treasury)?;
        }
    }

    let name = format!("{} - {}", node_name(world, target.start), node_name(world, target.end));
    let report = provision_fleet(
        FleetOrder {
            name: name.clone(),
            key: Some(target.key),
            mode: estimate.mode,
            schedule: Schedule::shuttle(
                sites.start.anchor(),
                sites.end.anchor(),
                config.min_load(passengers),
            ),
            infrastructure: works.used,
            consist: estimate.consist(),
            convoys: estimate.convoys,
        },
        owner,
        world.vehicles,
        world.fleet,
        treasury,
    )?;
    let mut convoys = report.convoys.len();

    for (feeder, infrastructure) in feeders {
        match open_feeder(target, &feeder, estimate, infrastructure, passengers, owner, &name, world, treasury, config) {
            Ok(count) => convoys += count,
            Err(err) => warn!("Feeder for {} not opened: {}", name, err),
        }
    }

    *line = Some(report.line);
    *works.built = Infrastructure::default();
    Ok(BuildOutcome::Opened {
        line: report.line,
        convoys,
    })
}

/// Roads and stops between inland nodes and their harbours.
#[allow(clippy::too_many_arguments)]
fn build_feeders(
    feeders: &mut [FeederPlan],
    estimate: &ModeEstimate,
    works: &mut Works,
    world: &mut AiWorld,
    treasury: &mut Treasury,
    config: &AiConfig,
) -> Result<Vec<(FeederPlan, Infrastructure)>, ConstructionFailure> {
    let Some(stock) = estimate.feeder else {
        return Ok(Vec::new());
    };
    let mut opened = Vec::new();
    for feeder in feeders.iter_mut() {
        let spent_before = treasury.cash();
        let mut infrastructure = works.lay_way(
            &feeder.node_stop.footprint,
            &feeder.harbour_stop.footprint,
            WayKind::Road,
            Some(stock.way),
            world.map,
            treasury,
            config,
        )?;
        works.build_station(&mut feeder.node_stop, world.map, treasury)?;
        works.build_station(&mut feeder.harbour_stop, world.map, treasury)?;
        debug!(
            "Feeder road of {} tiles to harbour near {} cost {}",
            infrastructure.ways.len(),
            feeder.harbour_stop.anchor(),
            spent_before - treasury.cash()
        );
        infrastructure.stations.extend(
            feeder
                .node_stop
                .footprint
                .iter()
                .chain(&feeder.harbour_stop.footprint)
                .copied(),
        );
        opened.push((feeder.clone(), infrastructure));
    }
    Ok(opened)
}

#[allow(clippy::too_many_arguments)]
fn open_feeder(
    target: &Target,
    feeder: &FeederPlan,
    estimate: &ModeEstimate,
    infrastructure: Infrastructure,
    passengers: bool,
    owner: Entity,
    name: &str,
    world: &mut AiWorld,
    treasury: &mut Treasury,
    config: &AiConfig,
) -> Result<usize, ConstructionFailure> {
    let stock = estimate.feeder.ok_or(PlanningError::NoViableMode)?;
    let node = feeder.node_stop.anchor();
    let harbour = feeder.harbour_stop.anchor();
    // Goods travel start -> end, so the start feeder loads at the node.
    let schedule = if feeder.node_stop.node == target.start {
        Schedule::shuttle(node, harbour, config.min_load(passengers))
    } else {
        Schedule::shuttle(harbour, node, config.min_load(passengers))
    };
    let report = provision_fleet(
        FleetOrder {
            name: format!("{} (feeder {})", name, node_name(world, feeder.node_stop.node)),
            key: None,
            mode: TransportMode::Road,
            schedule,
            infrastructure,
            consist: vec![stock.vehicle],
            convoys: FEEDER_CONVOYS,
        },
        owner,
        world.vehicles,
        world.fleet,
        treasury,
    )?;
    Ok(report.convoys.len())
}

/// Undo the construction of a failed attempt.
pub fn remove_attempt_infrastructure(built: &mut Infrastructure, owner: Entity, map: &mut dyn WorldMap) {
    let stations = built
        .stations
        .iter()
        .filter(|&&pos| map.remove_station(pos, owner))
        .count();
    let ways = map.remove(&built.ways, owner);
    let restored = map.restore_heights(&built.levelled);
    if stations > 0 || ways > 0 || restored > 0 {
        debug!(
            "Removed {} station tiles and {} way tiles, restored {} heights",
            stations, ways, restored
        );
    }
    *built = Infrastructure::default();
}
