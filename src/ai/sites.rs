//! Station site search and reservation.

use bevy::prelude::*;

use crate::ai::error::PlanningError;
use crate::ai::plan::{FeederPlan, ModeEstimate, PlannedSite, SitePair, Target};
use crate::ai::state::TransportMode;
use crate::constants::{FEEDER_RADIUS, MAX_SITE_RADIUS, STATION_REUSE_RADIUS};
use crate::economy::nodes::{EconomicNode, NodeId, NodeKind};
use crate::map::grid::StationKind;
use crate::map::tile_pos::{TilePos, TileRect};
use crate::map::ways::WayKind;
use crate::services::{AiWorld, EconomyRegistry, RouteRequest, TerrainQuery, WorldMap};

/// How an endpoint can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    InlandFactory,
    WatersideFactory,
    City,
    Attraction,
}

pub fn classify<M: TerrainQuery + ?Sized>(node: &EconomicNode, map: &M) -> EndpointClass {
    match node.kind {
        NodeKind::City { .. } => EndpointClass::City,
        NodeKind::Attraction { .. } => EndpointClass::Attraction,
        NodeKind::Factory { .. } => {
            if nearest_shore(map, node.pos, MAX_SITE_RADIUS).is_some() {
                EndpointClass::WatersideFactory
            } else {
                EndpointClass::InlandFactory
            }
        }
    }
}

/// Closest free shoreline tile within `radius` of `center`.
pub fn nearest_shore<M: TerrainQuery + ?Sized>(
    map: &M,
    center: TilePos,
    radius: u32,
) -> Option<TilePos> {
    (0..=radius).find_map(|r| {
        center.ring(r).into_iter().find(|&pos| {
            map.is_shore(pos)
                && map.reservation_owner(pos).is_none()
                && map
                    .tile(pos)
                    .is_some_and(|t| t.is_clear() && t.way.is_none())
        })
    })
}

/// A station site to look for.
#[derive(Debug, Clone, Copy)]
pub struct SiteRequest {
    pub node: NodeId,
    pub center: TilePos,
    pub kind: StationKind,
    pub footprint_len: u32,
    pub radius: u32,
    pub owner: Entity,
}

fn footprint_is_legal<M: TerrainQuery + ?Sized>(
    map: &M,
    footprint: &[TilePos],
    kind: StationKind,
    owner: Entity,
) -> bool {
    let Some(base) = footprint.first().and_then(|p| map.tile(*p)).map(|t| t.height) else {
        return false;
    };
    footprint.iter().all(|&pos| {
        let Some(tile) = map.tile(pos) else {
            return false;
        };
        let way_ok = match kind.required_way() {
            Some(way_kind) => tile.way.is_none_or(|w| w.usable_by(way_kind, owner)),
            None => tile.way.is_none(),
        };
        tile.is_clear()
            && tile.height == base
            && way_ok
            && map.reservation_owner(pos).is_none()
            && (kind != StationKind::Harbour || map.is_shore(pos))
    })
}

/// Whether the footprint touches way its vehicles can use.
fn adjoins_way<M: TerrainQuery + ?Sized>(
    map: &M,
    footprint: &[TilePos],
    kind: StationKind,
    owner: Entity,
) -> bool {
    let access = kind.required_way().unwrap_or(WayKind::Road);
    footprint
        .iter()
        .flat_map(|&pos| std::iter::once(pos).chain(pos.neighbors()))
        .any(|pos| {
            map.tile(pos)
                .and_then(|t| t.way)
                .is_some_and(|w| w.usable_by(access, owner))
        })
}

/// Find, or reuse, a station site and reserve it.
pub fn plan_site(request: &SiteRequest, map: &mut dyn WorldMap) -> Result<PlannedSite, PlanningError> {
    let reusable = map.stations_near(
        request.center,
        STATION_REUSE_RADIUS.min(request.radius),
        request.kind,
        request.owner,
    );
    if let Some(&pos) = reusable.first() {
        debug!("Reusing {} at {} for {:?}", request.kind.name(), pos, request.node);
        return Ok(PlannedSite {
            node: request.node,
            kind: request.kind,
            footprint: vec![pos],
            reservation: None,
            reused: true,
        });
    }

    let directions = if request.footprint_len > 1 { 6 } else { 1 };
    let mut candidates = Vec::new();
    for radius in 1..=request.radius {
        for anchor in request.center.ring(radius) {
            for direction in 0..directions {
                let footprint = anchor.line(direction, request.footprint_len.max(1));
                if !footprint_is_legal(&*map, &footprint, request.kind, request.owner) {
                    continue;
                }
                let detached = !adjoins_way(&*map, &footprint, request.kind, request.owner);
                candidates.push(((detached, radius, anchor, direction), footprint));
            }
        }
    }
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    for (_, footprint) in candidates {
        let Some(rect) = TileRect::covering(&footprint) else {
            continue;
        };
        if let Some(reservation) = map.reserve(rect, request.owner) {
            return Ok(PlannedSite {
                node: request.node,
                kind: request.kind,
                footprint,
                reservation: Some(reservation),
                reused: false,
            });
        }
    }

    Err(PlanningError::NoSite(request.node))
}

/// Drop every claim held by `sites`.
pub fn release_sites<'a>(map: &mut dyn WorldMap, sites: impl IntoIterator<Item = &'a mut PlannedSite>) {
    for site in sites {
        if let Some(reservation) = site.reservation.take() {
            map.release(reservation);
        }
    }
}

fn node_of<'a>(economy: &'a dyn EconomyRegistry, id: NodeId) -> Result<&'a EconomicNode, PlanningError> {
    economy.node(id).ok_or(PlanningError::NodeVanished(id))
}

/// Plan and reserve the stations for `estimate`.
pub fn plan_sites(
    target: &Target,
    estimate: &ModeEstimate,
    owner: Entity,
    world: &mut AiWorld,
) -> Result<SitePair, PlanningError> {
    let start = node_of(world.economy, target.start)?;
    let end = node_of(world.economy, target.end)?;
    let passengers = world
        .economy
        .good(target.good)
        .is_some_and(|g| g.is_passengers());

    if estimate.mode == TransportMode::Water {
        return plan_water_sites(start, end, estimate, passengers, owner, world);
    }

    let kind = estimate.mode.station_kind(passengers);
    let request = |node: &EconomicNode| SiteRequest {
        node: node.id,
        center: node.pos,
        kind,
        footprint_len: estimate.mode.footprint_len(),
        radius: MAX_SITE_RADIUS,
        owner,
    };

    let mut first = plan_site(&request(start), world.map)?;
    match plan_site(&request(end), world.map) {
        Ok(second) => Ok(SitePair {
            start: first,
            end: second,
            feeders: Vec::new(),
        }),
        Err(err) => {
            release_sites(world.map, [&mut first]);
            Err(err)
        }
    }
}

/// Harbour for `node`, plus a road feeder when the shore is too far away.
/// Every reserved site is also pushed to `claimed`.
fn plan_harbour(
    node: &EconomicNode,
    estimate: &ModeEstimate,
    passengers: bool,
    owner: Entity,
    map: &mut dyn WorldMap,
    claimed: &mut Vec<PlannedSite>,
) -> Result<(PlannedSite, Option<FeederPlan>), PlanningError> {
    let harbour = |radius| SiteRequest {
        node: node.id,
        center: node.pos,
        kind: StationKind::Harbour,
        footprint_len: 1,
        radius,
        owner,
    };
    let class = classify(node, &*map);
    if class != EndpointClass::InlandFactory {
        if let Ok(site) = plan_site(&harbour(MAX_SITE_RADIUS), map) {
            claimed.push(site.clone());
            return Ok((site, None));
        }
    }
    if estimate.feeder.is_none() {
        return Err(PlanningError::NoSite(node.id));
    }
    debug!("{:?} {} needs a feeder to the shore", class, node.name);

    let site = plan_site(&harbour(FEEDER_RADIUS), map)?;
    claimed.push(site.clone());
    let stop_kind = TransportMode::Road.station_kind(passengers);
    let node_stop = plan_site(
        &SiteRequest {
            node: node.id,
            center: node.pos,
            kind: stop_kind,
            footprint_len: 1,
            radius: MAX_SITE_RADIUS,
            owner,
        },
        map,
    )?;
    claimed.push(node_stop.clone());
    let harbour_stop = plan_site(
        &SiteRequest {
            node: node.id,
            center: site.anchor(),
            kind: stop_kind,
            footprint_len: 1,
            radius: 2,
            owner,
        },
        map,
    )?;
    claimed.push(harbour_stop.clone());

    Ok((
        site,
        Some(FeederPlan {
            node_stop,
            harbour_stop,
        }),
    ))
}

fn try_plan_water_sites(
    start: &EconomicNode,
    end: &EconomicNode,
    estimate: &ModeEstimate,
    passengers: bool,
    owner: Entity,
    map: &mut dyn WorldMap,
    claimed: &mut Vec<PlannedSite>,
) -> Result<SitePair, PlanningError> {
    let (first, first_feeder) = plan_harbour(start, estimate, passengers, owner, map, claimed)?;
    let (second, second_feeder) = plan_harbour(end, estimate, passengers, owner, map, claimed)?;

    // Probe only; nothing is built on water.
    let probe = RouteRequest {
        start: first.footprint.clone(),
        end: second.footprint.clone(),
        kind: WayKind::Water,
        way: None,
        allow_terraform: false,
        owner,
    };
    map.plan_route(&probe)
        .map_err(|_| PlanningError::WaterUnreachable)?;

    Ok(SitePair {
        start: first,
        end: second,
        feeders: first_feeder.into_iter().chain(second_feeder).collect(),
    })
}

fn plan_water_sites(
    start: &EconomicNode,
    end: &EconomicNode,
    estimate: &ModeEstimate,
    passengers: bool,
    owner: Entity,
    world: &mut AiWorld,
) -> Result<SitePair, PlanningError> {
    let mut claimed = Vec::new();
    let result = try_plan_water_sites(
        start,
        end,
        estimate,
        passengers,
        owner,
        world.map,
        &mut claimed,
    );
    if result.is_err() {
        release_sites(world.map, claimed.iter_mut());
    }
    result
}
