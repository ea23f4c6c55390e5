use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use bevy::prelude::*;

use crate::ai::error::RouteError;
use crate::constants::{
    BRIDGE_COST_FACTOR, MAX_ROUTE_SEARCH_NODES, TERRAFORM_COST_PER_STEP, TUNNEL_COST_FACTOR,
};
use crate::map::grid::{GameMap, Ground, Tile};
use crate::map::tile_pos::TilePos;
use crate::map::ways::{WayKind, WayType};
use crate::services::{PlannedRoute, RouteRequest, WayBuilder};

/// Search state of one tile: best known score and the height a way arriving
/// here would sit at.
#[derive(Debug, Clone, Copy)]
struct Visit {
    score: i64,
    height: i8,
    parent: Option<TilePos>,
    /// Money spent on this tile alone.
    build_cost: i64,
    terraform: Option<i8>,
}

/// Outcome of stepping onto a tile.
struct Step {
    build_cost: i64,
    height: i8,
    terraform: Option<i8>,
}

/// Plan a way for `request` over `map`.
///
/// Built ways (road, rail) are searched with A* from every start tile at once.
/// Water requests only check connectivity and build nothing; air needs no search.
pub fn plan_route(map: &GameMap, request: &RouteRequest) -> Result<PlannedRoute, RouteError> {
    if request.start.is_empty() || request.end.is_empty() {
        return Err(RouteError::EmptyEndpoints);
    }

    match request.kind {
        WayKind::Air => Ok(direct_route(request)),
        WayKind::Water => find_water_path(map, request),
        WayKind::Road | WayKind::Rail => {
            let way_id = request.way.ok_or(RouteError::NoWayType(request.kind))?;
            let way = map
                .way_type(way_id)
                .ok_or(RouteError::NoWayType(request.kind))?;
            find_way_path(map, request, way)
        }
    }
}

fn direct_route(request: &RouteRequest) -> PlannedRoute {
    let (from, to) = closest_pair(&request.start, &request.end);
    PlannedRoute {
        tiles: vec![from, to],
        kind: request.kind,
        way: None,
        cost: 0,
        new_tiles: 0,
        terraform: Vec::new(),
    }
}

fn closest_pair(start: &[TilePos], end: &[TilePos]) -> (TilePos, TilePos) {
    let mut best = (start[0], end[0]);
    for &a in start {
        for &b in end {
            if a.distance_to(b) < best.0.distance_to(best.1) {
                best = (a, b);
            }
        }
    }
    best
}

fn heuristic(pos: TilePos, goals: &[TilePos]) -> i64 {
    goals
        .iter()
        .map(|g| i64::from(pos.distance_to(*g)))
        .min()
        .unwrap_or(0)
}

fn find_water_path(map: &GameMap, request: &RouteRequest) -> Result<PlannedRoute, RouteError> {
    let goals: HashSet<TilePos> = request.end.iter().copied().collect();
    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<TilePos, Option<TilePos>> = HashMap::new();
    let mut cost_so_far: HashMap<TilePos, i64> = HashMap::new();

    for &start in &request.start {
        cost_so_far.insert(start, 0);
        came_from.insert(start, None);
        open.push(Reverse((heuristic(start, &request.end), start)));
    }

    let mut expanded = 0;
    while let Some(Reverse((_, current))) = open.pop() {
        if goals.contains(&current) {
            let tiles = reconstruct(&came_from, current);
            return Ok(PlannedRoute {
                tiles,
                kind: WayKind::Water,
                way: None,
                cost: 0,
                new_tiles: 0,
                terraform: Vec::new(),
            });
        }
        expanded += 1;
        if expanded > MAX_ROUTE_SEARCH_NODES {
            return Err(RouteError::SearchExhausted(expanded));
        }

        let current_cost = cost_so_far.get(&current).copied().unwrap_or(0);
        for neighbor in current.neighbors() {
            let Some(tile) = map.get(neighbor) else {
                continue;
            };
            if tile.ground != Ground::Water && !goals.contains(&neighbor) {
                continue;
            }
            let tentative = current_cost + 1;
            if cost_so_far.get(&neighbor).is_some_and(|&c| c <= tentative) {
                continue;
            }
            cost_so_far.insert(neighbor, tentative);
            came_from.insert(neighbor, Some(current));
            open.push(Reverse((tentative + heuristic(neighbor, &request.end), neighbor)));
        }
    }

    Err(RouteError::NoPath(WayKind::Water))
}

fn reconstruct(came_from: &HashMap<TilePos, Option<TilePos>>, goal: TilePos) -> Vec<TilePos> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(Some(parent)) = came_from.get(&current) {
        path.push(*parent);
        current = *parent;
    }
    path.reverse();
    path
}

/// Cost of putting way on `tile` when arriving at `height`, or `None` if
/// the tile cannot carry this way.
fn step_onto(
    tile: &Tile,
    pos: TilePos,
    height: i8,
    request: &RouteRequest,
    way: &WayType,
    map: &GameMap,
) -> Option<Step> {
    if tile.obstacle {
        return None;
    }
    if map
        .reservations
        .owner_at(pos)
        .is_some_and(|holder| holder != request.owner)
    {
        return None;
    }
    if let Some(station) = tile.station {
        if station.owner != request.owner || station.kind.required_way() != Some(request.kind) {
            return None;
        }
    }
    if let Some(existing) = tile.way {
        // Existing way is reused as is; foreign or crossing way blocks.
        return existing.usable_by(request.kind, request.owner).then_some(Step {
            build_cost: 0,
            height: tile.height,
            terraform: None,
        });
    }

    match tile.ground {
        Ground::Water => Some(Step {
            build_cost: way.cost_per_tile * BRIDGE_COST_FACTOR,
            height,
            terraform: None,
        }),
        Ground::Mountain => Some(Step {
            build_cost: way.cost_per_tile * TUNNEL_COST_FACTOR,
            height,
            terraform: None,
        }),
        Ground::Land => {
            let diff = (i16::from(tile.height) - i16::from(height)).unsigned_abs();
            if diff < 2 {
                return Some(Step {
                    build_cost: way.cost_per_tile,
                    height: tile.height,
                    terraform: None,
                });
            }
            if !request.allow_terraform {
                return None;
            }
            // Level the tile to one step from the previous height.
            let target = if tile.height > height {
                height.saturating_add(1)
            } else {
                height.saturating_sub(1)
            };
            Some(Step {
                build_cost: way.cost_per_tile + TERRAFORM_COST_PER_STEP * i64::from(diff - 1),
                height: target,
                terraform: Some(target),
            })
        }
    }
}

fn find_way_path(
    map: &GameMap,
    request: &RouteRequest,
    way: &WayType,
) -> Result<PlannedRoute, RouteError> {
    let goals: HashSet<TilePos> = request.end.iter().copied().collect();
    // Minimum cost of any tile.
    let step_weight = way.cost_per_tile.max(1);
    let mut open = BinaryHeap::new();
    let mut visits: HashMap<TilePos, Visit> = HashMap::new();
    let mut closed: HashSet<TilePos> = HashSet::new();

    for &start in &request.start {
        let Some(tile) = map.get(start) else {
            continue;
        };
        let Some(step) = step_onto(tile, start, tile.height, request, way, map) else {
            continue;
        };
        let visit = Visit {
            score: step.build_cost + step_weight,
            height: step.height,
            parent: None,
            build_cost: step.build_cost,
            terraform: step.terraform,
        };
        visits.insert(start, visit);
        let estimate = visit.score + heuristic(start, &request.end) * step_weight;
        open.push(Reverse((estimate, start)));
    }

    while let Some(Reverse((_, current))) = open.pop() {
        if !closed.insert(current) {
            continue;
        }
        if goals.contains(&current) {
            return Ok(build_plan(&visits, current, request));
        }
        if closed.len() > MAX_ROUTE_SEARCH_NODES {
            debug!(
                "{:?} route search gave up after {} tiles",
                request.kind,
                closed.len()
            );
            return Err(RouteError::SearchExhausted(closed.len()));
        }

        let Some(&here) = visits.get(&current) else {
            continue;
        };
        for neighbor in current.neighbors() {
            if closed.contains(&neighbor) {
                continue;
            }
            let Some(tile) = map.get(neighbor) else {
                continue;
            };
            let Some(step) = step_onto(tile, neighbor, here.height, request, way, map) else {
                continue;
            };
            let tentative = here.score + step.build_cost + step_weight;
            if visits
                .get(&neighbor)
                .is_some_and(|existing| existing.score <= tentative)
            {
                continue;
            }
            visits.insert(
                neighbor,
                Visit {
                    score: tentative,
                    height: step.height,
                    parent: Some(current),
                    build_cost: step.build_cost,
                    terraform: step.terraform,
                },
            );
            let estimate = tentative + heuristic(neighbor, &request.end) * step_weight;
            open.push(Reverse((estimate, neighbor)));
        }
    }

    Err(RouteError::NoPath(request.kind))
}

fn build_plan(visits: &HashMap<TilePos, Visit>, goal: TilePos, request: &RouteRequest) -> PlannedRoute {
    let mut tiles = Vec::new();
    let mut cost = 0;
    let mut new_tiles = 0;
    let mut terraform = Vec::new();
    let mut current = Some(goal);

    while let Some(pos) = current {
        let Some(visit) = visits.get(&pos) else {
            break;
        };
        tiles.push(pos);
        cost += visit.build_cost;
        if visit.build_cost > 0 {
            new_tiles += 1;
        }
        if let Some(height) = visit.terraform {
            terraform.push((pos, height));
        }
        current = visit.parent;
    }
    tiles.reverse();
    terraform.reverse();

    PlannedRoute {
        tiles,
        kind: request.kind,
        way: request.way,
        cost,
        new_tiles,
        terraform,
    }
}
