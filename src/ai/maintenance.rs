//! Retirement of idle and loss-making convoys and teardown of dead lines.

use bevy::prelude::*;

use crate::ai::config::AiConfig;
use crate::economy::treasury::Treasury;
use crate::fleet::{Convoy, ConvoyId, LineId};
use crate::map::tile_pos::TilePos;
use crate::services::{AiWorld, FleetService, WorldMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetiredConvoy {
    pub convoy: ConvoyId,
    pub line_name: String,
    pub refund: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub retired: Vec<RetiredConvoy>,
    /// Names of lines removed together with their infrastructure.
    pub removed_lines: Vec<String>,
}

/// Carried nothing for `months` months of service and earned nothing.
fn is_idle(convoy: &Convoy, months: u32) -> bool {
    convoy.age_months >= months
        && convoy.profit_in(months) <= 0
        && convoy.transported_in(months) == 0
}

/// Losing more than it is worth while the owner is in debt.
fn is_ruinous(convoy: &Convoy, net_worth: i64) -> bool {
    let profit = convoy.trailing_profit();
    profit < 0 && convoy.resale_value() < -profit && net_worth < 0
}

/// Delete `line` and every way and station tile no other line uses.
pub fn tear_down_line(
    line: LineId,
    owner: Entity,
    map: &mut dyn WorldMap,
    fleet: &mut dyn FleetService,
) -> Option<String> {
    let infrastructure = fleet.line(line)?.infrastructure.clone();
    let exclusive = |tiles: &[TilePos]| -> Vec<TilePos> {
        tiles
            .iter()
            .copied()
            .filter(|&pos| !fleet.infrastructure_shared(pos, line))
            .collect()
    };
    let stations = exclusive(infrastructure.stations.as_slice());
    let ways = exclusive(infrastructure.ways.as_slice());

    let removed_stations = stations
        .iter()
        .filter(|&&pos| map.remove_station(pos, owner))
        .count();
    let removed_ways = map.remove(&ways, owner);
    let levelled: Vec<(TilePos, i8)> = infrastructure
        .levelled
        .iter()
        .copied()
        .filter(|&(pos, _)| !fleet.infrastructure_shared(pos, line))
        .collect();
    map.restore_heights(&levelled);
    let removed = fleet.delete_line(line)?;
    info!(
        "Closed line {} ({} station tiles, {} way tiles removed)",
        removed.name, removed_stations, removed_ways
    );
    Some(removed.name)
}

/// Sell convoys that no longer pay off and close lines left without any.
pub fn review_fleet(
    owner: Entity,
    world: &mut AiWorld,
    treasury: &mut Treasury,
    config: &AiConfig,
) -> MaintenanceReport {
    let mut report = MaintenanceReport::default();
    let months = config.retire_after_months;

    for id in world.fleet.convoys_of(owner) {
        let net_worth = treasury.net_worth(world.fleet.fleet_value(owner));
        let Some(convoy) = world.fleet.convoy(id) else {
            continue;
        };
        if !is_idle(convoy, months) && !is_ruinous(convoy, net_worth) {
            continue;
        }
        let line = convoy.line;
        let line_name = world
            .fleet
            .line(line)
            .map(|l| l.name.clone())
            .unwrap_or_default();
        let Some(refund) = world.fleet.self_destruct(id) else {
            continue;
        };
        treasury.add(refund);
        info!("Retired convoy {:?} of {} for {}", id, line_name, refund);
        report.retired.push(RetiredConvoy {
            convoy: id,
            line_name,
            refund,
        });
    }

    for line in world.fleet.lines_of(owner) {
        let empty = world
            .fleet
            .line(line)
            .is_some_and(|l| l.convoys.is_empty());
        if !empty {
            continue;
        }
        if let Some(name) = tear_down_line(line, owner, world.map, world.fleet) {
            report.removed_lines.push(name);
        }
    }

    report
}
