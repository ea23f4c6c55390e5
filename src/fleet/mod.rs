//! Lines, convoys and their operating statistics.

use std::collections::{BTreeMap, VecDeque};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::error::{FleetError, ResourceError};
use crate::ai::state::TransportMode;
use crate::constants::{CONVOY_HANDLE_SPACE, DEFAULT_MAX_CONVOYS, STATS_HISTORY_MONTHS};
use crate::economy::nodes::ConnectionKey;
use crate::map::tile_pos::TilePos;
use crate::services::FleetService;
use crate::vehicles::VehicleTypeId;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct LineId(pub u32);

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct ConvoyId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub pos: TilePos,
    /// Convoys wait here until this share of capacity is loaded.
    pub min_load_percent: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct Schedule {
    pub entries: Vec<ScheduleEntry>,
}

impl Schedule {
    /// Shuttle between two stops, waiting for `min_load_percent` at the first.
    pub fn shuttle(loading: TilePos, unloading: TilePos, min_load_percent: u8) -> Self {
        Self {
            entries: vec![
                ScheduleEntry {
                    pos: loading,
                    min_load_percent,
                },
                ScheduleEntry {
                    pos: unloading,
                    min_load_percent: 0,
                },
            ],
        }
    }
}

/// Ways and stations built for one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct Infrastructure {
    pub ways: Vec<TilePos>,
    pub stations: Vec<TilePos>,
    /// Tiles levelled for the ways, with their original height.
    pub levelled: Vec<(TilePos, i8)>,
}

impl Infrastructure {
    pub fn is_empty(&self) -> bool {
        self.ways.is_empty() && self.stations.is_empty() && self.levelled.is_empty()
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        self.ways.contains(&pos) || self.stations.contains(&pos)
    }

    pub fn extend(&mut self, other: Infrastructure) {
        self.ways.extend(other.ways);
        self.stations.extend(other.stations);
        self.levelled.extend(other.levelled);
    }
}

/// Everything needed to register a line.
#[derive(Debug, Clone)]
pub struct NewLine {
    pub owner: Entity,
    pub name: String,
    /// `None` for feeder lines that serve a connection only indirectly.
    pub key: Option<ConnectionKey>,
    pub mode: TransportMode,
    pub schedule: Schedule,
    pub infrastructure: Infrastructure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub id: LineId,
    pub owner: Entity,
    pub name: String,
    pub key: Option<ConnectionKey>,
    pub mode: TransportMode,
    pub schedule: Schedule,
    pub infrastructure: Infrastructure,
    pub convoys: Vec<ConvoyId>,
}

/// Runtime trouble reported by vehicle movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvoyProblem {
    /// The convoy cannot reach its next stop.
    NoRoute,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthStats {
    pub profit: i64,
    pub transported: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convoy {
    pub id: ConvoyId,
    pub owner: Entity,
    pub line: LineId,
    pub vehicles: Vec<VehicleTypeId>,
    /// Purchase price of all vehicles.
    pub price: i64,
    pub age_months: u32,
    pub running: bool,
    pub problem: Option<ConvoyProblem>,
    /// Monthly figures, oldest first.
    history: VecDeque<MonthStats>,
}

impl Convoy {
    pub fn record_month(&mut self, profit: i64, transported: u32) {
        self.history.push_back(MonthStats {
            profit,
            transported,
        });
        while self.history.len() > STATS_HISTORY_MONTHS {
            self.history.pop_front();
        }
        self.age_months += 1;
    }

    pub fn history(&self) -> impl Iterator<Item = &MonthStats> {
        self.history.iter()
    }

    /// Profit over the whole recorded history.
    pub fn trailing_profit(&self) -> i64 {
        self.history.iter().map(|m| m.profit).sum()
    }

    /// Profit of the last `months` months.
    pub fn profit_in(&self, months: u32) -> i64 {
        self.history
            .iter()
            .rev()
            .take(months as usize)
            .map(|m| m.profit)
            .sum()
    }

    /// Units carried in the last `months` months.
    pub fn transported_in(&self, months: u32) -> u32 {
        self.history
            .iter()
            .rev()
            .take(months as usize)
            .map(|m| m.transported)
            .sum()
    }

    /// Resale value after depreciation (linear, floored at 20%).
    pub fn resale_value(&self) -> i64 {
        let depreciation = (self.price * i64::from(self.age_months.min(48))) / 60;
        (self.price - depreciation).max(self.price / 5)
    }
}

/// All lines and convoys of every player.
#[derive(Resource, Debug)]
pub struct FleetRegistry {
    lines: BTreeMap<LineId, Line>,
    convoys: BTreeMap<ConvoyId, Convoy>,
    next_line: u32,
    max_convoys: u32,
    handle_space: u32,
}

impl Default for FleetRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONVOYS, CONVOY_HANDLE_SPACE)
    }
}

impl FleetRegistry {
    pub fn new(max_convoys: u32, handle_space: u32) -> Self {
        Self {
            lines: BTreeMap::new(),
            convoys: BTreeMap::new(),
            next_line: 0,
            max_convoys,
            handle_space,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.values()
    }

    pub fn convoys(&self) -> impl Iterator<Item = &Convoy> {
        self.convoys.values()
    }

    /// Feed one month of operating results into a convoy.
    pub fn record_month(&mut self, convoy: ConvoyId, profit: i64, transported: u32) -> bool {
        match self.convoys.get_mut(&convoy) {
            Some(c) => {
                c.record_month(profit, transported);
                true
            }
            None => false,
        }
    }

    pub fn report_problem(&mut self, convoy: ConvoyId, problem: ConvoyProblem) -> bool {
        match self.convoys.get_mut(&convoy) {
            Some(c) => {
                c.problem = Some(problem);
                true
            }
            None => false,
        }
    }

    /// Lowest free handle below the handle space.
    fn free_handle(&self) -> Option<ConvoyId> {
        let mut candidate = 0;
        for id in self.convoys.keys() {
            if id.0 != candidate {
                break;
            }
            candidate += 1;
        }
        (candidate < self.handle_space).then_some(ConvoyId(candidate))
    }
}

impl FleetService for FleetRegistry {
    fn is_connected(&self, key: &ConnectionKey) -> bool {
        self.lines.values().any(|line| line.key.as_ref() == Some(key))
    }

    fn convoy_count(&self) -> u32 {
        self.convoys.len() as u32
    }

    fn max_convoys(&self) -> u32 {
        self.max_convoys
    }

    fn convoy_handle_space(&self) -> u32 {
        self.handle_space
    }

    fn create_line(&mut self, line: NewLine) -> LineId {
        let id = LineId(self.next_line);
        self.next_line += 1;
        self.lines.insert(
            id,
            Line {
                id,
                owner: line.owner,
                name: line.name,
                key: line.key,
                mode: line.mode,
                schedule: line.schedule,
                infrastructure: line.infrastructure,
                convoys: Vec::new(),
            },
        );
        id
    }

    fn create_convoy(
        &mut self,
        owner: Entity,
        line: LineId,
        vehicles: Vec<VehicleTypeId>,
        value: i64,
    ) -> Result<ConvoyId, FleetError> {
        if vehicles.is_empty() {
            return Err(FleetError::EmptyConsist);
        }
        if !self.lines.contains_key(&line) {
            return Err(FleetError::UnknownLine(line));
        }
        if self.convoy_count() >= self.max_convoys {
            return Err(ResourceError::ConvoyCeiling(self.max_convoys).into());
        }
        let id = self
            .free_handle()
            .ok_or(ResourceError::HandleSpaceExhausted)?;

        self.convoys.insert(
            id,
            Convoy {
                id,
                owner,
                line,
                vehicles,
                price: value,
                age_months: 0,
                running: false,
                problem: None,
                history: VecDeque::new(),
            },
        );
        if let Some(l) = self.lines.get_mut(&line) {
            l.convoys.push(id);
        }
        Ok(id)
    }

    fn start_convoy(&mut self, convoy: ConvoyId) -> bool {
        match self.convoys.get_mut(&convoy) {
            Some(c) => {
                c.running = true;
                true
            }
            None => false,
        }
    }

    fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.get(&id)
    }

    fn convoy(&self, id: ConvoyId) -> Option<&Convoy> {
        self.convoys.get(&id)
    }

    fn lines_of(&self, owner: Entity) -> Vec<LineId> {
        self.lines
            .values()
            .filter(|l| l.owner == owner)
            .map(|l| l.id)
            .collect()
    }

    fn convoys_of(&self, owner: Entity) -> Vec<ConvoyId> {
        self.convoys
            .values()
            .filter(|c| c.owner == owner)
            .map(|c| c.id)
            .collect()
    }

    fn self_destruct(&mut self, convoy: ConvoyId) -> Option<i64> {
        let removed = self.convoys.remove(&convoy)?;
        if let Some(line) = self.lines.get_mut(&removed.line) {
            line.convoys.retain(|c| *c != convoy);
        }
        Some(removed.resale_value())
    }

    fn delete_line(&mut self, line: LineId) -> Option<Line> {
        let removed = self.lines.remove(&line)?;
        for convoy in &removed.convoys {
            self.convoys.remove(convoy);
        }
        Some(removed)
    }

    fn infrastructure_shared(&self, pos: TilePos, except: LineId) -> bool {
        self.lines
            .values()
            .any(|line| line.id != except && line.infrastructure.contains(pos))
    }

    fn fleet_value(&self, owner: Entity) -> i64 {
        self.convoys
            .values()
            .filter(|c| c.owner == owner)
            .map(Convoy::resale_value)
            .sum()
    }

    fn problem_convoys(&self, owner: Entity) -> Vec<(ConvoyId, ConvoyProblem)> {
        self.convoys
            .values()
            .filter(|c| c.owner == owner)
            .filter_map(|c| c.problem.map(|p| (c.id, p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::goods::GoodId;
    use crate::economy::nodes::NodeId;

    fn new_line(owner: Entity, key: Option<ConnectionKey>) -> NewLine {
        NewLine {
            owner,
            name: "Test Line".into(),
            key,
            mode: TransportMode::Road,
            schedule: Schedule::shuttle(TilePos::new(0, 0), TilePos::new(5, 0), 100),
            infrastructure: Infrastructure {
                ways: vec![TilePos::new(1, 0), TilePos::new(2, 0)],
                stations: vec![TilePos::new(0, 0)],
                ..default()
            },
        }
    }

    #[test]
    fn convoy_ceiling_is_enforced() {
        let mut world = World::new();
        let owner = world.spawn_empty().id();
        let mut fleet = FleetRegistry::new(2, 100);
        let line = fleet.create_line(new_line(owner, None));

        fleet.create_convoy(owner, line, vec![VehicleTypeId(0)], 10).unwrap();
        fleet.create_convoy(owner, line, vec![VehicleTypeId(0)], 10).unwrap();
        assert_eq!(
            fleet.create_convoy(owner, line, vec![VehicleTypeId(0)], 10),
            Err(FleetError::Resource(ResourceError::ConvoyCeiling(2)))
        );
        assert_eq!(
            fleet.create_convoy(owner, LineId(9), vec![VehicleTypeId(0)], 10),
            Err(FleetError::UnknownLine(LineId(9)))
        );
    }

    #[test]
    fn handles_are_bounded_and_recycled() {
        let mut world = World::new();
        let owner = world.spawn_empty().id();
        let mut fleet = FleetRegistry::new(10, 2);
        let line = fleet.create_line(new_line(owner, None));

        let first = fleet.create_convoy(owner, line, vec![VehicleTypeId(0)], 1).unwrap();
        fleet.create_convoy(owner, line, vec![VehicleTypeId(0)], 1).unwrap();
        assert_eq!(
            fleet.create_convoy(owner, line, vec![VehicleTypeId(0)], 1),
            Err(FleetError::Resource(ResourceError::HandleSpaceExhausted))
        );

        assert!(fleet.self_destruct(first).is_some());
        assert_eq!(
            fleet.create_convoy(owner, line, vec![VehicleTypeId(0)], 1),
            Ok(first)
        );
    }

    #[test]
    fn statistics_and_depreciation() {
        let mut world = World::new();
        let owner = world.spawn_empty().id();
        let mut fleet = FleetRegistry::default();
        let line = fleet.create_line(new_line(owner, None));
        let id = fleet.create_convoy(owner, line, vec![VehicleTypeId(0)], 6_000).unwrap();

        for month in 0..14 {
            fleet.record_month(id, -10, if month < 8 { 5 } else { 0 });
        }
        let convoy = fleet.convoy(id).unwrap();
        assert_eq!(convoy.history().count(), STATS_HISTORY_MONTHS);
        assert_eq!(convoy.trailing_profit(), -120);
        assert_eq!(convoy.transported_in(6), 0);
        assert_eq!(convoy.transported_in(7), 5);
        assert_eq!(convoy.resale_value(), 6_000 - 1_400);
    }

    #[test]
    fn shared_infrastructure_and_connections() {
        let mut world = World::new();
        let owner = world.spawn_empty().id();
        let key = ConnectionKey::new(NodeId(1), NodeId(2), GoodId(0));
        let mut fleet = FleetRegistry::default();
        let first = fleet.create_line(new_line(owner, Some(key)));
        let second = fleet.create_line(new_line(owner, None));

        assert!(fleet.is_connected(&key));
        assert!(fleet.infrastructure_shared(TilePos::new(1, 0), first));
        assert!(!fleet.infrastructure_shared(TilePos::new(9, 9), first));

        fleet.delete_line(second);
        assert!(!fleet.infrastructure_shared(TilePos::new(1, 0), first));
        fleet.delete_line(first);
        assert!(!fleet.is_connected(&key));
    }
}
