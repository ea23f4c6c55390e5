use core::fmt;

use bevy::prelude::*;
use moonshine_save::prelude::Save;
use serde::{Deserialize, Serialize};

use crate::map::grid::StationKind;
use crate::map::ways::WayKind;

/// Means of transport a connection is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum TransportMode {
    Rail,
    Road,
    Water,
    Air,
}

impl TransportMode {
    /// Evaluation order; earlier modes win ties.
    pub const PREFERENCE: [TransportMode; 4] = [
        TransportMode::Rail,
        TransportMode::Road,
        TransportMode::Water,
        TransportMode::Air,
    ];

    pub fn way_kind(self) -> WayKind {
        match self {
            TransportMode::Rail => WayKind::Rail,
            TransportMode::Road => WayKind::Road,
            TransportMode::Water => WayKind::Water,
            TransportMode::Air => WayKind::Air,
        }
    }

    pub fn station_kind(self, passengers: bool) -> StationKind {
        match self {
            TransportMode::Rail => StationKind::RailStation,
            TransportMode::Road if passengers => StationKind::BusStop,
            TransportMode::Road => StationKind::TruckStop,
            TransportMode::Water => StationKind::Harbour,
            TransportMode::Air => StationKind::Airport,
        }
    }

    /// Tiles a new station of this mode occupies.
    pub fn footprint_len(self) -> u32 {
        match self {
            TransportMode::Rail => 3,
            TransportMode::Air => 2,
            TransportMode::Road | TransportMode::Water => 1,
        }
    }

    /// Position in [`TransportMode::PREFERENCE`].
    pub fn rank(self) -> usize {
        match self {
            TransportMode::Rail => 0,
            TransportMode::Road => 1,
            TransportMode::Water => 2,
            TransportMode::Air => 3,
        }
    }

    /// State that builds this mode.
    pub fn building_state(self) -> ConstructionState {
        match self {
            TransportMode::Rail => ConstructionState::BuildingRailRoute,
            TransportMode::Road => ConstructionState::BuildingRoadRoute,
            TransportMode::Water => ConstructionState::BuildingWaterRoute,
            TransportMode::Air => ConstructionState::BuildingAirRoute,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportMode::Rail => "rail",
            TransportMode::Road => "road",
            TransportMode::Water => "ship",
            TransportMode::Air => "air",
        };
        f.write_str(label)
    }
}

/// Where a player's construction automaton stands.
#[derive(
    Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize,
)]
#[reflect(Component)]
#[require(Save)]
pub enum ConstructionState {
    #[default]
    Idle,
    SelectingTarget,
    EvaluatingModes,
    BuildingRailRoute,
    BuildingRoadRoute,
    BuildingWaterRoute,
    BuildingAirRoute,
    CleaningUpFailedAttempt,
    ConstructionSucceeded(TransportMode),
    ReviewingFleet,
}

impl ConstructionState {
    /// Mode being built, for the four building states.
    pub fn building_mode(self) -> Option<TransportMode> {
        match self {
            ConstructionState::BuildingRailRoute => Some(TransportMode::Rail),
            ConstructionState::BuildingRoadRoute => Some(TransportMode::Road),
            ConstructionState::BuildingWaterRoute => Some(TransportMode::Water),
            ConstructionState::BuildingAirRoute => Some(TransportMode::Air),
            _ => None,
        }
    }

    /// States a cycle ends in.
    pub fn is_resting(self) -> bool {
        matches!(
            self,
            ConstructionState::Idle
                | ConstructionState::ReviewingFleet
                | ConstructionState::CleaningUpFailedAttempt
        )
    }
}

/// Which kind of destination the passenger AI looks for next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub enum PassengerFocus {
    #[default]
    CityPairs,
    Attractions,
}

impl PassengerFocus {
    pub fn toggled(self) -> Self {
        match self {
            PassengerFocus::CityPairs => PassengerFocus::Attractions,
            PassengerFocus::Attractions => PassengerFocus::CityPairs,
        }
    }
}

/// Per-player step gating.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[require(Save)]
#[serde(default)]
pub struct AiSchedule {
    /// First tick at which the next construction step may run.
    pub next_step_tick: u64,
    pub passenger_focus: PassengerFocus,
}

impl AiSchedule {
    pub fn is_due(&self, tick: u64) -> bool {
        tick >= self.next_step_tick
    }
}

/// Lifetime counters of one AI player.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[require(Save)]
#[serde(default)]
pub struct PlayerStats {
    pub connections_built: u32,
    pub attempts_failed: u32,
    pub convoys_retired: u32,
    pub lines_removed: u32,
    pub steps: u64,
}
