use bevy::prelude::*;
use moonshine_kind::Instance;
use moonshine_save::prelude::Save;
use serde::{Deserialize, Serialize};

use crate::ai::ledger::ForbiddenConnections;
use crate::ai::plan::AttemptSlot;
use crate::ai::state::{AiSchedule, ConstructionState, PlayerStats};
use crate::economy::treasury::Treasury;

/// Which connections an AI player builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum AiKind {
    /// Supplies factories with their input goods.
    #[default]
    Freight,
    /// Links cities with each other and with attractions.
    Passenger,
}

/// Marks a player entity driven by the construction automaton.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[require(
    Save,
    Name,
    Treasury,
    ConstructionState,
    ForbiddenConnections,
    AttemptSlot,
    AiSchedule,
    PlayerStats
)]
#[serde(default)]
pub struct AiPlayer {
    pub kind: AiKind,
}

impl AiPlayer {
    pub fn freight() -> Self {
        Self {
            kind: AiKind::Freight,
        }
    }

    pub fn passenger() -> Self {
        Self {
            kind: AiKind::Passenger,
        }
    }
}

/// Type-safe reference to an AI player entity.
pub type PlayerInstance = Instance<AiPlayer>;
