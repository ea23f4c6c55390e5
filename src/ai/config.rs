use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_RETIRE_AFTER_MONTHS, DEFAULT_STEP_INTERVAL_TICKS, FREIGHT_MIN_LOAD_PERCENT,
    LEDGER_CAPACITY, LEDGER_RETENTION_YEARS, MAX_PASSENGER_DISTANCE, MIN_AIR_DISTANCE,
    MIN_CONSTRUCTION_FUNDS, PASSENGER_MIN_LOAD_PERCENT, RNG_BASE_SEED, TERRAFORM_LENGTH_WEIGHT,
};

/// Tuning of the construction automaton.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct AiConfig {
    /// Ticks between two steps of the same player.
    pub step_interval: u64,
    pub ledger_capacity: usize,
    pub ledger_retention_years: u32,
    /// Cash a player keeps before starting new construction.
    pub min_construction_funds: i64,
    pub max_passenger_distance: u32,
    pub min_air_distance: u32,
    pub retire_after_months: u32,
    pub freight_min_load: u8,
    pub passenger_min_load: u8,
    pub terraform_length_weight: u32,
    pub seed: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            step_interval: DEFAULT_STEP_INTERVAL_TICKS,
            ledger_capacity: LEDGER_CAPACITY,
            ledger_retention_years: LEDGER_RETENTION_YEARS,
            min_construction_funds: MIN_CONSTRUCTION_FUNDS,
            max_passenger_distance: MAX_PASSENGER_DISTANCE,
            min_air_distance: MIN_AIR_DISTANCE,
            retire_after_months: DEFAULT_RETIRE_AFTER_MONTHS,
            freight_min_load: FREIGHT_MIN_LOAD_PERCENT,
            passenger_min_load: PASSENGER_MIN_LOAD_PERCENT,
            terraform_length_weight: TERRAFORM_LENGTH_WEIGHT,
            seed: RNG_BASE_SEED,
        }
    }
}

impl AiConfig {
    pub fn min_load(&self, passengers: bool) -> u8 {
        if passengers {
            self.passenger_min_load
        } else {
            self.freight_min_load
        }
    }
}

/// Random source of all AI decisions. Seeded, so runs are replayable.
#[derive(Resource, Debug, Clone)]
pub struct AiRng(pub StdRng);

impl AiRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl FromWorld for AiRng {
    fn from_world(world: &mut World) -> Self {
        let seed = world
            .get_resource::<AiConfig>()
            .map(|c| c.seed)
            .unwrap_or(RNG_BASE_SEED);
        Self::seeded(seed)
    }
}
