//! Tuning constants for the simulation clock and the AI construction automaton.
//!
//! These are heuristics: they keep fleets and search effort bounded and
//! plausible. Runtime-adjustable copies live in [`crate::ai::AiConfig`].

// ============================================================================
// CLOCK
// ============================================================================

/// Simulation ticks in one game month.
pub const TICKS_PER_MONTH: u32 = 64;

pub const MONTHS_PER_YEAR: u32 = 12;

pub const START_YEAR: u32 = 1930;

/// Size of the map created when none is supplied.
pub const DEFAULT_MAP_WIDTH: i32 = 64;
pub const DEFAULT_MAP_HEIGHT: i32 = 64;

// ============================================================================
// SCHEDULING
// ============================================================================

/// Ticks between two construction steps of the same AI player.
pub const DEFAULT_STEP_INTERVAL_TICKS: u64 = 8;

/// Cash an AI player keeps in reserve before starting new construction.
pub const MIN_CONSTRUCTION_FUNDS: i64 = 20_000;

pub const RNG_BASE_SEED: u64 = 0x7A_1C_00_42;

// ============================================================================
// LEDGER
// ============================================================================

/// Upper bound on remembered infeasible connections per player.
pub const LEDGER_CAPACITY: usize = 64;

/// Entries older than this many years are dropped at the turn of the year.
pub const LEDGER_RETENTION_YEARS: u32 = 2;

// ============================================================================
// TARGET SELECTION
// ============================================================================

/// Recursion limit when walking a factory's supply tree.
pub const SUPPLY_TREE_DEPTH: u32 = 4;

/// Weight of a consumer with exactly one missing link.
pub const NEED_WEIGHT_SCALE: u32 = 64;

/// Passenger volume per month is `min(population) / PASSENGER_DIVISOR`.
pub const PASSENGER_DIVISOR: u32 = 8;

pub const MAX_PASSENGER_DISTANCE: u32 = 60;

/// Air service is only evaluated above this distance.
pub const MIN_AIR_DISTANCE: u32 = 40;

// ============================================================================
// MODE EVALUATION
// ============================================================================

pub const MIN_RAIL_CARS: u32 = 3;

/// Longest train the AI assembles (odd: locomotive plus balanced cars).
pub const MAX_RAIL_CARS: u32 = 21;

pub const MAX_CONVOYS_PER_LINE: u32 = 6;
pub const MAX_ROAD_VEHICLES: u32 = 12;
pub const MAX_SHIPS: u32 = 4;
pub const MAX_AIRCRAFT: u32 = 4;

/// Ticks a vehicle needs for one tile at 100 km/h.
pub const TICKS_PER_TILE_AT_100KMH: u64 = 2;

/// Ticks spent loading and unloading per round trip.
pub const LOADING_TICKS: u64 = 16;

/// Locomotive power (kW) needed per tonne of train weight.
pub const POWER_PER_TONNE: u32 = 3;

/// Speed at which the income speed factor is 100%.
pub const REFERENCE_SPEED_KMH: u32 = 100;

// ============================================================================
// SITES & ROUTES
// ============================================================================

/// Search radius around an endpoint for a new station site.
pub const MAX_SITE_RADIUS: u32 = 4;

/// An owned station this close to an endpoint is reused.
pub const STATION_REUSE_RADIUS: u32 = 3;

/// Inland endpoints this close to a shore get a feeder road.
pub const FEEDER_RADIUS: u32 = 6;

/// Trucks or buses bought for each feeder shuttle.
pub const FEEDER_CONVOYS: u32 = 2;

/// Each terraformed tile counts as this many tiles of route length.
pub const TERRAFORM_LENGTH_WEIGHT: u32 = 3;

pub const TERRAFORM_COST_PER_STEP: i64 = 800;
pub const BRIDGE_COST_FACTOR: i64 = 4;
pub const TUNNEL_COST_FACTOR: i64 = 6;

/// Hard cap on expanded nodes per route search.
pub const MAX_ROUTE_SEARCH_NODES: usize = 40_000;

// ============================================================================
// FLEET
// ============================================================================

/// Global ceiling of simultaneously existing convoys.
pub const DEFAULT_MAX_CONVOYS: u32 = 512;

/// Number of addressable convoy handles.
pub const CONVOY_HANDLE_SPACE: u32 = u16::MAX as u32;

pub const FREIGHT_MIN_LOAD_PERCENT: u8 = 100;
pub const PASSENGER_MIN_LOAD_PERCENT: u8 = 30;

/// Months of trailing statistics kept per convoy.
pub const STATS_HISTORY_MONTHS: usize = 12;

/// A convoy that carried nothing for this many months while losing money is retired.
pub const DEFAULT_RETIRE_AFTER_MONTHS: u32 = 6;

pub const ANNOUNCEMENT_LOG_CAPACITY: usize = 100;
