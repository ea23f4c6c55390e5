// Map-related modules
pub mod grid;
pub mod pathfinding;
pub mod reservation;
pub mod tile_pos;
pub mod ways;

// Re-exports for convenience
pub use grid::{GameMap, Ground, StationKind, StationTile, Tile};
pub use reservation::{ReservationId, ReservationTable};
pub use tile_pos::{TilePos, TileRect};
pub use ways::{WayKind, WayTile, WayType, WayTypeId};
