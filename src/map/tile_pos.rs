use bevy::prelude::*;
use hexx::Hex;
use serde::{Deserialize, Serialize};

/// Axial tile coordinate on the hex map.
///
/// Stored as plain integers so it can be reflected and serialized; geometry is
/// delegated to [`hexx`] through [`TilePos::to_hex`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_hex(self) -> Hex {
        Hex::new(self.x, self.y)
    }

    pub fn from_hex(hex: Hex) -> Self {
        Self { x: hex.x, y: hex.y }
    }

    /// Hex distance in tiles.
    pub fn distance_to(self, other: TilePos) -> u32 {
        self.to_hex().distance_to(other.to_hex()).unsigned_abs()
    }

    pub fn neighbors(self) -> impl Iterator<Item = TilePos> {
        self.to_hex().all_neighbors().into_iter().map(TilePos::from_hex)
    }

    pub fn is_adjacent(self, other: TilePos) -> bool {
        self.distance_to(other) == 1
    }

    /// Tiles exactly `radius` steps away. Radius 0 yields the tile itself.
    pub fn ring(self, radius: u32) -> Vec<TilePos> {
        if radius == 0 {
            return vec![self];
        }
        self.to_hex().ring(radius).map(TilePos::from_hex).collect()
    }

    /// Straight line of `len` tiles starting here and heading in `direction`
    /// (an index into the six hex neighbours).
    pub fn line(self, direction: usize, len: u32) -> Vec<TilePos> {
        let step = Hex::ZERO.all_neighbors()[direction % 6];
        (0..len as i32)
            .map(|k| TilePos::from_hex(self.to_hex() + step * k))
            .collect()
    }
}

impl core::fmt::Display for TilePos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned (in axial coordinates) rectangle of tiles, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub struct TileRect {
    pub min: TilePos,
    pub max: TilePos,
}

impl TileRect {
    /// Smallest rectangle covering all `tiles`. Returns `None` for an empty slice.
    pub fn covering(tiles: &[TilePos]) -> Option<Self> {
        let first = tiles.first()?;
        let mut rect = TileRect {
            min: *first,
            max: *first,
        };
        for tile in &tiles[1..] {
            rect.min.x = rect.min.x.min(tile.x);
            rect.min.y = rect.min.y.min(tile.y);
            rect.max.x = rect.max.x.max(tile.x);
            rect.max.y = rect.max.y.max(tile.y);
        }
        Some(rect)
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    pub fn overlaps(&self, other: &TileRect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        (self.min.x..=self.max.x)
            .flat_map(move |x| (self.min.y..=self.max.y).map(move |y| TilePos::new(x, y)))
    }
}
