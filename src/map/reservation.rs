use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::map::tile_pos::{TilePos, TileRect};

/// Opaque identifier for a reservation
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Reflect, Serialize, Deserialize)]
pub struct ReservationId(u32);

/// Internal data for a reservation
#[derive(Debug, Clone, Copy)]
struct ReservationData {
    rect: TileRect,
    owner: Entity,
}

/// Exclusive claims on rectangular tile regions.
///
/// A claim keeps other planners from choosing an overlapping building site
/// until it is released. Claims never overlap.
#[derive(Debug, Default)]
pub struct ReservationTable {
    next_id: u32,
    reservations: BTreeMap<ReservationId, ReservationData>,
}

impl ReservationTable {
    /// Claim `rect` for `owner`. Fails if any part of it is already claimed,
    /// by anyone.
    pub fn try_reserve(&mut self, rect: TileRect, owner: Entity) -> Option<ReservationId> {
        if let Some((id, existing)) = self
            .reservations
            .iter()
            .find(|(_, data)| data.rect.overlaps(&rect))
        {
            debug!(
                "Reservation of {}..{} refused: overlaps {:?} held by {:?}",
                rect.min, rect.max, id, existing.owner
            );
            return None;
        }

        let id = ReservationId(self.next_id);
        self.next_id += 1;
        self.reservations
            .insert(id, ReservationData { rect, owner });
        Some(id)
    }

    /// Release a reservation. Returns false if it did not exist.
    pub fn release(&mut self, id: ReservationId) -> bool {
        self.reservations.remove(&id).is_some()
    }

    /// Drop every claim held by `owner`.
    pub fn release_all(&mut self, owner: Entity) -> usize {
        let before = self.reservations.len();
        self.reservations.retain(|_, data| data.owner != owner);
        before - self.reservations.len()
    }

    pub fn contains(&self, id: ReservationId) -> bool {
        self.reservations.contains_key(&id)
    }

    pub fn rect(&self, id: ReservationId) -> Option<TileRect> {
        self.reservations.get(&id).map(|data| data.rect)
    }

    /// Owner of the claim covering `pos`, if any.
    pub fn owner_at(&self, pos: TilePos) -> Option<Entity> {
        self.reservations
            .values()
            .find(|data| data.rect.contains(pos))
            .map(|data| data.owner)
    }

    /// Get count of active reservations (for debugging/UI)
    pub fn count(&self) -> usize {
        self.reservations.len()
    }

    pub fn count_for(&self, owner: Entity) -> usize {
        self.reservations
            .values()
            .filter(|data| data.owner == owner)
            .count()
    }
}
