use bevy::prelude::*;
use moonshine_save::prelude::Save;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::LEDGER_CAPACITY;
use crate::economy::nodes::{ConnectionKey, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct ForbiddenEntry {
    pub key: ConnectionKey,
    /// Year the key was recorded.
    pub year: u32,
}

/// Connections this player found impossible to build.
///
/// The selector never proposes a key that is listed here. Entries leave the
/// ledger only through aging, node deletion, or eviction when the ledger is
/// full (oldest first).
#[derive(Component, Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[require(Save)]
#[serde(default)]
pub struct ForbiddenConnections {
    entries: Vec<ForbiddenEntry>,
    #[serde(deserialize_with = "at_least_one")]
    capacity: usize,
}

fn at_least_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(usize::deserialize(deserializer)?.max(1))
}

impl Default for ForbiddenConnections {
    fn default() -> Self {
        Self::with_capacity(LEDGER_CAPACITY)
    }
}

impl ForbiddenConnections {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record `key`. Returns false if it was already listed.
    pub fn push(&mut self, key: ConnectionKey, year: u32) -> bool {
        if self.contains(&key) {
            return false;
        }
        // A reflected load may carry a zero capacity; one entry always fits.
        let excess = (self.entries.len() + 1).saturating_sub(self.capacity.max(1));
        for evicted in self.entries.drain(..excess) {
            debug!("Ledger full, forgetting {:?}", evicted.key);
        }
        self.entries.push(ForbiddenEntry { key, year });
        true
    }

    pub fn contains(&self, key: &ConnectionKey) -> bool {
        self.entries.iter().any(|e| e.key == *key)
    }

    /// Drop every entry mentioning `node`.
    pub fn purge_node(&mut self, node: NodeId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.key.involves(node));
        before - self.entries.len()
    }

    /// Drop entries recorded more than `retention_years` before `current_year`.
    pub fn age(&mut self, current_year: u32, retention_years: u32) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| current_year.saturating_sub(e.year) <= retention_years);
        before - self.entries.len()
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        let excess = self.entries.len().saturating_sub(self.capacity);
        self.entries.drain(..excess);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForbiddenEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
