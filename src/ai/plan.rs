//! Data of one in-flight construction attempt.

use bevy::prelude::*;
use moonshine_save::prelude::Save;
use serde::{Deserialize, Serialize};

use crate::ai::state::TransportMode;
use crate::economy::goods::GoodId;
use crate::economy::nodes::{ConnectionKey, NodeId};
use crate::fleet::{Infrastructure, LineId};
use crate::map::grid::StationKind;
use crate::map::reservation::ReservationId;
use crate::map::tile_pos::TilePos;
use crate::map::ways::WayTypeId;
use crate::vehicles::VehicleTypeId;

/// A connection the selector wants built. Goods are loaded at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct Target {
    pub start: NodeId,
    pub end: NodeId,
    pub good: GoodId,
    pub key: ConnectionKey,
}

impl Target {
    pub fn new(start: NodeId, end: NodeId, good: GoodId) -> Self {
        Self {
            start,
            end,
            good,
            key: ConnectionKey::new(start, end, good),
        }
    }
}

/// Vehicles and way feeding an inland endpoint of a water connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct FeederStock {
    pub way: WayTypeId,
    pub vehicle: VehicleTypeId,
}

/// Result of evaluating one transport mode for a target.
#[derive(Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct ModeEstimate {
    pub mode: TransportMode,
    /// `None` for water and air.
    pub way: Option<WayTypeId>,
    /// Locomotive of rail convoys.
    pub engine: Option<VehicleTypeId>,
    pub carrier: VehicleTypeId,
    /// Carrier vehicles per convoy.
    pub carriers_per_convoy: u32,
    pub convoys: u32,
    pub speed_kmh: u32,
    /// Distance between the endpoints in tiles.
    pub distance: u32,
    pub monthly_volume: u32,
    pub monthly_income: i64,
    pub monthly_cost: i64,
    pub build_cost: i64,
    pub feeder: Option<FeederStock>,
}

impl ModeEstimate {
    pub fn monthly_profit(&self) -> i64 {
        self.monthly_income - self.monthly_cost
    }

    /// Vehicle types of one convoy, lead vehicle first.
    pub fn consist(&self) -> Vec<VehicleTypeId> {
        let mut consist: Vec<VehicleTypeId> = self.engine.into_iter().collect();
        consist.extend(std::iter::repeat_n(
            self.carrier,
            self.carriers_per_convoy as usize,
        ));
        consist
    }
}

/// A station position chosen for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct PlannedSite {
    pub node: NodeId,
    pub kind: StationKind,
    pub footprint: Vec<TilePos>,
    /// Claim on the footprint while the attempt runs. `None` once built or when reused.
    pub reservation: Option<ReservationId>,
    /// An existing station of this player is used as is.
    pub reused: bool,
}

impl PlannedSite {
    pub fn anchor(&self) -> TilePos {
        self.footprint.first().copied().unwrap_or_default()
    }
}

/// Road shuttle between an inland node and its harbour.
#[derive(Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct FeederPlan {
    pub node_stop: PlannedSite,
    pub harbour_stop: PlannedSite,
}

#[derive(Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct SitePair {
    pub start: PlannedSite,
    pub end: PlannedSite,
    pub feeders: Vec<FeederPlan>,
}

impl SitePair {
    pub fn all(&self) -> impl Iterator<Item = &PlannedSite> {
        [&self.start, &self.end].into_iter().chain(
            self.feeders
                .iter()
                .flat_map(|f| [&f.node_stop, &f.harbour_stop]),
        )
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut PlannedSite> {
        [&mut self.start, &mut self.end].into_iter().chain(
            self.feeders
                .iter_mut()
                .flat_map(|f| [&mut f.node_stop, &mut f.harbour_stop]),
        )
    }

    pub fn reservations(&self) -> Vec<ReservationId> {
        self.all().filter_map(|s| s.reservation).collect()
    }
}

/// Everything decided and built so far for the current target.
#[derive(Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct ConstructionAttempt {
    pub target: Target,
    #[serde(default)]
    pub estimate: Option<ModeEstimate>,
    #[serde(default)]
    pub sites: Option<SitePair>,
    /// Ways and stations built by this attempt and not yet owned by a line.
    #[serde(default)]
    pub built: Infrastructure,
    /// Line registered when the attempt succeeded.
    #[serde(default)]
    pub line: Option<LineId>,
    /// Whether cleanup records the key in the ledger.
    #[serde(default)]
    pub blacklist: bool,
}

impl ConstructionAttempt {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            estimate: None,
            sites: None,
            built: Infrastructure::default(),
            line: None,
            blacklist: false,
        }
    }

    pub fn mode(&self) -> Option<TransportMode> {
        self.estimate.as_ref().map(|e| e.mode)
    }

    pub fn reservations(&self) -> Vec<ReservationId> {
        self.sites
            .as_ref()
            .map(SitePair::reservations)
            .unwrap_or_default()
    }
}

/// Holder of a player's current attempt. Empty between attempts.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[require(Save)]
pub struct AttemptSlot(pub Option<ConstructionAttempt>);

impl AttemptSlot {
    pub fn get(&self) -> Option<&ConstructionAttempt> {
        self.0.as_ref()
    }

    pub fn clear(&mut self) -> Option<ConstructionAttempt> {
        self.0.take()
    }
}
