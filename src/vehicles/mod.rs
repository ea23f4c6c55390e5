//! Vehicle type descriptors and the catalog the AI buys from.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::economy::goods::FreightCategory;
use crate::map::ways::WayKind;
use crate::services::VehicleRegistry;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct VehicleTypeId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleType {
    pub id: VehicleTypeId,
    pub name: String,
    pub way_kind: WayKind,
    /// Engine power in kW. Zero for unpowered cars.
    pub power_kw: u32,
    pub speed_kmh: u32,
    pub capacity: u32,
    /// `None` for locomotives that carry nothing themselves.
    pub cargo: Option<FreightCategory>,
    /// Empty weight in tonnes.
    pub weight_t: u32,
    pub price: i64,
    /// Running cost per tile travelled.
    pub running_cost: i64,
    pub electric: bool,
}

impl VehicleType {
    pub fn is_engine(&self) -> bool {
        self.power_kw > 0
    }

    /// Resale value after `age_months` of service (linear, floored at 20%).
    pub fn resale_value(&self, age_months: u32) -> i64 {
        let depreciation = (self.price * i64::from(age_months.min(48))) / 60;
        (self.price - depreciation).max(self.price / 5)
    }
}

/// Parameters of a vehicle search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleQuery {
    pub way_kind: WayKind,
    pub min_power: u32,
    /// Speed beyond this is worth nothing (the way is slower).
    pub max_speed: u32,
    /// Required cargo category; `None` searches for a pure engine.
    pub cargo: Option<FreightCategory>,
    pub require_electric: bool,
}

impl VehicleQuery {
    pub fn engine(way_kind: WayKind, min_power: u32, max_speed: u32) -> Self {
        Self {
            way_kind,
            min_power,
            max_speed,
            cargo: None,
            require_electric: false,
        }
    }

    pub fn carrier(way_kind: WayKind, cargo: FreightCategory, max_speed: u32) -> Self {
        Self {
            way_kind,
            min_power: 0,
            max_speed,
            cargo: Some(cargo),
            require_electric: false,
        }
    }

    pub fn electric(mut self) -> Self {
        self.require_electric = true;
        self
    }

    fn matches(&self, vehicle: &VehicleType) -> bool {
        if vehicle.way_kind != self.way_kind || vehicle.speed_kmh == 0 {
            return false;
        }
        if vehicle.electric != self.require_electric {
            return false;
        }
        if vehicle.power_kw < self.min_power {
            return false;
        }
        match self.cargo {
            Some(category) => vehicle.cargo == Some(category) && vehicle.capacity > 0,
            None => vehicle.is_engine() && vehicle.cargo.is_none(),
        }
    }
}

/// All vehicle types available for purchase.
#[derive(Resource, Debug, Default)]
pub struct VehicleCatalog {
    types: Vec<VehicleType>,
}

impl VehicleCatalog {
    pub fn register(&mut self, mut vehicle: VehicleType) -> VehicleTypeId {
        let id = VehicleTypeId(self.types.len() as u32);
        vehicle.id = id;
        self.types.push(vehicle);
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleType> {
        self.types.iter()
    }
}

impl VehicleRegistry for VehicleCatalog {
    fn find_best_vehicle(&self, query: &VehicleQuery) -> Option<&VehicleType> {
        self.types
            .iter()
            .filter(|v| query.matches(v))
            .max_by(|a, b| {
                let speed_a = a.speed_kmh.min(query.max_speed);
                let speed_b = b.speed_kmh.min(query.max_speed);
                speed_a
                    .cmp(&speed_b)
                    .then(a.capacity.cmp(&b.capacity))
                    .then(a.power_kw.cmp(&b.power_kw))
                    // cheaper to run wins remaining ties
                    .then(b.running_cost.cmp(&a.running_cost))
                    .then(b.id.cmp(&a.id))
            })
    }

    fn vehicle(&self, id: VehicleTypeId) -> Option<&VehicleType> {
        self.types.get(id.0 as usize)
    }
}
