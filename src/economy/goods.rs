use core::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Stable handle of a good descriptor.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Reflect, Serialize, Deserialize,
)]
pub struct GoodId(pub u16);

/// How a good is loaded; vehicles declare which category they can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum FreightCategory {
    Passengers,
    Mail,
    Bulk,
    Piece,
    Liquid,
    Cooled,
}

impl fmt::Display for FreightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FreightCategory::Passengers => "passengers",
            FreightCategory::Mail => "mail",
            FreightCategory::Bulk => "bulk goods",
            FreightCategory::Piece => "piece goods",
            FreightCategory::Liquid => "liquids",
            FreightCategory::Cooled => "cooled goods",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
pub struct GoodDescriptor {
    pub id: GoodId,
    pub name: String,
    pub category: FreightCategory,
    /// Revenue per unit per tile at the reference speed.
    pub value: i64,
    /// How strongly faster delivery raises revenue, in percent.
    pub speed_bonus: u32,
    /// Loaded weight of one unit in tonnes.
    pub weight_per_unit: u32,
}

impl GoodDescriptor {
    pub fn is_passengers(&self) -> bool {
        self.category == FreightCategory::Passengers
    }
}

/// All goods known to the economy.
#[derive(Debug, Clone, Default, Reflect)]
pub struct GoodCatalog {
    goods: Vec<GoodDescriptor>,
}

impl GoodCatalog {
    pub fn register(
        &mut self,
        name: impl Into<String>,
        category: FreightCategory,
        value: i64,
        speed_bonus: u32,
    ) -> GoodId {
        let id = GoodId(self.goods.len() as u16);
        self.goods.push(GoodDescriptor {
            id,
            name: name.into(),
            category,
            value,
            speed_bonus,
            weight_per_unit: if category == FreightCategory::Passengers {
                0
            } else {
                1
            },
        });
        id
    }

    pub fn get(&self, id: GoodId) -> Option<&GoodDescriptor> {
        self.goods.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GoodDescriptor> {
        self.goods.iter()
    }

    /// The good carried by passenger services, if one is registered.
    pub fn passengers(&self) -> Option<GoodId> {
        self.goods.iter().find(|g| g.is_passengers()).map(|g| g.id)
    }

    pub fn name(&self, id: GoodId) -> &str {
        self.get(id).map(|g| g.name.as_str()).unwrap_or("unknown goods")
    }
}
