use bevy::prelude::*;
use moonshine_save::prelude::Save;
use serde::{Deserialize, Serialize};

use crate::ai::error::ResourceError;

/// Cash account of a player. May go negative through running costs.
#[derive(Component, Debug, Clone, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[require(Save)]
#[serde(default)]
pub struct Treasury {
    cash: i64,
}

impl Default for Treasury {
    fn default() -> Self {
        Treasury { cash: 200_000 }
    }
}

impl Treasury {
    pub fn new(cash: i64) -> Self {
        Treasury { cash }
    }

    pub fn cash(&self) -> i64 {
        self.cash
    }

    /// Add money
    pub fn add(&mut self, amount: i64) {
        if amount > 0 {
            self.cash = self.cash.saturating_add(amount);
        }
    }

    /// Subtract money unconditionally (running costs, refunds of failed builds)
    pub fn subtract(&mut self, amount: i64) {
        if amount > 0 {
            self.cash = self.cash.saturating_sub(amount);
        }
    }

    pub fn can_afford(&self, amount: i64) -> bool {
        amount <= self.cash
    }

    /// Spend only if the cash covers it.
    pub fn try_spend(&mut self, amount: i64) -> Result<(), ResourceError> {
        if !self.can_afford(amount) {
            return Err(ResourceError::InsufficientFunds {
                needed: amount,
                available: self.cash,
            });
        }
        self.subtract(amount);
        Ok(())
    }

    /// Cash plus the resale value of everything the player owns.
    pub fn net_worth(&self, asset_value: i64) -> i64 {
        self.cash.saturating_add(asset_value)
    }
}

impl From<i64> for Treasury {
    fn from(amount: i64) -> Self {
        Treasury::new(amount)
    }
}
