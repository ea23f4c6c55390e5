//! Rust Tycoon AI - construction automaton for a tick-driven transport economy
//!
//! AI players pick unserved supply and passenger connections, plan stations,
//! lay rail or road, buy vehicles and retire what stops paying. Everything
//! runs headless on Bevy's ECS; the map, economy, vehicle catalog and fleet
//! are resources the host simulation owns.

use bevy::app::PluginGroup;
use bevy::prelude::*;

use crate::ai::AiPlugin;
use crate::save::GameSavePlugin;
use crate::sim_clock::SimClockPlugin;

pub mod ai;
pub mod constants;
pub mod economy;
pub mod fleet;
pub mod logging;
pub mod map;
pub mod messages;
pub mod save;
pub mod services;
pub mod sim_clock;
pub mod vehicles;

/// Plugin group for the simulation clock, the AI and persistence.
pub struct LogicPlugins;

impl PluginGroup for LogicPlugins {
    fn build(self) -> bevy::app::PluginGroupBuilder {
        bevy::app::PluginGroupBuilder::start::<Self>()
            .add(SimClockPlugin)
            .add(AiPlugin)
            .add(GameSavePlugin)
    }
}

/// Headless app running the AI on one tick per update.
pub fn app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, bevy::log::LogPlugin::default()))
        .add_plugins(LogicPlugins);
    app
}

#[cfg(test)]
pub mod test_utils;
