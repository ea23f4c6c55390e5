//! Construction AI: picks unserved connections, builds them and keeps the
//! resulting fleet profitable.

use bevy::prelude::*;

use crate::economy::nodes::NodeRegistry;
use crate::fleet::FleetRegistry;
use crate::logging::{AnnouncementLog, consume_announcements};
use crate::map::grid::GameMap;
use crate::messages::{AiAnnouncement, NodeRemoved};
use crate::sim_clock::{SimSet, year_changed};
use crate::vehicles::VehicleCatalog;

pub mod config;
pub mod error;
pub mod evaluator;
pub mod ledger;
pub mod machine;
pub mod maintenance;
pub mod markers;
pub mod plan;
pub mod provision;
pub mod route;
pub mod selector;
pub mod sites;
pub mod state;
pub mod systems;

pub use config::{AiConfig, AiRng};
pub use error::{
    CommitError, ConstructionFailure, FailureClass, FleetError, PlanningError, ResourceError,
    RouteError,
};
pub use ledger::{ForbiddenConnections, ForbiddenEntry};
pub use markers::{AiKind, AiPlayer, PlayerInstance};
pub use plan::{AttemptSlot, ConstructionAttempt, ModeEstimate, Target};
pub use state::{AiSchedule, ConstructionState, PassengerFocus, PlayerStats, TransportMode};

/// Runs the construction automaton of every [`AiPlayer`] once per due tick.
pub struct AiPlugin;

impl Plugin for AiPlugin {
    fn build(&self, app: &mut App) {
        // The RNG seeds itself from the config.
        app.init_resource::<AiConfig>()
            .init_resource::<AiRng>()
            .init_resource::<AnnouncementLog>()
            .init_resource::<GameMap>()
            .init_resource::<NodeRegistry>()
            .init_resource::<VehicleCatalog>()
            .init_resource::<FleetRegistry>()
            .add_message::<AiAnnouncement>()
            .add_message::<NodeRemoved>()
            .add_systems(
                Update,
                (
                    systems::sync_ledger_capacity,
                    systems::broadcast_node_removals,
                    systems::handle_node_removals,
                    systems::handle_convoy_problems,
                    systems::age_ledgers.run_if(year_changed),
                    systems::run_construction_steps,
                    consume_announcements,
                )
                    .chain()
                    .in_set(SimSet::Simulation),
            );
    }
}
