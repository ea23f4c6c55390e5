use thiserror::Error;

use crate::economy::nodes::NodeId;
use crate::fleet::LineId;
use crate::map::tile_pos::TilePos;
use crate::map::ways::WayKind;
use crate::vehicles::VehicleTypeId;

/// The way planner could not produce a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no {0:?} path between the sites")]
    NoPath(WayKind),
    #[error("route search gave up after {0} nodes")]
    SearchExhausted(usize),
    #[error("no buildable way type for {0:?}")]
    NoWayType(WayKind),
    #[error("route request has an empty endpoint set")]
    EmptyEndpoints,
    #[error("route costs {cost}, budget is {budget}")]
    OverBudget { cost: i64, budget: i64 },
    #[error("terraformed route is not shorter than the plain one")]
    NotShorter,
}

/// Laying a planned route failed. `built` lists tiles already laid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("tile {at} is no longer buildable")]
    Blocked { at: TilePos, built: Vec<TilePos> },
    #[error("route has no way type to build")]
    MissingWayType,
}

impl CommitError {
    pub fn built(&self) -> &[TilePos] {
        match self {
            CommitError::Blocked { built, .. } => built,
            CommitError::MissingWayType => &[],
        }
    }
}

/// No viable vehicle, way or site combination exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("no transport mode is feasible")]
    NoViableMode,
    #[error("no buildable site near node {0:?}")]
    NoSite(NodeId),
    #[error("harbours are not connected by water")]
    WaterUnreachable,
    #[error("node {0:?} no longer exists")]
    NodeVanished(NodeId),
    #[error("site at {0} is no longer free")]
    SiteLost(TilePos),
    #[error("could not build a {kind} at {at}")]
    StationRefused { at: TilePos, kind: &'static str },
}

/// Money or handle space ran out; retry later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("needs {needed}, only {available} available")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("convoy ceiling of {0} reached")]
    ConvoyCeiling(u32),
    #[error("convoy handle space exhausted")]
    HandleSpaceExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("line {0:?} does not exist")]
    UnknownLine(LineId),
    #[error("vehicle type {0:?} does not exist")]
    UnknownVehicle(VehicleTypeId),
    #[error("plan has no vehicles")]
    EmptyConsist,
}

/// Whether a failure blacklists the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Recorded in the forbidden-connection ledger.
    Infeasible,
    /// Abort without blacklisting; funds may recover.
    ResourceExhausted,
}

/// Any failure of a construction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionFailure {
    #[error(transparent)]
    Planning(#[from] PlanningError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Fleet(#[from] FleetError),
}

impl ConstructionFailure {
    pub fn class(&self) -> FailureClass {
        match self {
            ConstructionFailure::Planning(_)
            | ConstructionFailure::Route(_)
            | ConstructionFailure::Commit(_) => FailureClass::Infeasible,
            ConstructionFailure::Resource(_) => FailureClass::ResourceExhausted,
            ConstructionFailure::Fleet(FleetError::Resource(_)) => FailureClass::ResourceExhausted,
            ConstructionFailure::Fleet(_) => FailureClass::Infeasible,
        }
    }
}
