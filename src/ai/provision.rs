//! Vehicle purchase and line registration for a finished connection.

use bevy::prelude::*;

use crate::ai::error::{FleetError, ResourceError};
use crate::ai::state::TransportMode;
use crate::economy::nodes::ConnectionKey;
use crate::economy::treasury::Treasury;
use crate::fleet::{ConvoyId, Infrastructure, LineId, NewLine, Schedule};
use crate::services::{FleetService, VehicleRegistry};
use crate::vehicles::VehicleTypeId;

/// A line to open and the convoys to run on it.
#[derive(Debug, Clone)]
pub struct FleetOrder {
    pub name: String,
    pub key: Option<ConnectionKey>,
    pub mode: TransportMode,
    pub schedule: Schedule,
    pub infrastructure: Infrastructure,
    /// Vehicle types of one convoy, lead vehicle first.
    pub consist: Vec<VehicleTypeId>,
    pub convoys: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub line: LineId,
    pub convoys: Vec<ConvoyId>,
    pub spent: i64,
    /// Why fewer convoys than ordered were bought.
    pub stopped_by: Option<ResourceError>,
}

fn consist_price(consist: &[VehicleTypeId], vehicles: &dyn VehicleRegistry) -> Result<i64, FleetError> {
    if consist.is_empty() {
        return Err(FleetError::EmptyConsist);
    }
    consist.iter().try_fold(0i64, |total, id| {
        let vehicle = vehicles.vehicle(*id).ok_or(FleetError::UnknownVehicle(*id))?;
        Ok(total.saturating_add(vehicle.price))
    })
}

/// Register the line and buy as many of the ordered convoys as funds and
/// the global convoy ceiling allow.
///
/// Convoys already bought are kept when a limit is hit. If not even one
/// convoy can be bought the line is deleted again and the limit is returned
/// as the error.
pub fn provision_fleet(
    order: FleetOrder,
    owner: Entity,
    vehicles: &dyn VehicleRegistry,
    fleet: &mut dyn FleetService,
    treasury: &mut Treasury,
) -> Result<ProvisionReport, FleetError> {
    let price = consist_price(&order.consist, vehicles)?;
    let line = fleet.create_line(NewLine {
        owner,
        name: order.name.clone(),
        key: order.key,
        mode: order.mode,
        schedule: order.schedule,
        infrastructure: order.infrastructure,
    });

    let mut convoys = Vec::new();
    let mut spent = 0;
    let mut stopped_by = None;
    for _ in 0..order.convoys.max(1) {
        if fleet.convoy_count() >= fleet.max_convoys() {
            stopped_by = Some(ResourceError::ConvoyCeiling(fleet.max_convoys()));
            break;
        }
        if let Err(err) = treasury.try_spend(price) {
            stopped_by = Some(err);
            break;
        }
        match fleet.create_convoy(owner, line, order.consist.clone(), price) {
            Ok(convoy) => {
                fleet.start_convoy(convoy);
                convoys.push(convoy);
                spent += price;
            }
            Err(FleetError::Resource(err)) => {
                treasury.add(price);
                stopped_by = Some(err);
                break;
            }
            Err(err) => {
                treasury.add(price);
                fleet.delete_line(line);
                return Err(err);
            }
        }
    }

    if convoys.is_empty() {
        fleet.delete_line(line);
        let err = stopped_by.unwrap_or(ResourceError::ConvoyCeiling(fleet.max_convoys()));
        warn!("Could not buy any convoy for {}: {}", order.name, err);
        return Err(err.into());
    }

    info!(
        "Opened {} line {} with {} of {} convoys",
        order.mode,
        order.name,
        convoys.len(),
        order.convoys
    );
    Ok(ProvisionReport {
        line,
        convoys,
        spent,
        stopped_by,
    })
}
