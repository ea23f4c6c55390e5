//! Estimates of what each transport mode would cost and earn for a target.

use thiserror::Error;

use crate::ai::config::AiConfig;
use crate::ai::plan::{FeederStock, ModeEstimate, Target};
use crate::ai::sites::nearest_shore;
use crate::ai::state::TransportMode;
use crate::constants::{
    FEEDER_RADIUS, LOADING_TICKS, MAX_AIRCRAFT, MAX_CONVOYS_PER_LINE, MAX_RAIL_CARS,
    MAX_ROAD_VEHICLES, MAX_SHIPS, MAX_SITE_RADIUS, MIN_RAIL_CARS, PASSENGER_DIVISOR,
    POWER_PER_TONNE, REFERENCE_SPEED_KMH, TICKS_PER_TILE_AT_100KMH,
};
use crate::economy::goods::GoodDescriptor;
use crate::map::ways::{WayKind, WayType};
use crate::services::{EconomyRegistry, FleetService, VehicleRegistry, WorldMap};
use crate::vehicles::{VehicleQuery, VehicleType};

/// Why a mode cannot serve a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModeRejection {
    #[error("mode does not apply to this target")]
    NotApplicable,
    #[error("endpoint no longer exists")]
    MissingNode,
    #[error("nothing to transport")]
    NoDemand,
    #[error("no way type available")]
    NoWay,
    #[error("no suitable vehicle")]
    NoVehicle,
    #[error("engine too weak for the shortest train")]
    Underpowered,
    #[error("no shore near an endpoint")]
    NoShore,
    #[error("fleet arithmetic overflowed")]
    Overflow,
    #[error("not enough convoy handles left")]
    HandleSpace,
    #[error("service would lose money")]
    Unprofitable,
}

/// Estimate or rejection for every mode, in preference order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeReport {
    pub estimates: Vec<(TransportMode, Result<ModeEstimate, ModeRejection>)>,
}

impl ModeReport {
    /// Most profitable viable mode. Ties go to the earlier mode in
    /// [`TransportMode::PREFERENCE`].
    pub fn best(&self) -> Option<&ModeEstimate> {
        self.estimates
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok())
            .max_by_key(|e| (e.monthly_profit(), std::cmp::Reverse(e.mode.rank())))
    }

    pub fn get(&self, mode: TransportMode) -> Option<&Result<ModeEstimate, ModeRejection>> {
        self.estimates
            .iter()
            .find(|(m, _)| *m == mode)
            .map(|(_, result)| result)
    }
}

/// Read-only inputs of mode evaluation.
pub struct EvaluationView<'a> {
    pub map: &'a dyn WorldMap,
    pub economy: &'a dyn EconomyRegistry,
    pub vehicles: &'a dyn VehicleRegistry,
    pub fleet: &'a dyn FleetService,
    pub ticks_per_month: u32,
}

/// What has to be moved, how far.
struct Demand<'a> {
    good: &'a GoodDescriptor,
    volume: u32,
    distance: u32,
}

/// Sizing of one fleet before money is considered.
struct Fleet<'a> {
    way: Option<&'a WayType>,
    engine: Option<&'a VehicleType>,
    carrier: &'a VehicleType,
    carriers_per_convoy: u32,
    convoys: u32,
    speed: u32,
    cycle_ticks: u64,
}

pub fn evaluate_modes(target: &Target, view: &EvaluationView, config: &AiConfig) -> ModeReport {
    let demand = demand_for(target, view);
    let estimates = TransportMode::PREFERENCE
        .into_iter()
        .map(|mode| {
            let result = demand
                .as_ref()
                .map_err(|e| *e)
                .and_then(|d| evaluate_mode(mode, target, d, view, config));
            (mode, result)
        })
        .collect();
    ModeReport { estimates }
}

fn demand_for<'a>(target: &Target, view: &EvaluationView<'a>) -> Result<Demand<'a>, ModeRejection> {
    let start = view
        .economy
        .node(target.start)
        .ok_or(ModeRejection::MissingNode)?;
    let end = view
        .economy
        .node(target.end)
        .ok_or(ModeRejection::MissingNode)?;
    let good = view
        .economy
        .good(target.good)
        .ok_or(ModeRejection::NoDemand)?;

    let volume = if good.is_passengers() {
        start.population().min(end.population()) / PASSENGER_DIVISOR.max(1)
    } else {
        view.economy.output_rate(target.start, target.good)
    };
    if volume == 0 {
        return Err(ModeRejection::NoDemand);
    }

    Ok(Demand {
        good,
        volume,
        distance: start.pos.distance_to(end.pos).max(1),
    })
}

fn evaluate_mode(
    mode: TransportMode,
    target: &Target,
    demand: &Demand,
    view: &EvaluationView,
    config: &AiConfig,
) -> Result<ModeEstimate, ModeRejection> {
    let mut feeder = None;
    match mode {
        TransportMode::Air => {
            if !demand.good.is_passengers() || demand.distance <= config.min_air_distance {
                return Err(ModeRejection::NotApplicable);
            }
        }
        TransportMode::Water => {
            feeder = water_feeder(target, demand, view)?;
        }
        TransportMode::Rail | TransportMode::Road => {}
    }

    let fleet = size_fleet(mode, demand, view)?;
    let free_handles = view
        .fleet
        .convoy_handle_space()
        .saturating_sub(view.fleet.convoy_count());
    if fleet.convoys > free_handles {
        return Err(ModeRejection::HandleSpace);
    }

    let mut estimate = price_fleet(mode, demand, &fleet, view.ticks_per_month)
        .ok_or(ModeRejection::Overflow)?;
    estimate.feeder = feeder;
    if estimate.monthly_profit() <= 0 {
        return Err(ModeRejection::Unprofitable);
    }
    Ok(estimate)
}

/// Road stock for endpoints whose shore is beyond the site radius.
fn water_feeder(
    target: &Target,
    demand: &Demand,
    view: &EvaluationView,
) -> Result<Option<FeederStock>, ModeRejection> {
    let mut needs_feeder = false;
    for node in [target.start, target.end] {
        let pos = view
            .economy
            .node(node)
            .ok_or(ModeRejection::MissingNode)?
            .pos;
        if nearest_shore(view.map, pos, MAX_SITE_RADIUS).is_some() {
            continue;
        }
        if nearest_shore(view.map, pos, FEEDER_RADIUS).is_none() {
            return Err(ModeRejection::NoShore);
        }
        needs_feeder = true;
    }
    if !needs_feeder {
        return Ok(None);
    }

    let way = view
        .map
        .best_way(WayKind::Road, 0)
        .ok_or(ModeRejection::NoWay)?;
    let vehicle = view
        .vehicles
        .find_best_vehicle(&VehicleQuery::carrier(
            WayKind::Road,
            demand.good.category,
            way.max_speed,
        ))
        .ok_or(ModeRejection::NoVehicle)?;
    Ok(Some(FeederStock {
        way: way.id,
        vehicle: vehicle.id,
    }))
}

fn find_engine<'a>(
    view: &EvaluationView<'a>,
    way: &WayType,
) -> Option<&'a VehicleType> {
    let query = VehicleQuery::engine(WayKind::Rail, 1, way.max_speed);
    let electric = way
        .electrified
        .then(|| view.vehicles.find_best_vehicle(&query.electric()))
        .flatten();
    electric.or_else(|| view.vehicles.find_best_vehicle(&query))
}

fn size_fleet<'a>(
    mode: TransportMode,
    demand: &Demand,
    view: &EvaluationView<'a>,
) -> Result<Fleet<'a>, ModeRejection> {
    let kind = mode.way_kind();
    let category = demand.good.category;

    // The fastest carrier decides which way standard is worth building.
    let unrestricted = view
        .vehicles
        .find_best_vehicle(&VehicleQuery::carrier(kind, category, u32::MAX))
        .ok_or(ModeRejection::NoVehicle)?;
    let way = if kind.is_built() {
        Some(
            view.map
                .best_way(kind, unrestricted.speed_kmh)
                .ok_or(ModeRejection::NoWay)?,
        )
    } else {
        None
    };
    let way_speed = way.map_or(u32::MAX, |w| w.max_speed);
    let carrier = view
        .vehicles
        .find_best_vehicle(&VehicleQuery::carrier(kind, category, way_speed))
        .ok_or(ModeRejection::NoVehicle)?;
    if carrier.capacity == 0 {
        return Err(ModeRejection::NoVehicle);
    }

    let engine = match (mode, way) {
        (TransportMode::Rail, Some(way)) => {
            Some(find_engine(view, way).ok_or(ModeRejection::NoVehicle)?)
        }
        _ => None,
    };

    let speed = [Some(way_speed), Some(carrier.speed_kmh), engine.map(|e| e.speed_kmh)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(0)
        .max(1);
    let cycle_ticks = cycle_ticks(demand.distance, speed).ok_or(ModeRejection::Overflow)?;

    // Capacity needed per round trip to clear the monthly volume.
    let ticks_per_month = u64::from(view.ticks_per_month.max(1));
    let needed = u64::from(demand.volume)
        .checked_mul(cycle_ticks)
        .ok_or(ModeRejection::Overflow)?
        .div_ceil(ticks_per_month);
    let carriers_needed =
        u32::try_from(needed.div_ceil(u64::from(carrier.capacity)).max(1))
            .map_err(|_| ModeRejection::Overflow)?;

    let (carriers_per_convoy, convoys) = match (mode, engine) {
        (TransportMode::Rail, Some(engine)) => {
            let cars = train_length(engine, carrier, demand.good, carriers_needed)?;
            (cars, carriers_needed.div_ceil(cars).clamp(1, MAX_CONVOYS_PER_LINE))
        }
        (TransportMode::Road, _) => (1, carriers_needed.clamp(1, MAX_ROAD_VEHICLES)),
        (TransportMode::Water, _) => (1, carriers_needed.clamp(1, MAX_SHIPS)),
        (TransportMode::Air, _) => (1, carriers_needed.clamp(1, MAX_AIRCRAFT)),
        (TransportMode::Rail, None) => return Err(ModeRejection::NoVehicle),
    };

    Ok(Fleet {
        way,
        engine,
        carrier,
        carriers_per_convoy,
        convoys,
        speed,
        cycle_ticks,
    })
}

/// Ticks of one loaded round trip.
fn cycle_ticks(distance: u32, speed_kmh: u32) -> Option<u64> {
    let trip = u64::from(distance)
        .checked_mul(TICKS_PER_TILE_AT_100KMH)?
        .checked_mul(u64::from(REFERENCE_SPEED_KMH))?
        / u64::from(speed_kmh.max(1));
    trip.max(1).checked_mul(2)?.checked_add(LOADING_TICKS)
}

/// Odd number of cars in `MIN_RAIL_CARS..=MAX_RAIL_CARS` the engine can pull.
fn train_length(
    engine: &VehicleType,
    car: &VehicleType,
    good: &GoodDescriptor,
    wanted: u32,
) -> Result<u32, ModeRejection> {
    let mut cars = (wanted.max(MIN_RAIL_CARS) | 1).min(MAX_RAIL_CARS);
    let loaded_car = u64::from(car.weight_t) + u64::from(car.capacity) * u64::from(good.weight_per_unit);
    loop {
        let weight = u64::from(engine.weight_t) + u64::from(cars) * loaded_car;
        if u64::from(engine.power_kw) >= weight * u64::from(POWER_PER_TONNE) {
            return Ok(cars);
        }
        if cars <= MIN_RAIL_CARS {
            return Err(ModeRejection::Underpowered);
        }
        cars -= 2;
    }
}

fn price_fleet(
    mode: TransportMode,
    demand: &Demand,
    fleet: &Fleet,
    ticks_per_month: u32,
) -> Option<ModeEstimate> {
    let ticks_per_month = i64::from(ticks_per_month.max(1));
    let cycle = i64::try_from(fleet.cycle_ticks).ok()?.max(1);
    let convoys = i64::from(fleet.convoys);
    let carriers = i64::from(fleet.carriers_per_convoy);
    let distance = i64::from(demand.distance);

    let capacity = convoys
        .checked_mul(carriers)?
        .checked_mul(i64::from(fleet.carrier.capacity))?
        .checked_mul(ticks_per_month)?
        / cycle;
    let carried = capacity.min(i64::from(demand.volume));

    let speed_delta = i64::from(fleet.speed) - i64::from(REFERENCE_SPEED_KMH);
    let speed_factor = (100 + speed_delta * i64::from(demand.good.speed_bonus) / 100).max(10);
    let monthly_income = carried
        .checked_mul(demand.good.value)?
        .checked_mul(distance)?
        .checked_mul(speed_factor)?
        / 100;

    let consist_price = fleet.engine.map_or(0, |e| e.price) + carriers.checked_mul(fleet.carrier.price)?;
    let consist_running =
        fleet.engine.map_or(0, |e| e.running_cost) + carriers.checked_mul(fleet.carrier.running_cost)?;
    let tiles_per_month = (2 * distance).checked_mul(ticks_per_month)? / cycle;
    let maintenance = fleet
        .way
        .map_or(0, |w| w.maintenance_per_tile * distance);
    let monthly_cost = convoys
        .checked_mul(tiles_per_month)?
        .checked_mul(consist_running)?
        .checked_add(maintenance)?;

    let way_cost = fleet.way.map_or(0, |w| w.cost_per_tile * distance);
    let station_cost = 2 * i64::from(mode.footprint_len()) * mode.station_kind(demand.good.is_passengers()).build_cost();
    let build_cost = convoys
        .checked_mul(consist_price)?
        .checked_add(way_cost)?
        .checked_add(station_cost)?;

    Some(ModeEstimate {
        mode,
        way: fleet.way.map(|w| w.id),
        engine: fleet.engine.map(|e| e.id),
        carrier: fleet.carrier.id,
        carriers_per_convoy: fleet.carriers_per_convoy,
        convoys: fleet.convoys,
        speed_kmh: fleet.speed,
        distance: demand.distance,
        monthly_volume: demand.volume,
        monthly_income,
        monthly_cost,
        build_cost,
        feeder: None,
    })
}
