use std::collections::BTreeMap;

use jiff::{
    SignedDuration,
    civil::{Date, Time, Weekday},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use tracing::{instrument, warn};

use crate::{
    error::PlanningError,
    model::model_params::ModelParams,
    planner::PlanningResult,
    problem::{
        cost_structure::CostStructure,
        labor::{LaborCalendar, LaborDay, ManufacturingParams, StandardLaborRates},
        location::{Location, LocationType},
        planning_problem::{PlanningProblem, PlanningProblemBuilder, TruckScheduleInput},
        product::Product,
        route_definition::RouteDefinition,
        storage_state::{StorageCapability, StorageState, TransportMode},
        truck_schedule::DepartureType,
    },
    rolling::rolling_config::RollingHorizonConfig,
    solution::cost_breakdown::CostBreakdown,
    solver::{
        solve_params::{SolveParams, SolverBackend},
        termination::TerminationStatus,
    },
    trucks::{loading_policy::LoadingPolicy, truck_loading::UnassignedReason},
};

pub trait FromProblem<T> {
    fn from_problem(value: T, problem: &PlanningProblem) -> Self;
}

/// A complete planning scenario: the network, demand, calendars and the
/// parameters to plan it with.
#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "PlanningProblem")]
pub struct JsonPlanningProblem {
    pub locations: Vec<JsonLocation>,
    pub products: Vec<JsonProduct>,
    pub routes: Vec<RouteDefinition>,
    pub forecast: Vec<JsonDemand>,
    #[serde(default)]
    pub labor: JsonLabor,
    pub manufacturing: Option<ManufacturingParams>,
    #[serde(default)]
    pub trucks: Vec<JsonTruckSchedule>,
    pub costs: Option<CostStructure>,
    #[serde(default)]
    pub initial_inventory: Vec<JsonInventory>,
    pub model: Option<JsonModelParams>,
    pub solver: Option<JsonSolveParams>,
    pub rolling_horizon: Option<RollingHorizonConfig>,
    pub loading_policy: Option<LoadingPolicy>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Location")]
pub struct JsonLocation {
    pub id: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub storage: StorageCapability,
}

impl FromProblem<&Location> for JsonLocation {
    fn from_problem(value: &Location, _problem: &PlanningProblem) -> Self {
        JsonLocation {
            id: value.external_id().to_owned(),
            location_type: value.location_type(),
            storage: value.storage(),
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Product")]
pub struct JsonProduct {
    pub id: String,
    pub ambient_shelf_life_days: u32,
    pub frozen_shelf_life_days: u32,
}

impl FromProblem<&Product> for JsonProduct {
    fn from_problem(value: &Product, _problem: &PlanningProblem) -> Self {
        JsonProduct {
            id: value.external_id().to_owned(),
            ambient_shelf_life_days: value.shelf_life_days(StorageState::Ambient),
            frozen_shelf_life_days: value.shelf_life_days(StorageState::Frozen),
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Demand")]
pub struct JsonDemand {
    pub location: String,
    pub product: String,
    pub date: Date,
    pub quantity: f64,
}

/// Explicit labor days win over the generated standard calendar.
#[derive(Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields, rename = "Labor")]
pub struct JsonLabor {
    pub standard: Option<JsonStandardLabor>,
    #[serde(default)]
    pub days: Vec<LaborDay>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "StandardLabor")]
pub struct JsonStandardLabor {
    pub start: Date,
    pub end: Date,
    pub rates: Option<StandardLaborRates>,
}

impl JsonLabor {
    fn to_calendar(&self) -> LaborCalendar {
        let mut days = match &self.standard {
            Some(standard) => LaborCalendar::standard(
                standard.start,
                standard.end,
                &standard.rates.clone().unwrap_or_default(),
            )
            .days()
            .cloned()
            .collect::<Vec<_>>(),
            None => vec![],
        };
        days.extend(self.days.iter().cloned());

        LaborCalendar::new(days)
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy)]
#[serde(rename_all = "snake_case", rename = "Weekday")]
pub enum JsonWeekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<JsonWeekday> for Weekday {
    fn from(value: JsonWeekday) -> Self {
        match value {
            JsonWeekday::Monday => Weekday::Monday,
            JsonWeekday::Tuesday => Weekday::Tuesday,
            JsonWeekday::Wednesday => Weekday::Wednesday,
            JsonWeekday::Thursday => Weekday::Thursday,
            JsonWeekday::Friday => Weekday::Friday,
            JsonWeekday::Saturday => Weekday::Saturday,
            JsonWeekday::Sunday => Weekday::Sunday,
        }
    }
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "TruckSchedule")]
pub struct JsonTruckSchedule {
    pub id: String,
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub intermediate_stops: Vec<String>,
    /// Runs daily when absent.
    pub day_of_week: Option<JsonWeekday>,
    pub departure_time: Time,
    pub pallet_capacity: Option<u32>,
    pub units_per_pallet: Option<u32>,
    pub units_per_case: Option<u32>,
}

impl From<&JsonTruckSchedule> for TruckScheduleInput {
    fn from(value: &JsonTruckSchedule) -> Self {
        TruckScheduleInput {
            id: value.id.clone(),
            origin: value.origin.clone(),
            destination: value.destination.clone(),
            intermediate_stops: value.intermediate_stops.clone(),
            day_of_week: value.day_of_week.map(Weekday::from),
            departure_time: value.departure_time,
            pallet_capacity: value.pallet_capacity.unwrap_or(44),
            units_per_pallet: value.units_per_pallet.unwrap_or(320),
            units_per_case: value.units_per_case.unwrap_or(10),
        }
    }
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Inventory")]
pub struct JsonInventory {
    pub location: String,
    pub product: String,
    pub state: StorageState,
    pub quantity: f64,
    /// Defaults to the day before the planning start.
    pub production_date: Option<Date>,
}

#[derive(Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields, rename = "ModelParams")]
pub struct JsonModelParams {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub max_routes_per_destination: Option<usize>,
    pub max_intermediate_stops: Option<usize>,
    pub allow_shortages: Option<bool>,
    pub enforce_shelf_life: Option<bool>,
    pub use_batch_tracking: Option<bool>,
    pub enforce_truck_capacity: Option<bool>,
    pub integer_pallets: Option<bool>,
}

impl From<&JsonModelParams> for ModelParams {
    fn from(value: &JsonModelParams) -> Self {
        let defaults = ModelParams::default();
        ModelParams {
            start_date: value.start_date,
            end_date: value.end_date,
            max_routes_per_destination: value
                .max_routes_per_destination
                .unwrap_or(defaults.max_routes_per_destination),
            max_intermediate_stops: value
                .max_intermediate_stops
                .unwrap_or(defaults.max_intermediate_stops),
            allow_shortages: value.allow_shortages.unwrap_or(defaults.allow_shortages),
            enforce_shelf_life: value
                .enforce_shelf_life
                .unwrap_or(defaults.enforce_shelf_life),
            use_batch_tracking: value
                .use_batch_tracking
                .unwrap_or(defaults.use_batch_tracking),
            enforce_truck_capacity: value
                .enforce_truck_capacity
                .unwrap_or(defaults.enforce_truck_capacity),
            integer_pallets: value.integer_pallets.unwrap_or(defaults.integer_pallets),
        }
    }
}

#[derive(Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields, rename = "SolveParams")]
pub struct JsonSolveParams {
    pub backend: Option<SolverBackend>,
    pub time_limit: Option<SignedDuration>,
    pub mip_rel_gap: Option<f64>,
    pub aggressive_heuristics: Option<bool>,
}

impl From<&JsonSolveParams> for SolveParams {
    fn from(value: &JsonSolveParams) -> Self {
        let defaults = SolveParams::default();
        SolveParams {
            backend: value.backend.unwrap_or(defaults.backend),
            time_limit: value.time_limit.unwrap_or(defaults.time_limit),
            mip_rel_gap: value.mip_rel_gap.unwrap_or(defaults.mip_rel_gap),
            aggressive_heuristics: value
                .aggressive_heuristics
                .unwrap_or(defaults.aggressive_heuristics),
        }
    }
}

impl JsonPlanningProblem {
    #[instrument(skip_all, level = "debug")]
    pub fn build_problem(&self) -> Result<PlanningProblem, PlanningError> {
        let mut builder = PlanningProblemBuilder::default();

        for location in &self.locations {
            builder.add_location(Location::new(
                location.id.clone(),
                location.location_type,
                location.storage,
            ));
        }

        for product in &self.products {
            builder.add_product(Product::new(
                product.id.clone(),
                product.ambient_shelf_life_days,
                product.frozen_shelf_life_days,
            ));
        }

        for route in &self.routes {
            builder.add_route(route.clone());
        }

        for demand in &self.forecast {
            builder.add_demand(
                demand.location.clone(),
                demand.product.clone(),
                demand.date,
                demand.quantity,
            );
        }

        let labor = self.labor.to_calendar();
        if labor.is_empty() {
            warn!("Scenario has no labor days, nothing can be produced");
        }
        builder.set_labor_calendar(labor);

        if let Some(manufacturing) = &self.manufacturing {
            builder.set_manufacturing(manufacturing.clone());
        }

        for truck in &self.trucks {
            builder.add_truck_schedule(truck.into());
        }

        if let Some(costs) = &self.costs {
            builder.set_costs(costs.clone());
        }

        for inventory in &self.initial_inventory {
            builder.add_initial_inventory(
                inventory.location.clone(),
                inventory.product.clone(),
                inventory.state,
                inventory.quantity,
                inventory.production_date,
            );
        }

        builder.build()
    }

    pub fn model_params(&self) -> ModelParams {
        self.model.as_ref().map(ModelParams::from).unwrap_or_default()
    }

    pub fn solve_params(&self) -> SolveParams {
        self.solver.as_ref().map(SolveParams::from).unwrap_or_default()
    }
}

/// Planning output keyed by external ids.
#[serde_as]
#[derive(Serialize)]
#[serde(rename = "PlanningResult")]
pub struct JsonPlanningResult {
    pub status: TerminationStatus,
    pub objective_value: Option<f64>,
    pub solve_time: SignedDuration,
    pub start: Date,
    pub end: Date,
    pub costs: Option<CostBreakdown>,
    #[serde_as(as = "BTreeMap<DisplayFromStr, _>")]
    pub production: BTreeMap<Date, BTreeMap<String, f64>>,
    #[serde_as(as = "BTreeMap<DisplayFromStr, _>")]
    pub labor_hours: BTreeMap<Date, f64>,
    pub shipments: Vec<JsonShipment>,
    pub shortages: Vec<JsonShortage>,
    pub trucks: Vec<JsonTruck>,
    pub unassigned: Vec<JsonUnassignedShipment>,
    pub windows: Vec<JsonWindow>,
}

#[derive(Serialize)]
#[serde(rename = "Shipment")]
pub struct JsonShipment {
    pub origin: String,
    pub destination: String,
    pub product: String,
    pub transport_mode: TransportMode,
    pub departure_date: Date,
    pub delivery_date: Date,
    pub quantity: f64,
}

#[derive(Serialize)]
#[serde(rename = "Shortage")]
pub struct JsonShortage {
    pub location: String,
    pub product: String,
    pub date: Date,
    pub quantity: f64,
}

#[derive(Serialize)]
#[serde(rename = "Truck")]
pub struct JsonTruck {
    pub id: String,
    pub date: Date,
    pub departure_type: DepartureType,
    pub units: f64,
    pub pallets: u32,
    pub utilization: f64,
    pub loads: Vec<JsonTruckLoad>,
}

#[derive(Serialize)]
#[serde(rename = "TruckLoad")]
pub struct JsonTruckLoad {
    pub stop: String,
    pub product: String,
    pub production_date: Option<Date>,
    pub quantity: f64,
    pub pallets: u32,
}

#[derive(Serialize)]
#[serde(rename = "UnassignedShipment")]
pub struct JsonUnassignedShipment {
    pub destination: String,
    pub product: String,
    pub departure_date: Date,
    pub quantity: f64,
    pub reason: UnassignedReason,
}

#[derive(Serialize)]
#[serde(rename = "Window")]
pub struct JsonWindow {
    pub start: Date,
    pub end: Date,
    pub commit_end: Date,
    pub status: TerminationStatus,
    pub objective_value: Option<f64>,
    pub solve_time: SignedDuration,
    pub committed: bool,
}

impl FromProblem<&PlanningResult> for JsonPlanningResult {
    fn from_problem(value: &PlanningResult, problem: &PlanningProblem) -> Self {
        let location_id = |index| problem.location(index).external_id().to_owned();
        let product_id = |index| problem.product(index).external_id().to_owned();

        let mut production: BTreeMap<Date, BTreeMap<String, f64>> = BTreeMap::new();
        let mut labor_hours = BTreeMap::new();
        let mut shipments = vec![];
        let mut shortages = vec![];

        if let Some(plan) = &value.plan {
            for ((date, product), quantity) in plan.production_by_date() {
                *production
                    .entry(date)
                    .or_default()
                    .entry(product_id(product))
                    .or_insert(0.0) += quantity;
            }
            labor_hours = plan.labor_hours_by_date();

            shipments = plan
                .shipments
                .iter()
                .map(|shipment| JsonShipment {
                    origin: location_id(shipment.origin),
                    destination: location_id(shipment.destination),
                    product: product_id(shipment.product),
                    transport_mode: shipment.transport_mode,
                    departure_date: shipment.departure_date,
                    delivery_date: shipment.delivery_date,
                    quantity: shipment.quantity,
                })
                .collect();

            shortages = plan
                .shortages
                .iter()
                .map(|shortage| JsonShortage {
                    location: location_id(shortage.location),
                    product: product_id(shortage.product),
                    date: shortage.date,
                    quantity: shortage.quantity,
                })
                .collect();
        }

        let (trucks, unassigned) = match &value.truck_loading {
            Some(loading) => (
                loading
                    .trucks
                    .iter()
                    .map(|truck| JsonTruck {
                        id: truck.truck_id.clone(),
                        date: truck.departure.date,
                        departure_type: truck.departure.departure_type,
                        units: truck.total_units,
                        pallets: truck.pallets,
                        utilization: truck.utilization(),
                        loads: truck
                            .loads
                            .iter()
                            .map(|load| JsonTruckLoad {
                                stop: location_id(load.stop),
                                product: product_id(load.product),
                                production_date: load.production_date,
                                quantity: load.quantity,
                                pallets: load.pallets,
                            })
                            .collect(),
                    })
                    .collect(),
                loading
                    .unassigned
                    .iter()
                    .map(|shipment| JsonUnassignedShipment {
                        destination: location_id(shipment.request.destination),
                        product: product_id(shipment.request.product),
                        departure_date: shipment.request.departure_date,
                        quantity: shipment.quantity,
                        reason: shipment.reason,
                    })
                    .collect(),
            ),
            None => (vec![], vec![]),
        };

        JsonPlanningResult {
            status: value.status,
            objective_value: value.objective_value,
            solve_time: value.solve_time,
            start: value.start,
            end: value.end,
            costs: value.plan.as_ref().map(|plan| plan.costs),
            production,
            labor_hours,
            shipments,
            shortages,
            trucks,
            unassigned,
            windows: value
                .windows
                .iter()
                .map(|report| JsonWindow {
                    start: report.window.start,
                    end: report.window.end,
                    commit_end: report.window.commit_end,
                    status: report.status,
                    objective_value: report.objective_value,
                    solve_time: report.solve_time,
                    committed: report.committed,
                })
                .collect(),
        }
    }
}
