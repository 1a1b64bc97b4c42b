use std::collections::BTreeMap;

use jiff::{SignedDuration, civil::Date};
use serde::Serialize;

use crate::{
    model::planning_window::PlanningWindow,
    network::{leg::LegIdx, planning_network::PlanningNetwork},
    problem::{
        location::LocationIdx,
        planning_problem::PlanningProblem,
        product::ProductIdx,
        storage_state::{StorageState, TransportMode},
        truck_schedule::{DepartureType, TruckScheduleIdx},
    },
    solution::cost_breakdown::CostBreakdown,
    solver::termination::TerminationStatus,
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProductionEntry {
    pub date: Date,
    pub product: ProductIdx,
    pub quantity: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LaborEntry {
    pub date: Date,
    /// Production plus startup, shutdown and changeover hours.
    pub hours_used: f64,
    pub overtime_hours: f64,
    pub paid_hours: f64,
    pub cost: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InventoryEntry {
    pub location: LocationIdx,
    pub product: ProductIdx,
    pub production_date: Option<Date>,
    pub state: StorageState,
    /// End-of-day position.
    pub date: Date,
    pub quantity: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ShipmentEntry {
    pub leg: LegIdx,
    pub origin: LocationIdx,
    pub destination: LocationIdx,
    pub product: ProductIdx,
    pub transport_mode: TransportMode,
    pub departure_date: Date,
    pub delivery_date: Date,
    pub quantity: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CohortShipmentEntry {
    pub leg: LegIdx,
    pub origin: LocationIdx,
    pub destination: LocationIdx,
    pub product: ProductIdx,
    pub production_date: Option<Date>,
    pub departure_state: StorageState,
    pub arrival_state: StorageState,
    pub departure_date: Date,
    pub delivery_date: Date,
    pub quantity: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StateChangeEntry {
    pub location: LocationIdx,
    pub product: ProductIdx,
    pub production_date: Option<Date>,
    pub date: Date,
    pub from_state: StorageState,
    pub to_state: StorageState,
    pub quantity: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ConsumptionEntry {
    pub location: LocationIdx,
    pub product: ProductIdx,
    pub production_date: Option<Date>,
    pub state: StorageState,
    pub date: Date,
    pub quantity: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ShortageEntry {
    pub location: LocationIdx,
    pub product: ProductIdx,
    pub date: Date,
    pub quantity: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TruckLoadEntry {
    pub truck: TruckScheduleIdx,
    pub departure_type: DepartureType,
    pub stop: LocationIdx,
    pub product: ProductIdx,
    pub date: Date,
    pub quantity: f64,
}

/// Stock a window started from, split the way the material balance needs it.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct OpeningSummary {
    pub inventory: f64,
    /// (landing date, quantity) of shipments still on the road at the start.
    pub in_transit: Vec<(Date, f64)>,
    /// Opening stock past its shelf life before it could be used.
    pub expired: f64,
}

impl OpeningSummary {
    pub fn total(&self) -> f64 {
        self.inventory + self.in_transit.iter().map(|(_, quantity)| quantity).sum::<f64>()
    }

    pub fn in_transit_after(&self, date: Date) -> f64 {
        self.in_transit
            .iter()
            .filter(|(landing, _)| *landing > date)
            .map(|(_, quantity)| quantity)
            .sum()
    }
}

/// Plain-data plan read out of a solved model. Only non-zero flows are
/// listed, labor days are always listed so fixed labor cost stays visible.
#[derive(Serialize, Debug, Clone)]
pub struct PlanSolution {
    pub start: Date,
    pub end: Date,
    pub opening: OpeningSummary,
    pub production: Vec<ProductionEntry>,
    pub labor: Vec<LaborEntry>,
    pub inventory: Vec<InventoryEntry>,
    pub shipments: Vec<ShipmentEntry>,
    pub cohort_shipments: Vec<CohortShipmentEntry>,
    pub state_changes: Vec<StateChangeEntry>,
    pub consumption: Vec<ConsumptionEntry>,
    pub shortages: Vec<ShortageEntry>,
    pub truck_loads: Vec<TruckLoadEntry>,
    pub costs: CostBreakdown,
}

impl PlanSolution {
    pub fn total_production(&self) -> f64 {
        self.production.iter().map(|entry| entry.quantity).sum()
    }

    pub fn total_consumption(&self) -> f64 {
        self.consumption.iter().map(|entry| entry.quantity).sum()
    }

    pub fn total_shortage(&self) -> f64 {
        self.shortages.iter().map(|entry| entry.quantity).sum()
    }

    pub fn production_by_date(&self) -> BTreeMap<(Date, ProductIdx), f64> {
        let mut production = BTreeMap::new();
        for entry in &self.production {
            *production.entry((entry.date, entry.product)).or_insert(0.0) += entry.quantity;
        }
        production
    }

    pub fn labor_hours_by_date(&self) -> BTreeMap<Date, f64> {
        self.labor
            .iter()
            .map(|entry| (entry.date, entry.hours_used))
            .collect()
    }

    /// Cohorts on hand at the end of `date`.
    pub fn inventory_on(&self, date: Date) -> impl Iterator<Item = &InventoryEntry> {
        self.inventory.iter().filter(move |entry| entry.date == date)
    }

    /// Cohort shipments that left on or before `date` and land after it.
    pub fn in_transit_after(&self, date: Date) -> impl Iterator<Item = &CohortShipmentEntry> {
        self.cohort_shipments
            .iter()
            .filter(move |entry| entry.departure_date <= date && entry.delivery_date > date)
    }

    /// The part of the plan decided on or before `through`, with costs
    /// recomputed for that part only.
    pub fn truncated(
        &self,
        through: Date,
        problem: &PlanningProblem,
        network: &PlanningNetwork,
    ) -> PlanSolution {
        let mut truncated = PlanSolution {
            start: self.start,
            end: through.min(self.end),
            opening: self.opening.clone(),
            production: keep_until(&self.production, through, |entry| entry.date),
            labor: keep_until(&self.labor, through, |entry| entry.date),
            inventory: keep_until(&self.inventory, through, |entry| entry.date),
            shipments: keep_until(&self.shipments, through, |entry| entry.departure_date),
            cohort_shipments: keep_until(&self.cohort_shipments, through, |entry| {
                entry.departure_date
            }),
            state_changes: keep_until(&self.state_changes, through, |entry| entry.date),
            consumption: keep_until(&self.consumption, through, |entry| entry.date),
            shortages: keep_until(&self.shortages, through, |entry| entry.date),
            truck_loads: keep_until(&self.truck_loads, through, |entry| entry.date),
            costs: CostBreakdown::default(),
        };
        truncated.costs = CostBreakdown::compute(problem, network, &truncated);
        truncated
    }

    /// Appends a later, non-overlapping part of the plan. Opening stock of
    /// the later part is already counted here, only its expiry is added.
    pub fn append(&mut self, other: PlanSolution) {
        self.end = self.end.max(other.end);
        self.opening.expired += other.opening.expired;
        self.production.extend(other.production);
        self.labor.extend(other.labor);
        self.inventory.extend(other.inventory);
        self.shipments.extend(other.shipments);
        self.cohort_shipments.extend(other.cohort_shipments);
        self.state_changes.extend(other.state_changes);
        self.consumption.extend(other.consumption);
        self.shortages.extend(other.shortages);
        self.truck_loads.extend(other.truck_loads);
        self.costs += other.costs;
    }
}

fn keep_until<T: Clone>(entries: &[T], through: Date, date: impl Fn(&T) -> Date) -> Vec<T> {
    entries
        .iter()
        .filter(|&entry| date(entry) <= through)
        .cloned()
        .collect()
}

/// Outcome of solving one window. `solution` is only present when the
/// status carries one.
#[derive(Serialize, Debug, Clone)]
pub struct WindowResult {
    pub window: PlanningWindow,
    pub status: TerminationStatus,
    pub objective_value: Option<f64>,
    pub solve_time: SignedDuration,
    pub message: Option<String>,
    pub solution: Option<PlanSolution>,
}

impl WindowResult {
    pub fn is_solved(&self) -> bool {
        self.status.has_solution() && self.solution.is_some()
    }
}
