use std::{cmp::Reverse, collections::BTreeMap};

use jiff::civil::Date;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{
    problem::{
        location::LocationIdx,
        planning_problem::PlanningProblem,
        product::ProductIdx,
        truck_schedule::{DepartureType, TruckDeparture, TruckSchedule},
    },
    solution::plan_solution::PlanSolution,
    trucks::loading_policy::{CaseRounding, LoadingPolicy},
};

const EPSILON: f64 = 1e-6;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProductionTiming {
    /// Produced before the departure day, or of unknown age.
    DMinusOne,
    /// Produced on the departure day.
    DZero,
}

/// A quantity that has to leave the manufacturing site on a given day
/// towards the first stop of its route.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ShipmentRequest {
    pub destination: LocationIdx,
    pub product: ProductIdx,
    pub departure_date: Date,
    pub delivery_date: Date,
    pub production_date: Option<Date>,
    pub quantity: f64,
    /// Departure the solved plan put this quantity on. Unpinned requests may
    /// ride any matching departure of their day.
    pub planned_departure: Option<TruckDeparture>,
}

impl ShipmentRequest {
    pub fn production_timing(&self) -> ProductionTiming {
        match self.production_date {
            Some(production_date) if production_date >= self.departure_date => {
                ProductionTiming::DZero
            }
            _ => ProductionTiming::DMinusOne,
        }
    }

    fn accepted_by(&self, departure_type: DepartureType) -> bool {
        self.production_timing() == ProductionTiming::DMinusOne
            || departure_type.accepts_same_day_production()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TruckLoad {
    pub stop: LocationIdx,
    pub product: ProductIdx,
    pub production_date: Option<Date>,
    pub delivery_date: Date,
    pub quantity: f64,
    pub pallets: u32,
}

/// Everything loaded on one departure.
#[derive(Serialize, Debug, Clone)]
pub struct TruckAssignment {
    pub departure: TruckDeparture,
    pub truck_id: String,
    pub loads: Vec<TruckLoad>,
    pub total_units: f64,
    pub pallets: u32,
    pub pallet_capacity: u32,
}

impl TruckAssignment {
    /// Share of the pallet positions in use.
    pub fn utilization(&self) -> f64 {
        if self.pallet_capacity == 0 {
            return 0.0;
        }
        f64::from(self.pallets) / f64::from(self.pallet_capacity)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnassignedReason {
    NoMatchingDeparture,
    /// Only morning departures matched and the stock is produced that day.
    SameDayProductionOnMorningTruck,
    CapacityExceeded,
    /// Dropped when rounding down to whole cases.
    CaseRemainder,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UnassignedShipment {
    pub request: ShipmentRequest,
    pub quantity: f64,
    pub reason: UnassignedReason,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct TruckLoadingPlan {
    pub trucks: Vec<TruckAssignment>,
    pub unassigned: Vec<UnassignedShipment>,
}

impl TruckLoadingPlan {
    pub fn is_feasible(&self) -> bool {
        self.unassigned.is_empty()
    }

    pub fn total_assigned(&self) -> f64 {
        self.trucks.iter().map(|truck| truck.total_units).sum()
    }

    pub fn total_unassigned(&self) -> f64 {
        self.unassigned.iter().map(|shipment| shipment.quantity).sum()
    }
}

/// Cohort shipments leaving the manufacturing site, one request per
/// (first stop, product, departure, delivery, production date). Requests
/// are split over the truck loads of the plan for their stop, product and
/// day, so every piece keeps the departure the solver chose for it.
pub fn shipment_requests(problem: &PlanningProblem, plan: &PlanSolution) -> Vec<ShipmentRequest> {
    let site = problem.manufacturing_site();
    let mut grouped = BTreeMap::new();

    for shipment in plan
        .cohort_shipments
        .iter()
        .filter(|shipment| shipment.origin == site)
    {
        *grouped
            .entry((
                shipment.destination,
                shipment.product,
                shipment.departure_date,
                shipment.delivery_date,
                shipment.production_date,
            ))
            .or_insert(0.0) += shipment.quantity;
    }

    let mut requests = grouped
        .into_iter()
        .filter(|(_, quantity)| *quantity > EPSILON)
        .map(
            |((destination, product, departure_date, delivery_date, production_date), quantity)| {
                ShipmentRequest {
                    destination,
                    product,
                    departure_date,
                    delivery_date,
                    production_date,
                    quantity,
                    planned_departure: None,
                }
            },
        )
        .collect::<Vec<_>>();

    let mut planned: BTreeMap<(LocationIdx, ProductIdx, Date), Vec<(TruckDeparture, f64)>> =
        BTreeMap::new();
    for load in plan.truck_loads.iter().filter(|load| load.quantity > EPSILON) {
        let departure = TruckDeparture {
            date: load.date,
            departure_type: load.departure_type,
            schedule: load.truck,
        };
        planned
            .entry((load.stop, load.product, load.date))
            .or_default()
            .push((departure, load.quantity));
    }
    if planned.is_empty() {
        return requests;
    }
    for departures in planned.values_mut() {
        departures.sort_by_key(|(departure, _)| *departure);
    }

    // Same-day production only fits afternoon room, so it goes first
    requests.sort_by_key(|request| Reverse(request.production_timing()));

    let mut pinned = Vec::with_capacity(requests.len());
    for request in requests {
        let Some(departures) =
            planned.get_mut(&(request.destination, request.product, request.departure_date))
        else {
            pinned.push(request);
            continue;
        };

        let mut remaining = request.quantity;
        for (departure, room) in departures.iter_mut() {
            if remaining <= EPSILON {
                break;
            }
            if *room <= EPSILON || !request.accepted_by(departure.departure_type) {
                continue;
            }

            let quantity = remaining.min(*room);
            *room -= quantity;
            remaining -= quantity;
            pinned.push(ShipmentRequest {
                quantity,
                planned_departure: Some(*departure),
                ..request.clone()
            });
        }

        if remaining > EPSILON {
            pinned.push(ShipmentRequest {
                quantity: remaining,
                ..request
            });
        }
    }

    pinned
}

struct Candidate {
    request: ShipmentRequest,
    remaining: f64,
    matched_departure: bool,
    blocked_by_morning: bool,
}

/// Greedy assignment of requests onto the concrete departures of the
/// truck schedules. Departures are filled in date order, morning first.
#[instrument(skip_all, level = "debug")]
pub fn assign_trucks(
    problem: &PlanningProblem,
    requests: &[ShipmentRequest],
    policy: &LoadingPolicy,
) -> TruckLoadingPlan {
    let mut plan = TruckLoadingPlan::default();
    let site = problem.manufacturing_site();
    let trucks = problem.trucks();

    let mut candidates = requests
        .iter()
        .map(|request| Candidate {
            request: request.clone(),
            remaining: request.quantity,
            matched_departure: false,
            blocked_by_morning: false,
        })
        .collect::<Vec<_>>();

    let (Some(first), Some(last)) = (
        requests.iter().map(|request| request.departure_date).min(),
        requests.iter().map(|request| request.departure_date).max(),
    ) else {
        return plan;
    };

    for departure in trucks.departures_between(first, last) {
        let schedule = trucks.schedule(departure.schedule);
        if schedule.origin() != site {
            continue;
        }

        let mut order = Vec::new();
        for (index, candidate) in candidates.iter_mut().enumerate() {
            let request = &candidate.request;
            if candidate.remaining <= EPSILON
                || request.departure_date != departure.date
                || !schedule.serves(request.destination)
                || request
                    .planned_departure
                    .is_some_and(|planned| planned != departure)
            {
                continue;
            }

            if request.accepted_by(departure.departure_type) {
                candidate.matched_departure = true;
                order.push(index);
            } else {
                candidate.blocked_by_morning = true;
            }
        }

        order.sort_by(|&a, &b| {
            let (a, b) = (&candidates[a], &candidates[b]);
            a.request
                .production_timing()
                .cmp(&b.request.production_timing())
                .then(b.remaining.total_cmp(&a.remaining))
                .then(a.request.production_date.cmp(&b.request.production_date))
        });

        if let Some(assignment) = load_departure(
            departure,
            schedule,
            &mut candidates,
            &order,
            policy,
            &mut plan.unassigned,
        ) {
            debug!(
                truck = %assignment.truck_id,
                date = %departure.date,
                units = assignment.total_units,
                pallets = assignment.pallets,
                "Loaded departure"
            );
            plan.trucks.push(assignment);
        }
    }

    for candidate in candidates {
        if candidate.remaining <= EPSILON {
            continue;
        }

        let reason = if candidate.matched_departure {
            UnassignedReason::CapacityExceeded
        } else if candidate.blocked_by_morning {
            UnassignedReason::SameDayProductionOnMorningTruck
        } else {
            UnassignedReason::NoMatchingDeparture
        };

        warn!(
            destination = %problem.location(candidate.request.destination).external_id(),
            date = %candidate.request.departure_date,
            quantity = candidate.remaining,
            ?reason,
            "Shipment not assigned to a truck"
        );
        plan.unassigned.push(UnassignedShipment {
            request: candidate.request,
            quantity: candidate.remaining,
            reason,
        });
    }

    plan
}

/// Fills one departure in `order`. Quantities are rounded to the cases of
/// this schedule, rounding losses go to `remainders`.
fn load_departure(
    departure: TruckDeparture,
    schedule: &TruckSchedule,
    candidates: &mut [Candidate],
    order: &[usize],
    policy: &LoadingPolicy,
    remainders: &mut Vec<UnassignedShipment>,
) -> Option<TruckAssignment> {
    let units_per_pallet = f64::from(schedule.units_per_pallet());
    let units_per_case = schedule.units_per_case();
    let mut free_pallets = schedule.pallet_capacity();
    let mut loads = Vec::new();

    for &index in order {
        if free_pallets == 0 {
            break;
        }

        let candidate = &mut candidates[index];
        let wanted = policy.case_rounding.apply(candidate.remaining, units_per_case);
        let fits = pallets_for(wanted, units_per_pallet) <= free_pallets;
        let quantity = if fits {
            wanted
        } else if policy.allow_split {
            let room = f64::from(free_pallets) * units_per_pallet;
            match policy.case_rounding {
                CaseRounding::None => room,
                _ => CaseRounding::Down.apply(room, units_per_case),
            }
        } else {
            continue;
        };
        if quantity <= EPSILON {
            continue;
        }

        if fits {
            let dropped = candidate.remaining - wanted;
            if dropped > EPSILON {
                remainders.push(UnassignedShipment {
                    request: candidate.request.clone(),
                    quantity: dropped,
                    reason: UnassignedReason::CaseRemainder,
                });
            }
            candidate.remaining = 0.0;
        } else {
            candidate.remaining -= quantity;
        }

        let pallets = pallets_for(quantity, units_per_pallet);
        free_pallets -= pallets;
        loads.push(TruckLoad {
            stop: candidate.request.destination,
            product: candidate.request.product,
            production_date: candidate.request.production_date,
            delivery_date: candidate.request.delivery_date,
            quantity,
            pallets,
        });
    }

    if loads.is_empty() {
        return None;
    }

    Some(TruckAssignment {
        departure,
        truck_id: schedule.external_id().to_owned(),
        total_units: loads.iter().map(|load| load.quantity).sum(),
        pallets: loads.iter().map(|load| load.pallets).sum(),
        pallet_capacity: schedule.pallet_capacity(),
        loads,
    })
}

/// Partial pallets occupy a full position.
fn pallets_for(quantity: f64, units_per_pallet: f64) -> u32 {
    (quantity / units_per_pallet - 1e-9).ceil().max(0.0) as u32
}
