use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::Serialize;

use crate::{
    network::leg::LegIdx,
    problem::{
        location::LocationIdx, planning_problem::PlanningProblem, product::ProductIdx,
        storage_state::StorageState,
    },
    utils::dates,
};

/// Stock on hand at a location at the end of `OpeningState::as_of`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InventoryCohort {
    pub location: LocationIdx,
    pub product: ProductIdx,
    pub production_date: Option<Date>,
    pub state: StorageState,
    pub quantity: f64,
}

/// A shipment that already left its origin and lands during a later window.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InTransitArrival {
    pub leg: LegIdx,
    pub destination: LocationIdx,
    pub product: ProductIdx,
    pub production_date: Option<Date>,
    pub state: StorageState,
    pub departure_date: Date,
    pub delivery_date: Date,
    pub quantity: f64,
}

/// Everything a window starts from: cohorts on hand the evening before the
/// window starts and shipments still on the road.
#[derive(Serialize, Debug, Clone, Default)]
pub struct OpeningState {
    pub inventory: Vec<InventoryCohort>,
    pub in_transit: Vec<InTransitArrival>,
}

impl OpeningState {
    /// Initial inventory of the problem for a horizon starting at `start`.
    /// Stock without a production date counts as produced the day before.
    pub fn from_problem(problem: &PlanningProblem, start: Date) -> Self {
        let inventory = problem
            .initial_inventory()
            .iter()
            .filter(|entry| entry.quantity > 0.0)
            .map(|entry| InventoryCohort {
                location: entry.location,
                product: entry.product,
                production_date: Some(
                    entry
                        .production_date
                        .unwrap_or_else(|| dates::add_days(start, -1)),
                ),
                state: entry.state,
                quantity: entry.quantity,
            })
            .collect();

        let mut opening = Self {
            inventory,
            in_transit: Vec::new(),
        };
        opening.merge_duplicates();
        opening
    }

    pub fn total_inventory(&self) -> f64 {
        self.inventory.iter().map(|cohort| cohort.quantity).sum()
    }

    pub fn total_in_transit(&self) -> f64 {
        self.in_transit.iter().map(|arrival| arrival.quantity).sum()
    }

    pub fn total(&self) -> f64 {
        self.total_inventory() + self.total_in_transit()
    }

    pub fn is_empty(&self) -> bool {
        self.inventory.is_empty() && self.in_transit.is_empty()
    }

    /// The same stock seen from the evening of `new_as_of` when nothing
    /// happened in between: arrivals up to that day are landed and cohorts
    /// past their shelf life are dropped. Returns the dropped quantity.
    pub fn advance_to(
        &self,
        problem: &PlanningProblem,
        new_as_of: Date,
        enforce_shelf_life: bool,
    ) -> (OpeningState, f64) {
        let mut inventory = self.inventory.clone();
        let mut in_transit = Vec::with_capacity(self.in_transit.len());

        for arrival in &self.in_transit {
            if arrival.delivery_date <= new_as_of {
                inventory.push(InventoryCohort {
                    location: arrival.destination,
                    product: arrival.product,
                    production_date: arrival.production_date,
                    state: arrival.state,
                    quantity: arrival.quantity,
                });
            } else {
                in_transit.push(arrival.clone());
            }
        }

        let mut expired = 0.0;
        if enforce_shelf_life {
            inventory.retain(|cohort| {
                let keep = is_fresh(problem, cohort, new_as_of);
                if !keep {
                    expired += cohort.quantity;
                }
                keep
            });
        }

        let mut advanced = OpeningState {
            inventory,
            in_transit,
        };
        advanced.merge_duplicates();
        (advanced, expired)
    }

    /// Collapses cohorts sharing (location, product, production date, state).
    pub(crate) fn merge_duplicates(&mut self) {
        let mut merged: BTreeMap<(LocationIdx, ProductIdx, Option<Date>, StorageState), f64> =
            BTreeMap::new();
        for cohort in &self.inventory {
            *merged
                .entry((
                    cohort.location,
                    cohort.product,
                    cohort.production_date,
                    cohort.state,
                ))
                .or_insert(0.0) += cohort.quantity;
        }

        self.inventory = merged
            .into_iter()
            .filter(|(_, quantity)| *quantity > 0.0)
            .map(
                |((location, product, production_date, state), quantity)| InventoryCohort {
                    location,
                    product,
                    production_date,
                    state,
                    quantity,
                },
            )
            .collect();
    }
}

/// Whether `cohort` may still be held on `date`.
pub(crate) fn is_fresh(problem: &PlanningProblem, cohort: &InventoryCohort, date: Date) -> bool {
    within_shelf_life(
        problem,
        cohort.product,
        cohort.production_date,
        cohort.state,
        date,
    )
}

/// Age on `date` does not exceed the shelf life of `product` in `state`.
/// Stock without a production date never expires.
pub(crate) fn within_shelf_life(
    problem: &PlanningProblem,
    product: ProductIdx,
    production_date: Option<Date>,
    state: StorageState,
    date: Date,
) -> bool {
    production_date.is_none_or(|production_date| {
        dates::days_between(production_date, date)
            <= problem.product(product).shelf_life_days(state) as i32
    })
}
