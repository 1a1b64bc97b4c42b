use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::{
    error::PlanningError,
    model::model_params::ModelParams,
    problem::planning_problem::PlanningProblem,
    solution::{
        material_balance::{MaterialBalance, check_material_balance},
        plan_solution::PlanSolution,
    },
    utils::dates,
};

const DEMAND_TOLERANCE: f64 = 1e-3;

/// Runs every structural check on an accepted solution and returns its
/// material balance at the end of the solution.
#[instrument(skip_all, level = "debug")]
pub fn validate_solution(
    problem: &PlanningProblem,
    params: &ModelParams,
    solution: &PlanSolution,
) -> Result<MaterialBalance, PlanningError> {
    check_cohort_invariants(problem, params, solution)?;
    check_demand(problem, solution)?;
    let balance = check_material_balance(solution, solution.end)?;
    debug!(gap = balance.gap(), "Solution passed invariant checks");
    Ok(balance)
}

pub fn check_cohort_invariants(
    problem: &PlanningProblem,
    params: &ModelParams,
    solution: &PlanSolution,
) -> Result<(), PlanningError> {
    for entry in &solution.inventory {
        let location = problem.location(entry.location);
        if !location.supports(entry.state) {
            return Err(PlanningError::CohortInvariant(format!(
                "{} inventory of '{}' at '{}' on {}",
                entry.state,
                problem.product(entry.product).external_id(),
                location.external_id(),
                entry.date
            )));
        }

        if let Some(production_date) = entry.production_date {
            if entry.date < production_date {
                return Err(PlanningError::CohortInvariant(format!(
                    "cohort produced {production_date} held at '{}' on {}",
                    location.external_id(),
                    entry.date
                )));
            }

            let shelf_life = problem.product(entry.product).shelf_life_days(entry.state);
            if params.tracks_shelf_life()
                && dates::days_between(production_date, entry.date) > shelf_life as i32
            {
                return Err(PlanningError::CohortInvariant(format!(
                    "cohort produced {production_date} held {} at '{}' on {} past its {shelf_life} day shelf life",
                    entry.state,
                    location.external_id(),
                    entry.date
                )));
            }
        }
    }

    for entry in &solution.shipments {
        if entry.departure_date < solution.start {
            return Err(PlanningError::CohortInvariant(format!(
                "shipment of {:.3} delivered {} departed {} before the window start {}",
                entry.quantity, entry.delivery_date, entry.departure_date, solution.start
            )));
        }
    }

    for entry in &solution.cohort_shipments {
        if entry.delivery_date < entry.departure_date
            || entry
                .production_date
                .is_some_and(|production_date| entry.departure_date < production_date)
        {
            return Err(PlanningError::CohortInvariant(format!(
                "cohort shipment departing {} delivered {} violates date order",
                entry.departure_date, entry.delivery_date
            )));
        }
    }

    for entry in &solution.state_changes {
        if !problem.location(entry.location).storage().supports_both() {
            return Err(PlanningError::CohortInvariant(format!(
                "state change at '{}' which cannot hold both states",
                problem.location(entry.location).external_id()
            )));
        }
    }

    Ok(())
}

/// Every demand entry is either consumed or short, never both for the same unit.
pub fn check_demand(problem: &PlanningProblem, solution: &PlanSolution) -> Result<(), PlanningError> {
    let mut consumed = BTreeMap::new();
    for entry in &solution.consumption {
        *consumed
            .entry((entry.location, entry.product, entry.date))
            .or_insert(0.0) += entry.quantity;
    }
    let mut short = BTreeMap::new();
    for entry in &solution.shortages {
        *short
            .entry((entry.location, entry.product, entry.date))
            .or_insert(0.0) += entry.quantity;
    }

    for demand in problem.forecast().entries_between(solution.start, solution.end) {
        let key = (demand.location, demand.product, demand.date);
        let consumed = consumed.get(&key).copied().unwrap_or(0.0);
        let shortage = short.get(&key).copied().unwrap_or(0.0);

        if (consumed + shortage - demand.quantity).abs() > DEMAND_TOLERANCE {
            return Err(PlanningError::DemandMismatch {
                location: problem.location(demand.location).external_id().to_owned(),
                product: problem.product(demand.product).external_id().to_owned(),
                date: demand.date,
                consumed,
                shortage,
                demand: demand.quantity,
            });
        }
    }

    Ok(())
}
