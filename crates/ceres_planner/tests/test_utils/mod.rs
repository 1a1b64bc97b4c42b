use ceres_planner::{
    model::model_params::ModelParams,
    planner::{Planner, PlanningResult},
    problem::{
        labor::{LaborCalendar, ManufacturingParams, StandardLaborRates},
        location::{Location, LocationType},
        planning_problem::{PlanningProblem, PlanningProblemBuilder},
        product::Product,
        route_definition::RouteDefinition,
        storage_state::{StorageCapability, StorageState},
    },
    solution::plan_solution::PlanSolution,
    solver::solve_params::SolveParams,
};
use jiff::civil::{Date, date};

pub const TOLERANCE: f64 = 1e-3;

//
//  Calendar used by every scenario (June 2025):
//
//   Mo Tu We Th Fr Sa Su
//    2  3  4  5  6  7  8
//    9 10 11 12 13 14 15
//   16 17 18 19 20 21 22
//
//  Weekdays: 12 fixed hours + 2 overtime hours. Weekends: up to 14 hours
//  paid per hour. The line makes 100 units an hour, so 1400 a day.
pub fn create_labor() -> LaborCalendar {
    LaborCalendar::standard(
        date(2025, 6, 1),
        date(2025, 6, 30),
        &StandardLaborRates {
            minimum_hours: 0.0,
            ..StandardLaborRates::default()
        },
    )
}

pub fn create_manufacturing() -> ManufacturingParams {
    ManufacturingParams {
        production_rate_per_hour: 100.0,
        startup_hours: 0.0,
        shutdown_hours: 0.0,
        changeover_hours: 0.0,
    }
}

/// PLANT ships BREAD to STORE in one ambient day.
pub fn direct_problem_builder(demand: &[(Date, f64)]) -> PlanningProblemBuilder {
    let mut builder = PlanningProblemBuilder::default();
    builder
        .add_location(Location::new(
            "PLANT",
            LocationType::Manufacturing,
            StorageCapability::Ambient,
        ))
        .add_location(Location::new(
            "STORE",
            LocationType::Destination,
            StorageCapability::Ambient,
        ))
        .add_product(Product::new("BREAD", 17, 120))
        .add_route(RouteDefinition::single(
            "DIRECT",
            "PLANT",
            "STORE",
            1,
            StorageState::Ambient,
            0.3,
        ))
        .set_labor_calendar(create_labor())
        .set_manufacturing(create_manufacturing());

    for &(day, quantity) in demand {
        builder.add_demand("STORE", "BREAD", day, quantity);
    }

    builder
}

pub fn weekdays(from: Date, to: Date, quantity: f64) -> Vec<(Date, f64)> {
    let mut days = vec![];
    let mut day = from;
    while day <= to {
        if day.weekday().to_monday_one_offset() <= 5 {
            days.push((day, quantity));
        }
        day = day.tomorrow().unwrap();
    }
    days
}

pub fn solve(problem: PlanningProblem, params: ModelParams) -> PlanningResult {
    Planner::new(problem, params, SolveParams::default())
        .unwrap()
        .solve()
        .unwrap()
}

/// Solves to a proven optimum, for scenarios whose binaries make the
/// default relative gap too loose to assert exact values.
pub fn solve_exact(problem: PlanningProblem, params: ModelParams) -> PlanningResult {
    let solve_params = SolveParams {
        mip_rel_gap: 0.0,
        ..SolveParams::default()
    };
    Planner::new(problem, params, solve_params)
        .unwrap()
        .solve()
        .unwrap()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

/// Date and state invariants every accepted plan must satisfy.
pub fn assert_cohort_invariants(problem: &PlanningProblem, plan: &PlanSolution) {
    for entry in &plan.inventory {
        assert!(entry.quantity >= -TOLERANCE);
        assert!(problem.location(entry.location).supports(entry.state));
        if let Some(production_date) = entry.production_date {
            assert!(production_date <= entry.date);
        }
    }

    for shipment in &plan.cohort_shipments {
        assert!(shipment.departure_date >= plan.start);
        assert!(shipment.delivery_date >= shipment.departure_date);
        if let Some(production_date) = shipment.production_date {
            assert!(production_date <= shipment.departure_date);
        }
    }
}
