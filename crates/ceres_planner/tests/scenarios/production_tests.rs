use ceres_planner::{
    model::model_params::ModelParams,
    problem::{
        labor::{LaborCalendar, ManufacturingParams, StandardLaborRates},
        location::{Location, LocationType},
        planning_problem::PlanningProblemBuilder,
        product::Product,
        route_definition::RouteDefinition,
        storage_state::{StorageCapability, StorageState},
    },
    solver::termination::TerminationStatus,
};
use jiff::civil::date;

use crate::test_utils;

#[test]
fn test_changeover_between_products_takes_line_hours() {
    // Monday 2025-06-09 is the only production day for Tuesday's demand
    let mut builder = test_utils::direct_problem_builder(&[(date(2025, 6, 10), 650.0)]);
    builder
        .add_product(Product::new("CAKE", 7, 90))
        .add_demand("STORE", "CAKE", date(2025, 6, 10), 500.0)
        .set_manufacturing(ManufacturingParams {
            changeover_hours: 1.0,
            ..test_utils::create_manufacturing()
        });
    let problem = builder.build().unwrap();

    let result = test_utils::solve_exact(problem, ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);
    test_utils::assert_close(plan.total_production(), 1150.0);

    // 11.5 hours of production plus one changeover spills into overtime
    let monday = plan
        .labor
        .iter()
        .find(|entry| entry.date == date(2025, 6, 9))
        .unwrap();
    test_utils::assert_close(monday.hours_used, 12.5);
    test_utils::assert_close(monday.overtime_hours, 0.5);
    test_utils::assert_close(monday.paid_hours, 12.5);
}

#[test]
fn test_weekend_production_pays_minimum_hours() {
    // Monday's demand can only be made on Sunday 2025-06-08
    let mut builder = test_utils::direct_problem_builder(&[(date(2025, 6, 9), 300.0)]);
    builder.set_labor_calendar(LaborCalendar::standard(
        date(2025, 6, 1),
        date(2025, 6, 30),
        &StandardLaborRates::default(),
    ));
    let problem = builder.build().unwrap();

    let result = test_utils::solve_exact(problem, ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);

    let sunday = plan
        .labor
        .iter()
        .find(|entry| entry.date == date(2025, 6, 8))
        .unwrap();
    test_utils::assert_close(sunday.hours_used, 3.0);
    test_utils::assert_close(sunday.paid_hours, 4.0);
    test_utils::assert_close(sunday.cost, 4.0 * 40.0);
}

#[test]
fn test_pooled_stock_without_batch_tracking() {
    let demand = test_utils::weekdays(date(2025, 6, 9), date(2025, 6, 13), 400.0);
    let problem = test_utils::direct_problem_builder(&demand).build().unwrap();
    let params = ModelParams {
        use_batch_tracking: false,
        ..ModelParams::default()
    };

    let result = test_utils::solve(problem.clone(), params);

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);
    test_utils::assert_close(plan.total_consumption(), 2000.0);
    assert!(!plan.cohort_shipments.is_empty());
    assert!(
        plan.inventory
            .iter()
            .all(|entry| entry.production_date.is_none())
    );
    assert!(
        plan.cohort_shipments
            .iter()
            .all(|shipment| shipment.production_date.is_none())
    );

    test_utils::assert_cohort_invariants(&problem, plan);
}

#[test]
fn test_site_freezes_production_for_a_frozen_route() {
    // PLANT stores both states, STORE only keeps frozen stock
    let mut builder = PlanningProblemBuilder::default();
    builder
        .add_location(Location::new(
            "PLANT",
            LocationType::Manufacturing,
            StorageCapability::Both,
        ))
        .add_location(Location::new(
            "STORE",
            LocationType::Destination,
            StorageCapability::Frozen,
        ))
        .add_product(Product::new("BREAD", 3, 120))
        .add_route(RouteDefinition::single(
            "FROZEN",
            "PLANT",
            "STORE",
            1,
            StorageState::Frozen,
            0.4,
        ))
        .add_demand("STORE", "BREAD", date(2025, 6, 10), 500.0)
        .set_labor_calendar(test_utils::create_labor())
        .set_manufacturing(test_utils::create_manufacturing());
    let problem = builder.build().unwrap();
    let plant = problem.location_index("PLANT").unwrap();

    let result = test_utils::solve(problem.clone(), ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);

    let frozen = plan
        .state_changes
        .iter()
        .filter(|change| {
            change.location == plant
                && change.from_state == StorageState::Ambient
                && change.to_state == StorageState::Frozen
        })
        .map(|change| change.quantity)
        .sum::<f64>();
    test_utils::assert_close(frozen, 500.0);
    assert!(
        plan.state_changes
            .iter()
            .all(|change| change.to_state == StorageState::Frozen)
    );
    assert!(
        plan.state_changes
            .iter()
            .all(|change| change.production_date == Some(date(2025, 6, 9)))
    );
    test_utils::assert_close(plan.costs.freeze_thaw, 500.0 * 0.05);

    test_utils::assert_cohort_invariants(&problem, plan);
}
