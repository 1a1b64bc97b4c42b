use ceres_planner::{
    model::model_params::ModelParams,
    problem::{
        location::{Location, LocationType},
        planning_problem::{PlanningProblemBuilder, TruckScheduleInput},
        product::{Product, ProductIdx},
        route_definition::RouteDefinition,
        storage_state::{StorageCapability, StorageState},
    },
    solution::plan_solution::PlanSolution,
    solver::termination::TerminationStatus,
    trucks::{
        loading_policy::LoadingPolicy,
        truck_loading::{ShipmentRequest, UnassignedReason, assign_trucks},
    },
};
use jiff::civil::{date, time};

use crate::test_utils;

fn afternoon_truck(pallet_capacity: u32, units_per_pallet: u32) -> TruckScheduleInput {
    named_afternoon_truck("AFTERNOON", pallet_capacity, units_per_pallet)
}

fn named_afternoon_truck(
    id: &str,
    pallet_capacity: u32,
    units_per_pallet: u32,
) -> TruckScheduleInput {
    TruckScheduleInput {
        id: id.to_owned(),
        origin: "PLANT".to_owned(),
        destination: "STORE".to_owned(),
        intermediate_stops: vec![],
        day_of_week: None,
        departure_time: time(14, 0, 0, 0),
        pallet_capacity,
        units_per_pallet,
        units_per_case: 10,
    }
}

/// BREAD and CAKE due at STORE on Tuesday 2025-06-10, carried by Monday's
/// afternoon truck of 5 pallets of 100 units.
fn two_product_truck_builder(bread: f64, cake: f64) -> PlanningProblemBuilder {
    let mut builder = test_utils::direct_problem_builder(&[(date(2025, 6, 10), bread)]);
    builder
        .add_product(Product::new("CAKE", 7, 90))
        .add_demand("STORE", "CAKE", date(2025, 6, 10), cake)
        .add_truck_schedule(afternoon_truck(5, 100));
    builder
}

fn loaded(plan: &PlanSolution, product: ProductIdx) -> f64 {
    plan.truck_loads
        .iter()
        .filter(|load| load.product == product)
        .map(|load| load.quantity)
        .sum()
}

#[test]
fn test_trucks_carry_every_site_shipment() {
    let demand = test_utils::weekdays(date(2025, 6, 10), date(2025, 6, 13), 500.0);
    let mut builder = test_utils::direct_problem_builder(&demand);
    builder.add_truck_schedule(afternoon_truck(44, 320));
    let problem = builder.build().unwrap();

    let result = test_utils::solve(problem.clone(), ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);

    let site = problem.manufacturing_site();
    let shipped = plan
        .cohort_shipments
        .iter()
        .filter(|shipment| shipment.origin == site)
        .map(|shipment| shipment.quantity)
        .sum::<f64>();
    test_utils::assert_close(shipped, 2000.0);

    let loading = result.truck_loading.unwrap();
    assert!(loading.is_feasible());
    test_utils::assert_close(loading.total_assigned(), shipped);
    for truck in &loading.trucks {
        assert_eq!(truck.truck_id, "AFTERNOON");
        assert!(truck.pallets <= truck.pallet_capacity);
    }
}

#[test]
fn test_truck_capacity_limits_deliveries() {
    // Tuesday can only be served by Monday's truck, which holds 500 units
    let mut builder = test_utils::direct_problem_builder(&[(date(2025, 6, 10), 700.0)]);
    builder.add_truck_schedule(afternoon_truck(5, 100));
    let problem = builder.build().unwrap();

    let result = test_utils::solve(problem, ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_consumption(), 500.0);
    test_utils::assert_close(plan.total_shortage(), 200.0);

    let loading = result.truck_loading.unwrap();
    assert!(loading.is_feasible());
    assert_eq!(loading.trucks.len(), 1);
    assert_eq!(loading.trucks[0].departure.date, date(2025, 6, 9));
    assert_eq!(loading.trucks[0].pallets, 5);
    test_utils::assert_close(loading.trucks[0].utilization(), 1.0);
}

#[test]
fn test_no_truck_loading_without_schedules() {
    let demand = test_utils::weekdays(date(2025, 6, 10), date(2025, 6, 13), 500.0);
    let problem = test_utils::direct_problem_builder(&demand).build().unwrap();

    let result = test_utils::solve(problem, ModelParams::default());

    assert!(result.is_solved());
    assert!(result.truck_loading.is_none());
}

#[test]
fn test_overflow_is_reported_not_truncated() {
    let mut builder = test_utils::direct_problem_builder(&[(date(2025, 6, 10), 700.0)]);
    builder.add_truck_schedule(afternoon_truck(5, 100));
    let problem = builder.build().unwrap();

    let requests = [ShipmentRequest {
        destination: problem.location_index("STORE").unwrap(),
        product: ProductIdx::new(0),
        departure_date: date(2025, 6, 9),
        delivery_date: date(2025, 6, 10),
        production_date: Some(date(2025, 6, 9)),
        quantity: 700.0,
        planned_departure: None,
    }];
    let policy = LoadingPolicy {
        allow_split: false,
        ..LoadingPolicy::default()
    };

    let loading = assign_trucks(&problem, &requests, &policy);

    assert!(!loading.is_feasible());
    assert!(loading.trucks.is_empty());
    assert_eq!(loading.unassigned.len(), 1);
    assert_eq!(loading.unassigned[0].reason, UnassignedReason::CapacityExceeded);
    test_utils::assert_close(loading.unassigned[0].quantity, 700.0);
}

#[test]
fn test_split_fills_the_truck_and_reports_the_rest() {
    let mut builder = test_utils::direct_problem_builder(&[(date(2025, 6, 10), 700.0)]);
    builder.add_truck_schedule(afternoon_truck(5, 100));
    let problem = builder.build().unwrap();

    let requests = [ShipmentRequest {
        destination: problem.location_index("STORE").unwrap(),
        product: ProductIdx::new(0),
        departure_date: date(2025, 6, 9),
        delivery_date: date(2025, 6, 10),
        production_date: Some(date(2025, 6, 9)),
        quantity: 700.0,
        planned_departure: None,
    }];
    let policy = LoadingPolicy {
        allow_split: true,
        ..LoadingPolicy::default()
    };

    let loading = assign_trucks(&problem, &requests, &policy);

    test_utils::assert_close(loading.total_assigned(), 500.0);
    test_utils::assert_close(loading.total_unassigned(), 200.0);
    assert_eq!(loading.unassigned[0].reason, UnassignedReason::CapacityExceeded);
}

#[test]
fn test_loading_keeps_the_solved_split_over_trucks() {
    let mut builder = test_utils::direct_problem_builder(&[(date(2025, 6, 10), 800.0)]);
    builder
        .add_truck_schedule(named_afternoon_truck("FIRST", 5, 100))
        .add_truck_schedule(named_afternoon_truck("SECOND", 5, 100));
    let problem = builder.build().unwrap();

    let result = test_utils::solve(problem, ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);
    test_utils::assert_close(
        plan.truck_loads.iter().map(|load| load.quantity).sum::<f64>(),
        800.0,
    );

    // Neither truck holds the 800 units alone, so whole-request loading
    // without the solved split would leave everything unassigned
    let loading = result.truck_loading.unwrap();
    assert!(loading.is_feasible());
    test_utils::assert_close(loading.total_assigned(), 800.0);
    assert_eq!(loading.trucks.len(), 2);
    for truck in &loading.trucks {
        assert_eq!(truck.departure.date, date(2025, 6, 9));
        assert!(truck.pallets <= truck.pallet_capacity);
    }
}

#[test]
fn test_truck_loads_match_shipments_per_product() {
    let problem = two_product_truck_builder(300.0, 300.0).build().unwrap();

    let result = test_utils::solve(problem.clone(), ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.as_ref().unwrap();
    // 600 units due, 500 fit on the truck
    test_utils::assert_close(plan.total_shortage(), 100.0);

    let site = problem.manufacturing_site();
    for product in [ProductIdx::new(0), ProductIdx::new(1)] {
        let shipped = plan
            .cohort_shipments
            .iter()
            .filter(|shipment| shipment.origin == site && shipment.product == product)
            .map(|shipment| shipment.quantity)
            .sum::<f64>();
        test_utils::assert_close(loaded(plan, product), shipped);
    }
    test_utils::assert_close(
        loaded(plan, ProductIdx::new(0)) + loaded(plan, ProductIdx::new(1)),
        500.0,
    );
}

#[test]
fn test_integer_pallets_keep_products_on_separate_pallets() {
    let problem = two_product_truck_builder(250.0, 250.0).build().unwrap();

    let fractional = test_utils::solve_exact(problem.clone(), ModelParams::default());
    let whole = test_utils::solve_exact(
        problem,
        ModelParams {
            integer_pallets: true,
            ..ModelParams::default()
        },
    );

    // 500 units fill five pallets only when pallets may be shared
    let plan = fractional.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);

    // Each product needs three pallets of its own, the truck has five
    assert_eq!(whole.status, TerminationStatus::Optimal);
    let plan = whole.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 50.0);
    test_utils::assert_close(
        loaded(plan, ProductIdx::new(0)) + loaded(plan, ProductIdx::new(1)),
        450.0,
    );
}

#[test]
fn test_multi_stop_truck_shares_capacity() {
    // AFTERNOON drops at STORE_A on its way to STORE_B, both one day away
    let mut builder = PlanningProblemBuilder::default();
    builder
        .add_location(Location::new(
            "PLANT",
            LocationType::Manufacturing,
            StorageCapability::Ambient,
        ))
        .add_product(Product::new("BREAD", 17, 120))
        .set_labor_calendar(test_utils::create_labor())
        .set_manufacturing(test_utils::create_manufacturing());
    for store in ["STORE_A", "STORE_B"] {
        builder
            .add_location(Location::new(
                store,
                LocationType::Destination,
                StorageCapability::Ambient,
            ))
            .add_route(RouteDefinition::single(
                format!("PLANT-{store}"),
                "PLANT",
                store,
                1,
                StorageState::Ambient,
                0.2,
            ))
            .add_demand(store, "BREAD", date(2025, 6, 10), 300.0);
    }
    builder.add_truck_schedule(TruckScheduleInput {
        destination: "STORE_B".to_owned(),
        intermediate_stops: vec!["STORE_A".to_owned()],
        ..afternoon_truck(5, 100)
    });
    let problem = builder.build().unwrap();
    let store_a = problem.location_index("STORE_A").unwrap();
    let store_b = problem.location_index("STORE_B").unwrap();

    let result = test_utils::solve(problem.clone(), ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 100.0);
    test_utils::assert_close(plan.total_consumption(), 500.0);

    let at_stop = |stop| {
        plan.truck_loads
            .iter()
            .filter(|load| load.stop == stop)
            .map(|load| load.quantity)
            .sum::<f64>()
    };
    test_utils::assert_close(at_stop(store_a) + at_stop(store_b), 500.0);
    assert!(at_stop(store_a) <= 300.0 + test_utils::TOLERANCE);
    assert!(at_stop(store_b) <= 300.0 + test_utils::TOLERANCE);
    assert!(
        plan.truck_loads
            .iter()
            .all(|load| load.date == date(2025, 6, 9))
    );

    let loading = result.truck_loading.unwrap();
    assert_eq!(loading.trucks.len(), 1);
    test_utils::assert_close(loading.total_assigned(), 500.0);

    test_utils::assert_cohort_invariants(&problem, plan);
}
