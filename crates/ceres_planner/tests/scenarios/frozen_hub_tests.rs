use ceres_planner::{
    model::model_params::ModelParams,
    network::planning_network::PlanningNetwork,
    problem::{
        location::{Location, LocationType},
        planning_problem::{PlanningProblem, PlanningProblemBuilder},
        product::Product,
        route_definition::RouteDefinition,
        storage_state::{StorageCapability, StorageState},
    },
    solver::termination::TerminationStatus,
};
use jiff::civil::date;

use crate::test_utils;

// PLANT (frozen) --frozen, 1 day--> HUB (ambient only) --ambient, 1 day--> STORE
fn create_frozen_hub_problem() -> PlanningProblem {
    let mut builder = PlanningProblemBuilder::default();
    builder
        .add_location(Location::new(
            "PLANT",
            LocationType::Manufacturing,
            StorageCapability::Frozen,
        ))
        .add_location(Location::new(
            "HUB",
            LocationType::Hub,
            StorageCapability::Ambient,
        ))
        .add_location(Location::new(
            "STORE",
            LocationType::Destination,
            StorageCapability::Ambient,
        ))
        .add_product(Product::new("BREAD", 5, 120))
        .add_route(RouteDefinition::single(
            "PLANT-HUB",
            "PLANT",
            "HUB",
            1,
            StorageState::Frozen,
            0.2,
        ))
        .add_route(RouteDefinition::single(
            "HUB-STORE",
            "HUB",
            "STORE",
            1,
            StorageState::Ambient,
            0.1,
        ))
        .set_labor_calendar(test_utils::create_labor())
        .set_manufacturing(test_utils::create_manufacturing());

    for day in 10..=12 {
        builder.add_demand("STORE", "BREAD", date(2025, 6, day), 200.0);
    }

    builder.build().unwrap()
}

#[test]
fn test_frozen_leg_arrives_ambient_at_hub() {
    let problem = create_frozen_hub_problem();
    let network = PlanningNetwork::build(&problem, ModelParams::default().route_params()).unwrap();

    let plant = problem.location_index("PLANT").unwrap();
    let hub = problem.location_index("HUB").unwrap();
    let leg = network
        .leg(network.topology().find_leg(plant, hub).unwrap())
        .clone();

    assert_eq!(leg.departure_state(), StorageState::Frozen);
    assert_eq!(leg.arrival_state(), StorageState::Ambient);
    assert!(leg.is_forced_thaw());
}

#[test]
fn test_frozen_into_ambient_hub_scenario() {
    let problem = create_frozen_hub_problem();
    let hub = problem.location_index("HUB").unwrap();
    let plant = problem.location_index("PLANT").unwrap();

    let result = test_utils::solve(problem.clone(), ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);
    test_utils::assert_close(plan.total_consumption(), 600.0);

    // The thaw happens on the leg, no freeze/thaw decision is taken anywhere
    assert!(plan.state_changes.is_empty());
    test_utils::assert_close(plan.costs.freeze_thaw, 0.0);

    let into_hub = plan
        .cohort_shipments
        .iter()
        .filter(|shipment| shipment.origin == plant && shipment.destination == hub)
        .collect::<Vec<_>>();
    assert!(!into_hub.is_empty());
    for shipment in into_hub {
        assert_eq!(shipment.departure_state, StorageState::Frozen);
        assert_eq!(shipment.arrival_state, StorageState::Ambient);
    }

    assert!(
        plan.inventory
            .iter()
            .filter(|entry| entry.location == hub)
            .all(|entry| entry.state == StorageState::Ambient)
    );

    // Thawed stock keeps its production date
    for shipment in plan.cohort_shipments.iter().filter(|shipment| shipment.origin == hub) {
        let production_date = shipment.production_date.unwrap();
        assert!(production_date < shipment.departure_date);
    }

    test_utils::assert_cohort_invariants(&problem, plan);
}
