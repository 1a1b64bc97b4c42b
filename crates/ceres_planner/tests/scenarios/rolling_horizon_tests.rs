use ceres_planner::{
    error::PlanningError,
    model::model_params::ModelParams,
    planner::Planner,
    problem::{
        location::{Location, LocationType},
        route_definition::RouteDefinition,
        storage_state::{StorageCapability, StorageState},
    },
    rolling::rolling_config::{InfeasibleWindowPolicy, RollingHorizonConfig},
    solver::{solve_params::SolveParams, termination::TerminationStatus},
};
use jiff::civil::date;

use crate::test_utils;

fn two_week_planner(params: ModelParams) -> Planner {
    let demand = test_utils::weekdays(date(2025, 6, 9), date(2025, 6, 20), 400.0);
    let problem = test_utils::direct_problem_builder(&demand).build().unwrap();
    Planner::new(problem, params, SolveParams::default()).unwrap()
}

/// STORE gets BREAD through HUB (1 + 2 days) and NEAR directly in one
/// day, both on weekdays from 2025-06-09 to 2025-06-20.
fn hub_planner() -> Planner {
    let mut builder = test_utils::direct_problem_builder(&[]);
    builder
        .add_location(Location::new(
            "HUB",
            LocationType::Hub,
            StorageCapability::Ambient,
        ))
        .add_location(Location::new(
            "NEAR",
            LocationType::Destination,
            StorageCapability::Ambient,
        ))
        .add_route(RouteDefinition::single(
            "PLANT-HUB",
            "PLANT",
            "HUB",
            1,
            StorageState::Ambient,
            0.1,
        ))
        .add_route(RouteDefinition::single(
            "HUB-STORE",
            "HUB",
            "STORE",
            2,
            StorageState::Ambient,
            0.1,
        ))
        .add_route(RouteDefinition::single(
            "PLANT-NEAR",
            "PLANT",
            "NEAR",
            1,
            StorageState::Ambient,
            0.2,
        ));
    for (day, quantity) in test_utils::weekdays(date(2025, 6, 9), date(2025, 6, 20), 400.0) {
        builder
            .add_demand("STORE", "BREAD", day, quantity)
            .add_demand("NEAR", "BREAD", day, quantity - 100.0);
    }
    let problem = builder.build().unwrap();

    Planner::new(problem, ModelParams::default(), SolveParams::default()).unwrap()
}

#[test]
fn test_overlap_shorter_than_lead_time_is_rejected() {
    let planner = two_week_planner(ModelParams::default());
    let config = RollingHorizonConfig {
        window_size_days: 7,
        overlap_days: 0,
        infeasible_window_policy: InfeasibleWindowPolicy::Abort,
    };

    let result = planner.solve_rolling(config);

    assert!(matches!(
        result,
        Err(PlanningError::OverlapShorterThanLeadTime {
            overlap_days: 0,
            lead_time_days: 1
        })
    ));
}

#[test]
fn test_overlap_covering_the_window_is_rejected() {
    let planner = two_week_planner(ModelParams::default());
    let config = RollingHorizonConfig {
        window_size_days: 7,
        overlap_days: 7,
        infeasible_window_policy: InfeasibleWindowPolicy::Abort,
    };

    assert!(matches!(
        planner.solve_rolling(config),
        Err(PlanningError::InvalidRollingConfig(_))
    ));
}

#[test]
fn test_rolling_horizon_commits_every_window() {
    let planner = two_week_planner(ModelParams::default());
    let config = RollingHorizonConfig {
        window_size_days: 7,
        overlap_days: 2,
        infeasible_window_policy: InfeasibleWindowPolicy::Abort,
    };

    let result = planner.solve_rolling(config).unwrap();

    // 2025-06-08 to 2025-06-20, committing five days at a time
    assert_eq!(result.windows.len(), 3);
    assert_eq!(result.windows[0].window.commit_end, date(2025, 6, 12));
    assert_eq!(result.windows[1].window.start, date(2025, 6, 13));
    assert_eq!(result.windows[2].window.commit_end, date(2025, 6, 20));
    assert!(result.windows.iter().all(|window| window.committed));
    assert_eq!(result.status, TerminationStatus::Optimal);

    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);
    test_utils::assert_close(plan.total_consumption(), 4000.0);
    test_utils::assert_close(plan.total_production(), 4000.0);
    assert!(result.material_balance.unwrap().gap().abs() < 1.0);

    test_utils::assert_cohort_invariants(planner.problem(), plan);
}

#[test]
fn test_infeasible_window_aborts() {
    let params = ModelParams {
        allow_shortages: false,
        ..ModelParams::default()
    };
    let demand = vec![
        (date(2025, 6, 10), 400.0),
        // Far beyond two days of production
        (date(2025, 6, 18), 10_000.0),
    ];
    let problem = test_utils::direct_problem_builder(&demand).build().unwrap();
    let planner = Planner::new(problem, params, SolveParams::default()).unwrap();
    let config = RollingHorizonConfig {
        window_size_days: 5,
        overlap_days: 2,
        infeasible_window_policy: InfeasibleWindowPolicy::Abort,
    };

    let result = planner.solve_rolling(config);

    assert!(matches!(
        result,
        Err(PlanningError::WindowNotSolved {
            status: TerminationStatus::Infeasible,
            ..
        })
    ));
}

#[test]
fn test_infeasible_window_continues_uncommitted() {
    let params = ModelParams {
        allow_shortages: false,
        ..ModelParams::default()
    };
    let demand = vec![
        (date(2025, 6, 10), 400.0),
        (date(2025, 6, 18), 10_000.0),
    ];
    let problem = test_utils::direct_problem_builder(&demand).build().unwrap();
    let planner = Planner::new(problem, params, SolveParams::default()).unwrap();
    let config = RollingHorizonConfig {
        window_size_days: 5,
        overlap_days: 2,
        infeasible_window_policy: InfeasibleWindowPolicy::Continue,
    };

    let result = planner.solve_rolling(config).unwrap();

    assert_eq!(result.status, TerminationStatus::Infeasible);
    assert!(result.windows[0].committed);
    assert!(result.windows.iter().any(|window| !window.committed));
    assert!(result.material_balance.is_none());

    let skipped = result
        .windows
        .iter()
        .find(|window| !window.committed)
        .unwrap();
    assert!(skipped.window.contains(date(2025, 6, 18)));
}

#[test]
fn test_overlap_shorter_than_hub_route_is_rejected() {
    let planner = hub_planner();
    let config = RollingHorizonConfig {
        window_size_days: 7,
        overlap_days: 2,
        infeasible_window_policy: InfeasibleWindowPolicy::Abort,
    };

    assert!(matches!(
        planner.solve_rolling(config),
        Err(PlanningError::OverlapShorterThanLeadTime {
            overlap_days: 2,
            lead_time_days: 3
        })
    ));
}

#[test]
fn test_rolling_horizon_over_a_hub_route() {
    let planner = hub_planner();
    let config = RollingHorizonConfig {
        window_size_days: 7,
        overlap_days: 3,
        infeasible_window_policy: InfeasibleWindowPolicy::Abort,
    };

    let result = planner.solve_rolling(config).unwrap();

    // 2025-06-06 to 2025-06-20, committing four days at a time
    assert_eq!(result.windows.len(), 3);
    assert_eq!(result.windows[0].window.start, date(2025, 6, 6));
    assert_eq!(result.windows[0].window.commit_end, date(2025, 6, 9));
    assert_eq!(result.windows[1].window.start, date(2025, 6, 10));
    assert!(result.windows.iter().all(|window| window.committed));
    assert_eq!(result.status, TerminationStatus::Optimal);

    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);
    test_utils::assert_close(plan.total_consumption(), 7000.0);
    assert!(result.material_balance.unwrap().gap().abs() < 1.0);

    // Demand of the third window leaves PLANT while the second one commits
    let hub = planner.problem().location_index("HUB").unwrap();
    assert!(plan.cohort_shipments.iter().any(|shipment| {
        shipment.destination == hub
            && shipment.departure_date >= date(2025, 6, 10)
            && shipment.departure_date <= date(2025, 6, 13)
            && shipment.quantity > 0.0
    }));

    test_utils::assert_cohort_invariants(planner.problem(), plan);
}
