use ceres_planner::{
    model::model_params::ModelParams, problem::storage_state::StorageState,
    solver::termination::TerminationStatus,
};
use jiff::civil::date;

use crate::test_utils;

#[test]
fn test_shortage_is_demand_minus_supply() {
    // Only Sunday's production (1400) and the opening stock can reach Monday
    let mut builder = test_utils::direct_problem_builder(&[(date(2025, 6, 9), 3000.0)]);
    builder.add_initial_inventory("PLANT", "BREAD", StorageState::Ambient, 300.0, None);
    let problem = builder.build().unwrap();

    let result = test_utils::solve(problem, ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    let plan = result.plan.unwrap();
    test_utils::assert_close(plan.total_production(), 1400.0);
    test_utils::assert_close(plan.total_consumption(), 1700.0);
    test_utils::assert_close(plan.total_shortage(), 3000.0 - (1400.0 + 300.0));
    test_utils::assert_close(plan.costs.shortage, 1300.0 * 10_000.0);
}

#[test]
fn test_no_hidden_shortage_when_disallowed() {
    let problem = test_utils::direct_problem_builder(&[(date(2025, 6, 9), 3000.0)])
        .build()
        .unwrap();
    let params = ModelParams {
        allow_shortages: false,
        ..ModelParams::default()
    };

    let result = test_utils::solve(problem, params);

    assert_eq!(result.status, TerminationStatus::Infeasible);
    assert!(result.plan.is_none());
    assert!(result.objective_value.is_none());
    assert!(!result.is_solved());
}

#[test]
fn test_unreachable_demand_is_infeasible_without_solving() {
    // Starting on Monday leaves no day to ship Monday's demand
    let problem = test_utils::direct_problem_builder(&[(date(2025, 6, 9), 100.0)])
        .build()
        .unwrap();
    let params = ModelParams {
        start_date: Some(date(2025, 6, 9)),
        allow_shortages: false,
        ..ModelParams::default()
    };

    let result = test_utils::solve(problem, params);

    assert_eq!(result.status, TerminationStatus::Infeasible);
    assert!(result.plan.is_none());
    assert!(result.windows[0].message.as_deref().unwrap().contains("STORE"));
}
