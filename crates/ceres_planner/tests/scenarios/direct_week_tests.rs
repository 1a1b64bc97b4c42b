use ceres_planner::{
    error::PlanningError,
    model::{
        cohort_model::CohortModel, model_params::ModelParams, opening_state::OpeningState,
        planning_window::PlanningWindow,
    },
    network::planning_network::PlanningNetwork,
    planner::Planner,
    solution::material_balance::MaterialBalance,
    solver::{solve_params::SolveParams, termination::TerminationStatus},
};
use jiff::civil::date;

use crate::test_utils;

#[test]
fn test_one_week_direct_scenario() {
    let demand = test_utils::weekdays(date(2025, 6, 9), date(2025, 6, 13), 500.0);
    let problem = test_utils::direct_problem_builder(&demand).build().unwrap();

    let result = test_utils::solve(problem.clone(), ModelParams::default());

    assert_eq!(result.status, TerminationStatus::Optimal);
    assert_eq!(result.start, date(2025, 6, 8));
    assert_eq!(result.end, date(2025, 6, 13));

    let plan = result.plan.as_ref().unwrap();
    test_utils::assert_close(plan.total_shortage(), 0.0);
    test_utils::assert_close(plan.total_production(), 2500.0);
    test_utils::assert_close(plan.total_consumption(), 2500.0);

    let balance = result.material_balance.unwrap();
    assert!(balance.gap().abs() < 1.0);
    test_utils::assert_close(balance.opening, 0.0);

    test_utils::assert_cohort_invariants(&problem, plan);
}

#[test]
fn test_costs_match_objective() {
    let demand = test_utils::weekdays(date(2025, 6, 9), date(2025, 6, 13), 500.0);
    let problem = test_utils::direct_problem_builder(&demand).build().unwrap();

    let result = test_utils::solve(problem, ModelParams::default());
    let plan = result.plan.unwrap();
    let objective = result.objective_value.unwrap();

    assert!((plan.costs.total() - objective).abs() < 1e-3 * objective.abs().max(1.0));
    test_utils::assert_close(plan.costs.production, 2500.0 * 1.3);
    test_utils::assert_close(plan.costs.transport, 2500.0 * 0.3);
    test_utils::assert_close(plan.costs.shortage, 0.0);
}

#[test]
fn test_material_balance_at_every_day() {
    let demand = test_utils::weekdays(date(2025, 6, 9), date(2025, 6, 13), 700.0);
    let mut builder = test_utils::direct_problem_builder(&demand);
    builder.add_initial_inventory(
        "STORE",
        "BREAD",
        ceres_planner::problem::storage_state::StorageState::Ambient,
        300.0,
        None,
    );
    let problem = builder.build().unwrap();

    let result = test_utils::solve(problem, ModelParams::default());
    let plan = result.plan.unwrap();

    let mut day = plan.start;
    while day <= plan.end {
        let balance = MaterialBalance::compute(&plan, day);
        assert!(balance.gap().abs() < 1.0, "gap {} on {day}", balance.gap());
        day = day.tomorrow().unwrap();
    }
    test_utils::assert_close(plan.total_production(), 3500.0 - 300.0);
}

#[test]
fn test_no_phantom_shipments() {
    let demand = test_utils::weekdays(date(2025, 6, 9), date(2025, 6, 13), 500.0);
    let problem = test_utils::direct_problem_builder(&demand).build().unwrap();
    let params = ModelParams::default();
    let network = PlanningNetwork::build(&problem, params.route_params()).unwrap();

    let window = PlanningWindow::single(date(2025, 6, 8), date(2025, 6, 13));
    let opening = OpeningState::from_problem(&problem, window.start);
    let model = CohortModel::build(&problem, &network, window, &opening, &params).unwrap();

    // The delivery on the first day would have to leave the day before
    assert_eq!(model.phantom_shipments().len(), 1);
    assert_eq!(model.phantom_shipments()[0].2, date(2025, 6, 8));

    let result = model.solve(&SolveParams::default()).unwrap();
    let plan = result.solution.unwrap();
    assert!(
        plan.shipments
            .iter()
            .all(|shipment| shipment.departure_date >= window.start)
    );
}

#[test]
fn test_missing_route_fails_before_solve() {
    let demand = test_utils::weekdays(date(2025, 6, 9), date(2025, 6, 13), 500.0);
    let mut builder = test_utils::direct_problem_builder(&demand);
    builder
        .add_location(ceres_planner::problem::location::Location::new(
            "ISLAND",
            ceres_planner::problem::location::LocationType::Destination,
            ceres_planner::problem::storage_state::StorageCapability::Ambient,
        ))
        .add_demand("ISLAND", "BREAD", date(2025, 6, 10), 50.0);
    let problem = builder.build().unwrap();

    let result = Planner::new(problem, ModelParams::default(), SolveParams::default());

    assert!(matches!(
        result,
        Err(PlanningError::NoRouteToDestination { destination }) if destination == "ISLAND"
    ));
}
