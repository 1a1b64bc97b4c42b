use jiff::{SignedDuration, civil::Date};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    error::PlanningError,
    model::{
        cohort_model::CohortModel, model_params::ModelParams, opening_state::OpeningState,
        planning_window::PlanningWindow,
    },
    network::planning_network::PlanningNetwork,
    problem::planning_problem::PlanningProblem,
    rolling::{
        rolling_config::RollingHorizonConfig,
        rolling_horizon::{RollingHorizonSolver, WindowReport},
    },
    solution::{
        invariants::validate_solution, material_balance::MaterialBalance,
        plan_solution::PlanSolution,
    },
    solver::{solve_params::SolveParams, termination::TerminationStatus},
    timer_debug,
    trucks::{
        loading_policy::LoadingPolicy,
        truck_loading::{TruckLoadingPlan, assign_trucks, shipment_requests},
    },
    utils::dates,
};

/// Everything a planning run produces.
#[derive(Serialize, Debug, Clone)]
pub struct PlanningResult {
    pub status: TerminationStatus,
    pub objective_value: Option<f64>,
    pub solve_time: SignedDuration,
    pub start: Date,
    pub end: Date,
    pub windows: Vec<WindowReport>,
    /// Absent when no window could be solved.
    pub plan: Option<PlanSolution>,
    pub material_balance: Option<MaterialBalance>,
    pub truck_loading: Option<TruckLoadingPlan>,
}

impl PlanningResult {
    pub fn is_solved(&self) -> bool {
        self.status.has_solution() && self.plan.is_some()
    }
}

pub struct Planner {
    problem: PlanningProblem,
    network: PlanningNetwork,
    model_params: ModelParams,
    solve_params: SolveParams,
    loading_policy: LoadingPolicy,
}

impl Planner {
    /// Builds the planning network and rejects configurations that can
    /// never produce a sensible plan.
    pub fn new(
        problem: PlanningProblem,
        model_params: ModelParams,
        solve_params: SolveParams,
    ) -> Result<Self, PlanningError> {
        let network = PlanningNetwork::build(&problem, model_params.route_params())?;

        if model_params.allow_shortages {
            check_shortage_penalty(&problem, &network)?;
        }

        Ok(Planner {
            problem,
            network,
            model_params,
            solve_params,
            loading_policy: LoadingPolicy::default(),
        })
    }

    pub fn with_loading_policy(mut self, loading_policy: LoadingPolicy) -> Self {
        self.loading_policy = loading_policy;
        self
    }

    pub fn problem(&self) -> &PlanningProblem {
        &self.problem
    }

    pub fn network(&self) -> &PlanningNetwork {
        &self.network
    }

    /// Explicit dates win. Otherwise the horizon starts early enough for
    /// the longest route to reach the first demand and ends with the last.
    pub fn horizon(&self) -> Result<(Date, Date), PlanningError> {
        let forecast = self.problem.forecast();
        let lead_days = self.network.routes().max_transit_days() as i32;

        let start = match self.model_params.start_date {
            Some(start) => start,
            None => forecast
                .first_date()
                .map(|first| dates::add_days(first, -lead_days))
                .ok_or_else(|| {
                    PlanningError::InvalidHorizon(
                        "no start date given and the forecast is empty".to_owned(),
                    )
                })?,
        };
        let end = match self.model_params.end_date {
            Some(end) => end,
            None => forecast.last_date().ok_or_else(|| {
                PlanningError::InvalidHorizon(
                    "no end date given and the forecast is empty".to_owned(),
                )
            })?,
        };

        if end < start {
            return Err(PlanningError::InvalidHorizon(format!(
                "end {end} is before start {start}"
            )));
        }

        Ok((start, end))
    }

    /// Solves the whole horizon as one model.
    #[instrument(skip_all, level = "info")]
    pub fn solve(&self) -> Result<PlanningResult, PlanningError> {
        let (start, end) = self.horizon()?;
        let window = PlanningWindow::single(start, end);
        let opening = OpeningState::from_problem(&self.problem, start);

        let model = CohortModel::build(
            &self.problem,
            &self.network,
            window,
            &opening,
            &self.model_params,
        )?;
        info!(
            variables = model.num_variables(),
            constraints = model.num_constraints(),
            cohorts = model.cohorts().len(),
            "Solving {start} to {end} as a single window"
        );

        let result = timer_debug!("Solve single window", model.solve(&self.solve_params)?);

        let (plan, material_balance) = match result.solution {
            Some(solution) if result.status.has_solution() => {
                let balance = validate_solution(&self.problem, &self.model_params, &solution)?;
                (Some(solution), Some(balance))
            }
            _ => {
                warn!(status = %result.status, "No plan for {start} to {end}");
                (None, None)
            }
        };

        let report = WindowReport {
            window,
            status: result.status,
            objective_value: result.objective_value,
            solve_time: result.solve_time,
            message: result.message,
            committed: plan.is_some(),
            material_balance,
        };
        let truck_loading = plan.as_ref().and_then(|plan| self.load_trucks(plan));

        Ok(PlanningResult {
            status: result.status,
            objective_value: result.objective_value,
            solve_time: result.solve_time,
            start,
            end,
            windows: vec![report],
            plan,
            material_balance,
            truck_loading,
        })
    }

    /// Solves the horizon as a sequence of overlapping windows.
    #[instrument(skip_all, level = "info")]
    pub fn solve_rolling(
        &self,
        config: RollingHorizonConfig,
    ) -> Result<PlanningResult, PlanningError> {
        let (start, end) = self.horizon()?;
        let solver = RollingHorizonSolver::new(
            &self.problem,
            &self.network,
            &self.model_params,
            &self.solve_params,
            config,
        )?;

        let result = solver.solve(start, end)?;
        let status = combined_status(&result.windows);

        let material_balance = match &result.plan {
            Some(plan) if result.all_committed() => {
                Some(validate_solution(&self.problem, &self.model_params, plan)?)
            }
            _ => None,
        };
        let truck_loading = result.plan.as_ref().and_then(|plan| self.load_trucks(plan));

        Ok(PlanningResult {
            status,
            objective_value: result.plan.as_ref().map(|plan| plan.costs.total()),
            solve_time: result.total_solve_time,
            start,
            end,
            windows: result.windows,
            plan: result.plan,
            material_balance,
            truck_loading,
        })
    }

    /// `None` when the problem has no truck schedules to load.
    fn load_trucks(&self, plan: &PlanSolution) -> Option<TruckLoadingPlan> {
        if self.problem.trucks().is_empty() {
            return None;
        }

        let requests = shipment_requests(&self.problem, plan);
        let loading = assign_trucks(&self.problem, &requests, &self.loading_policy);
        if !loading.is_feasible() {
            warn!(
                unassigned = loading.unassigned.len(),
                quantity = loading.total_unassigned(),
                "Truck loading left shipments unassigned"
            );
        }
        Some(loading)
    }
}

/// A destination must be cheaper to serve than to leave short, otherwise
/// the model prefers shortages.
fn check_shortage_penalty(
    problem: &PlanningProblem,
    network: &PlanningNetwork,
) -> Result<(), PlanningError> {
    let costs = problem.costs();
    for destination in problem.forecast().destinations() {
        let Some(transport) = network.routes().cheapest_cost_to(destination) else {
            continue;
        };

        let required = costs.required_shortage_penalty(transport);
        if costs.shortage_penalty_per_unit <= required {
            return Err(PlanningError::ShortagePenaltyTooLow {
                penalty: costs.shortage_penalty_per_unit,
                required,
                destination: problem.location(destination).external_id().to_owned(),
            });
        }
    }

    Ok(())
}

/// The first window without a plan decides, then any time-limited window.
fn combined_status(windows: &[WindowReport]) -> TerminationStatus {
    if let Some(failed) = windows.iter().find(|window| !window.status.has_solution()) {
        return failed.status;
    }

    if windows
        .iter()
        .any(|window| window.status == TerminationStatus::TimeLimitFeasible)
    {
        TerminationStatus::TimeLimitFeasible
    } else {
        TerminationStatus::Optimal
    }
}
