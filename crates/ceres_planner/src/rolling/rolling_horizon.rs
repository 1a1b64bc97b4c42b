use jiff::{SignedDuration, civil::Date};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    error::PlanningError,
    model::{
        cohort_model::CohortModel,
        model_params::ModelParams,
        opening_state::{InTransitArrival, InventoryCohort, OpeningState},
        planning_window::PlanningWindow,
    },
    network::planning_network::PlanningNetwork,
    problem::planning_problem::PlanningProblem,
    rolling::rolling_config::{InfeasibleWindowPolicy, RollingHorizonConfig, minimum_lead_time_days},
    solution::{
        invariants::validate_solution, material_balance::MaterialBalance,
        plan_solution::PlanSolution,
    },
    solver::{solve_params::SolveParams, termination::TerminationStatus},
    utils::dates,
};

#[derive(Serialize, Debug, Clone)]
pub struct WindowReport {
    pub window: PlanningWindow,
    pub status: TerminationStatus,
    pub objective_value: Option<f64>,
    pub solve_time: SignedDuration,
    pub message: Option<String>,
    pub committed: bool,
    /// Balance of the committed part, present for committed windows.
    pub material_balance: Option<MaterialBalance>,
}

#[derive(Serialize, Debug, Clone)]
pub struct RollingHorizonResult {
    pub windows: Vec<WindowReport>,
    /// Committed parts of all solved windows, in date order.
    pub plan: Option<PlanSolution>,
    pub total_solve_time: SignedDuration,
}

impl RollingHorizonResult {
    pub fn all_committed(&self) -> bool {
        self.windows.iter().all(|window| window.committed)
    }

    pub fn skipped_windows(&self) -> impl Iterator<Item = &WindowReport> {
        self.windows.iter().filter(|window| !window.committed)
    }
}

pub struct RollingHorizonSolver<'a> {
    problem: &'a PlanningProblem,
    network: &'a PlanningNetwork,
    model_params: &'a ModelParams,
    solve_params: &'a SolveParams,
    config: RollingHorizonConfig,
}

impl<'a> RollingHorizonSolver<'a> {
    pub fn new(
        problem: &'a PlanningProblem,
        network: &'a PlanningNetwork,
        model_params: &'a ModelParams,
        solve_params: &'a SolveParams,
        config: RollingHorizonConfig,
    ) -> Result<Self, PlanningError> {
        config.validate(minimum_lead_time_days(problem, network))?;

        Ok(Self {
            problem,
            network,
            model_params,
            solve_params,
            config,
        })
    }

    /// Windows covering `[start, end]`. Every window but the last commits
    /// `window_size - overlap` days, the last one commits all of its days.
    pub fn windows(&self, start: Date, end: Date) -> Vec<PlanningWindow> {
        let window_size = self.config.window_size_days as i32;
        let committed = self.config.committed_days() as i32;

        let mut windows = Vec::new();
        let mut window_start = start;
        while window_start <= end {
            let window_end = dates::add_days(window_start, window_size - 1).min(end);
            let commit_end = if window_end == end {
                end
            } else {
                dates::add_days(window_start, committed - 1)
            };

            windows.push(PlanningWindow {
                index: windows.len(),
                start: window_start,
                end: window_end,
                commit_end,
            });
            window_start = dates::add_days(commit_end, 1);
        }

        windows
    }

    #[instrument(skip_all, level = "info")]
    pub fn solve(&self, start: Date, end: Date) -> Result<RollingHorizonResult, PlanningError> {
        let windows = self.windows(start, end);
        info!(
            windows = windows.len(),
            window_size = self.config.window_size_days,
            overlap = self.config.overlap_days,
            "Rolling horizon from {start} to {end}"
        );

        let mut opening = OpeningState::from_problem(self.problem, start);
        let mut reports = Vec::with_capacity(windows.len());
        let mut plan: Option<PlanSolution> = None;
        let mut total_solve_time = SignedDuration::ZERO;

        for window in windows {
            let model = CohortModel::build(
                self.problem,
                self.network,
                window,
                &opening,
                self.model_params,
            )?;
            let result = model.solve(self.solve_params)?;
            total_solve_time += result.solve_time;

            let solution = match result.solution {
                Some(solution) if result.status.has_solution() => solution,
                _ => {
                    if self.config.infeasible_window_policy == InfeasibleWindowPolicy::Abort {
                        return Err(PlanningError::WindowNotSolved {
                            window: window.index,
                            start: window.start,
                            end: window.end,
                            status: result.status,
                        });
                    }

                    warn!(
                        window = window.index,
                        status = %result.status,
                        "Window {} to {} not solved, carrying stock forward uncommitted",
                        window.start,
                        window.end
                    );
                    let (advanced, expired) = opening.advance_to(
                        self.problem,
                        window.commit_end,
                        self.model_params.tracks_shelf_life(),
                    );
                    if expired > 0.0 {
                        warn!(expired, "Stock expired in an uncommitted window");
                    }
                    opening = advanced;

                    reports.push(WindowReport {
                        window,
                        status: result.status,
                        objective_value: None,
                        solve_time: result.solve_time,
                        message: result.message,
                        committed: false,
                        material_balance: None,
                    });
                    continue;
                }
            };

            let committed = solution.truncated(window.commit_end, self.problem, self.network);
            let balance = validate_solution(self.problem, self.model_params, &committed)?;
            let next_opening = carry_forward(&opening, &solution, window.commit_end);

            info!(
                window = window.index,
                objective = result.objective_value,
                committed_cost = committed.costs.total(),
                carried = next_opening.total(),
                "Committed {} to {}",
                window.start,
                window.commit_end
            );

            reports.push(WindowReport {
                window,
                status: result.status,
                objective_value: result.objective_value,
                solve_time: result.solve_time,
                message: result.message,
                committed: true,
                material_balance: Some(balance),
            });

            match plan.as_mut() {
                Some(plan) => plan.append(committed),
                None => plan = Some(committed),
            }
            opening = next_opening;
        }

        Ok(RollingHorizonResult {
            windows: reports,
            plan,
            total_solve_time,
        })
    }
}

/// Opening state of the window after `commit_end`: the cohorts on hand at
/// the end of that day and everything still on the road, both the
/// committed shipments and earlier arrivals that have not landed yet.
pub fn carry_forward(
    previous: &OpeningState,
    solution: &PlanSolution,
    commit_end: Date,
) -> OpeningState {
    let inventory = solution
        .inventory_on(commit_end)
        .map(|entry| InventoryCohort {
            location: entry.location,
            product: entry.product,
            production_date: entry.production_date,
            state: entry.state,
            quantity: entry.quantity,
        })
        .collect();

    let mut in_transit = solution
        .in_transit_after(commit_end)
        .map(|entry| InTransitArrival {
            leg: entry.leg,
            destination: entry.destination,
            product: entry.product,
            production_date: entry.production_date,
            state: entry.arrival_state,
            departure_date: entry.departure_date,
            delivery_date: entry.delivery_date,
            quantity: entry.quantity,
        })
        .collect::<Vec<_>>();
    in_transit.extend(
        previous
            .in_transit
            .iter()
            .filter(|arrival| arrival.delivery_date > commit_end)
            .cloned(),
    );

    let mut opening = OpeningState {
        inventory,
        in_transit,
    };
    opening.merge_duplicates();
    opening
}
