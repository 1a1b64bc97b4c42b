use good_lp::{
    Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
};
use jiff::{SignedDuration, Timestamp};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::PlanningError,
    solver::{
        solve_params::{SolveParams, SolverBackend},
        termination::TerminationStatus,
    },
};

/// A formulation ready to be handed to a backend. Built fresh for every
/// solve and consumed by it.
pub struct MipProblem {
    pub variables: ProblemVariables,
    pub objective: Expression,
    pub constraints: Vec<Constraint>,
}

pub struct SolveOutcome<T> {
    pub status: TerminationStatus,
    pub objective_value: Option<f64>,
    pub solve_time: SignedDuration,
    pub message: Option<String>,
    /// Present only when `status` carries a solution.
    pub values: Option<T>,
}

/// Solves `problem` with the configured backend. `read` is called with a
/// variable lookup only when the backend returned a solution, so an
/// infeasible solve never produces values.
#[instrument(skip_all, level = "debug")]
pub fn solve<T>(
    problem: MipProblem,
    params: &SolveParams,
    read: impl FnOnce(&dyn Fn(Variable) -> f64) -> T,
) -> Result<SolveOutcome<T>, PlanningError> {
    validate(params)?;

    let MipProblem {
        variables,
        objective,
        constraints,
    } = problem;

    debug!(
        backend = %params.backend,
        constraints = constraints.len(),
        "Solving MIP"
    );

    if params.backend == SolverBackend::MicroLp {
        warn!(
            time_limit = ?params.time_limit,
            mip_rel_gap = params.mip_rel_gap,
            "microlp solves to optimality, time limit and gap are not enforced"
        );
    }

    let started = Timestamp::now();
    let result = match params.backend {
        SolverBackend::MicroLp => solve_microlp(variables, objective, constraints, read),
        SolverBackend::Highs => solve_highs(variables, objective, constraints, params, read),
    };
    let solve_time = Timestamp::now().duration_since(started);

    let outcome = match result {
        Ok((objective_value, values)) => SolveOutcome {
            status: if params.backend == SolverBackend::Highs && solve_time >= params.time_limit
            {
                TerminationStatus::TimeLimitFeasible
            } else {
                TerminationStatus::Optimal
            },
            objective_value: Some(objective_value),
            solve_time,
            message: unenforced_limits(params),
            values: Some(values),
        },
        Err(error) => {
            let status = match error {
                ResolutionError::Infeasible => TerminationStatus::Infeasible,
                ResolutionError::Unbounded => TerminationStatus::Unbounded,
                _ => TerminationStatus::Error,
            };
            warn!(%status, "MIP solve returned no solution: {error}");
            SolveOutcome {
                status,
                objective_value: None,
                solve_time,
                message: Some(error.to_string()),
                values: None,
            }
        }
    };

    info!(
        status = %outcome.status,
        objective = outcome.objective_value,
        "Solve finished in {:?}",
        outcome.solve_time
    );

    Ok(outcome)
}

fn validate(params: &SolveParams) -> Result<(), PlanningError> {
    if !params.backend.is_available() {
        return Err(PlanningError::InvalidParameter(format!(
            "solver '{}' is not compiled into this build",
            params.backend
        )));
    }

    if params.time_limit <= SignedDuration::ZERO {
        return Err(PlanningError::InvalidParameter(
            "time limit must be positive".to_owned(),
        ));
    }

    if !(0.0..1.0).contains(&params.mip_rel_gap) {
        return Err(PlanningError::InvalidParameter(format!(
            "relative MIP gap {} must be in [0, 1)",
            params.mip_rel_gap
        )));
    }

    Ok(())
}

/// Note attached to solutions of backends without time limit or gap hooks.
fn unenforced_limits(params: &SolveParams) -> Option<String> {
    match params.backend {
        SolverBackend::MicroLp => Some(format!(
            "microlp ignores the {:?} time limit and the {} relative MIP gap",
            params.time_limit, params.mip_rel_gap
        )),
        SolverBackend::Highs => None,
    }
}

fn read_solution<S: Solution, T>(
    solution: &S,
    objective: &Expression,
    read: impl FnOnce(&dyn Fn(Variable) -> f64) -> T,
) -> (f64, T) {
    let lookup = |variable: Variable| solution.value(variable);
    (objective.eval_with(solution), read(&lookup))
}

fn solve_microlp<T>(
    variables: ProblemVariables,
    objective: Expression,
    constraints: Vec<Constraint>,
    read: impl FnOnce(&dyn Fn(Variable) -> f64) -> T,
) -> Result<(f64, T), ResolutionError> {
    // No time limit or gap hooks, microlp solves to optimality
    let mut model = variables
        .minimise(objective.clone())
        .using(good_lp::solvers::microlp::microlp);
    for constraint in constraints {
        model.add_constraint(constraint);
    }

    let solution = model.solve()?;
    Ok(read_solution(&solution, &objective, read))
}

#[cfg(feature = "highs")]
fn solve_highs<T>(
    variables: ProblemVariables,
    objective: Expression,
    constraints: Vec<Constraint>,
    params: &SolveParams,
    read: impl FnOnce(&dyn Fn(Variable) -> f64) -> T,
) -> Result<(f64, T), ResolutionError> {
    use good_lp::WithTimeLimit;

    let mut model = variables
        .minimise(objective.clone())
        .using(good_lp::solvers::highs::highs)
        .with_time_limit(params.time_limit.as_secs_f64())
        .set_option("mip_rel_gap", params.mip_rel_gap);
    if params.aggressive_heuristics {
        model = model.set_option("mip_heuristic_effort", 0.3);
    }
    for constraint in constraints {
        model.add_constraint(constraint);
    }

    let solution = model.solve()?;
    Ok(read_solution(&solution, &objective, read))
}

#[cfg(not(feature = "highs"))]
fn solve_highs<T>(
    _variables: ProblemVariables,
    _objective: Expression,
    _constraints: Vec<Constraint>,
    _params: &SolveParams,
    _read: impl FnOnce(&dyn Fn(Variable) -> f64) -> T,
) -> Result<(f64, T), ResolutionError> {
    Err(ResolutionError::Str(
        "HiGHS support is not compiled in".to_owned(),
    ))
}
