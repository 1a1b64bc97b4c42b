use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::bail;
use ceres_planner::{
    json::types::{FromProblem, JsonPlanningProblem, JsonPlanningResult},
    planner::{Planner, PlanningResult},
    problem::planning_problem::PlanningProblem,
    solver::solve_params::SolverBackend,
};
use clap::Args;
use comfy_table::Table;
use tracing::{info, warn};

use crate::parsers;

#[derive(Args)]
pub struct PlanArgs {
    /// The scenario file to plan
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Overrides the solver time limit of the scenario (e.g., "30s", "PT5M")
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,

    /// Overrides the solver backend of the scenario
    #[arg(long)]
    backend: Option<SolverBackend>,

    /// Solve the whole horizon at once even when the scenario configures
    /// a rolling horizon
    #[arg(long)]
    single_window: bool,

    /// Where to write the plan as JSON
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

pub fn run(args: PlanArgs) -> anyhow::Result<()> {
    let f = File::open(&args.input)?;
    let content: JsonPlanningProblem = serde_json::from_reader(BufReader::new(f))?;
    let problem = content.build_problem()?;

    let mut solve_params = content.solve_params();
    if let Some(timeout) = args.timeout {
        solve_params.time_limit = timeout;
    }
    if let Some(backend) = args.backend {
        solve_params.backend = backend;
    }

    info!(
        locations = problem.locations().len(),
        products = problem.products().len(),
        routes = problem.routes().len(),
        backend = %solve_params.backend,
        "Planning {:?}",
        args.input
    );

    let mut planner = Planner::new(problem, content.model_params(), solve_params)?;
    if let Some(policy) = &content.loading_policy {
        planner = planner.with_loading_policy(policy.clone());
    }

    let result = match &content.rolling_horizon {
        Some(config) if !args.single_window => planner.solve_rolling(config.clone())?,
        _ => planner.solve()?,
    };

    print_summary(planner.problem(), &result);

    if let Some(out) = args.out {
        let json = JsonPlanningResult::from_problem(&result, planner.problem());
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&out, serde_json::to_string_pretty(&json)?)?;
        info!("Plan written to {:?}", out);
    }

    if !result.is_solved() {
        bail!("No plan found: {}", result.status);
    }

    Ok(())
}

fn print_summary(problem: &PlanningProblem, result: &PlanningResult) {
    let mut windows = Table::new();
    windows.set_header(vec![
        "window", "start", "end", "commit end", "status", "objective", "time", "committed",
    ]);
    for report in &result.windows {
        windows.add_row(vec![
            report.window.index.to_string(),
            report.window.start.to_string(),
            report.window.end.to_string(),
            report.window.commit_end.to_string(),
            report.status.to_string(),
            report
                .objective_value
                .map_or_else(|| "-".to_owned(), |value| format!("{value:.2}")),
            format!("{:#}", report.solve_time),
            report.committed.to_string(),
        ]);
    }
    println!("{windows}");
    for report in &result.windows {
        if let Some(message) = &report.message {
            warn!(window = report.window.index, "{message}");
        }
    }

    let Some(plan) = &result.plan else {
        warn!(status = %result.status, "No plan for {} to {}", result.start, result.end);
        return;
    };

    let mut costs = Table::new();
    costs.set_header(vec!["cost", "value"]);
    for (name, value) in [
        ("labor", plan.costs.labor),
        ("production", plan.costs.production),
        ("transport", plan.costs.transport),
        ("holding", plan.costs.holding),
        ("freeze/thaw", plan.costs.freeze_thaw),
        ("shortage", plan.costs.shortage),
        ("total", plan.costs.total()),
    ] {
        costs.add_row(vec![name.to_owned(), format!("{value:.2}")]);
    }
    println!("{costs}");

    let mut volumes = Table::new();
    volumes.set_header(vec!["volume", "units"]);
    volumes.add_row(vec![
        "production".to_owned(),
        format!("{:.0}", plan.total_production()),
    ]);
    volumes.add_row(vec![
        "consumption".to_owned(),
        format!("{:.0}", plan.total_consumption()),
    ]);
    volumes.add_row(vec![
        "shortage".to_owned(),
        format!("{:.0}", plan.total_shortage()),
    ]);
    if let Some(loading) = &result.truck_loading {
        volumes.add_row(vec![
            "on trucks".to_owned(),
            format!("{:.0}", loading.total_assigned()),
        ]);
        volumes.add_row(vec![
            "unassigned".to_owned(),
            format!("{:.0}", loading.total_unassigned()),
        ]);
    }
    println!("{volumes}");

    if let Some(loading) = &result.truck_loading {
        for shipment in &loading.unassigned {
            warn!(
                destination = problem.location(shipment.request.destination).external_id(),
                date = %shipment.request.departure_date,
                quantity = shipment.quantity,
                reason = ?shipment.reason,
                "Unassigned shipment"
            );
        }
    }
}
