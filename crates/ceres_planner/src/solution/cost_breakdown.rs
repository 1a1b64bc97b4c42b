use std::ops::AddAssign;

use schemars::JsonSchema;
use serde::Serialize;

use crate::{
    network::planning_network::PlanningNetwork,
    problem::{planning_problem::PlanningProblem, storage_state::StorageState},
    solution::plan_solution::PlanSolution,
};

#[derive(Serialize, JsonSchema, Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBreakdown {
    pub labor: f64,
    pub production: f64,
    pub transport: f64,
    pub holding: f64,
    pub freeze_thaw: f64,
    pub shortage: f64,
}

impl CostBreakdown {
    /// Prices every entry of `solution` with the rates the model uses, so the
    /// total of a fully solved window equals its objective value.
    pub fn compute(
        problem: &PlanningProblem,
        network: &PlanningNetwork,
        solution: &PlanSolution,
    ) -> Self {
        let costs = problem.costs();

        let freeze_thaw = solution
            .state_changes
            .iter()
            .map(|entry| match entry.to_state {
                StorageState::Frozen => entry.quantity * costs.freeze_cost_per_unit,
                StorageState::Ambient => entry.quantity * costs.thaw_cost_per_unit,
            })
            .sum();

        CostBreakdown {
            labor: solution.labor.iter().map(|entry| entry.cost).sum(),
            production: solution.total_production() * costs.production_cost_per_unit,
            transport: solution
                .shipments
                .iter()
                .map(|entry| entry.quantity * network.leg(entry.leg).cost_per_unit())
                .sum(),
            holding: solution
                .inventory
                .iter()
                .map(|entry| entry.quantity * costs.holding_cost(entry.state))
                .sum(),
            freeze_thaw,
            shortage: solution.total_shortage() * costs.shortage_penalty_per_unit,
        }
    }

    pub fn total(&self) -> f64 {
        self.labor + self.production + self.transport + self.holding + self.freeze_thaw
            + self.shortage
    }
}

impl AddAssign for CostBreakdown {
    fn add_assign(&mut self, rhs: Self) {
        self.labor += rhs.labor;
        self.production += rhs.production;
        self.transport += rhs.transport;
        self.holding += rhs.holding;
        self.freeze_thaw += rhs.freeze_thaw;
        self.shortage += rhs.shortage;
    }
}
