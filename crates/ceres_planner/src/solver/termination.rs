use std::fmt::Display;

use schemars::JsonSchema;
use serde::Serialize;

/// How a single MIP solve ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TerminationStatus {
    Optimal,
    /// The time limit was reached with an incumbent, possibly not optimal.
    TimeLimitFeasible,
    Infeasible,
    Unbounded,
    Error,
}

impl TerminationStatus {
    /// Whether variable values can be read from the solve.
    pub fn has_solution(&self) -> bool {
        matches!(
            self,
            TerminationStatus::Optimal | TerminationStatus::TimeLimitFeasible
        )
    }
}

impl Display for TerminationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationStatus::Optimal => write!(f, "optimal"),
            TerminationStatus::TimeLimitFeasible => write!(f, "time limit (feasible)"),
            TerminationStatus::Infeasible => write!(f, "infeasible"),
            TerminationStatus::Unbounded => write!(f, "unbounded"),
            TerminationStatus::Error => write!(f, "error"),
        }
    }
}
