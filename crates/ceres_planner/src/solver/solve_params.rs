use std::{fmt::Display, str::FromStr};

use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    /// Pure Rust simplex with branch and bound, always available.
    #[serde(rename = "microlp")]
    MicroLp,
    /// HiGHS, available when the crate is built with the `highs` feature.
    Highs,
}

impl SolverBackend {
    pub fn is_available(&self) -> bool {
        match self {
            SolverBackend::MicroLp => true,
            SolverBackend::Highs => cfg!(feature = "highs"),
        }
    }
}

impl Display for SolverBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverBackend::MicroLp => write!(f, "microlp"),
            SolverBackend::Highs => write!(f, "highs"),
        }
    }
}

impl FromStr for SolverBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "microlp" => Ok(SolverBackend::MicroLp),
            "highs" => Ok(SolverBackend::Highs),
            other => Err(format!("Unknown solver '{other}', expected 'microlp' or 'highs'")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SolveParams {
    pub backend: SolverBackend,
    pub time_limit: SignedDuration,
    /// Relative MIP gap at which the backend may stop.
    pub mip_rel_gap: f64,
    /// Spend more effort on primal heuristics, useful on large windows.
    pub aggressive_heuristics: bool,
}

impl Default for SolveParams {
    fn default() -> Self {
        Self {
            backend: if cfg!(feature = "highs") {
                SolverBackend::Highs
            } else {
                SolverBackend::MicroLp
            },
            time_limit: SignedDuration::from_secs(120),
            mip_rel_gap: 0.01,
            aggressive_heuristics: false,
        }
    }
}
