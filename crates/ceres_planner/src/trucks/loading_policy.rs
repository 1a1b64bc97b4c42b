use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How shipment quantities are brought to whole cases before loading.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaseRounding {
    /// Load the planned quantity as is.
    #[default]
    None,
    Up,
    Nearest,
    /// Round down and report the remainder as unassigned.
    Down,
}

impl CaseRounding {
    pub fn apply(&self, quantity: f64, units_per_case: u32) -> f64 {
        let case = f64::from(units_per_case.max(1));
        let cases = quantity / case;

        match self {
            CaseRounding::None => quantity,
            CaseRounding::Up => (cases - 1e-9).ceil() * case,
            CaseRounding::Nearest => cases.round() * case,
            CaseRounding::Down => (cases + 1e-9).floor() * case,
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct LoadingPolicy {
    #[serde(default)]
    pub case_rounding: CaseRounding,
    /// When a shipment does not fit, place as many whole pallets as the
    /// truck has room for and keep the remainder for later departures.
    #[serde(default)]
    pub allow_split: bool,
}

impl Default for LoadingPolicy {
    fn default() -> Self {
        Self {
            case_rounding: CaseRounding::None,
            allow_split: false,
        }
    }
}
