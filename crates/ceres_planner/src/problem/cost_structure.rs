use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::problem::storage_state::StorageState;

/// Per-unit cost rates. Transport costs live on legs and labor rates on the
/// labor calendar.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct CostStructure {
    pub production_cost_per_unit: f64,
    pub shortage_penalty_per_unit: f64,
    pub ambient_holding_cost_per_unit_day: f64,
    pub frozen_holding_cost_per_unit_day: f64,
    #[serde(default)]
    pub freeze_cost_per_unit: f64,
    #[serde(default)]
    pub thaw_cost_per_unit: f64,
}

impl CostStructure {
    pub fn holding_cost(&self, state: StorageState) -> f64 {
        match state {
            StorageState::Ambient => self.ambient_holding_cost_per_unit_day,
            StorageState::Frozen => self.frozen_holding_cost_per_unit_day,
        }
    }

    /// Smallest shortage penalty that still makes serving a destination
    /// cheaper than leaving it short.
    pub fn required_shortage_penalty(&self, cheapest_transport_cost: f64) -> f64 {
        self.production_cost_per_unit + cheapest_transport_cost
    }
}

impl Default for CostStructure {
    fn default() -> Self {
        Self {
            production_cost_per_unit: 1.3,
            shortage_penalty_per_unit: 10_000.0,
            ambient_holding_cost_per_unit_day: 0.002,
            frozen_holding_cost_per_unit_day: 0.01,
            freeze_cost_per_unit: 0.05,
            thaw_cost_per_unit: 0.05,
        }
    }
}
