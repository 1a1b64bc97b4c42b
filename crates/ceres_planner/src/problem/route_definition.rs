use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::problem::storage_state::TransportMode;

/// One hop of a raw route definition, referencing locations by external id.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RouteSegment {
    pub origin: String,
    pub destination: String,
    pub transit_days: u32,
    pub transport_mode: TransportMode,
    pub cost_per_unit: f64,
}

/// A route as configured by the planner, either a single leg or an already
/// chained multi-hop path. Only used to derive the leg graph.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RouteDefinition {
    pub id: String,
    pub segments: Vec<RouteSegment>,
}

impl RouteDefinition {
    pub fn single(
        id: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        transit_days: u32,
        transport_mode: TransportMode,
        cost_per_unit: f64,
    ) -> Self {
        Self {
            id: id.into(),
            segments: vec![RouteSegment {
                origin: origin.into(),
                destination: destination.into(),
                transit_days,
                transport_mode,
                cost_per_unit,
            }],
        }
    }

    pub fn total_transit_days(&self) -> u32 {
        self.segments.iter().map(|segment| segment.transit_days).sum()
    }
}
