use serde::Serialize;

use crate::{
    define_index_newtype,
    problem::{
        location::LocationIdx,
        storage_state::{StorageState, TransportMode},
    },
};

define_index_newtype!(LegIdx, Leg);

/// A single directed hop between two locations, the unit of shipment and
/// buffering. The departure and arrival states are derived from the
/// transport mode and the storage capabilities of both ends, so a frozen
/// truck into an ambient-only site thaws on arrival without any decision.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Leg {
    pub(crate) origin: LocationIdx,
    pub(crate) destination: LocationIdx,
    pub(crate) transit_days: u32,
    pub(crate) transport_mode: TransportMode,
    pub(crate) cost_per_unit: f64,
    pub(crate) departure_state: StorageState,
    pub(crate) arrival_state: StorageState,
}

impl Leg {
    pub fn origin(&self) -> LocationIdx {
        self.origin
    }

    pub fn destination(&self) -> LocationIdx {
        self.destination
    }

    pub fn transit_days(&self) -> u32 {
        self.transit_days
    }

    pub fn transit_days_i32(&self) -> i32 {
        self.transit_days as i32
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.transport_mode
    }

    pub fn cost_per_unit(&self) -> f64 {
        self.cost_per_unit
    }

    /// State the cargo is drawn from at the origin.
    pub fn departure_state(&self) -> StorageState {
        self.departure_state
    }

    /// State the cargo is stored in once it reaches the destination.
    pub fn arrival_state(&self) -> StorageState {
        self.arrival_state
    }

    pub fn is_forced_thaw(&self) -> bool {
        self.transport_mode == StorageState::Frozen && self.arrival_state == StorageState::Ambient
    }

    pub fn is_forced_freeze(&self) -> bool {
        self.transport_mode == StorageState::Ambient && self.arrival_state == StorageState::Frozen
    }
}
