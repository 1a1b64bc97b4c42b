use jiff::civil::Date;
use serde::Serialize;

use crate::problem::{location::LocationIdx, product::ProductIdx, storage_state::StorageState};

/// Stock on hand at the start of the planning horizon.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InitialInventory {
    pub location: LocationIdx,
    pub product: ProductIdx,
    pub state: StorageState,
    pub quantity: f64,
    /// Shelf-life reference. `None` means produced the day before the horizon starts.
    pub production_date: Option<Date>,
}
