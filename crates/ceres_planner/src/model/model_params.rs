use jiff::civil::Date;

use crate::network::route_enumerator::RouteEnumeratorParams;

#[derive(Clone, Debug)]
pub struct ModelParams {
    /// First planning day. Derived from the forecast when absent.
    pub start_date: Option<Date>,
    /// Last planning day. Derived from the forecast when absent.
    pub end_date: Option<Date>,
    pub max_routes_per_destination: usize,
    pub max_intermediate_stops: usize,
    /// When false, unmet demand makes the model infeasible.
    pub allow_shortages: bool,
    pub enforce_shelf_life: bool,
    /// Track inventory per production date. When disabled every unit lives
    /// in one pooled batch and shelf life is not enforced on inventory.
    pub use_batch_tracking: bool,
    pub enforce_truck_capacity: bool,
    /// Load trucks in whole pallets per (stop, product).
    pub integer_pallets: bool,
}

impl ModelParams {
    pub fn route_params(&self) -> RouteEnumeratorParams {
        RouteEnumeratorParams {
            max_routes_per_destination: self.max_routes_per_destination,
            max_intermediate_stops: self.max_intermediate_stops,
            enforce_shelf_life: self.enforce_shelf_life,
        }
    }

    pub(crate) fn tracks_shelf_life(&self) -> bool {
        self.enforce_shelf_life && self.use_batch_tracking
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            max_routes_per_destination: 5,
            max_intermediate_stops: 2,
            allow_shortages: true,
            enforce_shelf_life: true,
            use_batch_tracking: true,
            enforce_truck_capacity: true,
            integer_pallets: false,
        }
    }
}
