use jiff::civil::Date;

use crate::{
    define_index_newtype,
    problem::{location::LocationIdx, product::ProductIdx, storage_state::StorageState},
    utils::dates,
};

define_index_newtype!(CohortIdx, Cohort);

/// Identity of a batch at a location. `production_date` is `None` for the
/// pooled batch used when batch tracking is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CohortKey {
    pub location: LocationIdx,
    pub product: ProductIdx,
    pub production_date: Option<Date>,
    pub state: StorageState,
}

/// A cohort together with the contiguous date span on which it can hold
/// stock and its inventory variables for that span.
#[derive(Debug, Clone)]
pub struct Cohort {
    pub key: CohortKey,
    pub first: Date,
    pub last: Date,
    pub(crate) inventory: Vec<good_lp::Variable>,
}

impl Cohort {
    pub fn covers(&self, date: Date) -> bool {
        date >= self.first && date <= self.last
    }

    pub(crate) fn inventory_at(&self, date: Date) -> Option<good_lp::Variable> {
        if !self.covers(date) {
            return None;
        }

        self.inventory
            .get(dates::days_between(self.first, date) as usize)
            .copied()
    }

    pub fn dates(&self) -> impl Iterator<Item = Date> {
        dates::date_range(self.first, self.last)
    }
}
