use jiff::civil::Date;
use serde::Serialize;

use crate::utils::dates;

/// The date range one model is built for. Decisions up to `commit_end` are
/// kept, the rest only shapes them.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanningWindow {
    pub index: usize,
    pub start: Date,
    pub end: Date,
    pub commit_end: Date,
}

impl PlanningWindow {
    /// A window committed in full.
    pub fn single(start: Date, end: Date) -> Self {
        Self {
            index: 0,
            start,
            end,
            commit_end: end,
        }
    }

    pub fn num_days(&self) -> usize {
        (dates::days_between(self.start, self.end) + 1).max(0) as usize
    }

    pub fn days(&self) -> impl Iterator<Item = Date> {
        dates::date_range(self.start, self.end)
    }

    pub fn contains(&self, date: Date) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_committed(&self, date: Date) -> bool {
        date >= self.start && date <= self.commit_end
    }
}
