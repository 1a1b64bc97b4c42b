use std::collections::BTreeMap;

use jiff::civil::Date;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::utils::dates;

/// Labor availability and pricing for one calendar day at the manufacturing site.
///
/// A *fixed* day pays `fixed_hours` at `regular_rate` whether or not they are
/// used and allows overtime at `overtime_rate` up to `max_hours` in total.
/// A *non-fixed* day (weekend, holiday) pays every hour worked at
/// `non_fixed_rate`, with at least `minimum_hours` paid once the line runs.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LaborDay {
    pub date: Date,
    pub fixed_hours: f64,
    pub max_hours: f64,
    pub regular_rate: f64,
    pub overtime_rate: f64,
    pub non_fixed_rate: f64,
    pub minimum_hours: f64,
}

impl LaborDay {
    pub fn fixed(
        date: Date,
        fixed_hours: f64,
        max_hours: f64,
        regular_rate: f64,
        overtime_rate: f64,
    ) -> Self {
        LaborDay {
            date,
            fixed_hours,
            max_hours: max_hours.max(fixed_hours),
            regular_rate,
            overtime_rate,
            non_fixed_rate: overtime_rate,
            minimum_hours: 0.0,
        }
    }

    pub fn non_fixed(date: Date, max_hours: f64, non_fixed_rate: f64, minimum_hours: f64) -> Self {
        LaborDay {
            date,
            fixed_hours: 0.0,
            max_hours,
            regular_rate: 0.0,
            overtime_rate: non_fixed_rate,
            non_fixed_rate,
            minimum_hours: minimum_hours.min(max_hours),
        }
    }

    pub fn is_fixed_day(&self) -> bool {
        self.fixed_hours > 0.0
    }

    pub fn overtime_capacity(&self) -> f64 {
        (self.max_hours - self.fixed_hours).max(0.0)
    }

    /// Cost of the fixed hours, paid regardless of production.
    pub fn fixed_cost(&self) -> f64 {
        self.fixed_hours * self.regular_rate
    }

    /// Cost of running the line for `hours` on this day.
    pub fn cost_for_hours(&self, hours: f64) -> f64 {
        if self.is_fixed_day() {
            self.fixed_cost() + (hours - self.fixed_hours).max(0.0) * self.overtime_rate
        } else if hours > 0.0 {
            hours.max(self.minimum_hours) * self.non_fixed_rate
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LaborCalendar {
    days: BTreeMap<Date, LaborDay>,
}

impl LaborCalendar {
    pub fn new(days: impl IntoIterator<Item = LaborDay>) -> Self {
        Self {
            days: days.into_iter().map(|day| (day.date, day)).collect(),
        }
    }

    /// Weekdays are fixed days, weekends are non-fixed days.
    pub fn standard(start: Date, end: Date, rates: &StandardLaborRates) -> Self {
        Self::new(dates::date_range(start, end).map(|date| {
            if dates::is_weekday(date) {
                LaborDay::fixed(
                    date,
                    rates.fixed_hours,
                    rates.max_hours,
                    rates.regular_rate,
                    rates.overtime_rate,
                )
            } else {
                LaborDay::non_fixed(
                    date,
                    rates.max_hours,
                    rates.non_fixed_rate,
                    rates.minimum_hours,
                )
            }
        }))
    }

    pub fn day(&self, date: Date) -> Option<&LaborDay> {
        self.days.get(&date)
    }

    pub fn days(&self) -> impl Iterator<Item = &LaborDay> {
        self.days.values()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct StandardLaborRates {
    pub fixed_hours: f64,
    pub max_hours: f64,
    pub regular_rate: f64,
    pub overtime_rate: f64,
    pub non_fixed_rate: f64,
    pub minimum_hours: f64,
}

impl Default for StandardLaborRates {
    fn default() -> Self {
        Self {
            fixed_hours: 12.0,
            max_hours: 14.0,
            regular_rate: 25.0,
            overtime_rate: 37.5,
            non_fixed_rate: 40.0,
            minimum_hours: 4.0,
        }
    }
}

/// Throughput and overhead of the single production line.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ManufacturingParams {
    pub production_rate_per_hour: f64,
    /// Hours lost once per production day before the first unit.
    pub startup_hours: f64,
    /// Hours lost once per production day after the last unit.
    pub shutdown_hours: f64,
    /// Hours lost for every product switch within a day.
    pub changeover_hours: f64,
}

impl ManufacturingParams {
    pub fn has_daily_overhead(&self) -> bool {
        self.startup_hours + self.shutdown_hours > 0.0
    }
}

impl Default for ManufacturingParams {
    fn default() -> Self {
        Self {
            production_rate_per_hour: 1400.0,
            startup_hours: 0.5,
            shutdown_hours: 0.5,
            changeover_hours: 1.0,
        }
    }
}
