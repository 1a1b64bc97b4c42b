use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::Serialize;

use crate::problem::{location::LocationIdx, product::ProductIdx};

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct DemandEntry {
    pub location: LocationIdx,
    pub product: ProductIdx,
    pub date: Date,
    pub quantity: f64,
}

/// Deterministic demand keyed by (destination, product, date). Duplicate
/// entries for the same key are summed.
#[derive(Debug, Clone, Default)]
pub struct Forecast {
    demand: BTreeMap<(LocationIdx, ProductIdx, Date), f64>,
}

impl Forecast {
    pub fn new(entries: impl IntoIterator<Item = DemandEntry>) -> Self {
        let mut forecast = Forecast::default();
        for entry in entries {
            forecast.add(entry);
        }
        forecast
    }

    pub fn add(&mut self, entry: DemandEntry) {
        if entry.quantity <= 0.0 {
            return;
        }

        *self
            .demand
            .entry((entry.location, entry.product, entry.date))
            .or_insert(0.0) += entry.quantity;
    }

    pub fn demand(&self, location: LocationIdx, product: ProductIdx, date: Date) -> f64 {
        self.demand
            .get(&(location, product, date))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn entries(&self) -> impl Iterator<Item = DemandEntry> + '_ {
        self.demand
            .iter()
            .map(|(&(location, product, date), &quantity)| DemandEntry {
                location,
                product,
                date,
                quantity,
            })
    }

    pub fn entries_between(&self, start: Date, end: Date) -> impl Iterator<Item = DemandEntry> + '_ {
        self.entries()
            .filter(move |entry| entry.date >= start && entry.date <= end)
    }

    /// Locations with at least one positive demand entry, sorted and deduplicated.
    pub fn destinations(&self) -> Vec<LocationIdx> {
        let mut destinations = self
            .demand
            .keys()
            .map(|(location, _, _)| *location)
            .collect::<Vec<_>>();
        destinations.dedup();
        destinations
    }

    pub fn first_date(&self) -> Option<Date> {
        self.demand.keys().map(|(_, _, date)| *date).min()
    }

    pub fn last_date(&self) -> Option<Date> {
        self.demand.keys().map(|(_, _, date)| *date).max()
    }

    pub fn total_between(&self, start: Date, end: Date) -> f64 {
        self.entries_between(start, end)
            .map(|entry| entry.quantity)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.demand.is_empty()
    }
}
