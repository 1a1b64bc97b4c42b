use jiff::civil::Date;
use serde::Serialize;

use crate::{error::PlanningError, solution::plan_solution::PlanSolution};

/// Largest accepted gap between supply and usage, in units.
pub const MATERIAL_BALANCE_TOLERANCE: f64 = 1.0;

/// Stock accounting of a solution up to the end of a given day.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct MaterialBalance {
    pub opening: f64,
    pub production: f64,
    pub consumption: f64,
    pub closing_inventory: f64,
    pub in_transit: f64,
    pub expired: f64,
}

impl MaterialBalance {
    pub fn compute(solution: &PlanSolution, as_of: Date) -> Self {
        let production = solution
            .production
            .iter()
            .filter(|entry| entry.date <= as_of)
            .map(|entry| entry.quantity)
            .sum();
        let consumption = solution
            .consumption
            .iter()
            .filter(|entry| entry.date <= as_of)
            .map(|entry| entry.quantity)
            .sum();
        let closing_inventory = solution
            .inventory_on(as_of)
            .map(|entry| entry.quantity)
            .sum();
        let in_transit = solution
            .in_transit_after(as_of)
            .map(|entry| entry.quantity)
            .sum::<f64>()
            + solution.opening.in_transit_after(as_of);

        MaterialBalance {
            opening: solution.opening.total(),
            production,
            consumption,
            closing_inventory,
            in_transit,
            expired: solution.opening.expired,
        }
    }

    pub fn supply(&self) -> f64 {
        self.opening + self.production
    }

    pub fn usage(&self) -> f64 {
        self.consumption + self.closing_inventory + self.in_transit + self.expired
    }

    pub fn gap(&self) -> f64 {
        self.supply() - self.usage()
    }
}

/// Opening + production must equal consumption + closing inventory +
/// in-transit (+ expired opening stock) at the end of `as_of`.
pub fn check_material_balance(
    solution: &PlanSolution,
    as_of: Date,
) -> Result<MaterialBalance, PlanningError> {
    let balance = MaterialBalance::compute(solution, as_of);
    if balance.gap().abs() > MATERIAL_BALANCE_TOLERANCE {
        return Err(PlanningError::MaterialBalance {
            scope: format!("{} to {}", solution.start, as_of),
            supply: balance.supply(),
            usage: balance.usage(),
            gap: balance.gap(),
        });
    }

    Ok(balance)
}
