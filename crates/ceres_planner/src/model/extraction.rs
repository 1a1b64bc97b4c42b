use good_lp::Variable;

use crate::{
    model::cohort_model::ModelIndex,
    network::planning_network::PlanningNetwork,
    problem::planning_problem::PlanningProblem,
    solution::{
        cost_breakdown::CostBreakdown,
        plan_solution::{
            CohortShipmentEntry, ConsumptionEntry, InventoryEntry, LaborEntry, PlanSolution,
            ProductionEntry, ShipmentEntry, ShortageEntry, StateChangeEntry, TruckLoadEntry,
        },
    },
    utils::dates,
};

/// Values below this are solver noise and read as zero.
const EPSILON: f64 = 1e-6;

impl ModelIndex {
    pub(crate) fn extract(
        &self,
        problem: &PlanningProblem,
        network: &PlanningNetwork,
        value: &dyn Fn(Variable) -> f64,
    ) -> PlanSolution {
        let read = |variable: Variable| {
            let quantity = value(variable);
            if quantity.abs() < EPSILON { 0.0 } else { quantity }
        };

        let production = self
            .production
            .iter()
            .map(|(&(date, product), &variable)| ProductionEntry {
                date,
                product,
                quantity: read(variable),
            })
            .filter(|entry| entry.quantity > 0.0)
            .collect();

        let labor = self
            .labor
            .iter()
            .filter_map(|(&date, variables)| {
                let day = problem.labor().day(date)?;
                let hours_used = read(variables.hours);
                let overtime_hours = variables.overtime.map(read).unwrap_or(0.0);
                let (paid_hours, cost) = match variables.paid {
                    Some(paid) => {
                        let paid = read(paid);
                        (paid, paid * day.non_fixed_rate)
                    }
                    None => (
                        day.fixed_hours + overtime_hours,
                        day.fixed_cost() + overtime_hours * day.overtime_rate,
                    ),
                };

                Some(LaborEntry {
                    date,
                    hours_used,
                    overtime_hours,
                    paid_hours,
                    cost,
                })
            })
            .collect();

        let inventory = self
            .cohorts
            .iter()
            .flat_map(|cohort| {
                cohort
                    .dates()
                    .zip(cohort.inventory.iter())
                    .map(move |(date, &variable)| InventoryEntry {
                        location: cohort.key.location,
                        product: cohort.key.product,
                        production_date: cohort.key.production_date,
                        state: cohort.key.state,
                        date,
                        quantity: read(variable),
                    })
            })
            .filter(|entry| entry.quantity > 0.0)
            .collect();

        let shipments = self
            .shipments
            .iter()
            .map(|(&(leg_index, product, delivery_date), &variable)| {
                let leg = network.leg(leg_index);
                ShipmentEntry {
                    leg: leg_index,
                    origin: leg.origin(),
                    destination: leg.destination(),
                    product,
                    transport_mode: leg.transport_mode(),
                    departure_date: dates::add_days(
                        delivery_date,
                        -leg.transit_days_i32(),
                    ),
                    delivery_date,
                    quantity: read(variable),
                }
            })
            .filter(|entry| entry.quantity > 0.0)
            .collect();

        let cohort_shipments = self
            .cohort_shipments
            .iter()
            .map(|shipment| {
                let leg = network.leg(shipment.leg);
                let key = self.cohorts[shipment.from].key;
                CohortShipmentEntry {
                    leg: shipment.leg,
                    origin: leg.origin(),
                    destination: leg.destination(),
                    product: key.product,
                    production_date: key.production_date,
                    departure_state: leg.departure_state(),
                    arrival_state: leg.arrival_state(),
                    departure_date: shipment.departure_date,
                    delivery_date: shipment.delivery_date,
                    quantity: read(shipment.variable),
                }
            })
            .filter(|entry| entry.quantity > 0.0)
            .collect();

        let state_changes = self
            .state_changes
            .iter()
            .map(|change| {
                let from = self.cohorts[change.from].key;
                StateChangeEntry {
                    location: from.location,
                    product: from.product,
                    production_date: from.production_date,
                    date: change.date,
                    from_state: from.state,
                    to_state: self.cohorts[change.to].key.state,
                    quantity: read(change.variable),
                }
            })
            .filter(|entry| entry.quantity > 0.0)
            .collect();

        let consumption = self
            .consumption
            .iter()
            .map(|consumption| {
                let key = self.cohorts[consumption.cohort].key;
                ConsumptionEntry {
                    location: key.location,
                    product: key.product,
                    production_date: key.production_date,
                    state: key.state,
                    date: consumption.date,
                    quantity: read(consumption.variable),
                }
            })
            .filter(|entry| entry.quantity > 0.0)
            .collect();

        let shortages = self
            .shortages
            .iter()
            .map(|(&(location, product, date), &variable)| ShortageEntry {
                location,
                product,
                date,
                quantity: read(variable),
            })
            .filter(|entry| entry.quantity > 0.0)
            .collect();

        let truck_loads = self
            .truck_loads
            .iter()
            .map(|load| TruckLoadEntry {
                truck: load.departure.schedule,
                departure_type: load.departure.departure_type,
                stop: load.stop,
                product: load.product,
                date: load.departure.date,
                quantity: read(load.variable),
            })
            .filter(|entry| entry.quantity > 0.0)
            .collect();

        let mut solution = PlanSolution {
            start: self.window.start,
            end: self.window.end,
            opening: self.opening.clone(),
            production,
            labor,
            inventory,
            shipments,
            cohort_shipments,
            state_changes,
            consumption,
            shortages,
            truck_loads,
            costs: CostBreakdown::default(),
        };
        solution.costs = CostBreakdown::compute(problem, network, &solution);
        solution
    }
}
