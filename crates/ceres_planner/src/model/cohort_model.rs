use std::collections::BTreeMap;

use fxhash::FxHashMap;
use good_lp::{Constraint, Expression, ProblemVariables, Variable, VariableDefinition, variable};
use jiff::civil::Date;
use tracing::{debug, instrument, warn};

use crate::{
    error::PlanningError,
    model::{
        cohort::{Cohort, CohortIdx, CohortKey},
        model_params::ModelParams,
        opening_state::{OpeningState, is_fresh, within_shelf_life},
        planning_window::PlanningWindow,
    },
    network::{leg::LegIdx, planning_network::PlanningNetwork},
    problem::{
        location::LocationIdx, planning_problem::PlanningProblem, product::ProductIdx,
        storage_state::StorageState, truck_schedule::TruckDeparture,
    },
    solution::plan_solution::{OpeningSummary, WindowResult},
    solver::{
        backend::{self, MipProblem},
        solve_params::SolveParams,
        termination::TerminationStatus,
    },
    timer_debug,
    utils::{dates, enumerate_idx::EnumerateIdx},
};

pub(crate) struct LaborVariables {
    pub hours: Variable,
    pub overtime: Option<Variable>,
    pub paid: Option<Variable>,
}

pub(crate) struct CohortShipmentVariable {
    pub leg: LegIdx,
    pub from: CohortIdx,
    pub departure_date: Date,
    pub delivery_date: Date,
    pub variable: Variable,
}

pub(crate) struct StateChangeVariable {
    pub from: CohortIdx,
    pub to: CohortIdx,
    pub date: Date,
    pub variable: Variable,
}

pub(crate) struct ConsumptionVariable {
    pub cohort: CohortIdx,
    pub date: Date,
    pub variable: Variable,
}

pub(crate) struct TruckLoadVariable {
    pub departure: TruckDeparture,
    pub stop: LocationIdx,
    pub product: ProductIdx,
    pub variable: Variable,
}

/// Where every decision lives in the formulation. Kept apart from the
/// solver problem so it can be read after the problem was consumed.
pub(crate) struct ModelIndex {
    pub window: PlanningWindow,
    pub opening: OpeningSummary,
    pub production: BTreeMap<(Date, ProductIdx), Variable>,
    pub labor: BTreeMap<Date, LaborVariables>,
    pub cohorts: Vec<Cohort>,
    pub shipments: BTreeMap<(LegIdx, ProductIdx, Date), Variable>,
    pub phantom_shipments: Vec<(LegIdx, ProductIdx, Date)>,
    pub cohort_shipments: Vec<CohortShipmentVariable>,
    pub state_changes: Vec<StateChangeVariable>,
    pub consumption: Vec<ConsumptionVariable>,
    pub shortages: BTreeMap<(LocationIdx, ProductIdx, Date), Variable>,
    pub truck_loads: Vec<TruckLoadVariable>,
}

/// Cohort-based formulation of one planning window.
///
/// Inventory is tracked per (location, product, production date, state) on
/// the dates the cohort can physically exist, shipments are indexed by
/// delivery date and truck loads link the shipments leaving the site to
/// actual departures.
pub struct CohortModel<'a> {
    problem: &'a PlanningProblem,
    network: &'a PlanningNetwork,
    mip: MipProblem,
    index: ModelIndex,
    num_variables: usize,
    infeasibility: Option<String>,
}

impl<'a> CohortModel<'a> {
    #[instrument(skip_all, fields(window = window.index), level = "debug")]
    pub fn build(
        problem: &'a PlanningProblem,
        network: &'a PlanningNetwork,
        window: PlanningWindow,
        opening: &OpeningState,
        params: &ModelParams,
    ) -> Result<CohortModel<'a>, PlanningError> {
        if window.end < window.start || window.commit_end > window.end {
            return Err(PlanningError::InvalidHorizon(format!(
                "window {} runs from {} to {} committing through {}",
                window.index, window.start, window.end, window.commit_end
            )));
        }
        if problem.manufacturing().production_rate_per_hour <= 0.0 {
            return Err(PlanningError::InvalidParameter(
                "production rate must be positive".to_owned(),
            ));
        }

        let mut builder = ModelBuilder::new(problem, network, window, params);
        timer_debug!("Build cohort model", {
            builder.add_opening(opening);
            builder.add_production_and_labor();
            builder.add_cohorts();
            builder.add_production_inflows();
            builder.add_shipments();
            builder.add_state_changes();
            builder.add_demand();
            builder.add_truck_linkage();
            builder.add_inventory_balance();
        });

        Ok(builder.finish())
    }

    pub fn window(&self) -> PlanningWindow {
        self.index.window
    }

    pub fn cohorts(&self) -> &[Cohort] {
        &self.index.cohorts
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn num_constraints(&self) -> usize {
        self.mip.constraints.len()
    }

    /// Aggregate shipments that would have to depart before the window
    /// start. They exist with an upper bound of zero.
    pub fn phantom_shipments(&self) -> &[(LegIdx, ProductIdx, Date)] {
        &self.index.phantom_shipments
    }

    /// Set when the formulation is infeasible by construction, e.g. demand
    /// no cohort can reach while shortages are disallowed.
    pub fn structural_infeasibility(&self) -> Option<&str> {
        self.infeasibility.as_deref()
    }

    /// Solves the window and reads the plan out of the solver. The solver
    /// problem is dropped before returning.
    pub fn solve(self, params: &SolveParams) -> Result<WindowResult, PlanningError> {
        let CohortModel {
            problem,
            network,
            mip,
            index,
            infeasibility,
            ..
        } = self;

        if let Some(reason) = infeasibility {
            warn!(window = index.window.index, "{reason}");
            return Ok(WindowResult {
                window: index.window,
                status: TerminationStatus::Infeasible,
                objective_value: None,
                solve_time: jiff::SignedDuration::ZERO,
                message: Some(reason),
                solution: None,
            });
        }

        let outcome = backend::solve(mip, params, |value| {
            index.extract(problem, network, value)
        })?;

        Ok(WindowResult {
            window: index.window,
            status: outcome.status,
            objective_value: outcome.objective_value,
            solve_time: outcome.solve_time,
            message: outcome.message,
            solution: outcome.values,
        })
    }
}

struct ModelBuilder<'a> {
    problem: &'a PlanningProblem,
    network: &'a PlanningNetwork,
    params: ModelParams,
    window: PlanningWindow,

    variables: ProblemVariables,
    num_variables: usize,
    constraints: Vec<Constraint>,
    objective: Expression,

    opening_summary: OpeningSummary,
    opening_at_start: BTreeMap<CohortKey, f64>,
    opening_arrivals: Vec<(CohortKey, Date, f64)>,

    production: BTreeMap<(Date, ProductIdx), Variable>,
    labor: BTreeMap<Date, LaborVariables>,
    cohorts: Vec<Cohort>,
    cohort_index: FxHashMap<CohortKey, CohortIdx>,
    cohorts_at: FxHashMap<(LocationIdx, ProductIdx, StorageState), Vec<CohortIdx>>,
    /// Net inflow terms of each (cohort, date) balance row.
    flows: FxHashMap<(CohortIdx, Date), Expression>,

    shipments: BTreeMap<(LegIdx, ProductIdx, Date), Variable>,
    phantom_shipments: Vec<(LegIdx, ProductIdx, Date)>,
    cohort_shipments: Vec<CohortShipmentVariable>,
    /// Cohort shipments leaving the site on their production day, by (stop, product, date).
    same_day_shipments: FxHashMap<(LocationIdx, ProductIdx, Date), Vec<Variable>>,
    state_changes: Vec<StateChangeVariable>,
    consumption: Vec<ConsumptionVariable>,
    shortages: BTreeMap<(LocationIdx, ProductIdx, Date), Variable>,
    truck_loads: Vec<TruckLoadVariable>,

    infeasibility: Option<String>,
}

impl<'a> ModelBuilder<'a> {
    fn new(
        problem: &'a PlanningProblem,
        network: &'a PlanningNetwork,
        window: PlanningWindow,
        params: &ModelParams,
    ) -> Self {
        Self {
            problem,
            network,
            params: params.clone(),
            window,
            variables: ProblemVariables::new(),
            num_variables: 0,
            constraints: Vec::new(),
            objective: Expression::from(0.0),
            opening_summary: OpeningSummary::default(),
            opening_at_start: BTreeMap::new(),
            opening_arrivals: Vec::new(),
            production: BTreeMap::new(),
            labor: BTreeMap::new(),
            cohorts: Vec::new(),
            cohort_index: FxHashMap::default(),
            cohorts_at: FxHashMap::default(),
            flows: FxHashMap::default(),
            shipments: BTreeMap::new(),
            phantom_shipments: Vec::new(),
            cohort_shipments: Vec::new(),
            same_day_shipments: FxHashMap::default(),
            state_changes: Vec::new(),
            consumption: Vec::new(),
            shortages: BTreeMap::new(),
            truck_loads: Vec::new(),
            infeasibility: None,
        }
    }

    fn add_variable(&mut self, definition: VariableDefinition) -> Variable {
        self.num_variables += 1;
        self.variables.add(definition)
    }

    fn add_flow(&mut self, cohort: CohortIdx, date: Date, coefficient: f64, variable: Variable) {
        *self
            .flows
            .entry((cohort, date))
            .or_insert_with(|| Expression::from(0.0)) += coefficient * variable;
    }

    fn batch_date(&self, production_date: Option<Date>) -> Option<Date> {
        if self.params.use_batch_tracking {
            production_date
        } else {
            None
        }
    }

    /// Last date a cohort may hold stock in `state`, capped by the window end.
    fn last_valid_date(
        &self,
        product: ProductIdx,
        production_date: Option<Date>,
        state: StorageState,
    ) -> Date {
        match production_date {
            Some(production_date) if self.params.tracks_shelf_life() => {
                let shelf_life = self.problem.product(product).shelf_life_days(state);
                dates::add_days(production_date, shelf_life as i32).min(self.window.end)
            }
            _ => self.window.end,
        }
    }

    fn expires_in_window(
        &self,
        product: ProductIdx,
        production_date: Option<Date>,
        state: StorageState,
    ) -> bool {
        match production_date {
            Some(production_date) if self.params.tracks_shelf_life() => {
                let shelf_life = self.problem.product(product).shelf_life_days(state);
                dates::add_days(production_date, shelf_life as i32) <= self.window.end
            }
            _ => false,
        }
    }

    fn add_opening(&mut self, opening: &OpeningState) {
        let start = self.window.start;
        let tracks = self.params.tracks_shelf_life();

        for cohort in &opening.inventory {
            self.opening_summary.inventory += cohort.quantity;
            if tracks && !is_fresh(self.problem, cohort, start) {
                self.opening_summary.expired += cohort.quantity;
                continue;
            }

            let key = CohortKey {
                location: cohort.location,
                product: cohort.product,
                production_date: self.batch_date(cohort.production_date),
                state: cohort.state,
            };
            *self.opening_at_start.entry(key).or_insert(0.0) += cohort.quantity;
        }

        for arrival in &opening.in_transit {
            let landing = arrival.delivery_date.max(start);
            self.opening_summary
                .in_transit
                .push((landing, arrival.quantity));
            if landing > self.window.end {
                continue;
            }

            if tracks
                && !within_shelf_life(
                    self.problem,
                    arrival.product,
                    arrival.production_date,
                    arrival.state,
                    landing,
                )
            {
                // Counted by the window that commits the landing day
                if landing <= self.window.commit_end {
                    self.opening_summary.expired += arrival.quantity;
                }
                continue;
            }

            let key = CohortKey {
                location: arrival.destination,
                product: arrival.product,
                production_date: self.batch_date(arrival.production_date),
                state: arrival.state,
            };
            self.opening_arrivals.push((key, landing, arrival.quantity));
        }

        debug!(
            inventory = self.opening_summary.inventory,
            expired = self.opening_summary.expired,
            arrivals = self.opening_arrivals.len(),
            "Opening state"
        );
    }

    fn add_production_and_labor(&mut self) {
        let manufacturing = self.problem.manufacturing().clone();
        let rate = manufacturing.production_rate_per_hour;
        let overhead_hours = manufacturing.startup_hours + manufacturing.shutdown_hours;
        let num_products = self.problem.products().len();
        let tracks_changeovers = manufacturing.changeover_hours > 0.0 && num_products > 1;
        let production_cost = self.problem.costs().production_cost_per_unit;

        if num_products == 0 {
            return;
        }

        let window = self.window;
        for date in window.days() {
            let Some(labor_day) = self.problem.labor().day(date).cloned() else {
                continue;
            };
            if labor_day.max_hours <= 0.0 {
                continue;
            }

            let max_units = labor_day.max_hours * rate;
            let needs_active = overhead_hours > 0.0
                || (!labor_day.is_fixed_day() && labor_day.minimum_hours > 0.0);
            let active = needs_active.then(|| self.add_variable(variable().binary()));

            let mut hours_used = Expression::from(0.0);
            let mut total_production = Expression::from(0.0);
            let mut products_made = Expression::from(0.0);

            for product in ProductIdx::range(num_products) {
                let quantity = self.add_variable(variable().min(0.0).max(max_units));
                self.production.insert((date, product), quantity);
                self.objective += production_cost * quantity;
                hours_used += (1.0 / rate) * quantity;
                total_production += quantity;

                if tracks_changeovers {
                    let produced = self.add_variable(variable().binary());
                    self.constraints
                        .push((Expression::from(quantity) - max_units * produced).leq(0.0));
                    if let Some(active) = active {
                        self.constraints
                            .push((Expression::from(produced) - active).leq(0.0));
                    }
                    products_made += produced;
                }
            }

            if let Some(active) = active {
                if !tracks_changeovers {
                    self.constraints
                        .push((total_production - max_units * active).leq(0.0));
                }
                hours_used += overhead_hours * active;
            }

            if tracks_changeovers {
                let changeovers = self.add_variable(variable().min(0.0));
                self.constraints
                    .push((Expression::from(changeovers) - products_made).geq(-1.0));
                hours_used += manufacturing.changeover_hours * changeovers;
            }

            let hours = self.add_variable(variable().min(0.0).max(labor_day.max_hours));
            self.constraints
                .push((Expression::from(hours) - hours_used).eq(0.0));

            let labor = if labor_day.is_fixed_day() {
                let overtime =
                    self.add_variable(variable().min(0.0).max(labor_day.overtime_capacity()));
                self.constraints.push(
                    (Expression::from(overtime) - hours).geq(-labor_day.fixed_hours),
                );
                self.objective += Expression::from(labor_day.fixed_cost());
                self.objective += labor_day.overtime_rate * overtime;

                LaborVariables {
                    hours,
                    overtime: Some(overtime),
                    paid: None,
                }
            } else {
                let paid = self.add_variable(variable().min(0.0).max(labor_day.max_hours));
                self.constraints
                    .push((Expression::from(paid) - hours).geq(0.0));
                if let Some(active) = active {
                    self.constraints
                        .push((Expression::from(paid) - labor_day.minimum_hours * active).geq(0.0));
                    self.constraints
                        .push((Expression::from(hours) - labor_day.max_hours * active).leq(0.0));
                }
                self.objective += labor_day.non_fixed_rate * paid;

                LaborVariables {
                    hours,
                    overtime: None,
                    paid: Some(paid),
                }
            };
            self.labor.insert(date, labor);
        }

        debug!(
            production_days = self.labor.len(),
            "Production and labor variables"
        );
    }

    /// Dates from which stock of one batch can be at each (location, state),
    /// starting from where the batch enters the window.
    fn earliest_presence(
        &self,
        product: ProductIdx,
        production_date: Option<Date>,
        seeds: &[(LocationIdx, StorageState, Date)],
    ) -> BTreeMap<(LocationIdx, StorageState), Date> {
        let mut earliest: BTreeMap<(LocationIdx, StorageState), Date> = BTreeMap::new();
        let mut stack = seeds.to_vec();

        while let Some((location, state, date)) = stack.pop() {
            if date > self.last_valid_date(product, production_date, state) {
                continue;
            }
            if earliest
                .get(&(location, state))
                .is_some_and(|&known| known <= date)
            {
                continue;
            }
            earliest.insert((location, state), date);

            if self.problem.location(location).storage().supports_both() {
                stack.push((location, state.other(), date));
            }
            for &leg_index in self.network.active_outgoing(location) {
                let leg = self.network.leg(leg_index);
                if leg.departure_state() == state {
                    stack.push((
                        leg.destination(),
                        leg.arrival_state(),
                        dates::add_days(date, leg.transit_days_i32()),
                    ));
                }
            }
        }

        earliest
    }

    fn add_cohorts(&mut self) {
        let site = self.problem.manufacturing_site();
        let production_state = self.problem.location(site).production_state();

        let mut seeds: BTreeMap<(ProductIdx, Option<Date>), Vec<(LocationIdx, StorageState, Date)>> =
            BTreeMap::new();
        for &(date, product) in self.production.keys() {
            seeds
                .entry((product, self.batch_date(Some(date))))
                .or_default()
                .push((site, production_state, date));
        }
        for key in self.opening_at_start.keys() {
            seeds
                .entry((key.product, key.production_date))
                .or_default()
                .push((key.location, key.state, self.window.start));
        }
        for (key, landing, _) in &self.opening_arrivals {
            seeds
                .entry((key.product, key.production_date))
                .or_default()
                .push((key.location, key.state, *landing));
        }

        for ((product, production_date), batch_seeds) in seeds {
            let presence = self.earliest_presence(product, production_date, &batch_seeds);

            for ((location, state), first) in presence {
                let last = self.last_valid_date(product, production_date, state);
                let key = CohortKey {
                    location,
                    product,
                    production_date,
                    state,
                };
                let expires = self.expires_in_window(product, production_date, state);
                let holding_cost = self.problem.costs().holding_cost(state);

                let num_days = dates::days_between(first, last) + 1;
                let mut inventory = Vec::with_capacity(num_days.max(0) as usize);
                for offset in 0..num_days {
                    // Stock must be gone by the end of its last valid day
                    let definition = if expires && offset == num_days - 1 {
                        variable().min(0.0).max(0.0)
                    } else {
                        variable().min(0.0)
                    };
                    let quantity = self.add_variable(definition);
                    self.objective += holding_cost * quantity;
                    inventory.push(quantity);
                }

                let index = CohortIdx::new(self.cohorts.len());
                self.cohorts.push(Cohort {
                    key,
                    first,
                    last,
                    inventory,
                });
                self.cohort_index.insert(key, index);
                self.cohorts_at
                    .entry((location, product, state))
                    .or_default()
                    .push(index);
            }
        }

        debug!(cohorts = self.cohorts.len(), "Cohorts materialized");
    }

    fn add_production_inflows(&mut self) {
        let site = self.problem.manufacturing_site();
        let production_state = self.problem.location(site).production_state();

        let production = self
            .production
            .iter()
            .map(|(&key, &variable)| (key, variable))
            .collect::<Vec<_>>();
        for ((date, product), quantity) in production {
            let key = CohortKey {
                location: site,
                product,
                production_date: self.batch_date(Some(date)),
                state: production_state,
            };

            match self.cohort_index.get(&key).copied() {
                Some(cohort) if self.cohorts[cohort].covers(date) => {
                    self.add_flow(cohort, date, 1.0, quantity);
                }
                _ => {
                    warn!(%date, "Production has no cohort to enter, fixing it to zero");
                    self.constraints.push(Expression::from(quantity).leq(0.0));
                }
            }
        }
    }

    fn add_shipments(&mut self) {
        let site = self.problem.manufacturing_site();
        let start = self.window.start;
        let end = self.window.end;
        let tracks = self.params.tracks_shelf_life();
        let num_products = self.problem.products().len();

        let legs = self
            .network
            .active_legs()
            .map(|(index, leg)| (index, leg.clone()))
            .collect::<Vec<_>>();

        for (leg_index, leg) in legs {
            let transit = leg.transit_days_i32();

            for product in ProductIdx::range(num_products) {
                let origins = self
                    .cohorts_at
                    .get(&(leg.origin(), product, leg.departure_state()))
                    .cloned()
                    .unwrap_or_default();

                for delivery_date in dates::date_range(start, dates::add_days(end, transit)) {
                    let departure_date = dates::add_days(delivery_date, -transit);
                    if departure_date < start {
                        let shipment = self.add_variable(variable().min(0.0).max(0.0));
                        self.shipments
                            .insert((leg_index, product, delivery_date), shipment);
                        self.phantom_shipments
                            .push((leg_index, product, delivery_date));
                        continue;
                    }

                    let mut cohort_total = Expression::from(0.0);
                    let mut num_cohort_shipments = 0;

                    for &from in &origins {
                        if !self.cohorts[from].covers(departure_date) {
                            continue;
                        }
                        let production_date = self.cohorts[from].key.production_date;

                        let to = if delivery_date <= end {
                            let key = CohortKey {
                                location: leg.destination(),
                                product,
                                production_date,
                                state: leg.arrival_state(),
                            };
                            match self.cohort_index.get(&key).copied() {
                                Some(to) if self.cohorts[to].covers(delivery_date) => Some(to),
                                _ => continue,
                            }
                        } else {
                            if tracks
                                && !within_shelf_life(
                                    self.problem,
                                    product,
                                    production_date,
                                    leg.arrival_state(),
                                    delivery_date,
                                )
                            {
                                continue;
                            }
                            None
                        };

                        let quantity = self.add_variable(variable().min(0.0));
                        self.add_flow(from, departure_date, -1.0, quantity);
                        if let Some(to) = to {
                            self.add_flow(to, delivery_date, 1.0, quantity);
                        }
                        if leg.origin() == site && production_date == Some(departure_date) {
                            self.same_day_shipments
                                .entry((leg.destination(), product, departure_date))
                                .or_default()
                                .push(quantity);
                        }

                        self.cohort_shipments.push(CohortShipmentVariable {
                            leg: leg_index,
                            from,
                            departure_date,
                            delivery_date,
                            variable: quantity,
                        });
                        cohort_total += quantity;
                        num_cohort_shipments += 1;
                    }

                    if num_cohort_shipments == 0 {
                        let shipment = self.add_variable(variable().min(0.0).max(0.0));
                        self.shipments
                            .insert((leg_index, product, delivery_date), shipment);
                        continue;
                    }

                    let shipment = self.add_variable(variable().min(0.0));
                    self.objective += leg.cost_per_unit() * shipment;
                    self.constraints
                        .push((cohort_total - shipment).eq(0.0));
                    self.shipments
                        .insert((leg_index, product, delivery_date), shipment);
                }
            }
        }

        debug!(
            shipments = self.shipments.len(),
            cohort_shipments = self.cohort_shipments.len(),
            phantom = self.phantom_shipments.len(),
            "Shipment variables"
        );
    }

    fn add_state_changes(&mut self) {
        let costs = self.problem.costs().clone();

        let pairs = self
            .cohorts
            .iter()
            .enumerate_idx()
            .filter(|(_, cohort): &(CohortIdx, &Cohort)| {
                cohort.key.state == StorageState::Ambient
                    && self
                        .problem
                        .location(cohort.key.location)
                        .storage()
                        .supports_both()
            })
            .filter_map(|(ambient, cohort)| {
                let frozen_key = CohortKey {
                    state: StorageState::Frozen,
                    ..cohort.key
                };
                self.cohort_index
                    .get(&frozen_key)
                    .map(|&frozen| (ambient, frozen))
            })
            .collect::<Vec<_>>();

        for (ambient, frozen) in pairs {
            let first = self.cohorts[ambient].first.max(self.cohorts[frozen].first);
            let last = self.cohorts[ambient].last.min(self.cohorts[frozen].last);

            for date in dates::date_range(first, last) {
                let freeze = self.add_variable(variable().min(0.0));
                self.add_flow(ambient, date, -1.0, freeze);
                self.add_flow(frozen, date, 1.0, freeze);
                self.objective += costs.freeze_cost_per_unit * freeze;
                self.state_changes.push(StateChangeVariable {
                    from: ambient,
                    to: frozen,
                    date,
                    variable: freeze,
                });

                let thaw = self.add_variable(variable().min(0.0));
                self.add_flow(frozen, date, -1.0, thaw);
                self.add_flow(ambient, date, 1.0, thaw);
                self.objective += costs.thaw_cost_per_unit * thaw;
                self.state_changes.push(StateChangeVariable {
                    from: frozen,
                    to: ambient,
                    date,
                    variable: thaw,
                });
            }
        }
    }

    fn add_demand(&mut self) {
        let penalty = self.problem.costs().shortage_penalty_per_unit;
        let demand = self
            .problem
            .forecast()
            .entries_between(self.window.start, self.window.end)
            .collect::<Vec<_>>();

        for entry in demand {
            let states = self.problem.location(entry.location).storage().states();
            let mut served = Expression::from(0.0);
            let mut num_sources = 0;

            for state in states {
                let cohorts = self
                    .cohorts_at
                    .get(&(entry.location, entry.product, state))
                    .cloned()
                    .unwrap_or_default();
                for cohort in cohorts {
                    if !self.cohorts[cohort].covers(entry.date) {
                        continue;
                    }
                    let quantity = self.add_variable(variable().min(0.0).max(entry.quantity));
                    self.add_flow(cohort, entry.date, -1.0, quantity);
                    self.consumption.push(ConsumptionVariable {
                        cohort,
                        date: entry.date,
                        variable: quantity,
                    });
                    served += quantity;
                    num_sources += 1;
                }
            }

            if self.params.allow_shortages {
                let shortage = self.add_variable(variable().min(0.0).max(entry.quantity));
                self.objective += penalty * shortage;
                self.shortages
                    .insert((entry.location, entry.product, entry.date), shortage);
                served += shortage;
            } else if num_sources == 0 {
                let reason = format!(
                    "demand of {:.3} for '{}' at '{}' on {} cannot be reached and shortages are disallowed",
                    entry.quantity,
                    self.problem.product(entry.product).external_id(),
                    self.problem.location(entry.location).external_id(),
                    entry.date
                );
                self.infeasibility.get_or_insert(reason);
                continue;
            }

            self.constraints.push(served.eq(entry.quantity));
        }
    }

    fn add_truck_linkage(&mut self) {
        let problem = self.problem;
        let trucks = problem.trucks();
        if !self.params.enforce_truck_capacity || trucks.is_empty() {
            return;
        }

        let site = problem.manufacturing_site();
        let site_legs = self
            .network
            .active_outgoing(site)
            .iter()
            .map(|&index| (index, self.network.leg(index).clone()))
            .collect::<Vec<_>>();
        if site_legs.is_empty() {
            return;
        }

        let num_products = problem.products().len();
        let departures = trucks
            .departures_between(self.window.start, self.window.end)
            .into_iter()
            .filter(|departure| trucks.schedule(departure.schedule).origin() == site)
            .collect::<Vec<_>>();

        // (stop, product, date) -> (all loads, afternoon loads)
        let mut loads: FxHashMap<(LocationIdx, ProductIdx, Date), (Expression, Expression)> =
            FxHashMap::default();

        for departure in departures {
            let schedule = trucks.schedule(departure.schedule);
            let mut truck_total = Expression::from(0.0);
            let mut truck_pallets = Expression::from(0.0);
            let mut num_loads = 0;

            for &stop in schedule.stops() {
                if !site_legs.iter().any(|(_, leg)| leg.destination() == stop) {
                    continue;
                }

                for product in ProductIdx::range(num_products) {
                    let load =
                        self.add_variable(variable().min(0.0).max(schedule.unit_capacity()));
                    if self.params.integer_pallets {
                        let pallets = self.add_variable(
                            variable()
                                .integer()
                                .min(0.0)
                                .max(f64::from(schedule.pallet_capacity())),
                        );
                        self.constraints.push(
                            (Expression::from(load)
                                - f64::from(schedule.units_per_pallet()) * pallets)
                                .leq(0.0),
                        );
                        truck_pallets += pallets;
                    }

                    let (all, afternoon) = loads
                        .entry((stop, product, departure.date))
                        .or_insert_with(|| (Expression::from(0.0), Expression::from(0.0)));
                    *all += load;
                    if departure.departure_type.accepts_same_day_production() {
                        *afternoon += load;
                    }

                    self.truck_loads.push(TruckLoadVariable {
                        departure,
                        stop,
                        product,
                        variable: load,
                    });
                    truck_total += load;
                    num_loads += 1;
                }
            }

            if num_loads > 0 {
                self.constraints
                    .push(truck_total.leq(schedule.unit_capacity()));
                if self.params.integer_pallets {
                    self.constraints
                        .push(truck_pallets.leq(f64::from(schedule.pallet_capacity())));
                }
            }
        }

        let mut stops = site_legs
            .iter()
            .map(|(_, leg)| leg.destination())
            .collect::<Vec<_>>();
        stops.sort_unstable();
        stops.dedup();

        let window = self.window;
        for stop in stops {
            for product in ProductIdx::range(num_products) {
                for date in window.days() {
                    let mut shipped = Expression::from(0.0);
                    for (leg_index, leg) in site_legs
                        .iter()
                        .filter(|(_, leg)| leg.destination() == stop)
                    {
                        let delivery_date = dates::add_days(date, leg.transit_days_i32());
                        if let Some(&shipment) =
                            self.shipments.get(&(*leg_index, product, delivery_date))
                        {
                            shipped += shipment;
                        }
                    }

                    let (all, afternoon) = loads
                        .get(&(stop, product, date))
                        .cloned()
                        .unwrap_or_else(|| (Expression::from(0.0), Expression::from(0.0)));
                    self.constraints.push((shipped - all).eq(0.0));

                    if let Some(same_day) = self.same_day_shipments.get(&(stop, product, date)) {
                        let same_day_total = same_day
                            .iter()
                            .fold(Expression::from(0.0), |acc, &shipment| acc + shipment);
                        self.constraints
                            .push((same_day_total - afternoon).leq(0.0));
                    }
                }
            }
        }

        debug!(truck_loads = self.truck_loads.len(), "Truck linkage");
    }

    fn add_inventory_balance(&mut self) {
        let start = self.window.start;

        let mut arrivals: FxHashMap<(CohortIdx, Date), f64> = FxHashMap::default();
        for (key, landing, quantity) in &self.opening_arrivals {
            match self.cohort_index.get(key) {
                Some(&cohort) if self.cohorts[cohort].covers(*landing) => {
                    *arrivals.entry((cohort, *landing)).or_insert(0.0) += quantity;
                }
                _ => warn!(%landing, "In-transit arrival has no cohort to land in"),
            }
        }

        let mut balance = Vec::new();
        for (index, cohort) in self.cohorts.iter().enumerate_idx() {
            let index: CohortIdx = index;
            let mut previous: Option<Variable> = None;

            for (date, &inventory) in cohort.dates().zip(cohort.inventory.iter()) {
                let mut row = Expression::from(inventory);
                if let Some(previous) = previous {
                    row -= previous;
                }
                if let Some(flow) = self.flows.remove(&(index, date)) {
                    row -= flow;
                }

                let mut supplied = arrivals.get(&(index, date)).copied().unwrap_or(0.0);
                if previous.is_none() && date == start {
                    supplied += self
                        .opening_at_start
                        .get(&cohort.key)
                        .copied()
                        .unwrap_or(0.0);
                }

                balance.push(row.eq(supplied));
                previous = Some(inventory);
            }
        }

        if !self.flows.is_empty() {
            warn!(
                rows = self.flows.len(),
                "Flows reference dates outside their cohort"
            );
        }

        self.constraints.extend(balance);
    }

    fn finish(self) -> CohortModel<'a> {
        debug!(
            window = self.window.index,
            variables = self.num_variables,
            constraints = self.constraints.len(),
            cohorts = self.cohorts.len(),
            "Cohort model built"
        );

        CohortModel {
            problem: self.problem,
            network: self.network,
            mip: MipProblem {
                variables: self.variables,
                objective: self.objective,
                constraints: self.constraints,
            },
            index: ModelIndex {
                window: self.window,
                opening: self.opening_summary,
                production: self.production,
                labor: self.labor,
                cohorts: self.cohorts,
                shipments: self.shipments,
                phantom_shipments: self.phantom_shipments,
                cohort_shipments: self.cohort_shipments,
                state_changes: self.state_changes,
                consumption: self.consumption,
                shortages: self.shortages,
                truck_loads: self.truck_loads,
            },
            num_variables: self.num_variables,
            infeasibility: self.infeasibility,
        }
    }
}
