use fxhash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, instrument, warn};

use crate::{
    error::PlanningError,
    network::{
        leg::{Leg, LegIdx},
        topology::NetworkTopology,
    },
    problem::{location::LocationIdx, planning_problem::PlanningProblem},
};

pub struct RouteEnumeratorParams {
    pub max_routes_per_destination: usize,
    /// Hubs a route may pass through between the site and the destination.
    pub max_intermediate_stops: usize,
    pub enforce_shelf_life: bool,
}

impl Default for RouteEnumeratorParams {
    fn default() -> Self {
        Self {
            max_routes_per_destination: 5,
            max_intermediate_stops: 2,
            enforce_shelf_life: true,
        }
    }
}

/// An acyclic path of legs from the manufacturing site to a destination.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EnumeratedRoute {
    destination: LocationIdx,
    legs: SmallVec<[LegIdx; 3]>,
    transit_days: u32,
    cost_per_unit: f64,
}

impl EnumeratedRoute {
    pub fn destination(&self) -> LocationIdx {
        self.destination
    }

    pub fn legs(&self) -> &[LegIdx] {
        &self.legs
    }

    pub fn transit_days(&self) -> u32 {
        self.transit_days
    }

    pub fn cost_per_unit(&self) -> f64 {
        self.cost_per_unit
    }

    pub fn hops(&self) -> usize {
        self.legs.len()
    }

    fn rank_key(&self) -> (u32, f64, usize) {
        (self.transit_days, self.cost_per_unit, self.hops())
    }
}

/// Ranked routes per destination plus the set of legs they use.
#[derive(Debug, Clone, Default)]
pub struct RouteSet {
    routes: Vec<EnumeratedRoute>,
    by_destination: FxHashMap<LocationIdx, Vec<usize>>,
    legs: Vec<LegIdx>,
}

impl RouteSet {
    pub fn routes(&self) -> &[EnumeratedRoute] {
        &self.routes
    }

    pub fn routes_to(&self, destination: LocationIdx) -> impl Iterator<Item = &EnumeratedRoute> {
        self.by_destination
            .get(&destination)
            .into_iter()
            .flatten()
            .map(|&index| &self.routes[index])
    }

    /// Distinct legs used by at least one route, in index order.
    pub fn legs(&self) -> &[LegIdx] {
        &self.legs
    }

    pub fn cheapest_cost_to(&self, destination: LocationIdx) -> Option<f64> {
        self.routes_to(destination)
            .map(|route| route.cost_per_unit)
            .min_by(f64::total_cmp)
    }

    pub fn max_transit_days(&self) -> u32 {
        self.routes
            .iter()
            .map(|route| route.transit_days)
            .max()
            .unwrap_or(0)
    }
}

pub struct RouteEnumerator<'a> {
    problem: &'a PlanningProblem,
    topology: &'a NetworkTopology,
    params: RouteEnumeratorParams,
}

struct SearchState {
    path: SmallVec<[LegIdx; 3]>,
    visited: SmallVec<[LocationIdx; 4]>,
    transit_days: u32,
    cost_per_unit: f64,
}

impl<'a> RouteEnumerator<'a> {
    pub fn new(
        problem: &'a PlanningProblem,
        topology: &'a NetworkTopology,
        params: RouteEnumeratorParams,
    ) -> Self {
        Self {
            problem,
            topology,
            params,
        }
    }

    /// Enumerates routes to every destination with demand. Fails on the first
    /// demanded destination that no route reaches.
    #[instrument(skip_all, level = "debug")]
    pub fn enumerate(&self) -> Result<RouteSet, PlanningError> {
        let destinations = self.problem.forecast().destinations();
        let site = self.problem.manufacturing_site();

        let mut found: FxHashMap<LocationIdx, Vec<EnumeratedRoute>> = FxHashMap::default();
        let mut state = SearchState {
            path: SmallVec::new(),
            visited: SmallVec::from_elem(site, 1),
            transit_days: 0,
            cost_per_unit: 0.0,
        };
        self.search(site, &mut state, &destinations, &mut found);

        let mut route_set = RouteSet::default();
        for &destination in &destinations {
            if destination == site {
                // Demand at the site itself is served from stock without a leg
                route_set
                    .by_destination
                    .entry(destination)
                    .or_default()
                    .push(route_set.routes.len());
                route_set.routes.push(EnumeratedRoute {
                    destination,
                    legs: SmallVec::new(),
                    transit_days: 0,
                    cost_per_unit: 0.0,
                });
                continue;
            }

            let Some(mut routes) = found.remove(&destination) else {
                let destination = self.problem.location(destination).external_id().to_owned();
                warn!(%destination, "No feasible route");
                return Err(PlanningError::NoRouteToDestination { destination });
            };

            routes.sort_by(|a, b| {
                let (a_days, a_cost, a_hops) = a.rank_key();
                let (b_days, b_cost, b_hops) = b.rank_key();
                a_days
                    .cmp(&b_days)
                    .then(a_cost.total_cmp(&b_cost))
                    .then(a_hops.cmp(&b_hops))
            });
            routes.truncate(self.params.max_routes_per_destination.max(1));

            debug!(
                destination = self.problem.location(destination).external_id(),
                "Enumerated {} route(s), fastest {} day(s)",
                routes.len(),
                routes[0].transit_days
            );

            for route in routes {
                route_set
                    .by_destination
                    .entry(destination)
                    .or_default()
                    .push(route_set.routes.len());
                route_set.routes.push(route);
            }
        }

        let mut legs = route_set
            .routes
            .iter()
            .flat_map(|route| route.legs.iter().copied())
            .collect::<Vec<_>>();
        legs.sort_unstable();
        legs.dedup();
        route_set.legs = legs;

        Ok(route_set)
    }

    fn search(
        &self,
        location: LocationIdx,
        state: &mut SearchState,
        destinations: &[LocationIdx],
        found: &mut FxHashMap<LocationIdx, Vec<EnumeratedRoute>>,
    ) {
        if state.path.len() > self.params.max_intermediate_stops {
            return;
        }

        for &leg_index in self.topology.outgoing(location) {
            let leg = self.topology.leg(leg_index);
            let next = leg.destination();
            if state.visited.contains(&next) || !self.within_shelf_life(leg, state.transit_days) {
                continue;
            }

            state.path.push(leg_index);
            state.visited.push(next);
            state.transit_days += leg.transit_days();
            state.cost_per_unit += leg.cost_per_unit();

            if destinations.binary_search(&next).is_ok() {
                found.entry(next).or_default().push(EnumeratedRoute {
                    destination: next,
                    legs: state.path.clone(),
                    transit_days: state.transit_days,
                    cost_per_unit: state.cost_per_unit,
                });
            }
            self.search(next, state, destinations, found);

            state.path.pop();
            state.visited.pop();
            state.transit_days -= leg.transit_days();
            state.cost_per_unit -= leg.cost_per_unit();
        }
    }

    fn within_shelf_life(&self, leg: &Leg, elapsed_days: u32) -> bool {
        !self.params.enforce_shelf_life
            || elapsed_days + leg.transit_days()
                <= self.problem.max_shelf_life_days(leg.arrival_state())
    }
}
