use fxhash::FxHashMap;
use tracing::info;

use crate::{
    error::PlanningError,
    network::{
        leg::{Leg, LegIdx},
        route_enumerator::{RouteEnumerator, RouteEnumeratorParams, RouteSet},
        topology::NetworkTopology,
    },
    problem::{location::LocationIdx, planning_problem::PlanningProblem},
    timer_debug,
};

/// The legs that take part in planning: the topology restricted to the
/// legs of at least one enumerated route.
#[derive(Debug, Clone)]
pub struct PlanningNetwork {
    topology: NetworkTopology,
    routes: RouteSet,
    active_outgoing: FxHashMap<LocationIdx, Vec<LegIdx>>,
}

impl PlanningNetwork {
    pub fn build(
        problem: &PlanningProblem,
        params: RouteEnumeratorParams,
    ) -> Result<Self, PlanningError> {
        let topology = timer_debug!("Build topology", NetworkTopology::build(problem)?);
        let routes = timer_debug!(
            "Enumerate routes",
            RouteEnumerator::new(problem, &topology, params).enumerate()?
        );

        let mut active_outgoing: FxHashMap<LocationIdx, Vec<LegIdx>> = FxHashMap::default();
        for &leg in routes.legs() {
            active_outgoing
                .entry(topology.leg(leg).origin())
                .or_default()
                .push(leg);
        }

        info!(
            legs = topology.legs().len(),
            active_legs = routes.legs().len(),
            routes = routes.routes().len(),
            "Planning network ready"
        );

        Ok(Self {
            topology,
            routes,
            active_outgoing,
        })
    }

    pub fn topology(&self) -> &NetworkTopology {
        &self.topology
    }

    pub fn routes(&self) -> &RouteSet {
        &self.routes
    }

    pub fn leg(&self, index: LegIdx) -> &Leg {
        self.topology.leg(index)
    }

    pub fn active_legs(&self) -> impl Iterator<Item = (LegIdx, &Leg)> {
        self.routes
            .legs()
            .iter()
            .map(|&index| (index, self.topology.leg(index)))
    }

    pub fn active_outgoing(&self, location: LocationIdx) -> &[LegIdx] {
        self.active_outgoing
            .get(&location)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
