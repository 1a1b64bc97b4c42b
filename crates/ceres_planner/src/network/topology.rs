use fxhash::FxHashMap;
use tracing::{debug, instrument};

use crate::{
    error::PlanningError,
    network::leg::{Leg, LegIdx},
    problem::{
        location::LocationIdx, planning_problem::PlanningProblem, storage_state::TransportMode,
    },
    utils::enumerate_idx::EnumerateIdx,
};

/// The directed leg graph derived from the configured route definitions.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    legs: Vec<Leg>,
    outgoing: Vec<Vec<LegIdx>>,
    incoming: Vec<Vec<LegIdx>>,
}

impl NetworkTopology {
    /// Splits every route definition into legs, deduplicating by
    /// (origin, destination, mode). When the same hop is configured twice the
    /// faster, then cheaper, definition wins.
    #[instrument(skip_all, level = "debug")]
    pub fn build(problem: &PlanningProblem) -> Result<Self, PlanningError> {
        let locations = problem.locations();
        let mut by_key: FxHashMap<(LocationIdx, LocationIdx, TransportMode), LegIdx> =
            FxHashMap::default();
        let mut legs: Vec<Leg> = Vec::new();

        for route in problem.routes() {
            if route.segments.is_empty() {
                return Err(PlanningError::EmptyRoute(route.id.clone()));
            }

            let resolve = |id: &str| {
                problem
                    .location_index(id)
                    .ok_or_else(|| PlanningError::UndefinedLocation {
                        route: route.id.clone(),
                        location: id.to_owned(),
                    })
            };

            for (position, segment) in route.segments.iter().enumerate() {
                if position > 0 {
                    let previous = &route.segments[position - 1];
                    if previous.destination != segment.origin {
                        return Err(PlanningError::DisconnectedRoute {
                            route: route.id.clone(),
                            segment: position,
                            expected: previous.destination.clone(),
                            found: segment.origin.clone(),
                        });
                    }
                }

                let origin = resolve(&segment.origin)?;
                let destination = resolve(&segment.destination)?;
                if origin == destination {
                    continue;
                }

                let leg = Leg {
                    origin,
                    destination,
                    transit_days: segment.transit_days,
                    transport_mode: segment.transport_mode,
                    cost_per_unit: segment.cost_per_unit,
                    departure_state: locations[origin]
                        .storage()
                        .coerce(segment.transport_mode),
                    arrival_state: locations[destination]
                        .storage()
                        .coerce(segment.transport_mode),
                };

                match by_key
                    .get(&(origin, destination, segment.transport_mode))
                    .copied()
                {
                    Some(existing) => {
                        let current = &mut legs[existing];
                        if (leg.transit_days, leg.cost_per_unit)
                            < (current.transit_days, current.cost_per_unit)
                        {
                            debug!(
                                route = route.id,
                                "Replacing leg {} -> {} with a faster or cheaper definition",
                                locations[origin].external_id(),
                                locations[destination].external_id()
                            );
                            *current = leg;
                        }
                    }
                    None => {
                        by_key.insert((origin, destination, segment.transport_mode), legs.len().into());
                        legs.push(leg);
                    }
                }
            }
        }

        Ok(Self::from_legs(locations.len(), legs))
    }

    pub(crate) fn from_legs(num_locations: usize, legs: Vec<Leg>) -> Self {
        let mut outgoing = vec![Vec::new(); num_locations];
        let mut incoming = vec![Vec::new(); num_locations];

        for (index, leg) in legs.iter().enumerate_idx() {
            let index: LegIdx = index;
            outgoing[leg.origin.get()].push(index);
            incoming[leg.destination.get()].push(index);
        }

        debug!("Network topology with {} legs", legs.len());

        Self {
            legs,
            outgoing,
            incoming,
        }
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn leg(&self, index: LegIdx) -> &Leg {
        &self.legs[index]
    }

    pub fn outgoing(&self, location: LocationIdx) -> &[LegIdx] {
        &self.outgoing[location.get()]
    }

    pub fn incoming(&self, location: LocationIdx) -> &[LegIdx] {
        &self.incoming[location.get()]
    }

    pub fn find_leg(&self, origin: LocationIdx, destination: LocationIdx) -> Option<LegIdx> {
        self.outgoing(origin)
            .iter()
            .copied()
            .filter(|&leg| self.legs[leg].destination == destination)
            .min_by_key(|&leg| self.legs[leg].transit_days)
    }
}
