use jiff::civil::Date;
use thiserror::Error;

use crate::solver::termination::TerminationStatus;

/// Everything that makes a plan unusable. Solver infeasibility of a single
/// solve is *not* an error, it is reported through [`TerminationStatus`];
/// only the rolling-horizon abort policy turns it into one.
#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Route '{route}' references undefined location '{location}'")]
    UndefinedLocation { route: String, location: String },

    #[error("{context} references undefined location '{location}'")]
    UnknownLocation { context: String, location: String },

    #[error("{context} references undefined product '{product}'")]
    UnknownProduct { context: String, product: String },

    #[error("Route '{route}' is not contiguous: segment {segment} starts at '{found}', expected '{expected}'")]
    DisconnectedRoute {
        route: String,
        segment: usize,
        expected: String,
        found: String,
    },

    #[error("Route '{0}' has no segments")]
    EmptyRoute(String),

    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Expected exactly one manufacturing location, found {0}")]
    ManufacturingSite(usize),

    #[error("Destination '{destination}' has demand but no feasible route from the manufacturing site")]
    NoRouteToDestination { destination: String },

    #[error(
        "Shortage penalty {penalty} must exceed production + transport cost {required} to serve '{destination}'"
    )]
    ShortagePenaltyTooLow {
        penalty: f64,
        required: f64,
        destination: String,
    },

    #[error("Invalid planning horizon: {0}")]
    InvalidHorizon(String),

    #[error("Invalid rolling horizon configuration: {0}")]
    InvalidRollingConfig(String),

    #[error(
        "Overlap of {overlap_days} day(s) is shorter than the minimum production-to-delivery lead time of {lead_time_days} day(s)"
    )]
    OverlapShorterThanLeadTime {
        overlap_days: u32,
        lead_time_days: u32,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(
        "Material balance violated for {scope}: supply {supply:.3} vs. usage {usage:.3} (gap {gap:.3})"
    )]
    MaterialBalance {
        scope: String,
        supply: f64,
        usage: f64,
        gap: f64,
    },

    #[error("Cohort invariant violated: {0}")]
    CohortInvariant(String),

    #[error(
        "Demand at '{location}' for '{product}' on {date} is double booked: consumed {consumed:.3} + shortage {shortage:.3} vs. demand {demand:.3}"
    )]
    DemandMismatch {
        location: String,
        product: String,
        date: Date,
        consumed: f64,
        shortage: f64,
        demand: f64,
    },

    #[error("Window {window} ({start} to {end}) terminated with {status}")]
    WindowNotSolved {
        window: usize,
        start: Date,
        end: Date,
        status: TerminationStatus,
    },
}
