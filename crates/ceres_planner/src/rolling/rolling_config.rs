use jiff::civil::Weekday;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::PlanningError,
    network::planning_network::PlanningNetwork,
    problem::planning_problem::PlanningProblem,
};

/// What to do when a window does not produce a solution.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InfeasibleWindowPolicy {
    /// Stop and return [`PlanningError::WindowNotSolved`].
    #[default]
    Abort,
    /// Record the window as uncommitted and move on from the same stock.
    Continue,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RollingHorizonConfig {
    pub window_size_days: u32,
    pub overlap_days: u32,
    #[serde(default)]
    pub infeasible_window_policy: InfeasibleWindowPolicy,
}

impl RollingHorizonConfig {
    pub fn committed_days(&self) -> u32 {
        self.window_size_days.saturating_sub(self.overlap_days)
    }

    pub fn validate(&self, lead_time_days: u32) -> Result<(), PlanningError> {
        if self.window_size_days == 0 {
            return Err(PlanningError::InvalidRollingConfig(
                "window size must be at least one day".to_owned(),
            ));
        }

        if self.committed_days() == 0 {
            return Err(PlanningError::InvalidRollingConfig(format!(
                "overlap of {} day(s) leaves nothing to commit in a {} day window",
                self.overlap_days, self.window_size_days
            )));
        }

        if self.overlap_days < lead_time_days {
            return Err(PlanningError::OverlapShorterThanLeadTime {
                overlap_days: self.overlap_days,
                lead_time_days,
            });
        }

        Ok(())
    }
}

impl Default for RollingHorizonConfig {
    fn default() -> Self {
        Self {
            window_size_days: 28,
            overlap_days: 7,
            infeasible_window_policy: InfeasibleWindowPolicy::Abort,
        }
    }
}

/// Days a window has to see past its committed region so that committed
/// decisions can still serve the first days of the next window: the
/// longest enumerated route, the longest run of days without a truck
/// leaving the site, and one more day when morning trucks only take
/// production of an earlier day.
pub fn minimum_lead_time_days(problem: &PlanningProblem, network: &PlanningNetwork) -> u32 {
    let transit = network.routes().max_transit_days();
    let morning = u32::from(problem.trucks().has_morning_departures());

    transit + longest_departure_gap(problem) + morning
}

/// Longest run of days on which no schedule leaves the site. Zero without
/// site trucks, the model then ships any day.
fn longest_departure_gap(problem: &PlanningProblem) -> u32 {
    let site = problem.manufacturing_site();
    let schedules = problem
        .trucks()
        .schedules()
        .iter()
        .filter(|schedule| schedule.origin() == site)
        .collect::<Vec<_>>();
    if schedules.is_empty() {
        return 0;
    }

    let departs_on = |weekday: Weekday| {
        schedules
            .iter()
            .any(|schedule| schedule.day_of_week().is_none_or(|day| day == weekday))
    };

    // Two weeks, so a gap across Sunday is counted whole
    let mut longest = 0;
    let mut current = 0;
    for weekday in Weekday::Monday.cycle_forward().take(14) {
        if departs_on(weekday) {
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }

    longest
}
