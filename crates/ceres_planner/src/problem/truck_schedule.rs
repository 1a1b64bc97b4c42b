use jiff::civil::{Date, Time, Weekday};
use serde::Serialize;
use smallvec::SmallVec;

use crate::{define_index_newtype, problem::location::LocationIdx, utils::dates};

define_index_newtype!(TruckScheduleIdx, TruckSchedule);

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepartureType {
    /// Leaves before noon, can only carry stock produced on an earlier day (D-1).
    Morning,
    /// Leaves at or after noon, may also carry same-day production (D0).
    Afternoon,
}

impl DepartureType {
    pub fn from_time(time: Time) -> Self {
        if time.hour() < 12 {
            DepartureType::Morning
        } else {
            DepartureType::Afternoon
        }
    }

    pub fn accepts_same_day_production(&self) -> bool {
        matches!(self, DepartureType::Afternoon)
    }
}

#[derive(Debug, Clone)]
pub struct TruckSchedule {
    external_id: String,
    origin: LocationIdx,
    stops: SmallVec<[LocationIdx; 2]>,
    day_of_week: Option<Weekday>,
    departure_time: Time,
    pallet_capacity: u32,
    units_per_pallet: u32,
    units_per_case: u32,
}

impl TruckSchedule {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn origin(&self) -> LocationIdx {
        self.origin
    }

    /// Drop-off locations in visiting order, the final destination last.
    pub fn stops(&self) -> &[LocationIdx] {
        &self.stops
    }

    pub fn destination(&self) -> LocationIdx {
        self.stops[self.stops.len() - 1]
    }

    pub fn serves(&self, location: LocationIdx) -> bool {
        self.stops.contains(&location)
    }

    pub fn day_of_week(&self) -> Option<Weekday> {
        self.day_of_week
    }

    pub fn departure_time(&self) -> Time {
        self.departure_time
    }

    pub fn departure_type(&self) -> DepartureType {
        DepartureType::from_time(self.departure_time)
    }

    pub fn pallet_capacity(&self) -> u32 {
        self.pallet_capacity
    }

    pub fn units_per_pallet(&self) -> u32 {
        self.units_per_pallet
    }

    pub fn units_per_case(&self) -> u32 {
        self.units_per_case
    }

    pub fn unit_capacity(&self) -> f64 {
        f64::from(self.pallet_capacity) * f64::from(self.units_per_pallet)
    }

    /// Schedules pinned to a weekday run on that day only, the others run daily.
    pub fn runs_on(&self, date: Date) -> bool {
        self.day_of_week.is_none_or(|weekday| date.weekday() == weekday)
    }
}

#[derive(Default)]
pub struct TruckScheduleBuilder {
    external_id: Option<String>,
    origin: Option<LocationIdx>,
    destination: Option<LocationIdx>,
    intermediate_stops: Vec<LocationIdx>,
    day_of_week: Option<Weekday>,
    departure_time: Option<Time>,
    pallet_capacity: Option<u32>,
    units_per_pallet: Option<u32>,
    units_per_case: Option<u32>,
}

impl TruckScheduleBuilder {
    pub fn set_external_id(&mut self, external_id: impl Into<String>) -> &mut TruckScheduleBuilder {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn set_origin(&mut self, origin: impl Into<LocationIdx>) -> &mut TruckScheduleBuilder {
        self.origin = Some(origin.into());
        self
    }

    pub fn set_destination(
        &mut self,
        destination: impl Into<LocationIdx>,
    ) -> &mut TruckScheduleBuilder {
        self.destination = Some(destination.into());
        self
    }

    pub fn add_intermediate_stop(
        &mut self,
        stop: impl Into<LocationIdx>,
    ) -> &mut TruckScheduleBuilder {
        self.intermediate_stops.push(stop.into());
        self
    }

    pub fn set_day_of_week(&mut self, day_of_week: Weekday) -> &mut TruckScheduleBuilder {
        self.day_of_week = Some(day_of_week);
        self
    }

    pub fn set_departure_time(&mut self, departure_time: Time) -> &mut TruckScheduleBuilder {
        self.departure_time = Some(departure_time);
        self
    }

    pub fn set_pallet_capacity(&mut self, pallet_capacity: u32) -> &mut TruckScheduleBuilder {
        self.pallet_capacity = Some(pallet_capacity);
        self
    }

    pub fn set_units_per_pallet(&mut self, units_per_pallet: u32) -> &mut TruckScheduleBuilder {
        self.units_per_pallet = Some(units_per_pallet);
        self
    }

    pub fn set_units_per_case(&mut self, units_per_case: u32) -> &mut TruckScheduleBuilder {
        self.units_per_case = Some(units_per_case);
        self
    }

    /// Returns `None` when the destination or origin is missing.
    pub fn build(self) -> Option<TruckSchedule> {
        let mut stops: SmallVec<[LocationIdx; 2]> = self.intermediate_stops.into_iter().collect();
        stops.push(self.destination?);

        Some(TruckSchedule {
            external_id: self.external_id.unwrap_or_default(),
            origin: self.origin?,
            stops,
            day_of_week: self.day_of_week,
            departure_time: self.departure_time.unwrap_or(Time::constant(8, 0, 0, 0)),
            pallet_capacity: self.pallet_capacity.unwrap_or(44),
            units_per_pallet: self.units_per_pallet.unwrap_or(320).max(1),
            units_per_case: self.units_per_case.unwrap_or(10).max(1),
        })
    }
}

/// A concrete run of a schedule on a given date.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TruckDeparture {
    pub date: Date,
    pub departure_type: DepartureType,
    pub schedule: TruckScheduleIdx,
}

#[derive(Debug, Clone, Default)]
pub struct TruckScheduleCollection {
    schedules: Vec<TruckSchedule>,
}

impl TruckScheduleCollection {
    pub fn new(schedules: Vec<TruckSchedule>) -> Self {
        Self { schedules }
    }

    pub fn schedules(&self) -> &[TruckSchedule] {
        &self.schedules
    }

    pub fn schedule(&self, index: TruckScheduleIdx) -> &TruckSchedule {
        &self.schedules[index]
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn has_morning_departures(&self) -> bool {
        self.schedules
            .iter()
            .any(|schedule| schedule.departure_type() == DepartureType::Morning)
    }

    /// Departures in `[start, end]`, ordered by date, morning before afternoon, then schedule.
    pub fn departures_between(&self, start: Date, end: Date) -> Vec<TruckDeparture> {
        let mut departures = dates::date_range(start, end)
            .flat_map(|date| {
                TruckScheduleIdx::range(self.schedules.len())
                    .filter(move |&index| self.schedules[index].runs_on(date))
                    .map(move |index| TruckDeparture {
                        date,
                        departure_type: self.schedules[index].departure_type(),
                        schedule: index,
                    })
            })
            .collect::<Vec<_>>();

        departures.sort();
        departures
    }
}
