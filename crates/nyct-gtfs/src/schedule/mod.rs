//! Static schedule model and access.

mod index;
mod loader;

use chrono::NaiveDate;
use chrono_tz::Tz;

pub use self::index::{IndexedTrip, TripIndex};

use crate::trip_id::Direction;

/// One trip from the static schedule. Built at startup, immutable after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTrip {
    pub trip_id: String,
    /// Agency identifier carrying the realtime grammar, when the schedule
    /// publishes one alongside the opaque trip id.
    pub mta_trip_id: Option<String>,
    pub route_id: String,
    pub direction: Direction,
    pub service_id: String,
    /// Route/direction decomposition of the schedule-side identifier.
    pub path_id: String,
    pub network_id: Option<String>,
    /// First-stop departure, seconds past service-day midnight. May exceed
    /// 86 400 on the 26-hour schedule.
    pub start_sec: i64,
    /// Last-stop arrival, seconds past service-day midnight.
    pub end_sec: i64,
    pub stop_times: Vec<ScheduledStopTime>,
}

impl ScheduledTrip {
    /// The identifier that carries the agency grammar.
    #[must_use]
    pub fn schedule_id(&self) -> &str {
        self.mta_trip_id.as_deref().unwrap_or(&self.trip_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledStopTime {
    pub stop_id: String,
    pub arrival_sec: i64,
    pub departure_sec: i64,
}

/// A fully parsed static schedule bundle.
#[derive(Debug, Clone)]
pub struct StaticSchedule {
    pub timezone: Tz,
    pub trips: Vec<ScheduledTrip>,
    pub windows: Vec<ServiceWindow>,
    pub exceptions: Vec<ServiceException>,
}

/// Weekly service availability window from the calendar file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceWindow {
    pub service_id: String,
    /// Monday-first weekday availability.
    pub weekdays: [bool; 7],
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Single-date service exception from the calendar-dates file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceException {
    pub service_id: String,
    pub date: NaiveDate,
    /// `true` adds the service on `date`, `false` removes it.
    pub added: bool,
}
