//! Activated trip index over the static schedule.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use tracing::info;

use super::{ScheduledTrip, ServiceWindow, StaticSchedule};
use crate::trip_id::TripId;

/// A scheduled trip with its precomputed matching key.
#[derive(Debug, Clone)]
pub struct IndexedTrip {
    pub key: TripId,
    pub trip: Arc<ScheduledTrip>,
}

#[derive(Debug, Clone)]
struct IndexedSpan {
    start_sec: i64,
    end_sec: i64,
    trip: Arc<ScheduledTrip>,
}

/// Read-only schedule lookup built once at startup: which trips run a route,
/// which services are active on a date, and which trips span a time range.
/// Safe to share across cycles without synchronization.
#[derive(Debug)]
pub struct TripIndex {
    timezone: Tz,
    by_route: HashMap<String, Vec<IndexedTrip>>,
    windows: Vec<ServiceWindow>,
    exceptions: HashMap<NaiveDate, Vec<(String, bool)>>,
    by_start: Vec<IndexedSpan>,
}

impl TripIndex {
    /// Builds the index from a loaded schedule.
    ///
    /// # Errors
    ///
    /// Returns an error when a schedule identifier cannot be turned into a
    /// matching key. Fatal: the schedule bundle is broken.
    pub fn from_schedule(schedule: StaticSchedule) -> Result<Self> {
        let mut by_route: HashMap<String, Vec<IndexedTrip>> = HashMap::new();
        let mut by_start = Vec::with_capacity(schedule.trips.len());

        for trip in schedule.trips {
            let trip = Arc::new(trip);
            let key = TripId::from_scheduled(&trip)
                .with_context(|| format!("indexing trip {}", trip.trip_id))?;
            by_start.push(IndexedSpan {
                start_sec: trip.start_sec,
                end_sec: trip.end_sec,
                trip: Arc::clone(&trip),
            });
            by_route.entry(trip.route_id.clone()).or_default().push(IndexedTrip { key, trip });
        }

        for trips in by_route.values_mut() {
            // deterministic candidate iteration; match ties break on trip id
            trips.sort_by(|a, b| a.trip.trip_id.cmp(&b.trip.trip_id));
        }
        by_start.sort_by_key(|span| span.start_sec);

        let mut exceptions: HashMap<NaiveDate, Vec<(String, bool)>> = HashMap::new();
        for exception in schedule.exceptions {
            exceptions.entry(exception.date).or_default().push((exception.service_id, exception.added));
        }

        info!(trips = by_start.len(), routes = by_route.len(), "built trip index");
        Ok(Self {
            timezone: schedule.timezone,
            by_route,
            windows: schedule.windows,
            exceptions,
            by_start,
        })
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// All scheduled trips on `route_id`, in trip-id order.
    #[must_use]
    pub fn trips_on_route(&self, route_id: &str) -> &[IndexedTrip] {
        self.by_route.get(route_id).map_or(&[], Vec::as_slice)
    }

    /// Service ids active on `date`: the weekly calendar windows, adjusted
    /// by single-date exceptions.
    #[must_use]
    pub fn service_ids_for_date(&self, date: NaiveDate) -> HashSet<String> {
        let weekday = date.weekday().num_days_from_monday() as usize;
        let mut active: HashSet<String> = self
            .windows
            .iter()
            .filter(|window| window.weekdays[weekday] && window.start <= date && date <= window.end)
            .map(|window| window.service_id.clone())
            .collect();
        if let Some(entries) = self.exceptions.get(&date) {
            for (service_id, added) in entries {
                if *added {
                    active.insert(service_id.clone());
                } else {
                    active.remove(service_id);
                }
            }
        }
        active
    }

    /// Trips whose `[start_sec, end_sec]` span intersects the queried range
    /// of seconds past service-day midnight.
    #[must_use]
    pub fn trips_between(&self, from_sec: i64, to_sec: i64) -> Vec<Arc<ScheduledTrip>> {
        let upper = self.by_start.partition_point(|span| span.start_sec <= to_sec);
        self.by_start[..upper]
            .iter()
            .filter(|span| span.end_sec >= from_sec)
            .map(|span| Arc::clone(&span.trip))
            .collect()
    }

    #[must_use]
    pub fn trip_count(&self) -> usize {
        self.by_start.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schedule::{ScheduledStopTime, ServiceException, ServiceWindow};
    use crate::trip_id::Direction;

    fn trip(trip_id: &str, route_id: &str, service_id: &str, start_sec: i64) -> ScheduledTrip {
        ScheduledTrip {
            trip_id: trip_id.to_string(),
            mta_trip_id: None,
            route_id: route_id.to_string(),
            direction: Direction::North,
            service_id: service_id.to_string(),
            path_id: format!("{route_id}..N"),
            network_id: None,
            start_sec,
            end_sec: start_sec + 1_800,
            stop_times: vec![ScheduledStopTime {
                stop_id: "101N".to_string(),
                arrival_sec: start_sec,
                departure_sec: start_sec,
            }],
        }
    }

    fn schedule() -> StaticSchedule {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid date");
        StaticSchedule {
            timezone: chrono_tz::America::New_York,
            trips: vec![
                // schedule ids must carry the realtime grammar for key building
                trip("036000_1..N", "1", "WKD", 21_600),
                trip("042000_1..N", "1", "SAT", 25_200),
            ],
            windows: vec![
                ServiceWindow {
                    service_id: "WKD".to_string(),
                    weekdays: [true, true, true, true, true, false, false],
                    start: date(2024, 1, 1),
                    end: date(2024, 12, 31),
                },
                ServiceWindow {
                    service_id: "SAT".to_string(),
                    weekdays: [false, false, false, false, false, true, false],
                    start: date(2024, 1, 1),
                    end: date(2024, 12, 31),
                },
            ],
            exceptions: vec![
                ServiceException { service_id: "WKD".to_string(), date: date(2024, 7, 4), added: false },
                ServiceException { service_id: "SAT".to_string(), date: date(2024, 7, 4), added: true },
            ],
        }
    }

    #[test]
    fn resolves_weekday_and_exception_services() {
        let index = TripIndex::from_schedule(schedule()).expect("should build");
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid date");

        // 2024-07-03 is a Wednesday
        let wednesday = index.service_ids_for_date(date(2024, 7, 3));
        assert!(wednesday.contains("WKD"));
        assert!(!wednesday.contains("SAT"));

        // 2024-07-04 is a Thursday, but the exceptions swap the services
        let holiday = index.service_ids_for_date(date(2024, 7, 4));
        assert!(!holiday.contains("WKD"));
        assert!(holiday.contains("SAT"));
    }

    #[test]
    fn routes_are_indexed_in_trip_id_order() {
        let index = TripIndex::from_schedule(schedule()).expect("should build");
        let trips: Vec<&str> =
            index.trips_on_route("1").iter().map(|entry| entry.trip.trip_id.as_str()).collect();
        assert_eq!(trips, vec!["036000_1..N", "042000_1..N"]);
        assert!(index.trips_on_route("7").is_empty());
    }

    #[test]
    fn range_query_returns_overlapping_spans() {
        let index = TripIndex::from_schedule(schedule()).expect("should build");
        let spans: Vec<String> =
            index.trips_between(22_000, 24_000).iter().map(|t| t.trip_id.clone()).collect();
        assert_eq!(spans, vec!["036000_1..N".to_string()]);
        assert_eq!(index.trips_between(0, 10_000).len(), 0);
        assert_eq!(index.trips_between(25_000, 30_000).len(), 1);
    }
}
