//! Realtime-to-schedule trip matching.
//!
//! Each realtime trip update is reconciled against the scheduled trips on
//! its route: a strict match requires the full identifier including the
//! network id, a loose match tolerates a trip running late within a
//! configured window. Trips departing just after midnight are also tried
//! against the previous service day, shifted by a full day.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::model::TripUpdate;
use crate::schedule::{ScheduledTrip, TripIndex};
use crate::service_day::ServiceDate;
use crate::trip_id::TripId;

// realtime trips departing this close to midnight may still belong to the
// previous service day
const PREVIOUS_DAY_CUTOFF: i32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    StrictMatch,
    LooseMatch,
    /// Trips with the right route and direction exist on the service day,
    /// but none satisfied the match criteria.
    NoMatch,
    /// No scheduled trip with the right route and direction exists at all on
    /// the relevant service days.
    NoTripWithStartDate,
    BadTripId,
    /// Matched, then absorbed by the rewriter because no stop-time updates
    /// survived.
    Merged,
}

/// Outcome of matching one realtime trip update.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub status: MatchStatus,
    /// The realtime update under evaluation.
    pub trip_update: TripUpdate,
    /// Parsed realtime identifier; `None` for [`MatchStatus::BadTripId`].
    pub trip_id: Option<TripId>,
    pub scheduled: Option<Arc<ScheduledTrip>>,
    /// Service date the winning candidate was found on.
    pub service_date: Option<ServiceDate>,
    /// Seconds the realtime trip runs later than the schedule; loose only.
    pub delta: Option<i64>,
    /// Whether the matched trip's service id is active on the match date.
    pub on_service_day: bool,
}

impl MatchResult {
    fn unmatched(status: MatchStatus, update: &TripUpdate, trip_id: Option<TripId>) -> Self {
        Self {
            status,
            trip_update: update.clone(),
            trip_id,
            scheduled: None,
            service_date: None,
            delta: None,
            on_service_day: false,
        }
    }

    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self.status, MatchStatus::StrictMatch | MatchStatus::LooseMatch)
    }
}

/// Chooses the best scheduled trip for each realtime trip update.
pub struct TripMatcher {
    config: Arc<Config>,
    index: Arc<TripIndex>,
}

impl TripMatcher {
    #[must_use]
    pub const fn new(config: Arc<Config>, index: Arc<TripIndex>) -> Self {
        Self { config, index }
    }

    /// Matches one realtime trip update against the schedule.
    ///
    /// `timestamp` is the wall clock of the current cycle and determines the
    /// service day under consideration.
    #[must_use]
    pub fn match_trip(
        &self, update: &TripUpdate, trip_id: Option<TripId>, timestamp: i64,
    ) -> MatchResult {
        let Some(rt_id) = trip_id else {
            return MatchResult::unmatched(MatchStatus::BadTripId, update, None);
        };

        let date = ServiceDate::from_timestamp(timestamp, self.config.timezone);
        let mut found_route_direction = false;
        let mut candidates = Vec::new();

        self.add_candidates(&rt_id, date, &mut candidates, &mut found_route_direction);
        if rt_id.origin_departure_time < PREVIOUS_DAY_CUTOFF {
            self.add_candidates(
                &rt_id.relative_to_previous_day(),
                date.previous(),
                &mut candidates,
                &mut found_route_direction,
            );
        }

        let Some(best) = candidates.into_iter().min_by(Candidate::rank) else {
            let status = if found_route_direction {
                MatchStatus::NoMatch
            } else {
                MatchStatus::NoTripWithStartDate
            };
            return MatchResult::unmatched(status, update, Some(rt_id));
        };

        debug!(
            trip = %rt_id,
            matched = %best.trip.trip_id,
            strict = best.strict,
            delta = best.delta,
            "matched realtime trip"
        );
        MatchResult {
            status: if best.strict { MatchStatus::StrictMatch } else { MatchStatus::LooseMatch },
            trip_update: update.clone(),
            trip_id: Some(rt_id),
            scheduled: Some(best.trip),
            service_date: Some(best.date),
            delta: (!best.strict).then_some(best.delta),
            on_service_day: best.on_service_day,
        }
    }

    fn add_candidates(
        &self, rt_id: &TripId, date: ServiceDate, candidates: &mut Vec<Candidate>,
        found_route_direction: &mut bool,
    ) {
        let active = self.index.service_ids_for_date(date.date());
        for entry in self.index.trips_on_route(&rt_id.route_id) {
            if !entry.key.route_dir_match(rt_id) {
                continue;
            }
            *found_route_direction = true;
            let on_service_day = active.contains(&entry.trip.service_id);

            if on_service_day && entry.key.strict_match(rt_id) {
                candidates.push(Candidate {
                    trip: Arc::clone(&entry.trip),
                    date,
                    strict: true,
                    delta: 0,
                    on_service_day,
                });
            }

            if self.config.loose_match_disabled {
                continue;
            }
            // one origin-departure-time unit is 0.6 s; integer floor keeps
            // the delta == 0 boundary exact
            let delta = (i64::from(rt_id.origin_departure_time) * 3).div_euclid(5)
                - entry.trip.start_sec;
            // a same-minute match off its service day is trusted; a late one
            // is not
            if (0..self.config.late_trip_limit).contains(&delta) && (on_service_day || delta == 0) {
                candidates.push(Candidate {
                    trip: Arc::clone(&entry.trip),
                    date,
                    strict: false,
                    delta,
                    on_service_day,
                });
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    trip: Arc<ScheduledTrip>,
    date: ServiceDate,
    strict: bool,
    delta: i64,
    on_service_day: bool,
}

impl Candidate {
    // strict first, then least late, then on-service-day, then stable trip
    // id order
    fn rank(a: &Self, b: &Self) -> Ordering {
        b.strict
            .cmp(&a.strict)
            .then_with(|| a.delta.cmp(&b.delta))
            .then_with(|| b.on_service_day.cmp(&a.on_service_day))
            .then_with(|| a.trip.trip_id.cmp(&b.trip.trip_id))
    }
}
