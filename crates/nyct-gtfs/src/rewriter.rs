//! Stop-time rewriting for matched trips.
//!
//! A matched realtime update still references agency stop sequences that may
//! disagree with the schedule. The rewriter moves the descriptor onto the
//! scheduled trip's identifiers and keeps only stop-time updates that land
//! in the scheduled stop sequence, in schedule order.

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::model::{ScheduleRelationship, StopTimeUpdate, TripUpdate};
use crate::schedule::ScheduledTrip;
use crate::service_day::ServiceDate;

/// Outcome of rewriting one matched trip update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// The update, rewritten onto schedule identifiers.
    Update(TripUpdate),
    /// No stop-time updates survived and cancellation is configured.
    Canceled(TripUpdate),
    /// No stop-time updates survived; the update is absorbed.
    Absorbed,
}

pub struct StopTimeRewriter {
    config: Arc<Config>,
}

impl StopTimeRewriter {
    #[must_use]
    pub const fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Rewrites `update` against its matched scheduled trip.
    ///
    /// The descriptor takes the schedule's trip id, route, and start date.
    /// Stop-time updates keep their input order but are filtered to stops of
    /// the scheduled trip; an update for a stop behind one already emitted
    /// is dropped, as are updates older than the configured latency limit.
    #[must_use]
    pub fn rewrite(
        &self, update: &TripUpdate, trip: &ScheduledTrip, date: ServiceDate, feed_timestamp: i64,
    ) -> Rewrite {
        let mut rewritten = update.clone();
        rewritten.trip.trip_id.clone_from(&trip.trip_id);
        rewritten.trip.route_id = Some(trip.route_id.clone());
        rewritten.trip.start_date = Some(date.yyyymmdd());
        rewritten.trip.schedule_relationship = Some(ScheduleRelationship::Scheduled);

        let mut kept = Vec::with_capacity(update.stop_time_update.len());
        let mut cursor = 0_usize;
        for stop_update in &update.stop_time_update {
            let Some(stop_id) = stop_update.stop_id.as_deref() else {
                continue;
            };
            // schedule position no earlier than the last emitted stop
            let Some(position) = trip.stop_times[cursor..]
                .iter()
                .position(|stop| stop.stop_id == stop_id)
                .map(|offset| cursor + offset)
            else {
                debug!(trip = %trip.trip_id, stop = stop_id, "dropping out-of-schedule stop-time update");
                continue;
            };
            if self.is_stale(stop_update, feed_timestamp) {
                continue;
            }
            cursor = position;
            kept.push(stop_update.clone());
        }

        if kept.is_empty() {
            if self.config.cancel_unmatched_trips {
                rewritten.trip.schedule_relationship = Some(ScheduleRelationship::Canceled);
                rewritten.stop_time_update.clear();
                return Rewrite::Canceled(rewritten);
            }
            return Rewrite::Absorbed;
        }
        rewritten.stop_time_update = kept;
        Rewrite::Update(rewritten)
    }

    fn is_stale(&self, update: &StopTimeUpdate, feed_timestamp: i64) -> bool {
        if self.config.latency_limit < 0 {
            return false;
        }
        // an update with no event time carries no evidence of staleness
        event_time(update)
            .is_some_and(|time| time < feed_timestamp - self.config.latency_limit)
    }
}

fn event_time(update: &StopTimeUpdate) -> Option<i64> {
    update
        .departure
        .as_ref()
        .and_then(|event| event.time)
        .or_else(|| update.arrival.as_ref().and_then(|event| event.time))
}
