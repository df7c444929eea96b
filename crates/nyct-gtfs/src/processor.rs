//! Per-feed processing pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::matcher::{MatchStatus, TripMatcher};
use crate::metrics::{MetricsAggregator, Outcome};
use crate::model::{FeedMessage, ScheduleRelationship, TripUpdate};
use crate::rewriter::{Rewrite, StopTimeRewriter};
use crate::schedule::TripIndex;
use crate::service_day::ServiceDate;
use crate::trip_id::TripId;

/// Drives one upstream feed message through parse, match, and rewrite.
pub struct FeedProcessor {
    config: Arc<Config>,
    matcher: TripMatcher,
    rewriter: StopTimeRewriter,
}

impl FeedProcessor {
    #[must_use]
    pub fn new(config: Arc<Config>, index: Arc<TripIndex>) -> Self {
        Self {
            matcher: TripMatcher::new(Arc::clone(&config), index),
            rewriter: StopTimeRewriter::new(Arc::clone(&config)),
            config,
        }
    }

    /// Processes one feed message: every trip update is parsed, matched, and
    /// rewritten, with outcomes appended to `metrics`. Returns the rewritten
    /// updates in input order, deduplicated on `(trip_id, start_date)`.
    ///
    /// `timestamp` is the wall clock driving service-day resolution; the
    /// staleness filter prefers the feed header timestamp when present.
    pub fn process(
        &self, feed_id: u32, message: &FeedMessage, timestamp: i64,
        metrics: &mut MetricsAggregator,
    ) -> Vec<TripUpdate> {
        let feed_timestamp =
            if message.header.timestamp > 0 { message.header.timestamp } else { timestamp };
        let mut emitted = Vec::new();
        let mut seen = HashSet::new();

        for entity in &message.entity {
            let Some(update) = entity.trip_update.as_ref() else {
                continue;
            };
            let parsed = match TripId::from_descriptor(&update.trip, &self.config) {
                Ok(id) => Some(id),
                Err(err) => {
                    debug!(feed = feed_id, entity = %entity.id, error = %err, "unparseable trip id");
                    None
                }
            };
            let route = route_label(parsed.as_ref(), update);
            let mut result = self.matcher.match_trip(update, parsed, timestamp);

            if result.is_matched() {
                let (Some(trip), Some(date)) = (result.scheduled.as_deref(), result.service_date)
                else {
                    continue;
                };
                match self.rewriter.rewrite(update, trip, date, feed_timestamp) {
                    Rewrite::Update(rewritten) => {
                        metrics.record(&route, Outcome::from(result.status));
                        emit_deduped(rewritten, &route, &mut emitted, &mut seen, metrics);
                    }
                    Rewrite::Canceled(canceled) => {
                        metrics.record(&route, Outcome::from(result.status));
                        metrics.record(&route, Outcome::Cancellation);
                        emit_deduped(canceled, &route, &mut emitted, &mut seen, metrics);
                    }
                    Rewrite::Absorbed => {
                        result.status = MatchStatus::Merged;
                        metrics.record(&route, Outcome::from(result.status));
                        debug!(feed = feed_id, entity = %entity.id, "absorbed update with no surviving stop times");
                    }
                }
                continue;
            }

            metrics.record(&route, Outcome::from(result.status));
            if self.config.cancel_unmatched_trips {
                let canceled = self.cancel_unmatched(update, result.trip_id.as_ref(), timestamp);
                metrics.record(&route, Outcome::Cancellation);
                emit_deduped(canceled, &route, &mut emitted, &mut seen, metrics);
            } else {
                debug!(
                    feed = feed_id,
                    entity = %entity.id,
                    status = ?result.status,
                    "dropping unmatched trip update"
                );
            }
        }

        info!(
            monotonic_counter.trip_updates_emitted = emitted.len() as u64,
            feed = feed_id,
            "processed realtime feed"
        );
        emitted
    }

    /// A CANCELED stand-in for an unmatched trip, keyed by the best
    /// identifier available.
    fn cancel_unmatched(
        &self, update: &TripUpdate, trip_id: Option<&TripId>, timestamp: i64,
    ) -> TripUpdate {
        let mut canceled = update.clone();
        if let Some(id) = trip_id {
            canceled.trip.trip_id = id.to_string();
            canceled.trip.route_id = Some(id.route_id.clone());
        }
        canceled.trip.start_date =
            Some(ServiceDate::from_timestamp(timestamp, self.config.timezone).yyyymmdd());
        canceled.trip.schedule_relationship = Some(ScheduleRelationship::Canceled);
        canceled.stop_time_update.clear();
        canceled
    }
}

fn emit_deduped(
    update: TripUpdate, route: &str, emitted: &mut Vec<TripUpdate>,
    seen: &mut HashSet<(String, String)>, metrics: &mut MetricsAggregator,
) {
    let key = (update.trip.trip_id.clone(), update.trip.start_date().to_string());
    if seen.insert(key) {
        emitted.push(update);
    } else {
        debug!(trip = %update.trip.trip_id, "suppressing duplicate trip update");
        metrics.record(route, Outcome::Duplicate);
    }
}

fn route_label(parsed: Option<&TripId>, update: &TripUpdate) -> String {
    parsed
        .map(|id| id.route_id.clone())
        .or_else(|| update.trip.route_id().map(ToString::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}
