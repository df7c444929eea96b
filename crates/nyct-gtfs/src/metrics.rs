//! Per-cycle outcome counters.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::AGENCY_ID;
use crate::matcher::MatchStatus;

/// A single counted processing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    MatchedStrict,
    MatchedLoose,
    NoTripWithStartDate,
    NoMatch,
    BadTripId,
    Duplicate,
    Cancellation,
    Merged,
}

impl From<MatchStatus> for Outcome {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::StrictMatch => Self::MatchedStrict,
            MatchStatus::LooseMatch => Self::MatchedLoose,
            MatchStatus::NoMatch => Self::NoMatch,
            MatchStatus::NoTripWithStartDate => Self::NoTripWithStartDate,
            MatchStatus::BadTripId => Self::BadTripId,
            MatchStatus::Merged => Self::Merged,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub matched_strict: u64,
    pub matched_loose: u64,
    pub no_trip_with_start_date: u64,
    pub no_match: u64,
    pub bad_trip_id: u64,
    pub duplicates: u64,
    pub cancellations: u64,
    pub merged: u64,
}

impl OutcomeCounts {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::MatchedStrict => self.matched_strict += 1,
            Outcome::MatchedLoose => self.matched_loose += 1,
            Outcome::NoTripWithStartDate => self.no_trip_with_start_date += 1,
            Outcome::NoMatch => self.no_match += 1,
            Outcome::BadTripId => self.bad_trip_id += 1,
            Outcome::Duplicate => self.duplicates += 1,
            Outcome::Cancellation => self.cancellations += 1,
            Outcome::Merged => self.merged += 1,
        }
    }

    /// Updates that matched a scheduled trip, strictly or loosely.
    #[must_use]
    pub const fn matched(&self) -> u64 {
        self.matched_strict + self.matched_loose
    }
}

/// Outcome counters for one feed cycle, overall and per route. Owned by the
/// cycle that fills it; never shared across cycles.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    totals: OutcomeCounts,
    by_route: BTreeMap<String, OutcomeCounts>,
}

impl MetricsAggregator {
    pub fn record(&mut self, route: &str, outcome: Outcome) {
        self.totals.record(outcome);
        self.by_route.entry(route.to_string()).or_default().record(outcome);
    }

    #[must_use]
    pub const fn totals(&self) -> &OutcomeCounts {
        &self.totals
    }

    #[must_use]
    pub fn route(&self, route: &str) -> Option<&OutcomeCounts> {
        self.by_route.get(route)
    }

    /// Emits the per-cycle outcome summary.
    pub fn log_summary(&self) {
        info!(
            agency = AGENCY_ID,
            matched_strict = self.totals.matched_strict,
            matched_loose = self.totals.matched_loose,
            no_trip_with_start_date = self.totals.no_trip_with_start_date,
            no_match = self.totals.no_match,
            bad_trip_id = self.totals.bad_trip_id,
            duplicates = self.totals.duplicates,
            cancellations = self.totals.cancellations,
            merged = self.totals.merged,
            "feed cycle outcomes"
        );
        for (route, counts) in &self.by_route {
            debug!(
                route = %route,
                matched = counts.matched(),
                no_match = counts.no_match,
                bad_trip_id = counts.bad_trip_id,
                "route outcomes"
            );
        }
    }
}
