//! NYCT subway realtime feed translation.
//!
//! Reconciles the agency's realtime trip updates against the static
//! schedule: parses the agency trip identifier grammar, matches each
//! realtime trip to a scheduled trip on route, direction, and origin
//! departure time (tolerating lateness across the 26-hour service day), and
//! rewrites descriptors and stop-time sequences so every emitted reference
//! resolves into the published schedule.

pub mod config;
pub mod error;
pub mod matcher;
pub mod metrics;
pub mod model;
pub mod processor;
pub mod rewriter;
pub mod schedule;
pub mod service_day;
pub mod train_id;
pub mod trip_id;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::matcher::{MatchResult, MatchStatus, TripMatcher};
pub use crate::metrics::{MetricsAggregator, Outcome, OutcomeCounts};
pub use crate::processor::FeedProcessor;
pub use crate::rewriter::{Rewrite, StopTimeRewriter};
pub use crate::schedule::{ScheduledTrip, StaticSchedule, TripIndex};
pub use crate::service_day::ServiceDate;
pub use crate::train_id::TrainId;
pub use crate::trip_id::{Direction, TripId};

/// Agency id used for internal keying.
pub const AGENCY_ID: &str = "MTA NYCT";
