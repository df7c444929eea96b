use std::collections::HashSet;
use std::env;

use chrono_tz::Tz;

use crate::train_id;

/// Matching and rewriting configuration, read from the environment once at
/// startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Agency timezone used for all service-day math.
    pub timezone: Tz,
    /// Upper bound (seconds) on how late a loose match may run.
    pub late_trip_limit: i64,
    /// When set, the matcher considers strict matches only.
    pub loose_match_disabled: bool,
    /// When set, unmatched realtime trips are emitted as CANCELED instead of
    /// being dropped.
    pub cancel_unmatched_trips: bool,
    /// Stop-time updates whose event time is more than this many seconds in
    /// the past are dropped. Negative disables the filter.
    pub latency_limit: i64,
    /// Routes whose upstream N/S direction is flipped.
    pub reversed_directions_routes: HashSet<String>,
    /// Flushing line stops in north-to-south order, for direction inference.
    pub flushing_stop_order: Vec<String>,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let timezone = env::var("TIMEZONE")
            .ok()
            .and_then(|value| value.parse::<Tz>().ok())
            .unwrap_or(chrono_tz::America::New_York);
        let late_trip_limit = env_i64("LATE_TRIP_LIMIT_SEC", 3_600);
        let loose_match_disabled = env_bool("LOOSE_MATCH_DISABLED", false);
        let cancel_unmatched_trips = env_bool("CANCEL_UNMATCHED_TRIPS", false);
        let latency_limit = env_i64("LATENCY_LIMIT_SEC", -1);
        let reversed_directions_routes =
            env_list("REVERSED_DIRECTIONS_ROUTES").into_iter().collect();
        let flushing_stop_order = match env_list("FLUSHING_STOP_ORDER") {
            stops if stops.is_empty() => train_id::default_stop_order(),
            stops => stops,
        };

        Self {
            timezone,
            late_trip_limit,
            loose_match_disabled,
            cancel_unmatched_trips,
            latency_limit,
            reversed_directions_routes,
            flushing_stop_order,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|value| value.parse::<i64>().ok()).unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|value| {
            value
                .split(',')
                .map(|entry| entry.trim().to_string())
                .filter(|entry| !entry.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
