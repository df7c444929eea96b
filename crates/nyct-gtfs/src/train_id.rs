//! Agency train identifier codec.
//!
//! Realtime trip descriptors carry a separate train identifier in the agency
//! extension, e.g. `"06 0136+ QBP/MST"`: lead-car label, origin time, then
//! origin and destination stop abbreviations. Only the origin/destination
//! pair matters here; it drives direction inference for the Flushing line,
//! whose trip identifiers publish a truncated direction field.

use std::sync::LazyLock;

use regex::Regex;

use crate::trip_id::Direction;

/// Flushing line stops in north-to-south order.
const FLUSHING_STOPS: [&str; 22] = [
    "MST", "WPT", "111", "103", "JCT", "90S", "82S", "74S", "69S", "61S", "52S", "46B", "40S",
    "RAW", "QBP", "CHS", "HTR", "VER", "G-C", "5AV", "TSQ", "34H",
];

static TRAIN_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<label>.+) )?(?P<origin>[A-Z0-9-]{3})/(?P<dest>[A-Z0-9-]{3})\s*$")
        .expect("train id grammar")
});

/// Parsed train identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainId {
    pub origin: String,
    pub destination: String,
}

impl TrainId {
    /// Parses a train identifier, or `None` when the origin/destination pair
    /// cannot be extracted. Parse failures are expected in live feeds and
    /// only cost the direction fallback.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = TRAIN_ID.captures(raw)?;
        Some(Self { origin: caps["origin"].to_string(), destination: caps["dest"].to_string() })
    }

    /// Infers the direction of travel from the position of origin and
    /// destination in `stops` (ordered north to south). `None` when either
    /// stop is unknown or the two are equal.
    #[must_use]
    pub fn heading(&self, stops: &[String]) -> Option<Direction> {
        let origin = stops.iter().position(|stop| *stop == self.origin)?;
        let destination = stops.iter().position(|stop| *stop == self.destination)?;
        if origin == destination {
            return None;
        }
        // an origin further south than the destination means the train heads north
        Some(if origin > destination { Direction::North } else { Direction::South })
    }
}

/// The compiled-in Flushing stop order, southbound reading order.
#[must_use]
pub fn default_stop_order() -> Vec<String> {
    FLUSHING_STOPS.iter().map(ToString::to_string).collect()
}
