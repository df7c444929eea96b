//! Agency trip identifier codec.
//!
//! Realtime feeds key trips with a compound identifier carrying the origin
//! departure time (hundredths of a minute past service-day midnight), a
//! route, an optional direction, and an optional network suffix. The grammar
//! is lossy: routes collide inside the padded path field, the direction is
//! sometimes truncated, and only one upstream feed carries network ids. The
//! schedule-side identifiers use a close relative of the same grammar.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::TripDescriptor;
use crate::schedule::ScheduledTrip;
use crate::train_id::TrainId;

/// One service day expressed in origin-departure-time units (0.01 min).
pub const PREVIOUS_DAY_SHIFT: i32 = 24 * 60 * 100;

static REALTIME_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([A-Z0-9]+_)?(?P<odt>[0-9-]{6})_?(?P<route>[A-Z0-9]+)\.+(?P<dir>[NS]?)(?P<net>[A-Z0-9 -]*)$",
    )
    .expect("realtime trip id grammar")
});

static STATIC_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<route>[A-Z0-9]+)\.+(?P<dir>[NS])(?P<net>[A-Z0-9]*)$")
        .expect("static trip id grammar")
});

/// Compass direction of travel encoded in agency identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::North => "N",
            Self::South => "S",
        }
    }

    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
        }
    }

    fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "N" => Some(Self::North),
            "S" => Some(Self::South),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decomposed agency trip identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripId {
    /// Departure time of the trip's first stop, in hundredths of a minute
    /// past service-day midnight. May exceed one day after a previous-day
    /// shift, and may be negative in raw feed data.
    pub origin_departure_time: i32,
    pub route_id: String,
    pub direction: Option<Direction>,
    /// Disambiguating suffix carried by a single upstream feed.
    pub network_id: Option<String>,
    /// Route right-padded with dots to width 3, then the direction letter.
    pub path_id: String,
}

impl TripId {
    /// Parses a realtime trip identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadTripId`] when the identifier does not match the
    /// realtime grammar.
    pub fn parse(id: &str) -> Result<Self> {
        let caps = REALTIME_ID.captures(id).ok_or_else(|| Error::BadTripId(id.to_string()))?;
        let origin_departure_time = caps["odt"]
            .parse::<i32>()
            .map_err(|_| Error::BadTripId(id.to_string()))?;
        let route_id = caps["route"].to_string();
        let direction = Direction::from_letter(&caps["dir"]);
        let network_id =
            caps.name("net").map(|m| m.as_str()).filter(|net| !net.is_empty()).map(String::from);

        Ok(Self {
            origin_departure_time,
            path_id: path_of(&route_id, direction),
            route_id,
            direction,
            network_id,
        })
    }

    /// Builds the matching key for a scheduled trip from its schedule-side
    /// identifier. The route letter inside static path fields can disagree
    /// with the logical route (route W trips carry "N" there), so the route
    /// reference from the schedule wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadPathId`] when the schedule-side identifier does
    /// not carry the agency grammar. This is fatal at index build time.
    pub fn from_scheduled(trip: &ScheduledTrip) -> Result<Self> {
        let source = trip.schedule_id();
        let mut id = Self::parse(source).map_err(|_| Error::BadPathId(source.to_string()))?;
        id.route_id.clone_from(&trip.route_id);
        id.path_id = path_of(&id.route_id, id.direction);
        Ok(id)
    }

    /// Builds the matching key for a realtime trip descriptor.
    ///
    /// The descriptor's explicit route overrides the one parsed out of the
    /// identifier. Flushing-line trips (routes 7 and 7X) publish a truncated
    /// direction field, so a missing direction falls back to inference from
    /// the extension train identifier. Routes listed in
    /// `reversed_directions_routes` have N and S swapped upstream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadTripId`] when the descriptor identifier does not
    /// match the realtime grammar.
    pub fn from_descriptor(descriptor: &TripDescriptor, config: &Config) -> Result<Self> {
        let mut id = Self::parse(descriptor.trip_id())?;
        if let Some(route) = descriptor.route_id() {
            id.route_id = route.to_string();
        }
        if id.direction.is_none() && matches!(id.route_id.as_str(), "7" | "7X") {
            id.direction = descriptor
                .train_id()
                .and_then(TrainId::parse)
                .and_then(|train| train.heading(&config.flushing_stop_order));
        }
        if config.reversed_directions_routes.contains(&id.route_id) {
            id.direction = id.direction.map(Direction::flipped);
        }
        id.path_id = path_of(&id.route_id, id.direction);
        Ok(id)
    }

    /// Route and direction agree.
    #[must_use]
    pub fn route_dir_match(&self, other: &Self) -> bool {
        self.route_id == other.route_id && self.direction == other.direction
    }

    /// Route, direction, and origin departure time agree.
    #[must_use]
    pub fn loose_match(&self, other: &Self) -> bool {
        self.route_dir_match(other)
            && self.origin_departure_time == other.origin_departure_time
    }

    /// Loose match plus an equal, present network id. A missing network on
    /// the left is never a strict match: strict matching is only meaningful
    /// when a network id was published.
    #[must_use]
    pub fn strict_match(&self, other: &Self) -> bool {
        self.loose_match(other) && self.network_id.is_some() && self.network_id == other.network_id
    }

    /// The same identifier expressed relative to the previous service day.
    #[must_use]
    pub fn relative_to_previous_day(&self) -> Self {
        Self {
            origin_departure_time: self.origin_departure_time + PREVIOUS_DAY_SHIFT,
            ..self.clone()
        }
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}_{}", self.origin_departure_time, self.path_id)
    }
}

/// Schedule-side path decomposition: route, mandatory direction, and an
/// optional network suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePath {
    pub route_id: String,
    pub direction: Direction,
    pub network_id: Option<String>,
}

impl SchedulePath {
    /// Canonical padded rendering: route padded with dots to width 3, then
    /// the direction letter.
    #[must_use]
    pub fn path_id(&self) -> String {
        path_of(&self.route_id, Some(self.direction))
    }
}

/// Parses a schedule-side identifier via the static grammar.
///
/// # Errors
///
/// Returns [`Error::BadPathId`] when the identifier does not match.
pub fn parse_static(id: &str) -> Result<SchedulePath> {
    let caps = STATIC_ID.captures(id).ok_or_else(|| Error::BadPathId(id.to_string()))?;
    let direction = Direction::from_letter(&caps["dir"])
        .ok_or_else(|| Error::BadPathId(id.to_string()))?;
    Ok(SchedulePath {
        route_id: caps["route"].to_string(),
        direction,
        network_id: caps
            .name("net")
            .map(|m| m.as_str())
            .filter(|net| !net.is_empty())
            .map(String::from),
    })
}

fn path_of(route: &str, direction: Option<Direction>) -> String {
    let mut path = format!("{route:.<3}");
    if let Some(direction) = direction {
        path.push_str(direction.as_str());
    }
    path
}
