//! Parsed transit-realtime feed model.
//!
//! Wire decoding belongs to the host; the pipeline operates on these already
//! parsed entities, including the agency extension blocks carried on the
//! header, trip descriptor, and stop-time update.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedMessage {
    pub header: FeedHeader,
    #[serde(default)]
    pub entity: Vec<FeedEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedHeader {
    pub gtfs_realtime_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incrementality: Option<Incrementality>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nyct_feed_header: Option<NyctFeedHeader>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Incrementality {
    #[default]
    FullDataset,
    Differential,
}

/// Agency extension on the feed header.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NyctFeedHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nyct_subway_version: Option<String>,
    #[serde(default)]
    pub trip_replacement_period: Vec<TripReplacementPeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TripReplacementPeriod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_period: Option<TimeRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntity {
    pub id: String,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_update: Option<TripUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TripUpdate {
    pub trip: TripDescriptor,
    #[serde(default)]
    pub stop_time_update: Vec<StopTimeUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TripDescriptor {
    pub trip_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_relationship: Option<ScheduleRelationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nyct_trip_descriptor: Option<NyctTripDescriptor>,
}

impl TripDescriptor {
    #[must_use]
    pub fn trip_id(&self) -> &str {
        &self.trip_id
    }

    #[must_use]
    pub fn route_id(&self) -> Option<&str> {
        self.route_id.as_deref().filter(|route| !route.is_empty())
    }

    #[must_use]
    pub fn start_date(&self) -> &str {
        self.start_date.as_deref().unwrap_or("")
    }

    /// Train identifier carried by the agency extension, when present.
    #[must_use]
    pub fn train_id(&self) -> Option<&str> {
        self.nyct_trip_descriptor.as_ref().and_then(|ext| ext.train_id.as_deref())
    }
}

/// Agency extension on the trip descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NyctTripDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_assigned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleRelationship {
    #[default]
    Scheduled,
    Added,
    Unscheduled,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StopTimeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<StopTimeEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<StopTimeEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nyct_stop_time_update: Option<NyctStopTimeUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StopTimeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<i32>,
}

/// Agency extension on the stop-time update.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NyctStopTimeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_track: Option<String>,
}
