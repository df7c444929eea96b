//! Cycle-level tests over a mock feed provider.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use nyct_gtfs::model::{
    FeedEntity, FeedHeader, FeedMessage, StopTimeEvent, StopTimeUpdate, TripDescriptor, TripUpdate,
};
use nyct_gtfs::schedule::{ScheduledStopTime, ScheduledTrip, ServiceWindow, StaticSchedule};
use nyct_gtfs::{Config, Direction, TripIndex, train_id};

use subway_rt::{FeedEndpoint, FeedProvider, ProxyService, ServiceConfig};

#[derive(Clone, Default)]
struct MockProvider {
    feeds: Arc<Mutex<HashMap<u32, FeedMessage>>>,
    failing: Arc<Mutex<Vec<u32>>>,
    published: Arc<Mutex<Vec<FeedMessage>>>,
}

impl MockProvider {
    fn with_feed(self, id: u32, message: FeedMessage) -> Self {
        self.feeds.lock().expect("feeds lock").insert(id, message);
        self
    }

    fn with_failing(self, id: u32) -> Self {
        self.failing.lock().expect("failing lock").push(id);
        self
    }

    fn published(&self) -> Vec<FeedMessage> {
        self.published.lock().expect("published lock").clone()
    }
}

#[async_trait]
impl FeedProvider for MockProvider {
    async fn fetch_feed(&self, feed: &FeedEndpoint) -> Result<Option<FeedMessage>> {
        if self.failing.lock().expect("failing lock").contains(&feed.id) {
            return Err(anyhow!("connection reset"));
        }
        Ok(self.feeds.lock().expect("feeds lock").get(&feed.id).cloned())
    }

    async fn publish_feed(&self, feed: &FeedMessage) -> Result<()> {
        self.published.lock().expect("published lock").push(feed.clone());
        Ok(())
    }
}

fn trip(trip_id: &str, mta_trip_id: &str, route_id: &str, stops: &[&str]) -> ScheduledTrip {
    let stop_times: Vec<ScheduledStopTime> = stops
        .iter()
        .enumerate()
        .map(|(index, stop_id)| ScheduledStopTime {
            stop_id: (*stop_id).to_string(),
            arrival_sec: 21_600 + 400 * index as i64,
            departure_sec: 21_600 + 400 * index as i64,
        })
        .collect();
    let end_sec = stop_times.last().map_or(21_600, |stop| stop.arrival_sec);
    ScheduledTrip {
        trip_id: trip_id.to_string(),
        mta_trip_id: Some(mta_trip_id.to_string()),
        route_id: route_id.to_string(),
        direction: Direction::North,
        service_id: "DAILY".to_string(),
        path_id: String::new(),
        network_id: None,
        start_sec: 21_600,
        end_sec,
        stop_times,
    }
}

fn index() -> Arc<TripIndex> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid date");
    let schedule = StaticSchedule {
        timezone: chrono_tz::America::New_York,
        trips: vec![
            trip("1037-Daily", "AFA24GEN-1037-Daily-00_036000_1..N03R", "1", &["101N", "103N"]),
            trip("A037-Daily", "AFA24GEN-A037-Daily-00_036000_A..N", "A", &["A01N", "A02N"]),
        ],
        windows: vec![ServiceWindow {
            service_id: "DAILY".to_string(),
            weekdays: [true; 7],
            start: date(2020, 1, 1),
            end: date(2030, 12, 31),
        }],
        exceptions: Vec::new(),
    };
    Arc::new(TripIndex::from_schedule(schedule).expect("fixture index builds"))
}

fn matching_config() -> Arc<Config> {
    Arc::new(Config {
        timezone: chrono_tz::America::New_York,
        late_trip_limit: 3_600,
        loose_match_disabled: false,
        cancel_unmatched_trips: false,
        latency_limit: -1,
        reversed_directions_routes: HashSet::new(),
        flushing_stop_order: train_id::default_stop_order(),
    })
}

fn service_config(feeds: Vec<FeedEndpoint>) -> ServiceConfig {
    ServiceConfig {
        gtfs_static_dir: "./gtfs".into(),
        feeds,
        fetch_interval: Duration::from_secs(60),
    }
}

fn feed_message(trip_ids: &[(&str, &str, &str)]) -> FeedMessage {
    FeedMessage {
        header: FeedHeader { gtfs_realtime_version: "1.0".to_string(), ..FeedHeader::default() },
        entity: trip_ids
            .iter()
            .enumerate()
            .map(|(index, (trip_id, route_id, stop_id))| FeedEntity {
                id: format!("{index:06}"),
                trip_update: Some(TripUpdate {
                    trip: TripDescriptor {
                        trip_id: (*trip_id).to_string(),
                        route_id: Some((*route_id).to_string()),
                        ..TripDescriptor::default()
                    },
                    stop_time_update: vec![StopTimeUpdate {
                        stop_id: Some((*stop_id).to_string()),
                        departure: Some(StopTimeEvent {
                            time: Some(1),
                            ..StopTimeEvent::default()
                        }),
                        ..StopTimeUpdate::default()
                    }],
                    ..TripUpdate::default()
                }),
                ..FeedEntity::default()
            })
            .collect(),
    }
}

fn endpoints(ids: &[u32]) -> Vec<FeedEndpoint> {
    ids.iter().map(|id| FeedEndpoint { id: *id, url: format!("http://upstream/{id}") }).collect()
}

#[tokio::test]
async fn cycle_aggregates_feeds_in_feed_id_order() {
    let provider = MockProvider::default()
        .with_feed(2, feed_message(&[("036000_A..N", "A", "A01N")]))
        .with_feed(1, feed_message(&[("036000_1..N03R", "1", "101N")]));
    // endpoints supplied out of order; the service sorts by feed id
    let service =
        ProxyService::new(service_config(endpoints(&[2, 1])), matching_config(), index(), provider.clone());

    let outcome = service.run_cycle().await.expect("cycle runs");
    assert_eq!(outcome.published, 2);
    assert_eq!(outcome.metrics.totals().matched(), 2);

    let published = provider.published();
    assert_eq!(published.len(), 1);
    let trips: Vec<&str> = published[0]
        .entity
        .iter()
        .filter_map(|entity| entity.trip_update.as_ref())
        .map(|update| update.trip.trip_id.as_str())
        .collect();
    assert_eq!(trips, vec!["1037-Daily", "A037-Daily"]);
    assert_eq!(published[0].entity[0].id, "000001");
}

#[tokio::test]
async fn failed_and_absent_feeds_are_skipped() {
    let provider = MockProvider::default()
        .with_feed(1, feed_message(&[("036000_1..N03R", "1", "101N")]))
        .with_failing(2);
    // feed 3 has no message at all
    let service = ProxyService::new(
        service_config(endpoints(&[1, 2, 3])),
        matching_config(),
        index(),
        provider.clone(),
    );

    let outcome = service.run_cycle().await.expect("cycle still publishes");
    assert_eq!(outcome.published, 1);

    let published = provider.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].entity.len(), 1);
}
