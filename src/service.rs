use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use nyct_gtfs::model::{FeedEntity, FeedHeader, FeedMessage, Incrementality, TripUpdate};
use nyct_gtfs::{Config, FeedProcessor, MetricsAggregator, StaticSchedule, TripIndex};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, warn};

use crate::config::ServiceConfig;
use crate::provider::FeedProvider;

/// Loads the static schedule bundle and builds the trip index.
///
/// # Errors
///
/// Returns an error when the bundle is missing or malformed; a proxy without
/// a schedule cannot match anything, so startup fails.
pub fn load_trip_index(dir: &Path) -> Result<TripIndex> {
    let schedule = StaticSchedule::from_dir(dir).context("loading static schedule")?;
    TripIndex::from_schedule(schedule).context("building trip index")
}

/// What one feed cycle produced.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub published: usize,
    pub metrics: MetricsAggregator,
}

/// Drives the fetch-match-rewrite-publish loop on a fixed delay.
pub struct ProxyService<P: FeedProvider> {
    config: ServiceConfig,
    provider: P,
    processor: FeedProcessor,
}

impl<P: FeedProvider> ProxyService<P> {
    #[must_use]
    pub fn new(
        config: ServiceConfig, matching: Arc<Config>, index: Arc<TripIndex>, provider: P,
    ) -> Self {
        let mut config = config;
        config.feeds.sort_by_key(|feed| feed.id);
        Self { processor: FeedProcessor::new(matching, index), config, provider }
    }

    /// Runs cycles forever. A failed cycle is logged and the loop continues;
    /// cancellation granularity is one cycle.
    pub async fn run(&self) {
        let mut ticker = time::interval(self.config.fetch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_cycle().await {
                error!(error = %err, "feed cycle failed");
            }
        }
    }

    /// Executes one cycle: fetch each feed in feed-id order, translate, and
    /// publish the aggregate. A feed that fails to fetch is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only when publishing the aggregated feed fails.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let timestamp = Utc::now().timestamp();
        let mut metrics = MetricsAggregator::default();
        let mut updates = Vec::new();

        for feed in &self.config.feeds {
            match self.provider.fetch_feed(feed).await {
                Ok(Some(message)) => {
                    updates.extend(self.processor.process(feed.id, &message, timestamp, &mut metrics));
                }
                Ok(None) => debug!(feed = feed.id, "no feed message; skipping"),
                Err(err) => {
                    warn!(
                        monotonic_counter.feed_fetch_failed = 1,
                        feed = feed.id,
                        error = %err,
                        "feed fetch failed; skipping"
                    );
                }
            }
        }

        let message = aggregate(updates, timestamp);
        let published = message.entity.len();
        self.provider.publish_feed(&message).await.context("publishing aggregated feed")?;
        metrics.log_summary();
        Ok(CycleOutcome { published, metrics })
    }
}

fn aggregate(updates: Vec<TripUpdate>, timestamp: i64) -> FeedMessage {
    let entity = updates
        .into_iter()
        .enumerate()
        .map(|(index, update)| FeedEntity {
            id: format!("{:06}", index + 1),
            trip_update: Some(update),
            ..FeedEntity::default()
        })
        .collect();
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "1.0".to_string(),
            incrementality: Some(Incrementality::FullDataset),
            timestamp,
            nyct_feed_header: None,
        },
        entity,
    }
}
