use anyhow::Result;
use async_trait::async_trait;
use nyct_gtfs::model::FeedMessage;

use crate::config::FeedEndpoint;

/// External collaborators implemented by the host: upstream fetch and
/// downstream publish. Transport, retries, and wire decoding all live behind
/// this trait.
#[async_trait]
pub trait FeedProvider: Send + Sync + Clone + 'static {
    /// Fetches and decodes one upstream feed. `Ok(None)` means the fetch was
    /// aborted or the payload was unusable; the cycle skips that feed.
    async fn fetch_feed(&self, feed: &FeedEndpoint) -> Result<Option<FeedMessage>>;

    /// Publishes the aggregated realtime feed.
    async fn publish_feed(&self, feed: &FeedMessage) -> Result<()>;
}
