use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// One configured upstream feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoint {
    pub id: u32,
    pub url: String,
}

/// Service-shell configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the static schedule bundle.
    pub gtfs_static_dir: PathBuf,
    /// Upstream feeds, in feed-id order.
    pub feeds: Vec<FeedEndpoint>,
    /// Delay between feed cycles.
    pub fetch_interval: Duration,
}

impl ServiceConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let gtfs_static_dir =
            PathBuf::from(env::var("GTFS_STATIC_DIR").unwrap_or_else(|_| "./gtfs".to_string()));
        let feeds = env::var("FEED_URLS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .enumerate()
                    .map(|(index, url)| FeedEndpoint {
                        id: u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1),
                        url: url.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let fetch_interval = Duration::from_secs(env_u64("FETCH_INTERVAL_SEC", 60));

        Self { gtfs_static_dir, feeds, fetch_interval }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
}
