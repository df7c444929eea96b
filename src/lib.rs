//! NYCT subway realtime trip-update proxy.
//!
//! The service shell: loads the static schedule once, then drives feed
//! cycles on a fixed delay. Each cycle fetches every configured upstream
//! feed through the host-supplied [`FeedProvider`], runs the
//! [`nyct_gtfs::FeedProcessor`] pipeline over it, and republishes one
//! aggregated feed. Fetching, decoding, and publishing transports belong to
//! the host; everything here is wiring.

mod config;
mod provider;
mod service;

pub use crate::config::{FeedEndpoint, ServiceConfig};
pub use crate::provider::FeedProvider;
pub use crate::service::{CycleOutcome, ProxyService, load_trip_index};
