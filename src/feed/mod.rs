//! Client side of the activity feed: connect, keep the latest records, reconnect.

mod buffer;
mod client;
mod connector;

pub use buffer::{ActivityFeed, DEFAULT_FEED_CAPACITY};
pub use client::{FeedClient, FeedClientConfig, FeedStatus, DEFAULT_RECONNECT_DELAY};
pub use connector::{FeedConnector, FeedError, FeedStream, WsConnector};
