// Infrastructure layer (shared components)
pub mod infrastructure;

// Re-export infrastructure modules at the crate root
pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;
pub use infrastructure::postgres;

// Domain layer
pub mod activity;
pub mod connection_manager;
pub mod relay;
pub mod store;

// Application layer
pub mod api;
pub mod server;
pub mod websocket;

// Client side of the feed
pub mod feed;

// Supporting modules
pub mod telemetry;
