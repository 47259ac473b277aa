//! Prometheus metrics for the activity relay.
//!
//! - Feed connection metrics (active, opened, closed, duration)
//! - Relay polling metrics (polls by outcome, poll latency, activities relayed)
//! - Delivery metrics (frames delivered and failed)
//! - Activity API metrics

mod helpers;

pub use helpers::{encode_metrics, ActivityApiMetrics, DeliveryMetrics, PollMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "vendcrm";

lazy_static! {
    // ============================================================================
    // Feed Connection Metrics
    // ============================================================================

    /// Currently open feed connections
    pub static ref FEED_CONNECTIONS: IntGauge = register_int_gauge!(
        format!("{}_feed_connections", METRIC_PREFIX),
        "Number of open activity feed connections"
    ).unwrap();

    pub static ref FEED_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_feed_connections_opened_total", METRIC_PREFIX),
        "Total activity feed connections opened"
    ).unwrap();

    pub static ref FEED_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_feed_connections_closed_total", METRIC_PREFIX),
        "Total activity feed connections closed"
    ).unwrap();

    pub static ref FEED_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_feed_connection_duration_seconds", METRIC_PREFIX),
        "Activity feed connection lifetime in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 900.0, 3600.0, 14400.0, 86400.0]
    ).unwrap();

    // ============================================================================
    // Relay Metrics
    // ============================================================================

    /// Polls by outcome ("ok" / "error")
    pub static ref RELAY_POLLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_relay_polls_total", METRIC_PREFIX),
        "Total activity polls by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref RELAY_POLL_DURATION: Histogram = register_histogram!(
        format!("{}_relay_poll_duration_seconds", METRIC_PREFIX),
        "Time spent querying the activity store per poll",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();

    pub static ref ACTIVITIES_RELAYED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_activities_relayed_total", METRIC_PREFIX),
        "Total activity records picked up by the poller and broadcast"
    ).unwrap();

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    pub static ref FRAMES_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_frames_delivered_total", METRIC_PREFIX),
        "Total activity frames queued to feed connections"
    ).unwrap();

    pub static ref FRAMES_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_frames_failed_total", METRIC_PREFIX),
        "Total activity frames that could not be queued to a connection"
    ).unwrap();

    // ============================================================================
    // Activity API Metrics
    // ============================================================================

    pub static ref ACTIVITIES_CREATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_activities_created_total", METRIC_PREFIX),
        "Total activities created through the REST API"
    ).unwrap();

    pub static ref ACTIVITY_VALIDATION_FAILURES: IntCounter = register_int_counter!(
        format!("{}_activity_validation_failures_total", METRIC_PREFIX),
        "Total activity create requests rejected by validation"
    ).unwrap();
}
