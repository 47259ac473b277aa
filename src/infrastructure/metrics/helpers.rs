//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    ACTIVITIES_CREATED_TOTAL, ACTIVITIES_RELAYED_TOTAL, ACTIVITY_VALIDATION_FAILURES,
    FRAMES_DELIVERED_TOTAL, FRAMES_FAILED_TOTAL, RELAY_POLLS_TOTAL, RELAY_POLL_DURATION,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording poll metrics
pub struct PollMetrics;

impl PollMetrics {
    /// Record a successful poll and how many rows it picked up
    pub fn record_ok(duration_secs: f64, relayed: usize) {
        RELAY_POLLS_TOTAL.with_label_values(&["ok"]).inc();
        RELAY_POLL_DURATION.observe(duration_secs);
        ACTIVITIES_RELAYED_TOTAL.inc_by(relayed as u64);
    }

    /// Record a failed poll
    pub fn record_error(duration_secs: f64) {
        RELAY_POLLS_TOTAL.with_label_values(&["error"]).inc();
        RELAY_POLL_DURATION.observe(duration_secs);
    }
}

/// Helper struct for recording per-connection delivery
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    pub fn record(delivered: usize, failed: usize) {
        if delivered > 0 {
            FRAMES_DELIVERED_TOTAL.inc_by(delivered as u64);
        }
        if failed > 0 {
            FRAMES_FAILED_TOTAL.inc_by(failed as u64);
        }
    }
}

/// Helper struct for REST activity metrics
pub struct ActivityApiMetrics;

impl ActivityApiMetrics {
    pub fn record_created() {
        ACTIVITIES_CREATED_TOTAL.inc();
    }

    pub fn record_rejected() {
        ACTIVITY_VALIDATION_FAILURES.inc();
    }
}
