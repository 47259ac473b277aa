//! Connection statistics and info structures

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Connection statistics
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub total_broadcasts: u64,
    pub frames_delivered: u64,
    pub frames_failed: u64,
}

/// Outcome of a single fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Per-connection information
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub id: Uuid,
    pub peer: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub frames_sent: u64,
    pub send_failures: u64,
}
