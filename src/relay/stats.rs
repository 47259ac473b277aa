use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::activity::{CursorPolicy, PollCursor};

/// Counters kept by the polling monitor
#[derive(Debug, Default)]
pub struct RelayStats {
    pub polls_total: AtomicU64,
    pub polls_failed: AtomicU64,
    pub activities_relayed: AtomicU64,
    /// Unix millis of the last completed poll, 0 if none
    last_poll_at_ms: AtomicI64,
}

impl RelayStats {
    pub fn record_poll(&self, relayed: usize, at: DateTime<Utc>) {
        self.polls_total.fetch_add(1, Ordering::Relaxed);
        self.activities_relayed
            .fetch_add(relayed as u64, Ordering::Relaxed);
        self.last_poll_at_ms
            .store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn record_failure(&self, at: DateTime<Utc>) {
        self.polls_total.fetch_add(1, Ordering::Relaxed);
        self.polls_failed.fetch_add(1, Ordering::Relaxed);
        self.last_poll_at_ms
            .store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_poll_at(&self) -> Option<DateTime<Utc>> {
        match self.last_poll_at_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }
}

/// Point-in-time view of the relay, served on `/stats`
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatsSnapshot {
    pub running: bool,
    pub poll_interval_ms: u64,
    pub cursor_policy: CursorPolicy,
    pub polls_total: u64,
    pub polls_failed: u64,
    pub activities_relayed: u64,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub cursor: PollCursor,
}
