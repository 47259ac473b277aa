use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::activity::{CursorPolicy, PollCursor};
use crate::config::RelayConfig;
use crate::connection_manager::ConnectionManager;
use crate::metrics::PollMetrics;
use crate::store::{ActivityStore, StoreError};

use super::stats::{RelayStats, RelayStatsSnapshot};

/// Result of one poll tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollOutcome {
    /// Rows picked up by the query
    pub fetched: usize,
    /// Frames queued across all connections
    pub delivered: usize,
    /// Frames that could not be queued
    pub failed: usize,
    /// Cursor after this tick
    pub cursor: PollCursor,
}

/// Polls the activity store and fans new records out to every feed connection.
///
/// Built once at startup. The cursor and the connection set are instance state;
/// `start`/`stop` control the background timer task.
pub struct ActivityRelay {
    config: RelayConfig,
    store: Arc<dyn ActivityStore>,
    connections: Arc<ConnectionManager>,
    cursor: RwLock<PollCursor>,
    stats: RelayStats,
    shutdown: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ActivityRelay {
    /// Create a relay whose cursor starts at the current time
    pub fn new(
        config: RelayConfig,
        store: Arc<dyn ActivityStore>,
        connections: Arc<ConnectionManager>,
    ) -> Self {
        Self::with_cursor(config, store, connections, PollCursor::starting_now())
    }

    /// Create a relay with an explicit starting cursor
    pub fn with_cursor(
        config: RelayConfig,
        store: Arc<dyn ActivityStore>,
        connections: Arc<ConnectionManager>,
        cursor: PollCursor,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            store,
            connections,
            cursor: RwLock::new(cursor),
            stats: RelayStats::default(),
            shutdown,
            task: Mutex::new(None),
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub async fn cursor(&self) -> PollCursor {
        *self.cursor.read().await
    }

    pub async fn set_cursor(&self, cursor: PollCursor) {
        *self.cursor.write().await = cursor;
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the polling task. Returns `false` if it is already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("Activity relay already running");
            return false;
        }

        // Subscribe before spawning so a stop() issued right away is not missed
        let shutdown = self.shutdown.subscribe();
        let relay = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            relay.run(shutdown).await;
        }));
        true
    }

    /// Signal the polling task and wait for it to finish
    pub async fn stop(&self) {
        let handle = self.task.lock().await.take();
        let Some(handle) = handle else {
            return;
        };

        let _ = self.shutdown.send(());
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Activity relay task ended abnormally");
        }
    }

    async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        // Ticks never overlap: a slow poll pushes the next one back
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip immediate first tick
        ticker.tick().await;

        tracing::info!(
            poll_interval_ms = self.config.poll_interval_ms,
            cursor_policy = ?self.config.cursor_policy,
            store = self.store.backend_name(),
            "Activity relay started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Activity relay received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    // Failures are logged inside and retried on the next tick
                    let _ = self.poll_once().await;
                }
            }
        }

        tracing::info!("Activity relay stopped");
    }

    /// Run one poll: fetch rows past the cursor, broadcast each in order, advance the cursor.
    ///
    /// On a query failure the cursor is left where it was.
    #[tracing::instrument(name = "relay.poll", skip(self))]
    pub async fn poll_once(&self) -> Result<PollOutcome, StoreError> {
        let cursor = *self.cursor.read().await;
        let policy = self.config.cursor_policy;
        let limit = match policy {
            CursorPolicy::MaxSeen => Some(self.config.batch_limit.max(1)),
            CursorPolicy::Now => None,
        };

        let started = Instant::now();
        let batch = match self.store.fetch_after(&cursor, limit).await {
            Ok(batch) => batch,
            Err(e) => {
                PollMetrics::record_error(started.elapsed().as_secs_f64());
                self.stats.record_failure(Utc::now());
                tracing::error!(
                    error = %e,
                    checked_at = %cursor.checked_at,
                    "Activity poll failed, retrying next tick"
                );
                return Err(e);
            }
        };
        let query_secs = started.elapsed().as_secs_f64();

        let mut delivered = 0;
        let mut failed = 0;
        for activity in &batch {
            let report = self.connections.broadcast(activity);
            delivered += report.delivered;
            failed += report.failed;
        }

        let now = Utc::now();
        let next = cursor.advance(policy, &batch, now);
        *self.cursor.write().await = next;

        PollMetrics::record_ok(query_secs, batch.len());
        self.stats.record_poll(batch.len(), now);

        if !batch.is_empty() {
            tracing::info!(
                fetched = batch.len(),
                delivered = delivered,
                failed = failed,
                connections = self.connections.len(),
                "Relayed new activities"
            );
        }

        Ok(PollOutcome {
            fetched: batch.len(),
            delivered,
            failed,
            cursor: next,
        })
    }

    pub async fn stats(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            running: self.is_running().await,
            poll_interval_ms: self.config.poll_interval_ms,
            cursor_policy: self.config.cursor_policy,
            polls_total: self.stats.polls_total.load(Ordering::Relaxed),
            polls_failed: self.stats.polls_failed.load(Ordering::Relaxed),
            activities_relayed: self.stats.activities_relayed.load(Ordering::Relaxed),
            last_poll_at: self.stats.last_poll_at(),
            cursor: self.cursor().await,
        }
    }
}
