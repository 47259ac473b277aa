use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::activity::Activity;
use crate::metrics::{DeliveryMetrics, FEED_CONNECTIONS};

use super::stats::{BroadcastReport, ConnectionInfo, ConnectionStats};
use super::types::{ConnectionHandle, Frame};

/// Manages all open feed connections
pub struct ConnectionManager {
    /// connection_id -> ConnectionHandle
    connections: DashMap<Uuid, Arc<ConnectionHandle>>,
    /// Outbound frames buffered per connection
    send_buffer: usize,
    total_broadcasts: AtomicU64,
    frames_delivered: AtomicU64,
    frames_failed: AtomicU64,
    /// Set by `close`; later registrations are not tracked
    closed: AtomicBool,
}

impl ConnectionManager {
    pub fn new(send_buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            send_buffer: send_buffer.max(1),
            total_broadcasts: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            frames_failed: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a new connection. The receiver yields every frame broadcast from now on.
    ///
    /// After `close` the connection is not stored: the receiver closes as soon as the
    /// returned handle is dropped.
    pub fn register(
        &self,
        peer: Option<SocketAddr>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(self.send_buffer);
        let handle = Arc::new(ConnectionHandle::new(peer, tx));

        self.connections.insert(handle.id, handle.clone());
        // Checked after the insert so a concurrent close() either sweeps this entry or is seen here
        if self.is_closed() {
            self.connections.remove(&handle.id);
            tracing::info!(
                connection_id = %handle.id,
                peer = ?peer,
                "Feed connection refused, registry closed"
            );
            return (handle, rx);
        }
        FEED_CONNECTIONS.set(self.connections.len() as i64);

        tracing::info!(
            connection_id = %handle.id,
            peer = ?peer,
            total = self.connections.len(),
            "Feed connection registered"
        );

        (handle, rx)
    }

    /// Unregister a connection. Unknown ids are ignored.
    pub fn unregister(&self, connection_id: Uuid) {
        if let Some((_, handle)) = self.connections.remove(&connection_id) {
            FEED_CONNECTIONS.set(self.connections.len() as i64);
            tracing::info!(
                connection_id = %connection_id,
                peer = ?handle.peer,
                frames_sent = handle.frames_sent(),
                send_failures = handle.send_failures(),
                "Feed connection unregistered"
            );
        }
    }

    /// Serialize `activity` once and queue it on every open connection.
    ///
    /// A failure on one connection is logged and counted; it neither stops delivery to
    /// the others nor removes the failing connection.
    pub fn broadcast(&self, activity: &Activity) -> BroadcastReport {
        let frame: Frame = match activity.to_json() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::error!(
                    activity_id = activity.id,
                    error = %e,
                    "Failed to serialize activity"
                );
                return BroadcastReport::default();
            }
        };

        self.broadcast_frame(frame, activity.id)
    }

    fn broadcast_frame(&self, frame: Frame, activity_id: i64) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        // Snapshot first so no map shard lock is held while sending
        for handle in self.get_all_connections() {
            match handle.try_deliver(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        connection_id = %handle.id,
                        activity_id = activity_id,
                        error = %e,
                        "Failed to deliver activity to connection"
                    );
                }
            }
        }

        self.total_broadcasts.fetch_add(1, Ordering::Relaxed);
        self.frames_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.frames_failed
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        DeliveryMetrics::record(report.delivered, report.failed);

        tracing::debug!(
            activity_id = activity_id,
            delivered = report.delivered,
            failed = report.failed,
            "Activity broadcast"
        );

        report
    }

    /// Drop every connection. Each writer task sees its channel close and ends.
    pub fn disconnect_all(&self) -> usize {
        let count = self.connections.len();
        self.connections.clear();
        FEED_CONNECTIONS.set(0);
        if count > 0 {
            tracing::info!(count = count, "Dropped all feed connections");
        }
        count
    }

    /// Drop every connection and refuse new ones. Used at shutdown.
    pub fn close(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        self.disconnect_all()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Get all connections
    pub fn get_all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.iter().map(|r| r.value().clone()).collect()
    }

    /// Get connection by ID
    pub fn get_connection(&self, connection_id: Uuid) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&connection_id).map(|h| h.clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Get statistics
    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            total_connections: self.connections.len(),
            total_broadcasts: self.total_broadcasts.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
        }
    }

    /// Per-connection details, oldest connection first
    pub fn connection_info(&self) -> Vec<ConnectionInfo> {
        let mut info: Vec<ConnectionInfo> = self
            .connections
            .iter()
            .map(|entry| {
                let handle = entry.value();
                ConnectionInfo {
                    id: handle.id,
                    peer: handle.peer.map(|p| p.to_string()),
                    connected_at: handle.connected_at,
                    frames_sent: handle.frames_sent(),
                    send_failures: handle.send_failures(),
                }
            })
            .collect();
        info.sort_by_key(|i| i.connected_at);
        info
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(crate::config::WebSocketConfig::default().send_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn activity(id: i64) -> Activity {
        Activity {
            id,
            customer_id: 11,
            activity_type: "meeting".to_string(),
            description: "Contract renewal".to_string(),
            outcome: None,
            next_steps: Some("Send proposal".to_string()),
            contact_method: None,
            contacted_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_register_and_unregister() {
        let manager = ConnectionManager::new(8);
        let (handle, _rx) = manager.register(None);

        assert_eq!(manager.len(), 1);
        assert!(manager.get_connection(handle.id).is_some());

        manager.unregister(handle.id);
        assert!(manager.is_empty());

        // Second unregister is a no-op
        manager.unregister(handle.id);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_every_connection() {
        let manager = ConnectionManager::new(8);
        let (_a, mut rx_a) = manager.register(None);
        let (_b, mut rx_b) = manager.register(None);

        let record = activity(1);
        let report = manager.broadcast(&record);
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 0 });

        let expected = record.to_json().unwrap();
        assert_eq!(rx_a.try_recv().unwrap().as_ref(), expected);
        assert_eq!(rx_b.try_recv().unwrap().as_ref(), expected);
    }

    #[test]
    fn test_failed_connection_does_not_block_others() {
        let manager = ConnectionManager::new(8);
        let (closed, rx_closed) = manager.register(None);
        let (_open, mut rx_open) = manager.register(None);
        drop(rx_closed);

        let report = manager.broadcast(&activity(2));
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
        assert!(rx_open.try_recv().is_ok());

        // The failing connection is still registered
        assert!(manager.get_connection(closed.id).is_some());
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_full_buffer_counts_as_failure() {
        let manager = ConnectionManager::new(1);
        let (handle, mut rx) = manager.register(None);

        assert_eq!(manager.broadcast(&activity(1)).delivered, 1);
        assert_eq!(manager.broadcast(&activity(2)).failed, 1);
        assert_eq!(handle.send_failures(), 1);

        // Only the first frame made it
        let frame = rx.try_recv().unwrap();
        assert!(frame.contains("\"id\":1"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_late_joiner_gets_nothing_retroactively() {
        let manager = ConnectionManager::new(8);
        manager.broadcast(&activity(1));

        let (_late, mut rx) = manager.register(None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_disconnect_all_closes_receivers() {
        let manager = ConnectionManager::new(8);
        let (handle, mut rx) = manager.register(None);
        drop(handle);

        assert_eq!(manager.disconnect_all(), 1);
        assert!(manager.is_empty());
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_stats_accumulate() {
        let manager = ConnectionManager::new(8);
        let (_a, _rx_a) = manager.register(None);
        manager.broadcast(&activity(1));
        manager.broadcast(&activity(2));

        let stats = manager.stats();
        assert_eq!(stats.total_connections, 1);
        assert_eq!(stats.total_broadcasts, 2);
        assert_eq!(stats.frames_delivered, 2);
        assert_eq!(stats.frames_failed, 0);
        assert_eq!(manager.connection_info().len(), 1);
    }

    #[test]
    fn test_register_after_close_is_not_tracked() {
        let manager = ConnectionManager::new(8);
        let (_open, _rx_open) = manager.register(None);
        assert_eq!(manager.close(), 1);
        assert!(manager.is_closed());

        // An upgrade that lands after the shutdown sweep
        let (late, mut rx_late) = manager.register(None);
        assert!(manager.is_empty());
        assert!(manager.get_connection(late.id).is_none());
        assert_eq!(manager.broadcast(&activity(3)).delivered, 0);

        drop(late);
        assert!(matches!(
            rx_late.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
