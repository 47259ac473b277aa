//! Connection handle and related types

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A serialized activity, shared by every connection it is fanned out to
pub type Frame = Arc<str>;

/// Why a frame could not be queued for a connection
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound buffer full")]
    BufferFull,

    #[error("connection writer closed")]
    Closed,
}

/// Handle for a single feed connection
pub struct ConnectionHandle {
    pub id: Uuid,
    pub peer: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Frame>,
    frames_sent: AtomicU64,
    send_failures: AtomicU64,
}

impl ConnectionHandle {
    pub fn new(peer: Option<SocketAddr>, sender: mpsc::Sender<Frame>) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            connected_at: Utc::now(),
            sender,
            frames_sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
        }
    }

    /// Queue a frame without waiting. A slow reader loses frames instead of
    /// holding up the broadcast.
    pub fn try_deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        match self.sender.try_send(frame) {
            Ok(()) => {
                self.frames_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.send_failures.fetch_add(1, Ordering::Relaxed);
                match e {
                    mpsc::error::TrySendError::Full(_) => Err(DeliveryError::BufferFull),
                    mpsc::error::TrySendError::Closed(_) => Err(DeliveryError::Closed),
                }
            }
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_deliver_counts_outcomes() {
        let (tx, mut rx) = mpsc::channel::<Frame>(1);
        let handle = ConnectionHandle::new(None, tx);

        assert_eq!(handle.try_deliver(Arc::from("a")), Ok(()));
        assert_eq!(
            handle.try_deliver(Arc::from("b")),
            Err(DeliveryError::BufferFull)
        );

        assert_eq!(rx.try_recv().unwrap().as_ref(), "a");
        drop(rx);
        assert_eq!(handle.try_deliver(Arc::from("c")), Err(DeliveryError::Closed));

        assert_eq!(handle.frames_sent(), 1);
        assert_eq!(handle.send_failures(), 2);
    }
}
