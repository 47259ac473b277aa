use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::activity::Activity;

use super::buffer::{ActivityFeed, DEFAULT_FEED_CAPACITY};
use super::connector::FeedConnector;

/// Default pause between a lost connection and the next attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Connection state of a feed client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Connecting,
    Live,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    pub reconnect_delay: Duration,
    pub capacity: usize,
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

/// Follows a relay: keeps the latest records and reconnects after a fixed delay.
///
/// There is no resume. Records broadcast while the client is reconnecting are missed.
pub struct FeedClient<C: FeedConnector> {
    connector: C,
    config: FeedClientConfig,
    feed: RwLock<ActivityFeed>,
    status: watch::Sender<FeedStatus>,
    activities: broadcast::Sender<Activity>,
    shutdown: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
    connect_attempts: AtomicU64,
    parse_failures: AtomicU64,
}

impl<C: FeedConnector> FeedClient<C> {
    pub fn new(connector: C, config: FeedClientConfig) -> Self {
        let (status, _) = watch::channel(FeedStatus::Connecting);
        let (activities, _) = broadcast::channel(config.capacity.max(1));
        let (shutdown, _) = broadcast::channel(1);
        Self {
            connector,
            feed: RwLock::new(ActivityFeed::new(config.capacity)),
            config,
            status,
            activities,
            shutdown,
            task: Mutex::new(None),
            connect_attempts: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> FeedStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<FeedStatus> {
        self.status.subscribe()
    }

    /// Every record accepted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Activity> {
        self.activities.subscribe()
    }

    /// Kept records, newest first
    pub async fn snapshot(&self) -> Vec<Activity> {
        self.feed.read().await.to_vec()
    }

    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    pub fn parse_failures(&self) -> u64 {
        self.parse_failures.load(Ordering::Relaxed)
    }

    /// Spawn the connection loop. Returns `false` if it is already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let shutdown = self.shutdown.subscribe();
        let client = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            client.run(shutdown).await;
        }));
        true
    }

    /// Close the connection, cancel any pending reconnect and wait for the loop to end
    pub async fn stop(&self) {
        let handle = self.task.lock().await.take();
        let Some(handle) = handle else {
            return;
        };

        let _ = self.shutdown.send(());
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Feed client task ended abnormally");
        }
    }

    async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let endpoint = self.connector.endpoint().to_string();

        'connection: loop {
            self.status.send_replace(FeedStatus::Connecting);
            let attempt = self.connect_attempts.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(endpoint = %endpoint, attempt, "Connecting to activity feed");

            let connected = tokio::select! {
                _ = shutdown.recv() => break 'connection,
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(mut stream) => {
                    self.status.send_replace(FeedStatus::Live);
                    tracing::info!(endpoint = %endpoint, "Activity feed live");

                    loop {
                        tokio::select! {
                            _ = shutdown.recv() => break 'connection,
                            next = stream.next() => match next {
                                Some(Ok(text)) => self.handle_message(&text).await,
                                Some(Err(e)) => {
                                    tracing::warn!(endpoint = %endpoint, error = %e, "Activity feed error");
                                    break;
                                }
                                None => {
                                    tracing::info!(endpoint = %endpoint, "Activity feed closed");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "Activity feed connection failed");
                }
            }

            self.status.send_replace(FeedStatus::Connecting);
            tracing::debug!(
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Scheduling activity feed reconnect"
            );

            tokio::select! {
                _ = shutdown.recv() => break 'connection,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        self.status.send_replace(FeedStatus::Stopped);
        tracing::info!(endpoint = %endpoint, "Feed client stopped");
    }

    async fn handle_message(&self, text: &str) {
        match serde_json::from_str::<Activity>(text) {
            Ok(activity) => {
                self.feed.write().await.push(activity.clone());
                // No subscribers is fine
                let _ = self.activities.send(activity);
            }
            Err(e) => {
                self.parse_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Discarding unparseable feed message");
            }
        }
    }
}
