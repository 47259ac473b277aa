//! Follow a running relay from the terminal.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use vendcrm_activity_relay::config::Settings;
use vendcrm_activity_relay::feed::{
    FeedClient, FeedClientConfig, WsConnector, DEFAULT_FEED_CAPACITY,
};
use vendcrm_activity_relay::telemetry::init_telemetry;

#[derive(Debug, Parser)]
#[command(name = "feed-tail", version, about = "Print activities as the relay pushes them")]
struct Args {
    /// Relay WebSocket endpoint
    #[arg(long, env = "FEED_URL", default_value = "ws://127.0.0.1:8081/ws")]
    url: String,

    /// Delay before each reconnect attempt, in milliseconds
    #[arg(long, default_value_t = 5000)]
    reconnect_ms: u64,

    /// Number of records kept in memory
    #[arg(long, default_value_t = DEFAULT_FEED_CAPACITY)]
    capacity: usize,

    /// Print raw JSON instead of a one-line summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging follows the relay's telemetry settings when a config is present
    let settings = Settings::new().ok();
    let telemetry = settings.as_ref().map(|s| s.telemetry.clone()).unwrap_or_default();
    let _telemetry = init_telemetry(&telemetry, &Default::default())?;

    let client = Arc::new(FeedClient::new(
        WsConnector::new(args.url.clone()),
        FeedClientConfig {
            reconnect_delay: Duration::from_millis(args.reconnect_ms),
            capacity: args.capacity,
        },
    ));
    let mut activities = client.subscribe();
    let mut status = client.watch_status();
    client.start().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                tracing::info!(status = ?current, "Feed status changed");
            }
            received = activities.recv() => match received {
                Ok(activity) => {
                    if args.json {
                        println!("{}", activity.to_json()?);
                    } else {
                        println!(
                            "{}  #{:<6} customer={:<6} {:<10} {}",
                            activity.created_at.format("%Y-%m-%d %H:%M:%S"),
                            activity.id,
                            activity.customer_id,
                            activity.activity_type,
                            activity.description
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Output fell behind the feed");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    client.stop().await;
    Ok(())
}
