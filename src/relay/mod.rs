//! Polling monitor that turns new activity rows into feed broadcasts.

mod monitor;
mod stats;

pub use monitor::{ActivityRelay, PollOutcome};
pub use stats::{RelayStats, RelayStatsSnapshot};
