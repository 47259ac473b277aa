//! Registry of open feed connections and the fan-out over them.

mod registry;
mod stats;
mod types;

pub use registry::ConnectionManager;
pub use stats::{BroadcastReport, ConnectionInfo, ConnectionStats};
pub use types::{ConnectionHandle, DeliveryError, Frame};
