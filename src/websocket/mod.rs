//! `/ws` activity feed endpoint.

mod handler;

pub use handler::ws_handler;
