//! API layer - HTTP endpoint handlers.

mod activities;
mod health;
mod metrics;
mod routes;

pub use activities::{
    create_activity, customer_activities, list_activities, ActivityListResponse, ListQuery,
};
pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
