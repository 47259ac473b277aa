use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};

use super::activities::{create_activity, customer_activities, list_activities};
use super::health::{health, stats};
use super::metrics::prometheus_metrics;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                .route("/activities", post(create_activity).get(list_activities))
                .route(
                    "/customers/{customer_id}/activities",
                    get(customer_activities),
                )
                .route_layer(middleware::from_fn_with_state(state, api_key_auth)),
        )
}
