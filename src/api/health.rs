use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::connection_manager::ConnectionStats;
use crate::relay::RelayStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: StoreHealth,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub backend: String,
    pub reachable: bool,
    pub durable: bool,
    /// Only reported by in-memory stores
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retained_rows: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connections: ConnectionStats,
    pub relay: RelayStatsSnapshot,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    let retained_rows = state.store.retained_rows().await;
    if let Some(rows) = retained_rows {
        tracing::debug!(backend = state.store.backend_name(), rows, "In-memory store size");
    }

    let (status, label) = if reachable {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: StoreHealth {
                backend: state.store.backend_name().to_string(),
                reachable,
                durable: state.store.is_durable(),
                retained_rows,
            },
        }),
    )
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connections: state.connections.stats(),
        relay: state.relay.stats().await,
    })
}
