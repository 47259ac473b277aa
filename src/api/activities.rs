//! Activity REST endpoints. Creating an activity is the write the relay picks up.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::activity::{Activity, NewActivity};
use crate::error::{AppError, Result};
use crate::metrics::ActivityApiMetrics;
use crate::server::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

impl ListQuery {
    fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityListResponse {
    pub activities: Vec<Activity>,
    pub count: usize,
}

impl From<Vec<Activity>> for ActivityListResponse {
    fn from(activities: Vec<Activity>) -> Self {
        let count = activities.len();
        Self { activities, count }
    }
}

/// POST /api/v1/activities
pub async fn create_activity(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewActivity>, JsonRejection>,
) -> Result<(StatusCode, Json<Activity>)> {
    let Json(payload) = payload.map_err(|e| {
        ActivityApiMetrics::record_rejected();
        AppError::Validation(e.body_text())
    })?;

    if let Err(msg) = payload.validate() {
        ActivityApiMetrics::record_rejected();
        return Err(AppError::Validation(msg));
    }

    let activity = state.store.insert(payload.normalized()).await?;
    ActivityApiMetrics::record_created();

    tracing::info!(
        activity_id = activity.id,
        customer_id = activity.customer_id,
        activity_type = %activity.activity_type,
        "Activity recorded"
    );

    Ok((StatusCode::CREATED, Json(activity)))
}

/// GET /api/v1/activities?limit=N
pub async fn list_activities(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ActivityListResponse>> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let activities = state.store.recent(query.effective_limit()).await?;
    Ok(Json(activities.into()))
}

/// GET /api/v1/customers/{customer_id}/activities?limit=N
pub async fn customer_activities(
    State(state): State<AppState>,
    customer_id: std::result::Result<Path<i64>, PathRejection>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ActivityListResponse>> {
    let Path(customer_id) = customer_id.map_err(|e| AppError::Validation(e.body_text()))?;
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    if customer_id <= 0 {
        return Err(AppError::Validation(
            "customer_id must be a positive integer".to_string(),
        ));
    }

    let activities = state
        .store
        .for_customer(customer_id, query.effective_limit())
        .await?;
    Ok(Json(activities.into()))
}
