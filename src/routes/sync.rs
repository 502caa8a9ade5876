// SPDX-License-Identifier: MIT

//! On-demand workout sync, triggered by the authenticated front end.

use axum::{
    extract::{Json, State},
    routing::post,
    Extension, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::AppState;

/// Sync routes (require authentication via session JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/sync/workouts", post(sync_workouts))
}

/// Sync request body. Fields are validated by hand so a missing field is a
/// clean 400 rather than an extractor rejection.
#[derive(Deserialize)]
struct SyncRequest {
    #[serde(default)]
    user_id: Option<Uuid>,
    #[serde(default)]
    start_date: Option<NaiveDate>,
}

/// Sync response.
#[derive(Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub count: usize,
    pub pages_processed: u32,
}

/// Sync workouts for a user from `start_date` onwards.
async fn sync_workouts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let (Some(user_id), Some(start_date)) = (req.user_id, req.start_date) else {
        return Err(AppError::BadRequest(
            "user_id and start_date are required".to_string(),
        ));
    };

    // A caller may only sync their own workouts.
    if user_id != user.user_id {
        tracing::warn!(
            requested = %user_id,
            authenticated = %user.user_id,
            "Sync user mismatch"
        );
        return Err(AppError::Unauthorized);
    }

    let outcome = state.sync.sync_workouts(user_id, start_date).await?;

    Ok(Json(SyncResponse {
        message: "Workouts synced successfully".to_string(),
        count: outcome.count,
        pages_processed: outcome.pages_processed,
    }))
}
