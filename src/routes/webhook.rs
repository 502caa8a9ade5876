// SPDX-License-Identifier: MIT

//! Webhook routes for Concept2 result push events.
//!
//! Each event is processed independently and is safe to redeliver: upsert
//! and delete are both idempotent, and no ordering between deliveries is
//! assumed. Responses are plain text.

use crate::models::WorkoutRecord;
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook/concept2", post(handle_event))
}

/// Result payload carried by `result-added` / `result-updated` events.
#[derive(Deserialize, Debug)]
struct ResultPayload {
    id: u64,
    /// Concept2 numeric user id; resolved against the token store
    user_id: u64,
    date: String,
    #[serde(default)]
    distance: Option<u64>,
    #[serde(default)]
    rest_distance: Option<u64>,
}

/// Handle incoming webhook events (POST).
async fn handle_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> (StatusCode, &'static str) {
    let Some(event_type) = payload.get("type").and_then(|t| t.as_str()) else {
        tracing::error!(payload = %payload, "Webhook payload missing event type");
        return (StatusCode::BAD_REQUEST, "Malformed webhook payload");
    };

    tracing::info!(event_type, "Webhook event received");

    match event_type {
        "result-added" | "result-updated" => {
            let result: ResultPayload = match payload
                .get("result")
                .cloned()
                .map(serde_json::from_value)
                .transpose()
            {
                Ok(Some(r)) => r,
                Ok(None) | Err(_) => {
                    tracing::error!(payload = %payload, "Failed to parse result payload");
                    return (StatusCode::BAD_REQUEST, "Malformed webhook payload");
                }
            };

            // Resolve the internal user by the provider-side user id
            let user_id = match state.db.find_user_by_concept2_id(result.user_id).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    tracing::warn!(
                        concept2_user_id = result.user_id,
                        "No user for webhook event"
                    );
                    return (StatusCode::NOT_FOUND, "User not found");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to resolve webhook user");
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
                }
            };

            let workout = WorkoutRecord {
                user_id,
                concept2_id: result.id,
                workout_date: result.date,
                meters: result.distance.unwrap_or(0) + result.rest_distance.unwrap_or(0),
            };

            if let Err(e) = state.db.upsert_workouts(&[workout]).await {
                tracing::error!(error = %e, concept2_id = result.id, "Failed to upsert workout");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Error upserting data");
            }

            tracing::info!(concept2_id = result.id, "Workout upserted from webhook");
        }
        "result-deleted" => {
            let Some(result_id) = payload.get("result_id").and_then(|v| v.as_u64()) else {
                tracing::error!(payload = %payload, "Delete event missing result_id");
                return (StatusCode::BAD_REQUEST, "Malformed webhook payload");
            };

            if let Err(e) = state.db.delete_workout(result_id).await {
                tracing::error!(error = %e, result_id, "Failed to delete workout");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Error deleting workout");
            }

            tracing::info!(result_id, "Workout deleted from webhook");
        }
        other => {
            tracing::warn!(event_type = other, "Unsupported webhook event type");
            return (StatusCode::BAD_REQUEST, "Event type not supported");
        }
    }

    (StatusCode::OK, "Webhook received")
}
