// SPDX-License-Identifier: MIT

//! HTTP route handlers.

pub mod oidc;
pub mod sync;
pub mod webhook;

use crate::middleware::auth::require_auth;
use crate::AppState;
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Build the complete router with all routes.
///
/// The route table is explicit: exact path + method pairs, no substring
/// dispatch. Every consumer is cross-origin (the broker, the front end, the
/// Concept2 push system), so CORS is permissive and the layer answers
/// `OPTIONS` preflights directly.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes: the OAuth provider surface consumed by the identity
    // broker and the webhook receiver invoked by Concept2.
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(oidc::routes())
        .merge(webhook::routes());

    // Protected routes: the front end's sync trigger (session JWT required)
    let protected_routes =
        sync::routes().route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
