// SPDX-License-Identifier: MIT

use ergsync::config::Config;
use ergsync::db::Database;
use ergsync::middleware::auth::issue_session_jwt;
use ergsync::models::UserTokenRecord;
use ergsync::routes::create_router;
use ergsync::services::{Concept2Client, SyncService};
use ergsync::AppState;
use std::sync::Arc;
use uuid::Uuid;

/// Create a test app backed by the in-memory database, with the Concept2
/// client pointed at `concept2_base_url` (usually a wiremock server).
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(concept2_base_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.concept2_base_url = concept2_base_url.to_string();

    let db = Database::new_memory();
    let concept2 = Concept2Client::new(
        config.concept2_client_id.clone(),
        config.concept2_client_secret.clone(),
        config.concept2_base_url.clone(),
    );
    let sync = SyncService::new(concept2.clone(), db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        concept2,
        sync,
    });

    (create_router(state.clone()), state)
}

/// Bearer header value for a session JWT signed with the test secret.
#[allow(dead_code)]
pub fn bearer_for(state: &AppState, user_id: Uuid) -> String {
    let token = issue_session_jwt(user_id, &state.config.supabase_jwt_secret)
        .expect("JWT creation should succeed");
    format!("Bearer {token}")
}

/// Seed a token record for a user.
#[allow(dead_code)]
pub async fn seed_token(
    state: &AppState,
    user_id: Uuid,
    concept2_user_id: Option<u64>,
    refresh_token: &str,
) {
    state
        .db
        .upsert_user_token(&UserTokenRecord {
            user_id,
            concept2_user_id,
            concept2_refresh_token: refresh_token.to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        })
        .await
        .expect("Seeding token record should succeed");
}
