// SPDX-License-Identifier: MIT

//! Ergsync API Server
//!
//! Bridges Supabase's generic OAuth provider interface to the Concept2
//! Logbook OAuth dialect and syncs workout history for goal tracking.

use ergsync::{
    config::Config,
    db::Database,
    services::{Concept2Client, SyncService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Ergsync API");

    // Supabase PostgREST client (service role)
    let db = Database::connect(&config.supabase_url, &config.supabase_service_role_key);
    tracing::info!(url = %config.supabase_url, "Supabase client initialized");

    // Concept2 Logbook API client
    let concept2 = Concept2Client::new(
        config.concept2_client_id.clone(),
        config.concept2_client_secret.clone(),
        config.concept2_base_url.clone(),
    );

    // Workout synchronizer
    let sync = SyncService::new(concept2.clone(), db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        concept2,
        sync,
    });

    // Build router
    let app = ergsync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ergsync=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
