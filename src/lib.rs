// SPDX-License-Identifier: MIT

//! Ergsync: Concept2 OAuth bridge and workout sync for a rowing goal tracker.
//!
//! This crate exposes Keycloak-shaped OAuth provider endpoints that Supabase
//! uses as a generic identity provider, and ingests Concept2 workout history
//! via on-demand paginated sync and push webhooks.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Database;
use services::{Concept2Client, SyncService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub concept2: Concept2Client,
    pub sync: SyncService,
}
