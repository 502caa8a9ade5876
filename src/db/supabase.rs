// SPDX-License-Identifier: MIT

//! Supabase PostgREST client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - User tokens (refresh-token custody, webhook user resolution)
//! - Workouts (idempotent upserts keyed on `(user_id, concept2_id)`)
//!
//! Two backends share the contract: a REST backend talking to PostgREST with
//! the service-role key, and an in-memory backend for tests and local runs
//! without a Supabase project. Concurrency safety comes from PostgREST's own
//! atomic upsert (`on_conflict` + `resolution=merge-duplicates`); nothing is
//! cached across requests.

use crate::db::tables;
use crate::error::AppError;
use crate::models::{UserTokenRecord, WorkoutRecord};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Upstream calls are bounded; a hung PostgREST connection must not hang the
/// handler.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Database client over PostgREST, or an in-memory store.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Rest(RestBackend),
    Memory(Arc<Mutex<MemoryStore>>),
}

impl Database {
    /// Create a PostgREST-backed client using the service-role key.
    pub fn connect(supabase_url: &str, service_role_key: &str) -> Self {
        Self {
            backend: Backend::Rest(RestBackend {
                http: reqwest::Client::builder()
                    .timeout(HTTP_TIMEOUT)
                    .build()
                    .unwrap_or_default(),
                base_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
                service_role_key: service_role_key.to_string(),
            }),
        }
    }

    /// Create an in-memory database (tests and credential-less local runs).
    pub fn new_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Mutex::new(MemoryStore::default()))),
        }
    }

    // ─── Token Operations ────────────────────────────────────────

    /// Insert or overwrite the token record for a user (conflict on `user_id`).
    pub async fn upsert_user_token(&self, record: &UserTokenRecord) -> Result<(), AppError> {
        match &self.backend {
            Backend::Rest(rest) => {
                rest.upsert(tables::USER_TOKENS, "user_id", &[record.clone()])
                    .await
            }
            Backend::Memory(store) => {
                let mut store = store.lock().map_err(poisoned)?;
                store.tokens.insert(record.user_id, record.clone());
                Ok(())
            }
        }
    }

    /// Get the stored refresh token for a user, if any.
    pub async fn get_refresh_token(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        match &self.backend {
            Backend::Rest(rest) => {
                #[derive(Deserialize)]
                struct Row {
                    concept2_refresh_token: String,
                }

                let rows: Vec<Row> = rest
                    .select(
                        tables::USER_TOKENS,
                        &format!("user_id=eq.{user_id}&select=concept2_refresh_token&limit=1"),
                    )
                    .await?;
                Ok(rows.into_iter().next().map(|r| r.concept2_refresh_token))
            }
            Backend::Memory(store) => {
                let store = store.lock().map_err(poisoned)?;
                Ok(store
                    .tokens
                    .get(&user_id)
                    .map(|r| r.concept2_refresh_token.clone()))
            }
        }
    }

    /// Overwrite the stored refresh token for a user (targeted update).
    ///
    /// Used when the provider rotates refresh tokens during a refresh grant;
    /// the previous value is discarded (last-write-wins).
    pub async fn update_refresh_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        match &self.backend {
            Backend::Rest(rest) => {
                rest.patch(
                    tables::USER_TOKENS,
                    &format!("user_id=eq.{user_id}"),
                    &serde_json::json!({
                        "concept2_refresh_token": token,
                        "updated_at": updated_at,
                    }),
                )
                .await
            }
            Backend::Memory(store) => {
                let mut store = store.lock().map_err(poisoned)?;
                if let Some(record) = store.tokens.get_mut(&user_id) {
                    record.concept2_refresh_token = token.to_string();
                    record.updated_at = updated_at;
                }
                Ok(())
            }
        }
    }

    /// Resolve the internal user id for a Concept2 user id (webhook path).
    pub async fn find_user_by_concept2_id(
        &self,
        concept2_user_id: u64,
    ) -> Result<Option<Uuid>, AppError> {
        match &self.backend {
            Backend::Rest(rest) => {
                #[derive(Deserialize)]
                struct Row {
                    user_id: Uuid,
                }

                let rows: Vec<Row> = rest
                    .select(
                        tables::USER_TOKENS,
                        &format!("concept2_user_id=eq.{concept2_user_id}&select=user_id&limit=1"),
                    )
                    .await?;
                Ok(rows.into_iter().next().map(|r| r.user_id))
            }
            Backend::Memory(store) => {
                let store = store.lock().map_err(poisoned)?;
                Ok(store
                    .tokens
                    .values()
                    .find(|r| r.concept2_user_id == Some(concept2_user_id))
                    .map(|r| r.user_id))
            }
        }
    }

    // ─── Workout Operations ──────────────────────────────────────

    /// Upsert a batch of workouts (conflict on `user_id,concept2_id`).
    pub async fn upsert_workouts(&self, rows: &[WorkoutRecord]) -> Result<(), AppError> {
        if rows.is_empty() {
            return Ok(());
        }

        match &self.backend {
            Backend::Rest(rest) => {
                rest.upsert(tables::WORKOUTS, "user_id,concept2_id", rows)
                    .await
            }
            Backend::Memory(store) => {
                let mut store = store.lock().map_err(poisoned)?;
                for row in rows {
                    store
                        .workouts
                        .insert((row.user_id, row.concept2_id), row.clone());
                }
                Ok(())
            }
        }
    }

    /// Delete workout rows by Concept2 result id.
    ///
    /// Provider result ids are globally unique, so no user scoping is needed.
    pub async fn delete_workout(&self, concept2_id: u64) -> Result<(), AppError> {
        match &self.backend {
            Backend::Rest(rest) => {
                rest.delete(tables::WORKOUTS, &format!("concept2_id=eq.{concept2_id}"))
                    .await
            }
            Backend::Memory(store) => {
                let mut store = store.lock().map_err(poisoned)?;
                store.workouts.retain(|(_, id), _| *id != concept2_id);
                Ok(())
            }
        }
    }

    /// List stored workouts for a user, ordered by date.
    ///
    /// The goal dashboard consumes this view; tests use it to observe
    /// convergence.
    pub async fn list_workouts(&self, user_id: Uuid) -> Result<Vec<WorkoutRecord>, AppError> {
        match &self.backend {
            Backend::Rest(rest) => {
                rest.select(
                    tables::WORKOUTS,
                    &format!("user_id=eq.{user_id}&order=workout_date.asc"),
                )
                .await
            }
            Backend::Memory(store) => {
                let store = store.lock().map_err(poisoned)?;
                let mut rows: Vec<WorkoutRecord> = store
                    .workouts
                    .values()
                    .filter(|w| w.user_id == user_id)
                    .cloned()
                    .collect();
                rows.sort_by(|a, b| {
                    a.workout_date
                        .cmp(&b.workout_date)
                        .then(a.concept2_id.cmp(&b.concept2_id))
                });
                Ok(rows)
            }
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> AppError {
    AppError::Database("In-memory store lock poisoned".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// REST backend (PostgREST)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    service_role_key: String,
}

impl RestBackend {
    fn request(&self, method: reqwest::Method, table: &str, query: &str) -> reqwest::RequestBuilder {
        let url = if query.is_empty() {
            format!("{}/{}", self.base_url, table)
        } else {
            format!("{}/{}?{}", self.base_url, table, query)
        };

        self.http
            .request(method, url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    async fn select<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .request(reqwest::Method::GET, table, query)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::Database(format!("PostgREST response parse error: {e}")))
    }

    async fn upsert<T: serde::Serialize>(
        &self,
        table: &str,
        conflict_target: &str,
        rows: &[T],
    ) -> Result<(), AppError> {
        let response = self
            .request(
                reqwest::Method::POST,
                table,
                &format!("on_conflict={conflict_target}"),
            )
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }

    async fn patch(
        &self,
        table: &str,
        query: &str,
        body: &serde_json::Value,
    ) -> Result<(), AppError> {
        let response = self
            .request(reqwest::Method::PATCH, table, query)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, query: &str) -> Result<(), AppError> {
        let response = self
            .request(reqwest::Method::DELETE, table, query)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Database(format!("PostgREST {status}: {body}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryStore {
    /// Keyed by `user_id` (the table's unique column)
    tokens: HashMap<Uuid, UserTokenRecord>,
    /// Keyed by `(user_id, concept2_id)` (the table's unique tuple)
    workouts: HashMap<(Uuid, u64), WorkoutRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workout(user_id: Uuid, concept2_id: u64, meters: u64) -> WorkoutRecord {
        WorkoutRecord {
            user_id,
            concept2_id,
            workout_date: "2024-01-15 06:30:00".to_string(),
            meters,
        }
    }

    #[tokio::test]
    async fn test_upsert_workouts_is_idempotent() {
        let db = Database::new_memory();
        let user_id = Uuid::new_v4();

        let rows = vec![workout(user_id, 1, 5000), workout(user_id, 2, 8000)];
        db.upsert_workouts(&rows).await.unwrap();
        db.upsert_workouts(&rows).await.unwrap();

        let stored = db.list_workouts(user_id).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_workout_overwrites_on_conflict() {
        let db = Database::new_memory();
        let user_id = Uuid::new_v4();

        db.upsert_workouts(&[workout(user_id, 1, 5000)])
            .await
            .unwrap();
        db.upsert_workouts(&[workout(user_id, 1, 6000)])
            .await
            .unwrap();

        let stored = db.list_workouts(user_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].meters, 6000);
    }

    #[tokio::test]
    async fn test_delete_workout_removes_only_matching_id() {
        let db = Database::new_memory();
        let user_id = Uuid::new_v4();

        db.upsert_workouts(&[workout(user_id, 1, 5000), workout(user_id, 2, 8000)])
            .await
            .unwrap();
        db.delete_workout(1).await.unwrap();

        let stored = db.list_workouts(user_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].concept2_id, 2);
    }

    #[tokio::test]
    async fn test_token_record_upsert_and_rotation() {
        let db = Database::new_memory();
        let user_id = Uuid::new_v4();

        let record = UserTokenRecord {
            user_id,
            concept2_user_id: Some(42),
            concept2_refresh_token: "original".to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        db.upsert_user_token(&record).await.unwrap();

        assert_eq!(
            db.get_refresh_token(user_id).await.unwrap().as_deref(),
            Some("original")
        );
        assert_eq!(
            db.find_user_by_concept2_id(42).await.unwrap(),
            Some(user_id)
        );

        db.update_refresh_token(user_id, "rotated").await.unwrap();
        assert_eq!(
            db.get_refresh_token(user_id).await.unwrap().as_deref(),
            Some("rotated")
        );

        // Upsert again with the same user_id: overwrite, not a second record
        db.upsert_user_token(&record).await.unwrap();
        assert_eq!(
            db.find_user_by_concept2_id(42).await.unwrap(),
            Some(user_id)
        );
    }
}
