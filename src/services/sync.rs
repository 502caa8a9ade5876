// SPDX-License-Identifier: MIT

//! Workout synchronizer: refresh-token exchange, sequential pagination,
//! normalization, and one batch upsert.

use crate::db::Database;
use crate::error::AppError;
use crate::models::WorkoutRecord;
use crate::services::concept2::Concept2Client;
use chrono::NaiveDate;
use uuid::Uuid;

/// High-level synchronizer over the Concept2 results API.
///
/// Stateless per invocation: the refresh token is read from the store each
/// time and nothing is cached across calls. Concurrent syncs for the same
/// user converge through the idempotent upsert key.
#[derive(Clone)]
pub struct SyncService {
    client: Concept2Client,
    db: Database,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Copy)]
pub struct SyncOutcome {
    /// Workouts upserted in this run.
    pub count: usize,
    /// Total page count reported by the provider for the query.
    pub pages_processed: u32,
}

impl SyncService {
    pub fn new(client: Concept2Client, db: Database) -> Self {
        Self { client, db }
    }

    /// Sync all rower results for `user_id` on or after `start_date`.
    ///
    /// Pages are fetched sequentially to respect the provider's per-token
    /// rate limits. A failed non-first page is logged and skipped so one bad
    /// page degrades the sync instead of aborting it; the first page carries
    /// the pagination info and is required.
    pub async fn sync_workouts(
        &self,
        user_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<SyncOutcome, AppError> {
        let refresh_token = self
            .db
            .get_refresh_token(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No refresh token for user {user_id}")))?;

        let tokens = self.client.refresh_access_token(&refresh_token).await?;

        // The provider may rotate the refresh token on every grant; persist
        // the newest one immediately (last-write-wins) so later syncs do not
        // present a superseded credential.
        if tokens.refresh_token != refresh_token {
            self.db
                .update_refresh_token(user_id, &tokens.refresh_token)
                .await?;
            tracing::debug!(%user_id, "Stored rotated refresh token");
        }

        let first_page = self
            .client
            .list_results(&tokens.access_token, start_date, 1)
            .await?;

        let total_pages = first_page.meta.pagination.total_pages;
        let mut results = first_page.data;

        for page in 2..=total_pages {
            match self
                .client
                .list_results(&tokens.access_token, start_date, page)
                .await
            {
                Ok(p) => results.extend(p.data),
                Err(e) => {
                    tracing::warn!(%user_id, page, error = %e, "Skipping failed results page");
                }
            }
        }

        let rows: Vec<WorkoutRecord> = results
            .iter()
            .map(|r| WorkoutRecord {
                user_id,
                concept2_id: r.id,
                workout_date: r.date.clone(),
                meters: r.total_meters(),
            })
            .collect();

        self.db.upsert_workouts(&rows).await?;

        tracing::info!(
            %user_id,
            count = rows.len(),
            total_pages,
            "Workouts synced"
        );

        Ok(SyncOutcome {
            count: rows.len(),
            pages_processed: total_pages,
        })
    }
}
