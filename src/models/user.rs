// SPDX-License-Identifier: MIT

//! User token model for storage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user token custody record (`user_tokens` table, unique on `user_id`).
///
/// The refresh token is the sole long-lived credential; it is overwritten on
/// every write, never appended (last-write-wins, no rotation history).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTokenRecord {
    /// Internal user identity (Supabase auth uid)
    pub user_id: Uuid,
    /// Concept2 numeric user id, set once known (webhook user resolution)
    pub concept2_user_id: Option<u64>,
    /// Opaque Concept2 refresh token
    pub concept2_refresh_token: String,
    /// Timestamp of last write (RFC3339)
    pub updated_at: String,
}
