// SPDX-License-Identifier: MIT

//! Workout model for storage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One Concept2 result, scoped to a user (`workouts` table, unique on
/// `(user_id, concept2_id)`).
///
/// Re-ingesting the same result (sync or webhook) is an overwrite, not a
/// duplicate row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Internal user identity
    pub user_id: Uuid,
    /// Concept2 result id (globally unique on the provider side)
    pub concept2_id: u64,
    /// Workout date as reported by the provider
    pub workout_date: String,
    /// Total distance: primary workout meters plus rest-interval meters.
    /// Goal progress downstream consumes this single cumulative figure.
    pub meters: u64,
}
