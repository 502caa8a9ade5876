// SPDX-License-Identifier: MIT

//! Database layer (Supabase PostgREST).

pub mod supabase;

pub use supabase::Database;

/// Table names as constants.
pub mod tables {
    pub const USER_TOKENS: &str = "user_tokens";
    pub const WORKOUTS: &str = "workouts";
}
