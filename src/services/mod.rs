// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod concept2;
pub mod sync;

pub use concept2::Concept2Client;
pub use sync::{SyncOutcome, SyncService};
