//! SLA deadline tracking.
//!
//! Derives and maintains the three phase deadlines per ticket and the
//! pause/resume semantics around review and verification statuses. All
//! functions are pure over [`crate::models::sla::SlaRecord`] and an
//! explicit `now`, so display-time evaluation and deterministic tests
//! share the same code path.

pub mod tracker;

pub use tracker::{evaluate, on_transition, refresh_breaches, start};
