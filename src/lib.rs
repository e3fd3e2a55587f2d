#![forbid(unsafe_code)]

//! `fieldline`: ticket lifecycle, SLA, and action-token engine.
//!
//! The engine owns the canonical ticket status state machine, the
//! three-phase SLA deadline tracker with pause/resume semantics, and the
//! single-use action tokens that let a field executive drive specific
//! transitions from an unauthenticated link. Everything else in the CRM
//! (ingestion, dashboards, notification delivery) consumes this crate
//! through [`orchestrator::engine::LifecycleEngine`].

pub mod audit;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod persistence;
pub mod sla;

pub use config::GlobalConfig;
pub use errors::{AppError, Result, TokenError};
