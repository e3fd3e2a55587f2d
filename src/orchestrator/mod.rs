//! Lifecycle orchestration.
//!
//! [`engine::LifecycleEngine`] is the only entry point callers use to
//! mutate tickets. It composes the state machine, SLA tracker, and token
//! repository into atomic, per-ticket-linearizable operations.

pub mod engine;

pub use engine::{
    ActorContext, ActorRole, IssuedToken, LifecycleEngine, OpenTicket, Redemption, StaffAction,
};
