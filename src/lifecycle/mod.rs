//! Ticket lifecycle rules.
//!
//! The state machine here is the single authority on which
//! `(status, action)` pairs are legal. It is pure and never touches the
//! store; the orchestrator applies its verdicts transactionally.

pub mod state_machine;

pub use state_machine::{next_status, TicketAction};
