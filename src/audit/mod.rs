//! Structured audit logging for ticket lifecycle events.
//!
//! Provides the [`AuditLogger`] trait and associated types. The primary
//! implementation, [`JsonlAuditWriter`], appends JSONL records to
//! daily-rotating files. Audit writes are best-effort and happen after
//! the primary transaction commits; a failed write is logged, never
//! raised to the caller.

pub mod writer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type classification for audit log entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A ticket was opened.
    TicketOpened,
    /// A ticket status transition was applied.
    Transition,
    /// A field executive was assigned.
    AssignmentCreated,
    /// An action token was issued.
    TokenIssued,
    /// An action token was redeemed.
    TokenRedeemed,
    /// An SLA phase was newly detected as breached.
    SlaBreach,
}

/// A structured record of a lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// ISO 8601 timestamp with timezone.
    pub timestamp: DateTime<Utc>,
    /// Associated ticket identifier.
    pub ticket_id: Option<String>,
    /// Event classification.
    pub event_type: AuditEventType,
    /// Lifecycle action name (for transition events).
    pub action: Option<String>,
    /// Status before the transition.
    pub from_status: Option<String>,
    /// Status after the transition.
    pub to_status: Option<String>,
    /// Acting staff member or field executive.
    pub actor_id: Option<String>,
    /// Field executive (for assignment and token events).
    pub fe_id: Option<String>,
    /// Token value (for token events).
    pub token_id: Option<String>,
    /// Free-form supplementary metadata.
    pub metadata: Option<serde_json::Value>,
}

impl AuditEntry {
    /// Construct a minimal audit entry for the given event type.
    #[must_use]
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            timestamp: Utc::now(),
            ticket_id: None,
            event_type,
            action: None,
            from_status: None,
            to_status: None,
            actor_id: None,
            fe_id: None,
            token_id: None,
            metadata: None,
        }
    }

    /// Set the ticket identifier for this entry.
    #[must_use]
    pub fn with_ticket(mut self, ticket_id: String) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    /// Set the lifecycle action name for this entry.
    #[must_use]
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_owned());
        self
    }

    /// Set the before/after statuses for this entry.
    #[must_use]
    pub fn with_statuses(mut self, from: &str, to: &str) -> Self {
        self.from_status = Some(from.to_owned());
        self.to_status = Some(to.to_owned());
        self
    }

    /// Set the acting user for this entry.
    #[must_use]
    pub fn with_actor(mut self, actor_id: String) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Set the field executive for this entry.
    #[must_use]
    pub fn with_fe(mut self, fe_id: String) -> Self {
        self.fe_id = Some(fe_id);
        self
    }

    /// Set the token value for this entry.
    #[must_use]
    pub fn with_token(mut self, token_id: String) -> Self {
        self.token_id = Some(token_id);
        self
    }

    /// Set supplementary metadata for this entry.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Writes structured audit entries to a persistent sink.
///
/// Implementations must be [`Send`] and [`Sync`] to allow sharing across
/// async task boundaries via [`std::sync::Arc`].
pub trait AuditLogger: Send + Sync {
    /// Record a single audit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write operation fails.
    fn log_entry(&self, entry: AuditEntry) -> crate::Result<()>;
}

pub use writer::JsonlAuditWriter;
