//! Ticket model and lifecycle status enumeration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical lifecycle status of a service ticket.
///
/// A closed enumeration: the transition table in
/// [`crate::lifecycle::state_machine`] is the only authority on movement
/// between these values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Awaiting assignment to a field executive.
    Open,
    /// Parked for staff review (low ingestion confidence).
    NeedsReview,
    /// A field executive holds the current assignment.
    Assigned,
    /// On-site token issued; technician is travelling.
    EnRoute,
    /// Technician has arrived at the service location.
    OnSite,
    /// Resolution proof submitted, awaiting staff verification.
    ResolvedPendingVerification,
    /// Work verified and closed.
    Resolved,
    /// A resolved ticket reopened by the requester or staff.
    Reopened,
}

impl TicketStatus {
    /// Stable string form used in the store and in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::NeedsReview => "needs_review",
            Self::Assigned => "assigned",
            Self::EnRoute => "en_route",
            Self::OnSite => "on_site",
            Self::ResolvedPendingVerification => "resolved_pending_verification",
            Self::Resolved => "resolved",
            Self::Reopened => "reopened",
        }
    }

    /// Parse the stable string form back into a status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "needs_review" => Some(Self::NeedsReview),
            "assigned" => Some(Self::Assigned),
            "en_route" => Some(Self::EnRoute),
            "on_site" => Some(Self::OnSite),
            "resolved_pending_verification" => Some(Self::ResolvedPendingVerification),
            "resolved" => Some(Self::Resolved),
            "reopened" => Some(Self::Reopened),
            _ => None,
        }
    }

    /// Whether the SLA clock is suspended while a ticket holds this status.
    #[must_use]
    pub fn pauses_sla(self) -> bool {
        matches!(self, Self::NeedsReview | Self::ResolvedPendingVerification)
    }

    /// All enumerated statuses, for exhaustive sweeps in validation code.
    #[must_use]
    pub fn all() -> [Self; 8] {
        [
            Self::Open,
            Self::NeedsReview,
            Self::Assigned,
            Self::EnRoute,
            Self::OnSite,
            Self::ResolvedPendingVerification,
            Self::Resolved,
            Self::Reopened,
        ]
    }
}

/// A unit of service work with a lifecycle status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Ticket {
    /// Unique record identifier; immutable.
    pub id: String,
    /// Current lifecycle status.
    pub status: TicketStatus,
    /// The active assignment, if any. A ticket without one must be
    /// `open` or `needs_review`.
    pub current_assignment_id: Option<String>,
    /// Email address of the party who reported the issue.
    pub requester: String,
    /// Short description carried from the inbound email subject.
    pub subject: String,
    /// Ingestion pipeline confidence score, when machine-created.
    pub confidence: Option<f64>,
    /// Optimistic concurrency counter; bumped on every mutation.
    pub version: i64,
    /// Creation timestamp.
    pub opened_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Construct a new ticket in the given initial status.
    #[must_use]
    pub fn new(
        requester: String,
        subject: String,
        confidence: Option<f64>,
        status: TicketStatus,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status,
            current_assignment_id: None,
            requester,
            subject,
            confidence,
            version: 0,
            opened_at,
            updated_at: opened_at,
        }
    }
}
