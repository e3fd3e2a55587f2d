//! Assignment model linking a ticket to a field executive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A field-executive assignment for a ticket.
///
/// Immutable once created. Reassignment creates a new row and repoints
/// `ticket.current_assignment_id`; prior rows are retained as history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Assignment {
    /// Unique record identifier.
    pub id: String,
    /// Owning ticket identifier.
    pub ticket_id: String,
    /// Assigned field executive identifier.
    pub fe_id: String,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
    /// Reason recorded when staff picked a non-recommended technician.
    pub override_reason: Option<String>,
}

impl Assignment {
    /// Construct a new assignment with a generated identifier.
    #[must_use]
    pub fn new(
        ticket_id: String,
        fe_id: String,
        override_reason: Option<String>,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ticket_id,
            fe_id,
            assigned_at,
            override_reason,
        }
    }
}
