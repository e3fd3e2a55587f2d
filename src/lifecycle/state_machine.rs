//! Pure ticket status transition table.

use crate::models::ticket::TicketStatus;
use crate::{AppError, Result};

/// An action that may move a ticket between statuses.
///
/// Payload (assignee, proof URL) travels separately through the
/// orchestrator; the table itself only cares about the action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketAction {
    /// Staff assigns (or reassigns) a field executive.
    Assign,
    /// Staff approves a ticket parked for review.
    Approve,
    /// Staff issues an on-site token, dispatching the technician.
    IssueOnSiteToken,
    /// Arrival at the service location is recorded.
    TechnicianArrives,
    /// Staff issues a resolution token. Issuance alone does not move
    /// the status; arrival is its own explicitly ordered action.
    IssueResolutionToken,
    /// The technician submits resolution proof through a token link.
    TechnicianSubmitsProof,
    /// Staff verifies completed work.
    StaffVerify,
    /// A resolved ticket is reopened.
    Reopen,
}

impl TicketAction {
    /// Stable action name for errors and log fields.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Approve => "approve",
            Self::IssueOnSiteToken => "issue_on_site_token",
            Self::TechnicianArrives => "technician_arrives",
            Self::IssueResolutionToken => "issue_resolution_token",
            Self::TechnicianSubmitsProof => "technician_submits_proof",
            Self::StaffVerify => "staff_verify",
            Self::Reopen => "reopen",
        }
    }

    /// All actions, for exhaustive sweeps in tests and validation.
    #[must_use]
    pub fn all() -> [Self; 8] {
        [
            Self::Assign,
            Self::Approve,
            Self::IssueOnSiteToken,
            Self::TechnicianArrives,
            Self::IssueResolutionToken,
            Self::TechnicianSubmitsProof,
            Self::StaffVerify,
            Self::Reopen,
        ]
    }
}

/// Resolve the status a ticket moves to when `action` fires from `from`.
///
/// The table is closed: any pair not listed fails, including attempts to
/// skip states. `IssueResolutionToken` is the one legal no-op row.
///
/// # Errors
///
/// Returns [`AppError::InvalidTransition`] for any pair outside the table.
pub fn next_status(from: TicketStatus, action: TicketAction) -> Result<TicketStatus> {
    use TicketAction as A;
    use TicketStatus as S;

    let next = match (from, action) {
        (S::Open | S::NeedsReview | S::Reopened, A::Assign) => S::Assigned,
        (S::NeedsReview, A::Approve) => S::Open,
        (S::Assigned, A::IssueOnSiteToken) => S::EnRoute,
        (S::EnRoute | S::Assigned, A::TechnicianArrives) => S::OnSite,
        (S::OnSite, A::IssueResolutionToken) => S::OnSite,
        (S::OnSite, A::TechnicianSubmitsProof) => S::ResolvedPendingVerification,
        (S::ResolvedPendingVerification, A::StaffVerify) => S::Resolved,
        (S::Resolved, A::Reopen) => S::Reopened,
        (from, action) => {
            return Err(AppError::InvalidTransition {
                from,
                action: action.name(),
            })
        }
    };

    Ok(next)
}
