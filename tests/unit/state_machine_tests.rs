//! Unit tests for the ticket status transition table.
//!
//! Validates:
//! - Every row of the transition table resolves to the documented status
//! - The table is closed: all other `(status, action)` pairs fail with
//!   `InvalidTransition` naming the offending pair
//! - State skipping is illegal

use fieldline::lifecycle::state_machine::{next_status, TicketAction};
use fieldline::models::ticket::TicketStatus;
use fieldline::AppError;

use TicketAction as A;
use TicketStatus as S;

/// The full legal transition table.
fn legal_rows() -> Vec<(S, A, S)> {
    vec![
        (S::Open, A::Assign, S::Assigned),
        (S::NeedsReview, A::Assign, S::Assigned),
        (S::Reopened, A::Assign, S::Assigned),
        (S::NeedsReview, A::Approve, S::Open),
        (S::Assigned, A::IssueOnSiteToken, S::EnRoute),
        (S::EnRoute, A::TechnicianArrives, S::OnSite),
        (S::Assigned, A::TechnicianArrives, S::OnSite),
        (S::OnSite, A::IssueResolutionToken, S::OnSite),
        (S::OnSite, A::TechnicianSubmitsProof, S::ResolvedPendingVerification),
        (S::ResolvedPendingVerification, A::StaffVerify, S::Resolved),
        (S::Resolved, A::Reopen, S::Reopened),
    ]
}

#[test]
fn every_legal_row_resolves() {
    for (from, action, expected) in legal_rows() {
        let next = next_status(from, action).expect("legal transition");
        assert_eq!(next, expected, "{} via {}", from.as_str(), action.name());
    }
}

#[test]
fn every_other_pair_is_rejected() {
    let legal: Vec<(S, A)> = legal_rows()
        .into_iter()
        .map(|(from, action, _)| (from, action))
        .collect();

    for from in TicketStatus::all() {
        for action in TicketAction::all() {
            if legal.contains(&(from, action)) {
                continue;
            }
            let err = next_status(from, action).expect_err("pair outside the table");
            match err {
                AppError::InvalidTransition {
                    from: err_from,
                    action: err_action,
                } => {
                    assert_eq!(err_from, from);
                    assert_eq!(err_action, action.name());
                }
                other => panic!("expected InvalidTransition, got {other}"),
            }
        }
    }
}

#[test]
fn skipping_states_is_illegal() {
    assert!(next_status(S::Open, A::StaffVerify).is_err());
    assert!(next_status(S::Open, A::TechnicianSubmitsProof).is_err());
    assert!(next_status(S::Assigned, A::StaffVerify).is_err());
    assert!(next_status(S::EnRoute, A::TechnicianSubmitsProof).is_err());
}

#[test]
fn resolved_is_terminal_absent_reopening() {
    for action in TicketAction::all() {
        if action == A::Reopen {
            continue;
        }
        assert!(next_status(S::Resolved, action).is_err());
    }
}

#[test]
fn resolution_token_issuance_is_a_status_noop() {
    let next = next_status(S::OnSite, A::IssueResolutionToken).expect("legal");
    assert_eq!(next, S::OnSite);
}
