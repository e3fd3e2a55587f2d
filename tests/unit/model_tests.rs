//! Unit tests for domain model helpers.

use chrono::{Duration, Utc};
use fieldline::models::assignment::Assignment;
use fieldline::models::sla::SlaPhase;
use fieldline::models::ticket::{Ticket, TicketStatus};
use fieldline::models::token::{generate_token_value, ActionToken, TokenAction};

#[test]
fn status_string_round_trip() {
    for status in TicketStatus::all() {
        assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
    }
    assert!(TicketStatus::parse("closed").is_none());
}

#[test]
fn only_review_and_verification_pause_the_sla_clock() {
    let pausing: Vec<TicketStatus> = TicketStatus::all()
        .into_iter()
        .filter(|s| s.pauses_sla())
        .collect();
    assert_eq!(
        pausing,
        vec![
            TicketStatus::NeedsReview,
            TicketStatus::ResolvedPendingVerification
        ]
    );
}

#[test]
fn token_action_string_round_trip() {
    for action in [TokenAction::OnSite, TokenAction::Resolution] {
        assert_eq!(TokenAction::parse(action.as_str()), Some(action));
    }
    assert!(TokenAction::parse("arrival").is_none());
}

#[test]
fn new_ticket_starts_unversioned_and_unassigned() {
    let now = Utc::now();
    let ticket = Ticket::new(
        "ops@depot.example".to_owned(),
        "Dock leveller jammed".to_owned(),
        None,
        TicketStatus::Open,
        now,
    );
    assert_eq!(ticket.version, 0);
    assert!(ticket.current_assignment_id.is_none());
    assert_eq!(ticket.opened_at, now);
    assert_eq!(ticket.updated_at, now);
}

#[test]
fn token_expiry_is_created_at_plus_ttl() {
    let now = Utc::now();
    let token = ActionToken::new(
        "tick-1".to_owned(),
        "fe-1".to_owned(),
        TokenAction::OnSite,
        12,
        now,
    );
    assert_eq!(token.expires_at, now + Duration::hours(12));
    assert!(token.is_active(now));
    assert!(!token.is_active(now + Duration::hours(13)));
}

#[test]
fn redeemed_token_is_not_active() {
    let now = Utc::now();
    let mut token = ActionToken::new(
        "tick-1".to_owned(),
        "fe-1".to_owned(),
        TokenAction::Resolution,
        24,
        now,
    );
    token.used = true;
    assert!(!token.is_active(now));
}

#[test]
fn token_values_carry_256_bits() {
    let value = generate_token_value();
    assert_eq!(value.len(), 64);
    assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn assignment_records_override_reason() {
    let now = Utc::now();
    let assignment = Assignment::new(
        "tick-1".to_owned(),
        "fe-2".to_owned(),
        Some("requested by site manager".to_owned()),
        now,
    );
    assert_eq!(assignment.ticket_id, "tick-1");
    assert_eq!(
        assignment.override_reason.as_deref(),
        Some("requested by site manager")
    );
}

#[test]
fn default_phase_is_idle() {
    let phase = SlaPhase::default();
    assert!(!phase.is_running());
    assert!(phase.deadline.is_none());
    assert!(!phase.breached);
}
