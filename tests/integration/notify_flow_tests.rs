//! Notification dispatch through the engine: per-transition events and
//! the all-resolved check that fires when a requester's queue empties.

use std::sync::Arc;

use fieldline::notify::LifecycleEvent;
use fieldline::orchestrator::StaffAction;

use super::test_helpers::{
    advance_to_pending_verification, harness_with_notifier, open_request, RecordingNotifier,
};

fn all_resolved_requesters(events: &[LifecycleEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            LifecycleEvent::AllResolved { requester } => Some(requester.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn all_resolved_fires_only_when_the_last_ticket_is_verified() {
    let notifier = Arc::new(RecordingNotifier::default());
    let h = harness_with_notifier(notifier.clone()).await;

    let first = advance_to_pending_verification(&h, "ops@depot.example", "fe-1").await;
    let second = advance_to_pending_verification(&h, "ops@depot.example", "fe-2").await;

    h.engine
        .attempt_transition(&first.id, &StaffAction::StaffVerify, &h.staff)
        .await
        .expect("verify first");
    assert!(
        all_resolved_requesters(&notifier.events()).is_empty(),
        "one ticket is still unresolved"
    );

    h.engine
        .attempt_transition(&second.id, &StaffAction::StaffVerify, &h.staff)
        .await
        .expect("verify second");
    assert_eq!(
        all_resolved_requesters(&notifier.events()),
        vec!["ops@depot.example"]
    );
}

#[tokio::test]
async fn other_requesters_do_not_hold_the_queue_open() {
    let notifier = Arc::new(RecordingNotifier::default());
    let h = harness_with_notifier(notifier.clone()).await;

    let mine = advance_to_pending_verification(&h, "ops@depot.example", "fe-1").await;
    // A separate requester's open ticket must not suppress the event.
    h.engine
        .open_ticket(open_request("elsewhere@depot.example", None))
        .await
        .expect("open");

    h.engine
        .attempt_transition(&mine.id, &StaffAction::StaffVerify, &h.staff)
        .await
        .expect("verify");
    assert_eq!(
        all_resolved_requesters(&notifier.events()),
        vec!["ops@depot.example"]
    );
}

#[tokio::test]
async fn transitions_emit_open_and_status_change_events() {
    let notifier = Arc::new(RecordingNotifier::default());
    let h = harness_with_notifier(notifier.clone()).await;

    let ticket = h
        .engine
        .open_ticket(open_request("ops@depot.example", None))
        .await
        .expect("open");
    h.engine
        .attempt_transition(
            &ticket.id,
            &StaffAction::Assign {
                fe_id: "fe-1".to_owned(),
                override_reason: None,
            },
            &h.staff,
        )
        .await
        .expect("assign");

    let events = notifier.events();
    assert!(matches!(
        &events[0],
        LifecycleEvent::TicketOpened { ticket_id, .. } if *ticket_id == ticket.id
    ));
    assert!(events.iter().any(|event| matches!(
        event,
        LifecycleEvent::StatusChanged { from, to, .. } if from == "open" && to == "assigned"
    )));
}
