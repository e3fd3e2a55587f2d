//! Audit trail through the engine: a JSONL sink attached via
//! `with_audit` receives entries for each lifecycle event.

use std::fs;
use std::sync::Arc;

use fieldline::audit::JsonlAuditWriter;
use fieldline::orchestrator::StaffAction;

use super::test_helpers::{harness, open_request, Harness};

async fn harness_with_audit(dir: &std::path::Path) -> Harness {
    let mut h = harness().await;
    let writer = JsonlAuditWriter::new(dir.to_path_buf()).expect("writer");
    h.engine = h.engine.with_audit(Arc::new(writer));
    h
}

fn read_entries(dir: &std::path::Path) -> Vec<serde_json::Value> {
    let mut entries = Vec::new();
    for file in fs::read_dir(dir).expect("read dir").filter_map(Result::ok) {
        let content = fs::read_to_string(file.path()).expect("read");
        for line in content.lines() {
            entries.push(serde_json::from_str(line).expect("json"));
        }
    }
    entries
}

#[tokio::test]
async fn assignment_writes_its_own_entry_alongside_the_transition() {
    let dir = tempfile::tempdir().expect("tempdir");
    let h = harness_with_audit(dir.path()).await;

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

    let entries = read_entries(dir.path());

    let created: Vec<&serde_json::Value> = entries
        .iter()
        .filter(|entry| entry["event_type"] == "assignment_created")
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["ticket_id"], ticket.id.as_str());
    assert_eq!(created[0]["fe_id"], "fe-1");
    assert_eq!(created[0]["actor_id"], "staff-1");

    let transition = entries
        .iter()
        .find(|entry| entry["event_type"] == "transition")
        .expect("transition entry");
    assert_eq!(transition["from_status"], "open");
    assert_eq!(transition["to_status"], "assigned");
    assert_eq!(transition["fe_id"], "fe-1");

    assert!(entries
        .iter()
        .any(|entry| entry["event_type"] == "ticket_opened"));
}

#[tokio::test]
async fn non_assignment_transitions_write_no_assignment_entry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let h = harness_with_audit(dir.path()).await;

    let ticket = h
        .engine
        .open_ticket(open_request("ops@depot.example", Some(0.2)))
        .await
        .expect("open");
    h.engine
        .attempt_transition(&ticket.id, &StaffAction::Approve, &h.staff)
        .await
        .expect("approve");

    let entries = read_entries(dir.path());
    assert!(entries
        .iter()
        .all(|entry| entry["event_type"] != "assignment_created"));
}
