//! Pure SLA derivation, pause/resume, and breach evaluation.
//!
//! The observable guarantee: total unpaused elapsed time, not wall-clock
//! time, determines breach. Pausing stamps `paused_at`; resuming pushes
//! every running deadline forward by the paused duration, after which
//! evaluation is a plain deadline comparison.

use chrono::{DateTime, Duration, Utc};

use crate::config::SlaConfig;
use crate::models::sla::{PhaseStatus, SlaEvaluation, SlaPhase, SlaRecord};
use crate::models::ticket::TicketStatus;

fn hours(h: u32) -> Duration {
    Duration::hours(i64::from(h))
}

/// Create the SLA record for a freshly opened ticket.
///
/// Only the assignment phase starts; its deadline counts from
/// `opened_at`. If the ticket opens directly into a pausing status the
/// caller stamps `paused_at` via [`on_transition`]-equivalent logic in
/// the orchestrator.
#[must_use]
pub fn start(ticket_id: String, opened_at: DateTime<Utc>, config: &SlaConfig) -> SlaRecord {
    SlaRecord {
        ticket_id,
        assignment: SlaPhase {
            deadline: Some(opened_at + hours(config.assignment_hours)),
            satisfied_at: None,
            breached: false,
        },
        onsite: SlaPhase::default(),
        resolution: SlaPhase::default(),
        paused_at: None,
    }
}

/// Mark a phase breached if its deadline passed, then satisfy it.
///
/// "Freeze" from the product rules: a satisfied phase never changes
/// again, whether it was met in time or already over the line.
fn satisfy_phase(phase: &mut SlaPhase, now: DateTime<Utc>) {
    if let Some(deadline) = phase.deadline {
        if phase.satisfied_at.is_none() {
            if !phase.breached && now > deadline {
                phase.breached = true;
            }
            phase.satisfied_at = Some(now);
        }
    }
}

fn shift_running_deadlines(record: &mut SlaRecord, by: Duration) {
    for phase in [
        &mut record.assignment,
        &mut record.onsite,
        &mut record.resolution,
    ] {
        if phase.is_running() {
            if let Some(deadline) = phase.deadline {
                phase.deadline = Some(deadline + by);
            }
        }
    }
}

/// Update the SLA record for a status transition.
///
/// Handles pause/resume bookkeeping first, then the phase hooks:
/// assignment satisfied and on-site clock started on entry to
/// `assigned`; on-site satisfied and resolution clock started on first
/// arrival; resolution frozen as-is on entry to `resolved`. A
/// reassignment after reopening restarts the on-site and resolution
/// cycles without touching already-set breach flags.
pub fn on_transition(
    record: &mut SlaRecord,
    from: TicketStatus,
    to: TicketStatus,
    now: DateTime<Utc>,
    config: &SlaConfig,
) {
    if from.pauses_sla() && !to.pauses_sla() {
        if let Some(paused_at) = record.paused_at.take() {
            let paused_for = now - paused_at;
            if paused_for > Duration::zero() {
                shift_running_deadlines(record, paused_for);
            }
        }
    } else if !from.pauses_sla() && to.pauses_sla() && record.paused_at.is_none() {
        record.paused_at = Some(now);
    }

    match to {
        TicketStatus::Assigned => {
            satisfy_phase(&mut record.assignment, now);
            if from == TicketStatus::Reopened {
                // New field visit: fresh on-site cycle, resolution clock
                // restarts on the next arrival. Breach flags stay set.
                record.onsite.satisfied_at = None;
                record.resolution.deadline = None;
                record.resolution.satisfied_at = None;
            }
            record.onsite.deadline = Some(now + hours(config.onsite_hours));
        }
        TicketStatus::OnSite if record.onsite.satisfied_at.is_none() => {
            satisfy_phase(&mut record.onsite, now);
            record.resolution.deadline = Some(now + hours(config.resolution_hours));
        }
        TicketStatus::Resolved => {
            satisfy_phase(&mut record.resolution, now);
        }
        _ => {}
    }
}

/// Persist-side breach sweep: flip `breached` on any phase whose deadline
/// passed while running. Monotonic; returns whether anything changed.
///
/// Suspended entirely while the ticket is paused or resolved; that is
/// the difference between "breach evaluation is suspended" and "breach
/// is merely hidden".
pub fn refresh_breaches(record: &mut SlaRecord, status: TicketStatus, now: DateTime<Utc>) -> bool {
    if status == TicketStatus::Resolved || status.pauses_sla() || record.paused_at.is_some() {
        return false;
    }

    let mut changed = false;
    for phase in [
        &mut record.assignment,
        &mut record.onsite,
        &mut record.resolution,
    ] {
        if phase.is_running() {
            if let Some(deadline) = phase.deadline {
                if now > deadline {
                    phase.breached = true;
                    changed = true;
                }
            }
        }
    }
    changed
}

fn evaluate_phase(
    phase: &SlaPhase,
    paused: bool,
    now: DateTime<Utc>,
    at_risk_window: Duration,
) -> PhaseStatus {
    if phase.breached {
        return PhaseStatus::Breached;
    }
    let Some(deadline) = phase.deadline else {
        return PhaseStatus::NotStarted;
    };
    if phase.satisfied_at.is_some() {
        return PhaseStatus::OnTrack;
    }
    if paused {
        return PhaseStatus::Paused;
    }
    if now > deadline {
        return PhaseStatus::Breached;
    }
    if deadline - now <= at_risk_window {
        return PhaseStatus::AtRisk;
    }
    PhaseStatus::OnTrack
}

/// Evaluate all three phases at `now`. Pure; safe to call anytime.
#[must_use]
pub fn evaluate(
    record: &SlaRecord,
    status: TicketStatus,
    now: DateTime<Utc>,
    config: &SlaConfig,
) -> SlaEvaluation {
    let paused = status.pauses_sla() || record.paused_at.is_some();
    let window = hours(config.at_risk_window_hours);

    SlaEvaluation {
        assignment: evaluate_phase(&record.assignment, paused, now, window),
        onsite: evaluate_phase(&record.onsite, paused, now, window),
        resolution: evaluate_phase(&record.resolution, paused, now, window),
    }
}
