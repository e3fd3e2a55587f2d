//! SLA record model: three deadline phases plus pause bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-phase SLA state.
///
/// `satisfied_at` is the concrete representation of "freezing" a phase:
/// once the phase's target transition happens, the deadline stops
/// mattering and the phase evaluates as met (or stays breached).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlaPhase {
    /// Deadline timestamp; `None` until the phase starts.
    pub deadline: Option<DateTime<Utc>>,
    /// When the phase's target transition happened, if it has.
    pub satisfied_at: Option<DateTime<Utc>>,
    /// Monotonic breach flag; once set it never reverts.
    pub breached: bool,
}

impl SlaPhase {
    /// Whether the phase still has a live, unmet deadline.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.deadline.is_some() && self.satisfied_at.is_none() && !self.breached
    }
}

/// Display/evaluation status for one SLA phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Deadline not yet derived.
    NotStarted,
    /// Ample time remains, or the phase was met in time.
    OnTrack,
    /// Less than the configured at-risk window remains.
    AtRisk,
    /// The deadline passed while the clock was running.
    Breached,
    /// The ticket status suspends breach evaluation.
    Paused,
}

impl PhaseStatus {
    /// Stable string form for log fields and CLI output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::OnTrack => "on_track",
            Self::AtRisk => "at_risk",
            Self::Breached => "breached",
            Self::Paused => "paused",
        }
    }
}

/// Result of evaluating all three phases at a point in time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlaEvaluation {
    /// Assignment phase status.
    pub assignment: PhaseStatus,
    /// On-site phase status.
    pub onsite: PhaseStatus,
    /// Resolution phase status.
    pub resolution: PhaseStatus,
}

/// SLA state for one ticket, 1:1, created alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlaRecord {
    /// Owning ticket identifier.
    pub ticket_id: String,
    /// Time-to-assignment phase.
    pub assignment: SlaPhase,
    /// Time-to-arrival phase.
    pub onsite: SlaPhase,
    /// Time-to-resolution phase.
    pub resolution: SlaPhase,
    /// Set while the ticket holds a pausing status. Deadlines of running
    /// phases are pushed forward by the paused duration on resume, so
    /// only unpaused elapsed time counts toward breach.
    pub paused_at: Option<DateTime<Utc>>,
}
