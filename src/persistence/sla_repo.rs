//! SLA record repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::models::sla::{SlaPhase, SlaRecord};
use crate::Result;

use super::ticket_repo::parse_timestamp;

/// Repository wrapper around `SQLite` for SLA records.
#[derive(Clone)]
pub struct SlaRepo {
    db: Arc<SqlitePool>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct SlaRow {
    ticket_id: String,
    assignment_deadline: Option<String>,
    assignment_satisfied_at: Option<String>,
    assignment_breached: bool,
    onsite_deadline: Option<String>,
    onsite_satisfied_at: Option<String>,
    onsite_breached: bool,
    resolution_deadline: Option<String>,
    resolution_satisfied_at: Option<String>,
    resolution_breached: bool,
    paused_at: Option<String>,
}

fn parse_optional(s: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>> {
    s.map(|v| parse_timestamp(v, field)).transpose()
}

impl SlaRow {
    fn into_record(self) -> Result<SlaRecord> {
        Ok(SlaRecord {
            ticket_id: self.ticket_id,
            assignment: SlaPhase {
                deadline: parse_optional(self.assignment_deadline.as_deref(), "assignment_deadline")?,
                satisfied_at: parse_optional(
                    self.assignment_satisfied_at.as_deref(),
                    "assignment_satisfied_at",
                )?,
                breached: self.assignment_breached,
            },
            onsite: SlaPhase {
                deadline: parse_optional(self.onsite_deadline.as_deref(), "onsite_deadline")?,
                satisfied_at: parse_optional(
                    self.onsite_satisfied_at.as_deref(),
                    "onsite_satisfied_at",
                )?,
                breached: self.onsite_breached,
            },
            resolution: SlaPhase {
                deadline: parse_optional(self.resolution_deadline.as_deref(), "resolution_deadline")?,
                satisfied_at: parse_optional(
                    self.resolution_satisfied_at.as_deref(),
                    "resolution_satisfied_at",
                )?,
                breached: self.resolution_breached,
            },
            paused_at: parse_optional(self.paused_at.as_deref(), "paused_at")?,
        })
    }
}

fn rfc3339(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|dt| dt.to_rfc3339())
}

impl SlaRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a new SLA record inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, conn: &mut SqliteConnection, record: &SlaRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO sla_record (ticket_id,
             assignment_deadline, assignment_satisfied_at, assignment_breached,
             onsite_deadline, onsite_satisfied_at, onsite_breached,
             resolution_deadline, resolution_satisfied_at, resolution_breached,
             paused_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&record.ticket_id)
        .bind(rfc3339(record.assignment.deadline))
        .bind(rfc3339(record.assignment.satisfied_at))
        .bind(record.assignment.breached)
        .bind(rfc3339(record.onsite.deadline))
        .bind(rfc3339(record.onsite.satisfied_at))
        .bind(record.onsite.breached)
        .bind(rfc3339(record.resolution.deadline))
        .bind(rfc3339(record.resolution.satisfied_at))
        .bind(record.resolution.breached)
        .bind(rfc3339(record.paused_at))
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Retrieve the SLA record for a ticket.
    ///
    /// Returns `Ok(None)` if no record exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_for_ticket(&self, ticket_id: &str) -> Result<Option<SlaRecord>> {
        fetch(self.db.as_ref(), ticket_id).await
    }

    /// Retrieve the SLA record inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_in_tx(
        &self,
        conn: &mut SqliteConnection,
        ticket_id: &str,
    ) -> Result<Option<SlaRecord>> {
        fetch(&mut *conn, ticket_id).await
    }

    /// Persist the full SLA record state inside the caller's transaction.
    ///
    /// SLA mutations always ride alongside a version-guarded ticket
    /// update, which serializes them; breach flags are additionally
    /// monotonic so a lost standalone refresh race is benign.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn save(&self, conn: &mut SqliteConnection, record: &SlaRecord) -> Result<()> {
        sqlx::query(
            "UPDATE sla_record SET
             assignment_deadline = ?1, assignment_satisfied_at = ?2, assignment_breached = ?3,
             onsite_deadline = ?4, onsite_satisfied_at = ?5, onsite_breached = ?6,
             resolution_deadline = ?7, resolution_satisfied_at = ?8, resolution_breached = ?9,
             paused_at = ?10
             WHERE ticket_id = ?11",
        )
        .bind(rfc3339(record.assignment.deadline))
        .bind(rfc3339(record.assignment.satisfied_at))
        .bind(record.assignment.breached)
        .bind(rfc3339(record.onsite.deadline))
        .bind(rfc3339(record.onsite.satisfied_at))
        .bind(record.onsite.breached)
        .bind(rfc3339(record.resolution.deadline))
        .bind(rfc3339(record.resolution.satisfied_at))
        .bind(record.resolution.breached)
        .bind(rfc3339(record.paused_at))
        .bind(&record.ticket_id)
        .execute(conn)
        .await?;

        Ok(())
    }
}

async fn fetch<'e, E>(executor: E, ticket_id: &str) -> Result<Option<SlaRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row: Option<SlaRow> = sqlx::query_as("SELECT * FROM sla_record WHERE ticket_id = ?1")
        .bind(ticket_id)
        .fetch_optional(executor)
        .await?;

    row.map(SlaRow::into_record).transpose()
}
