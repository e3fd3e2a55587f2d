//! Ticket repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::models::ticket::{Ticket, TicketStatus};
use crate::{AppError, Result};

/// Repository wrapper around `SQLite` for ticket records.
#[derive(Clone)]
pub struct TicketRepo {
    db: Arc<SqlitePool>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct TicketRow {
    id: String,
    status: String,
    current_assignment_id: Option<String>,
    requester: String,
    subject: String,
    confidence: Option<f64>,
    version: i64,
    opened_at: String,
    updated_at: String,
}

impl TicketRow {
    /// Convert a database row into the domain model.
    fn into_ticket(self) -> Result<Ticket> {
        let status = parse_status(&self.status)?;
        let opened_at = parse_timestamp(&self.opened_at, "opened_at")?;
        let updated_at = parse_timestamp(&self.updated_at, "updated_at")?;

        Ok(Ticket {
            id: self.id,
            status,
            current_assignment_id: self.current_assignment_id,
            requester: self.requester,
            subject: self.subject,
            confidence: self.confidence,
            version: self.version,
            opened_at,
            updated_at,
        })
    }
}

fn parse_status(s: &str) -> Result<TicketStatus> {
    TicketStatus::parse(s).ok_or_else(|| AppError::Db(format!("invalid ticket status: {s}")))
}

pub(crate) fn parse_timestamp(s: &str, field: &str) -> Result<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Db(format!("invalid {field}: {e}")))
}

impl TicketRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a new ticket record inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, conn: &mut SqliteConnection, ticket: &Ticket) -> Result<()> {
        sqlx::query(
            "INSERT INTO ticket (id, status, current_assignment_id, requester, subject,
             confidence, version, opened_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&ticket.id)
        .bind(ticket.status.as_str())
        .bind(&ticket.current_assignment_id)
        .bind(&ticket.requester)
        .bind(&ticket.subject)
        .bind(ticket.confidence)
        .bind(ticket.version)
        .bind(ticket.opened_at.to_rfc3339())
        .bind(ticket.updated_at.to_rfc3339())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Retrieve a ticket by identifier.
    ///
    /// Returns `Ok(None)` if the ticket does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Ticket>> {
        fetch(self.db.as_ref(), id).await
    }

    /// Retrieve a ticket inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_in_tx(&self, conn: &mut SqliteConnection, id: &str) -> Result<Option<Ticket>> {
        fetch(&mut *conn, id).await
    }

    /// Apply a transition result with an optimistic version guard.
    ///
    /// Persists `status` and `current_assignment_id`, bumps `version` and
    /// `updated_at`, and succeeds only if no concurrent writer got there
    /// first. Returns `false` when the guard misses so the orchestrator
    /// can retry the whole attempt.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn update_guarded(
        &self,
        conn: &mut SqliteConnection,
        ticket: &Ticket,
        expected_version: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE ticket SET status = ?1, current_assignment_id = ?2, updated_at = ?3,
             version = version + 1
             WHERE id = ?4 AND version = ?5",
        )
        .bind(ticket.status.as_str())
        .bind(&ticket.current_assignment_id)
        .bind(ticket.updated_at.to_rfc3339())
        .bind(&ticket.id)
        .bind(expected_version)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Count a requester's tickets that are not yet resolved.
    ///
    /// Drives the "all resolved" notification check after verification.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_unresolved_for_requester(&self, requester: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM ticket WHERE requester = ?1 AND status != 'resolved'",
        )
        .bind(requester)
        .fetch_one(self.db.as_ref())
        .await?;

        Ok(count.0)
    }
}

async fn fetch<'e, E>(executor: E, id: &str) -> Result<Option<Ticket>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row: Option<TicketRow> = sqlx::query_as("SELECT * FROM ticket WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(TicketRow::into_ticket).transpose()
}
