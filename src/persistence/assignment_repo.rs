//! Assignment repository for `SQLite` persistence.

use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};

use crate::models::assignment::Assignment;
use crate::Result;

use super::ticket_repo::parse_timestamp;

/// Repository wrapper around `SQLite` for assignment records.
#[derive(Clone)]
pub struct AssignmentRepo {
    db: Arc<SqlitePool>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: String,
    ticket_id: String,
    fe_id: String,
    assigned_at: String,
    override_reason: Option<String>,
}

impl AssignmentRow {
    fn into_assignment(self) -> Result<Assignment> {
        let assigned_at = parse_timestamp(&self.assigned_at, "assigned_at")?;
        Ok(Assignment {
            id: self.id,
            ticket_id: self.ticket_id,
            fe_id: self.fe_id,
            assigned_at,
            override_reason: self.override_reason,
        })
    }
}

impl AssignmentRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a new assignment record inside the caller's transaction.
    ///
    /// Assignments are immutable; reassignment inserts a new row and the
    /// superseded one stays behind as history.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, conn: &mut SqliteConnection, assignment: &Assignment) -> Result<()> {
        sqlx::query(
            "INSERT INTO assignment (id, ticket_id, fe_id, assigned_at, override_reason)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&assignment.id)
        .bind(&assignment.ticket_id)
        .bind(&assignment.fe_id)
        .bind(assignment.assigned_at.to_rfc3339())
        .bind(&assignment.override_reason)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Retrieve an assignment by identifier.
    ///
    /// Returns `Ok(None)` if the assignment does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Assignment>> {
        let row: Option<AssignmentRow> = sqlx::query_as("SELECT * FROM assignment WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(AssignmentRow::into_assignment).transpose()
    }

    /// Retrieve an assignment inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_in_tx(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> Result<Option<Assignment>> {
        let row: Option<AssignmentRow> = sqlx::query_as("SELECT * FROM assignment WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        row.map(AssignmentRow::into_assignment).transpose()
    }

    /// List all assignments for a ticket, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_ticket(&self, ticket_id: &str) -> Result<Vec<Assignment>> {
        let rows: Vec<AssignmentRow> =
            sqlx::query_as("SELECT * FROM assignment WHERE ticket_id = ?1 ORDER BY assigned_at")
                .bind(ticket_id)
                .fetch_all(self.db.as_ref())
                .await?;

        rows.into_iter().map(AssignmentRow::into_assignment).collect()
    }
}
