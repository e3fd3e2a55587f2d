//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS`, safe to
//! re-run on every startup. Produces a convergent result.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// Creates all four tables idempotently. Safe to call on every startup.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS ticket (
    id                      TEXT PRIMARY KEY NOT NULL,
    status                  TEXT NOT NULL CHECK(status IN ('open','needs_review','assigned','en_route','on_site','resolved_pending_verification','resolved','reopened')),
    current_assignment_id   TEXT,
    requester               TEXT NOT NULL,
    subject                 TEXT NOT NULL,
    confidence              REAL,
    version                 INTEGER NOT NULL DEFAULT 0,
    opened_at               TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assignment (
    id              TEXT PRIMARY KEY NOT NULL,
    ticket_id       TEXT NOT NULL,
    fe_id           TEXT NOT NULL,
    assigned_at     TEXT NOT NULL,
    override_reason TEXT
);

CREATE TABLE IF NOT EXISTS sla_record (
    ticket_id               TEXT PRIMARY KEY NOT NULL,
    assignment_deadline     TEXT,
    assignment_satisfied_at TEXT,
    assignment_breached     INTEGER NOT NULL DEFAULT 0,
    onsite_deadline         TEXT,
    onsite_satisfied_at     TEXT,
    onsite_breached         INTEGER NOT NULL DEFAULT 0,
    resolution_deadline     TEXT,
    resolution_satisfied_at TEXT,
    resolution_breached     INTEGER NOT NULL DEFAULT 0,
    paused_at               TEXT
);

CREATE TABLE IF NOT EXISTS action_token (
    id          TEXT PRIMARY KEY NOT NULL,
    ticket_id   TEXT NOT NULL,
    fe_id       TEXT NOT NULL,
    action_type TEXT NOT NULL CHECK(action_type IN ('on_site','resolution')),
    expires_at  TEXT NOT NULL,
    used        INTEGER NOT NULL DEFAULT 0,
    used_at     TEXT,
    proof_url   TEXT,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ticket_requester ON ticket(requester);
CREATE INDEX IF NOT EXISTS idx_assignment_ticket ON assignment(ticket_id);
CREATE INDEX IF NOT EXISTS idx_token_ticket ON action_token(ticket_id);
CREATE INDEX IF NOT EXISTS idx_token_triple ON action_token(ticket_id, fe_id, action_type);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
