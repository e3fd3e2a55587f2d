//! Action token repository for `SQLite` persistence.
//!
//! Redemption is a single conditional UPDATE: `used = 0 AND expires_at >
//! now` checked and flipped in one statement, so two racing redemptions
//! can never both succeed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::models::token::{ActionToken, TokenAction};
use crate::{AppError, Result, TokenError};

use super::ticket_repo::parse_timestamp;

/// Repository wrapper around `SQLite` for action token records.
#[derive(Clone)]
pub struct TokenRepo {
    db: Arc<SqlitePool>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct TokenRow {
    id: String,
    ticket_id: String,
    fe_id: String,
    action_type: String,
    expires_at: String,
    used: bool,
    used_at: Option<String>,
    proof_url: Option<String>,
    created_at: String,
}

impl TokenRow {
    fn into_token(self) -> Result<ActionToken> {
        let action = TokenAction::parse(&self.action_type)
            .ok_or_else(|| AppError::Db(format!("invalid action_type: {}", self.action_type)))?;
        let expires_at = parse_timestamp(&self.expires_at, "expires_at")?;
        let used_at = self
            .used_at
            .as_deref()
            .map(|s| parse_timestamp(s, "used_at"))
            .transpose()?;
        let created_at = parse_timestamp(&self.created_at, "created_at")?;

        Ok(ActionToken {
            id: self.id,
            ticket_id: self.ticket_id,
            fe_id: self.fe_id,
            action,
            expires_at,
            used: self.used,
            used_at,
            proof_url: self.proof_url,
            created_at,
        })
    }
}

impl TokenRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a new token record inside the caller's transaction.
    ///
    /// The caller must have checked [`Self::find_active_in_tx`] first in
    /// the same transaction; together they enforce at most one live
    /// token per `(ticket, fe, action)` triple.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, conn: &mut SqliteConnection, token: &ActionToken) -> Result<()> {
        sqlx::query(
            "INSERT INTO action_token (id, ticket_id, fe_id, action_type, expires_at,
             used, used_at, proof_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&token.id)
        .bind(&token.ticket_id)
        .bind(&token.fe_id)
        .bind(token.action.as_str())
        .bind(token.expires_at.to_rfc3339())
        .bind(token.used)
        .bind(token.used_at.map(|dt| dt.to_rfc3339()))
        .bind(&token.proof_url)
        .bind(token.created_at.to_rfc3339())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Retrieve a token by value.
    ///
    /// Returns `Ok(None)` if no such token exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<ActionToken>> {
        fetch(self.db.as_ref(), id).await
    }

    /// Find the live (unused, unexpired) token for a triple, if any,
    /// inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn find_active_in_tx(
        &self,
        conn: &mut SqliteConnection,
        ticket_id: &str,
        fe_id: &str,
        action: TokenAction,
        now: DateTime<Utc>,
    ) -> Result<Option<ActionToken>> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT * FROM action_token
             WHERE ticket_id = ?1 AND fe_id = ?2 AND action_type = ?3
               AND used = 0 AND expires_at > ?4
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(ticket_id)
        .bind(fe_id)
        .bind(action.as_str())
        .bind(now.to_rfc3339())
        .fetch_optional(&mut *conn)
        .await?;

        row.map(TokenRow::into_token).transpose()
    }

    /// Redeem a token: atomically check unused-and-unexpired and flip to
    /// used, recording the redemption time and optional proof URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Token` with `NotFound`, `AlreadyUsed`, or
    /// `Expired` when the conditional update matches no row; `AppError::Db`
    /// on persistence failure.
    pub async fn redeem(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        now: DateTime<Utc>,
        proof_url: Option<&str>,
    ) -> Result<ActionToken> {
        let result = sqlx::query(
            "UPDATE action_token SET used = 1, used_at = ?2, proof_url = ?3
             WHERE id = ?1 AND used = 0 AND expires_at > ?2",
        )
        .bind(id)
        .bind(now.to_rfc3339())
        .bind(proof_url)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            // Classify the miss for the caller.
            let existing = fetch(&mut *conn, id).await?;
            let err = match existing {
                None => TokenError::NotFound,
                Some(token) if token.used => TokenError::AlreadyUsed,
                Some(_) => TokenError::Expired,
            };
            return Err(AppError::Token(err));
        }

        fetch(&mut *conn, id)
            .await?
            .ok_or_else(|| AppError::Db(format!("token {id} vanished during redemption")))
    }

    /// Look up the newest live token for a ticket, for UI display of
    /// "pending technician action".
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn lookup_active(
        &self,
        ticket_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ActionToken>> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT * FROM action_token
             WHERE ticket_id = ?1 AND used = 0 AND expires_at > ?2
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(ticket_id)
        .bind(now.to_rfc3339())
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(TokenRow::into_token).transpose()
    }
}

async fn fetch<'e, E>(executor: E, id: &str) -> Result<Option<ActionToken>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row: Option<TokenRow> = sqlx::query_as("SELECT * FROM action_token WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(TokenRow::into_token).transpose()
}
