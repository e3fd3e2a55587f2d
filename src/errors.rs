//! Error types shared across the application.

use std::fmt::{Display, Formatter};

use crate::models::ticket::TicketStatus;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure modes for action-token redemption.
///
/// Surfaced to the technician UI as "link invalid or expired"; never
/// silently treated as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// No token exists with the supplied value.
    NotFound,
    /// The token was already redeemed once.
    AlreadyUsed,
    /// The token's wall-clock expiry has passed.
    Expired,
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "token not found"),
            Self::AlreadyUsed => write!(f, "token already used"),
            Self::Expired => write!(f, "token expired"),
        }
    }
}

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// The requested action is not legal from the ticket's current status.
    InvalidTransition {
        /// Status the ticket held when the action was attempted.
        from: TicketStatus,
        /// Name of the rejected action.
        action: &'static str,
    },
    /// Action-token lookup or redemption failure.
    Token(TokenError),
    /// Optimistic version check failed after exhausting retries.
    ConcurrentModification(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::InvalidTransition { from, action } => {
                write!(f, "invalid transition: {action} from {}", from.as_str())
            }
            Self::Token(err) => write!(f, "token: {err}"),
            Self::ConcurrentModification(msg) => {
                write!(f, "concurrent modification: {msg}")
            }
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // SQLITE_BUSY / SQLITE_LOCKED and their extended codes are lock
        // contention on a shared database file; the orchestrator retries
        // ConcurrentModification, so classify them as that rather than a
        // hard persistence failure.
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if matches!(code.as_ref(), "5" | "6" | "261" | "262" | "517") {
                    return Self::ConcurrentModification(db_err.message().to_owned());
                }
            }
        }
        Self::Db(err.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        Self::Token(err)
    }
}
