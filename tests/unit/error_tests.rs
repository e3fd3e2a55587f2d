//! Unit tests for error display and conversions.

use fieldline::models::ticket::TicketStatus;
use fieldline::{AppError, TokenError};

#[test]
fn invalid_transition_names_status_and_action() {
    let err = AppError::InvalidTransition {
        from: TicketStatus::Open,
        action: "staff_verify",
    };
    assert_eq!(err.to_string(), "invalid transition: staff_verify from open");
}

#[test]
fn token_errors_render_human_readable() {
    assert_eq!(
        AppError::Token(TokenError::NotFound).to_string(),
        "token: token not found"
    );
    assert_eq!(
        AppError::Token(TokenError::AlreadyUsed).to_string(),
        "token: token already used"
    );
    assert_eq!(
        AppError::Token(TokenError::Expired).to_string(),
        "token: token expired"
    );
}

#[test]
fn token_error_converts_into_app_error() {
    let err: AppError = TokenError::AlreadyUsed.into();
    assert!(matches!(err, AppError::Token(TokenError::AlreadyUsed)));
}

#[test]
fn concurrent_modification_renders_prefixed() {
    let err = AppError::ConcurrentModification("ticket t1 changed".to_owned());
    assert_eq!(err.to_string(), "concurrent modification: ticket t1 changed");
}

#[test]
fn toml_parse_failures_map_to_config() {
    let parse_err = toml::from_str::<toml::Value>("= broken").expect_err("invalid toml");
    let err: AppError = parse_err.into();
    assert!(matches!(err, AppError::Config(_)));
}

/// Stand-in for a `SQLite` driver error with a fixed result code.
#[derive(Debug)]
struct StubDbError {
    message: &'static str,
    code: &'static str,
}

impl std::fmt::Display for StubDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StubDbError {}

impl sqlx::error::DatabaseError for StubDbError {
    fn message(&self) -> &str {
        self.message
    }

    fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
        Some(self.code.into())
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::Other
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }
}

#[test]
fn sqlite_busy_and_locked_classify_as_concurrent_modification() {
    for code in ["5", "6", "261", "262", "517"] {
        let err: AppError = sqlx::Error::Database(Box::new(StubDbError {
            message: "database is locked",
            code,
        }))
        .into();
        assert!(
            matches!(err, AppError::ConcurrentModification(_)),
            "code {code} must be retryable"
        );
    }
}

#[test]
fn other_database_errors_stay_hard_failures() {
    let err: AppError = sqlx::Error::Database(Box::new(StubDbError {
        message: "UNIQUE constraint failed: ticket.id",
        code: "1555",
    }))
    .into();
    assert!(matches!(err, AppError::Db(_)));
}
