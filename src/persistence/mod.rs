//! Persistence layer modules.

pub mod assignment_repo;
pub mod db;
pub mod schema;
pub mod sla_repo;
pub mod ticket_repo;
pub mod token_repo;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
