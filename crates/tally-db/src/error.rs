//! Errors raised by the ledger store.
//!
//! Constraint failures keep enough detail for the engine to tell a
//! duplicate invoice number apart from a reused redemption event, and lock
//! contention surfaces as [`DbError::Busy`] so units of work can retry it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `field` is the `table.column` SQLite names in its message, e.g.
    /// `transactions.invoice_number`.
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Negative stock, negative balance and the like.
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    /// Another connection held the write lock past the busy timeout.
    #[error("Database is busy")]
    Busy,

    #[error("Could not open ledger database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// BEGIN, COMMIT or ROLLBACK failed.
    #[error("Unit of work failed: {0}")]
    TransactionFailed(String),

    #[error("No pooled connection became free")]
    PoolExhausted,

    #[error("Unexpected database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when the error is a unique violation on `field` (`table.column`).
    pub fn is_unique_violation_on(&self, field: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field: f } if f == field)
    }

    /// True for lock contention worth retrying.
    pub fn is_busy(&self) -> bool {
        matches!(self, DbError::Busy)
    }
}

/// Sorts a driver-level failure by SQLite result code, falling back to the
/// message text for constraint kinds.
fn classify(db_err: &dyn sqlx::error::DatabaseError) -> DbError {
    let msg = db_err.message();

    // SQLITE_BUSY, SQLITE_LOCKED, SQLITE_BUSY_SNAPSHOT
    if matches!(db_err.code().as_deref(), Some("5" | "6" | "517"))
        || msg.contains("database is locked")
    {
        return DbError::Busy;
    }

    if db_err.is_unique_violation() || msg.contains("UNIQUE constraint failed") {
        return DbError::UniqueViolation {
            field: unique_field(msg),
        };
    }
    if db_err.is_foreign_key_violation() || msg.contains("FOREIGN KEY constraint failed") {
        return DbError::ForeignKeyViolation {
            message: msg.to_string(),
        };
    }
    if db_err.is_check_violation() || msg.contains("CHECK constraint failed") {
        return DbError::CheckViolation {
            message: msg.to_string(),
        };
    }
    DbError::QueryFailed(msg.to_string())
}

/// `UNIQUE constraint failed: transactions.invoice_number` → `transactions.invoice_number`
fn unique_field(msg: &str) -> String {
    msg.rsplit_once("failed: ")
        .map(|(_, field)| field.trim())
        .unwrap_or("unknown")
        .to_string()
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => classify(db_err.as_ref()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
