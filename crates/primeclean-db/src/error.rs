//! # Store Errors
//!
//! `DbError` classifies what SQLite reported so the engine can tell a
//! caller's mistake from a broken store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "UNIQUE constraint failed"     → UniqueViolation   (engine: CONFLICT)  │
//! │  "CHECK constraint failed"      → CheckViolation    (engine: VALIDATION)│
//! │  "FOREIGN KEY constraint failed"→ ForeignKeyViolation                  │
//! │  no row                         → NotFound          (engine: NOT_FOUND) │
//! │  pool timeout, I/O, decode      → the rest          (engine: INTERNAL)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Raised for:
    /// - Second invoice for the same booking (`invoices.booking_id`)
    /// - Invoice number collision (`invoices.invoice_number`)
    /// - Duplicate service name
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Booking pointing at a missing service, item at a missing invoice.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (non-positive price, owner exclusivity, ...).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// A stored row could not be turned into a domain value.
    #[error("Corrupt {entity} row {id}: {reason}")]
    Decode {
        entity: String,
        id: String,
        reason: String,
    },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection freed up within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn decode(entity: impl Into<String>, id: impl ToString, reason: impl ToString) -> Self {
        DbError::Decode {
            entity: entity.into(),
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for a unique violation on `column` (e.g. `"booking_id"`).
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        match self {
            DbError::UniqueViolation { field, .. } => field
                .split(',')
                .map(str::trim)
                .any(|f| f == column || f.ends_with(&format!(".{column}"))),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: <table>.<column>"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
