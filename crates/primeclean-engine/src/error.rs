//! # Engine Error Types
//!
//! Every engine operation fails with an [`EngineError`] carrying one of five
//! stable kinds plus a human-readable message.
//!
//! ## Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Source                                  Kind                           │
//! │  ──────────────────────────────────────  ─────────────────              │
//! │  CoreError::{Service,Booking,...}NotFound NOT_FOUND                     │
//! │  DbError::NotFound                        NOT_FOUND                     │
//! │  CoreError::InvoiceAlreadyExists          CONFLICT                      │
//! │  CoreError::SlotUnavailable               CONFLICT                      │
//! │  DbError::UniqueViolation                 CONFLICT                      │
//! │  ValidationError, CHECK / FK violations   VALIDATION                    │
//! │  TransitionForbidden, Forbidden           FORBIDDEN                     │
//! │  Everything else (pool, I/O, config)      INTERNAL                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Store errors are never retried; they surface as `INTERNAL`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use primeclean_core::{CoreError, ValidationError};
use primeclean_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Stable error classification for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Conflict(_) => ErrorKind::Conflict,
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Forbidden(_) => ErrorKind::Forbidden,
            EngineError::Config(_) | EngineError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    /// The error body as JSON, for transports that speak JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.body()).unwrap_or_else(|_| {
            serde_json::json!({ "kind": self.kind().as_str(), "message": self.to_string() })
        })
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ServiceNotFound(id) => EngineError::not_found("Service", id),
            CoreError::BookingNotFound(id) => EngineError::not_found("Booking", id),
            CoreError::InvoiceNotFound(id) => EngineError::not_found("Invoice", id),
            CoreError::QuoteNotFound(id) => EngineError::not_found("Quote", id),
            err @ (CoreError::InvoiceAlreadyExists { .. } | CoreError::SlotUnavailable { .. }) => {
                EngineError::Conflict(err.to_string())
            }
            err @ (CoreError::TransitionForbidden { .. } | CoreError::Forbidden(_)) => {
                EngineError::Forbidden(err.to_string())
            }
            CoreError::Validation(v) => EngineError::Validation(v.to_string()),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            err @ DbError::UniqueViolation { .. } => EngineError::Conflict(err.to_string()),
            err @ (DbError::CheckViolation { .. } | DbError::ForeignKeyViolation { .. }) => {
                EngineError::Validation(err.to_string())
            }
            other => {
                error!(error = %other, "Store failure");
                EngineError::Internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_source() {
        let conflict: EngineError = CoreError::InvoiceAlreadyExists { booking_id: 3 }.into();
        assert_eq!(conflict.kind(), ErrorKind::Conflict);

        let missing: EngineError = DbError::not_found("Booking", 9).into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(missing.to_string(), "Booking not found: 9");

        let invalid: EngineError = ValidationError::required("address").into();
        assert_eq!(invalid.kind(), ErrorKind::Validation);

        let internal: EngineError = DbError::PoolExhausted.into();
        assert_eq!(internal.kind(), ErrorKind::Internal);
        assert_eq!(EngineError::Config("bad".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_body_serializes_kind_in_caps() {
        let err = EngineError::Forbidden("staff access required".into());
        let json = err.to_json();
        assert_eq!(json["kind"], "FORBIDDEN");
        assert_eq!(json["message"], "Forbidden: staff access required");
    }
}
