//! # Error Types
//!
//! Domain-specific error types for primeclean-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  primeclean-core errors (this file)                                    │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  primeclean-db errors (separate crate)                                 │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  primeclean-engine errors                                              │
//! │  └── EngineError      - Stable kind + message for callers              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → Caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::BookingStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced service does not exist.
    #[error("Service not found: {0}")]
    ServiceNotFound(i64),

    /// Referenced booking does not exist.
    #[error("Booking not found: {0}")]
    BookingNotFound(i64),

    /// Referenced invoice does not exist.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(i64),

    /// Referenced quote does not exist.
    #[error("Quote not found: {0}")]
    QuoteNotFound(i64),

    /// The booking already carries an invoice.
    ///
    /// ## User Workflow
    /// ```text
    /// Staff clicks "Generate invoice" twice
    ///      │
    ///      ▼
    /// first call  → Invoice PP-2025-00042
    /// second call → InvoiceAlreadyExists { booking_id: 17 }
    /// ```
    #[error("Invoice already exists for booking {booking_id}")]
    InvoiceAlreadyExists { booking_id: i64 },

    /// Requested window overlaps an existing booking.
    #[error("Time {time} on {date} conflicts with booking {conflicting_booking}")]
    SlotUnavailable {
        date: NaiveDate,
        time: String,
        conflicting_booking: i64,
    },

    /// Caller is not allowed to move the booking to the requested status.
    #[error("Status change {from} -> {to} is not permitted: {reason}")]
    TransitionForbidden {
        from: BookingStatus,
        to: BookingStatus,
        reason: String,
    },

    /// Caller does not own the resource and is not staff.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a Forbidden error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden(reason.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any mutation reaches the store.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid date, invalid time).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub fn must_be_positive(field: &str) -> Self {
        ValidationError::MustBePositive {
            field: field.to_string(),
        }
    }

    pub fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvoiceAlreadyExists { booking_id: 17 };
        assert_eq!(err.to_string(), "Invoice already exists for booking 17");

        let err = CoreError::TransitionForbidden {
            from: BookingStatus::Pending,
            to: BookingStatus::Confirmed,
            reason: "customers may only cancel".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Status change pending -> confirmed is not permitted: customers may only cancel"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("address").to_string(),
            "address is required"
        );
        assert_eq!(
            ValidationError::must_be_positive("square_meters").to_string(),
            "square_meters must be positive"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("email").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
