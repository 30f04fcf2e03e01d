//! # Validation Module
//!
//! Input validation shared by every engine operation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request types (serde)                                        │
//! │  └── Shape and type of each field                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Positive area / price / quantity                                  │
//! │  ├── Required text, length limits, e-mail shape                        │
//! │  └── Runs before any write reaches the store                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (square_meters > 0), CHECK (total_price_cents > 0)          │
//! │  └── UNIQUE (invoices.booking_id), UNIQUE (invoice_number)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text field accepted (instructions, notes, terms).
pub const MAX_TEXT_LEN: usize = 2000;

/// Longest short field accepted (names, e-mails, addresses).
pub const MAX_SHORT_TEXT_LEN: usize = 255;

/// Largest area the business quotes for, in m².
pub const MAX_SQUARE_METERS: f64 = 100_000.0;

/// Largest single price accepted: $1,000,000.00.
pub const MAX_AMOUNT: Money = Money::from_cents(100_000_000);

/// Largest quantity on one invoice line.
pub const MAX_QUANTITY: f64 = 10_000.0;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required short field and returns it trimmed.
///
/// ## Example
/// ```rust
/// use primeclean_core::validation::validate_required;
///
/// assert_eq!(validate_required("address", "  12 Palm Ave ").unwrap(), "12 Palm Ave");
/// assert!(validate_required("address", "   ").is_err());
/// ```
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_SHORT_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_SHORT_TEXT_LEN,
        });
    }

    Ok(value.to_string())
}

/// Validates optional free text; blank input collapses to `None`.
pub fn validate_optional_text(field: &str, value: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    Ok(Some(value.to_string()))
}

/// Validates an e-mail address shape (`local@domain.tld`) and lowercases it.
///
/// ## Example
/// ```rust
/// use primeclean_core::validation::validate_email;
///
/// assert_eq!(validate_email("Ana@Example.com").unwrap(), "ana@example.com");
/// assert!(validate_email("ana.example.com").is_err());
/// ```
pub fn validate_email(value: &str) -> ValidationResult<String> {
    let email = validate_required("email", value)?.to_ascii_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::invalid_format(
            "email",
            "expected an address like name@example.com",
        ));
    }

    Ok(email)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a serviced area in square meters.
///
/// ## Rules
/// - Must be a finite number
/// - Must be strictly positive
/// - Must not exceed [`MAX_SQUARE_METERS`]
pub fn validate_square_meters(value: f64) -> ValidationResult<f64> {
    if !value.is_finite() {
        return Err(ValidationError::invalid_format(
            "square_meters",
            "must be a finite number",
        ));
    }

    if value <= 0.0 {
        return Err(ValidationError::must_be_positive("square_meters"));
    }

    if value > MAX_SQUARE_METERS {
        return Err(ValidationError::OutOfRange {
            field: "square_meters".to_string(),
            min: 0,
            max: MAX_SQUARE_METERS as i64,
        });
    }

    Ok(value)
}

/// Validates that a monetary amount is positive and at most [`MAX_AMOUNT`].
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<Money> {
    if !amount.is_positive() {
        return Err(ValidationError::must_be_positive(field));
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_AMOUNT.cents(),
        });
    }
    Ok(amount)
}

/// Validates an invoice item quantity (finite, > 0, at most [`MAX_QUANTITY`]).
pub fn validate_quantity(value: f64) -> ValidationResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    if value > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_QUANTITY as i64,
        });
    }
    Ok(value)
}

/// Validates payment terms in days (1..=365).
pub fn validate_net_days(days: i64) -> ValidationResult<i64> {
    if !(1..=365).contains(&days) {
        return Err(ValidationError::OutOfRange {
            field: "net_days".to_string(),
            min: 1,
            max: 365,
        });
    }
    Ok(days)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_limits() {
        assert_eq!(validate_required("name", " Ana ").unwrap(), "Ana");
        assert!(matches!(
            validate_required("name", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_required("name", &"x".repeat(300)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(validate_optional_text("notes", None).unwrap(), None);
        assert_eq!(validate_optional_text("notes", Some("  ")).unwrap(), None);
        assert_eq!(
            validate_optional_text("notes", Some(" pets on site ")).unwrap(),
            Some("pets on site".to_string())
        );
        assert!(validate_optional_text("notes", Some(&"a".repeat(2001))).is_err());
    }

    #[test]
    fn test_email_shapes() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("@b.co").is_err());
        assert!(validate_email("a@@b.co").is_err());
        assert!(validate_email("a@b.co.").is_err());
    }

    #[test]
    fn test_square_meters() {
        assert_eq!(validate_square_meters(75.5).unwrap(), 75.5);
        assert!(validate_square_meters(0.0).is_err());
        assert!(validate_square_meters(-3.0).is_err());
        assert!(validate_square_meters(f64::NAN).is_err());
        assert!(validate_square_meters(f64::INFINITY).is_err());
        assert!(validate_square_meters(200_000.0).is_err());
    }

    #[test]
    fn test_amount_and_quantity() {
        assert!(validate_positive_amount("total_price", Money::from_cents(1)).is_ok());
        assert!(validate_positive_amount("total_price", Money::zero()).is_err());
        assert!(validate_quantity(0.5).is_ok());
        assert!(validate_quantity(0.0).is_err());
    }

    #[test]
    fn test_amount_and_quantity_upper_bounds() {
        assert!(validate_positive_amount("unit_price", MAX_AMOUNT).is_ok());
        assert!(matches!(
            validate_positive_amount("unit_price", MAX_AMOUNT + Money::from_cents(1)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_positive_amount("unit_price", Money::from_cents(i64::MAX)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_quantity(MAX_QUANTITY).is_ok());
        assert!(matches!(
            validate_quantity(1e14),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_net_days() {
        assert!(validate_net_days(30).is_ok());
        assert!(validate_net_days(0).is_err());
        assert!(validate_net_days(400).is_err());
    }
}
