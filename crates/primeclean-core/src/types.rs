//! # Domain Types
//!
//! Core domain types used throughout PrimeClean.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Service      │   │    Booking      │   │    Invoice      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  service_id     │◄──│  booking_id (1) │       │
//! │  │  base_price     │   │  owner          │   │  invoice_number │       │
//! │  │  duration       │   │  date + time    │   │  subtotal / tax │       │
//! │  │  service_type   │   │  status         │   │  items[]        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  BookingStatus  │   │ InvoiceStatus   │       │
//! │  │  bps (u32)      │   │  pending …      │   │ pending, paid,  │       │
//! │  │  700 = 7%       │   │  cancelled      │   │ overdue, …      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Invoices copy customer identity and billing address at creation time.
//! Later edits to a booking or a customer profile never alter issued invoices.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::schedule::{self, ScheduledTime};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so the Florida combined rate of 7% is 700 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Tax Mode
// =============================================================================

/// Whether a booking price already contains sales tax.
///
/// ```text
/// Exclusive: subtotal = price          tax = subtotal × r    total = subtotal + tax
/// Inclusive: total    = price          subtotal = total/(1+r) tax = total − subtotal
/// ```
///
/// Exactly one mode is configured per deployment and applied to every invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    /// Price + tax shown separately.
    Exclusive,
    /// Booking prices are quoted to customers tax included.
    #[default]
    Inclusive,
}

impl TaxMode {
    pub const ALL: [TaxMode; 2] = [TaxMode::Exclusive, TaxMode::Inclusive];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TaxMode::Exclusive => "exclusive",
            TaxMode::Inclusive => "inclusive",
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Residential or commercial service line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Residential,
    Commercial,
}

impl ServiceType {
    pub const ALL: [ServiceType; 2] = [ServiceType::Residential, ServiceType::Commercial];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Residential => "residential",
            ServiceType::Commercial => "commercial",
        }
    }
}

/// A cleaning service offered to customers.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Service {
    pub id: i64,

    /// Display name; also drives the duration fallback.
    pub name: String,

    pub description: Option<String>,

    /// Price for an area up to the 50 m² baseline.
    pub base_price: Money,

    /// Recorded duration, when staff entered one.
    pub duration_minutes: Option<u32>,

    pub service_type: ServiceType,

    /// Inactive services cannot be booked (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// Recorded duration, or the duration inferred from the service name.
    pub fn effective_duration_minutes(&self) -> u32 {
        self.duration_minutes
            .filter(|minutes| *minutes > 0)
            .unwrap_or_else(|| schedule::duration_for_service_name(&self.name))
    }
}

// =============================================================================
// Booking Status
// =============================================================================

/// The lifecycle status of a booking.
///
/// ```text
///   pending ──► confirmed ──► in_progress ──► completed
///      │            │
///      └────────────┴──────────► cancelled
///
///   Staff may move between any two states (corrections); customers may only
///   cancel. See `transitions` for the permission table.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled bookings are finished work.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Whether the booking still occupies its time window.
    pub const fn blocks_schedule(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    /// Hex color used by the staff calendar.
    pub const fn calendar_color(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "#FFA500",
            BookingStatus::Confirmed => "#4CAF50",
            BookingStatus::InProgress => "#2196F3",
            BookingStatus::Completed => "#8BC34A",
            BookingStatus::Cancelled => "#F44336",
        }
    }
}

// =============================================================================
// Booking Owner
// =============================================================================

/// Contact details embedded in a guest booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GuestContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Who a booking belongs to: exactly one of a registered user or a guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingOwner {
    Registered { user_id: i64 },
    Guest { contact: GuestContact },
}

impl BookingOwner {
    /// Builds the owner from the two nullable store columns.
    ///
    /// ## Errors
    /// Both or neither being present violates owner exclusivity.
    pub fn from_parts(
        user_id: Option<i64>,
        guest: Option<GuestContact>,
    ) -> Result<Self, ValidationError> {
        match (user_id, guest) {
            (Some(user_id), None) => Ok(BookingOwner::Registered { user_id }),
            (None, Some(contact)) => Ok(BookingOwner::Guest { contact }),
            (Some(_), Some(_)) => Err(ValidationError::invalid_format(
                "owner",
                "booking cannot have both a user and guest contact",
            )),
            (None, None) => Err(ValidationError::required("owner")),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            BookingOwner::Registered { user_id } => Some(*user_id),
            BookingOwner::Guest { .. } => None,
        }
    }

    pub fn guest(&self) -> Option<&GuestContact> {
        match self {
            BookingOwner::Registered { .. } => None,
            BookingOwner::Guest { contact } => Some(contact),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, BookingOwner::Guest { .. })
    }
}

// =============================================================================
// Billing Address
// =============================================================================

/// Optional billing fields captured on a booking or profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillingAddress {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

impl BillingAddress {
    /// True when no street address has been recorded.
    pub fn is_empty(&self) -> bool {
        self.address
            .as_deref()
            .map(|a| a.trim().is_empty())
            .unwrap_or(true)
    }
}

/// Fully resolved billing address frozen onto an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillingSnapshot {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

// =============================================================================
// Booking
// =============================================================================

/// A reservation of one service at one date and time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Booking {
    pub id: i64,
    pub owner: BookingOwner,
    pub service_id: i64,

    /// Service name at read time (joined, used for duration and display).
    pub service_name: String,

    #[ts(as = "String")]
    pub scheduled_date: NaiveDate,

    #[ts(as = "String")]
    pub scheduled_time: ScheduledTime,

    pub address: String,

    /// Serviced area in m², always > 0.
    pub square_meters: f64,

    pub special_instructions: Option<String>,

    /// Always > 0.
    pub total_price: Money,

    pub status: BookingStatus,
    pub invoice_id: Option<i64>,
    pub billing: BillingAddress,
    pub reschedule_reason: Option<String>,

    /// Synthesized to carry a custom invoice; never blocks the schedule.
    pub is_placeholder: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn user_id(&self) -> Option<i64> {
        self.owner.user_id()
    }

    /// Whether this booking occupies its window for availability purposes.
    pub fn blocks_schedule(&self) -> bool {
        !self.is_placeholder && self.status.blocks_schedule()
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    CreditCard,
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Check,
        PaymentMethod::CreditCard,
        PaymentMethod::BankTransfer,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Check => "check",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A tax invoice derived from exactly one booking.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: i64,
    pub booking_id: i64,

    /// `PP-{year}-{sequence}`, unique across all invoices.
    pub invoice_number: String,

    #[ts(as = "String")]
    pub issue_date: NaiveDate,
    #[ts(as = "String")]
    pub due_date: NaiveDate,

    /// Customer identity at issue time (frozen).
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,

    /// Billing address at issue time (frozen).
    pub billing: BillingSnapshot,

    /// Where the work was done (frozen).
    pub service_address: String,

    pub subtotal: Money,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub total_amount: Money,

    /// Convention used to derive subtotal and tax.
    pub tax_mode: TaxMode,

    pub status: InvoiceStatus,
    pub payment_method: Option<PaymentMethod>,
    #[ts(as = "Option<String>")]
    pub payment_date: Option<NaiveDate>,
    pub payment_reference: Option<String>,

    pub tax_exempt: bool,
    pub tax_exempt_reason: Option<String>,

    pub notes: Option<String>,
    pub terms: Option<String>,

    pub items: Vec<InvoiceItem>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// `total == subtotal + tax`, and exempt invoices carry no tax.
    pub fn totals_consistent(&self) -> bool {
        let sums = self.subtotal + self.tax_amount == self.total_amount;
        if self.tax_exempt {
            sums && self.tax_amount.is_zero()
        } else {
            sums
        }
    }
}

/// One billed line of an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub description: String,
    pub quantity: f64,
    pub unit_price: Money,
    /// `round(unit_price × quantity)`.
    pub total_price: Money,
    pub taxable: bool,
    pub position: i64,
}

// =============================================================================
// Quote
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Pending,
    Sent,
    Accepted,
    Rejected,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 4] = [
        QuoteStatus::Pending,
        QuoteStatus::Sent,
        QuoteStatus::Accepted,
        QuoteStatus::Rejected,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
        }
    }
}

/// A non-binding price estimate request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quote {
    pub id: i64,
    pub service_id: i64,
    pub service_name: String,
    pub square_meters: f64,
    pub address: String,
    pub special_requirements: Option<String>,
    #[ts(as = "Option<String>")]
    pub preferred_date: Option<NaiveDate>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub estimated_price: Money,
    pub status: QuoteStatus,
    pub admin_notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Customer Profile
// =============================================================================

/// Identity of a registered customer, used for invoice snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerProfile {
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub billing: BillingAddress,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// String Conversions
// =============================================================================
// Status values cross the store and API boundary as snake_case strings.

macro_rules! impl_text_enum {
    ($ty:ty, $field:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| ValidationError::NotAllowed {
                        field: $field.to_string(),
                        allowed: <$ty>::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    })
            }
        }
    };
}

impl_text_enum!(TaxMode, "tax_mode");
impl_text_enum!(ServiceType, "service_type");
impl_text_enum!(BookingStatus, "status");
impl_text_enum!(InvoiceStatus, "status");
impl_text_enum!(PaymentMethod, "payment_method");
impl_text_enum!(QuoteStatus, "status");

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(700);
        assert_eq!(rate.bps(), 700);
        assert!((rate.percentage() - 7.0).abs() < 0.001);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in_progress".parse::<BookingStatus>().unwrap(), BookingStatus::InProgress);
        assert_eq!(" Cancelled ".parse::<BookingStatus>().unwrap(), BookingStatus::Cancelled);
        assert!("done".parse::<BookingStatus>().is_err());
        assert_eq!("bank_transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankTransfer);
        assert_eq!("overdue".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Overdue);
        assert_eq!("exclusive".parse::<TaxMode>().unwrap(), TaxMode::Exclusive);
    }

    #[test]
    fn test_status_serde_matches_display() {
        for status in BookingStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_owner_exclusivity() {
        let guest = GuestContact {
            name: "Ana Lopez".to_string(),
            email: "ana@example.com".to_string(),
            phone: "555-0100".to_string(),
        };

        assert_eq!(
            BookingOwner::from_parts(Some(4), None).unwrap().user_id(),
            Some(4)
        );
        assert!(BookingOwner::from_parts(None, Some(guest.clone()))
            .unwrap()
            .is_guest());
        assert!(BookingOwner::from_parts(Some(4), Some(guest)).is_err());
        assert!(BookingOwner::from_parts(None, None).is_err());
    }

    #[test]
    fn test_owner_serializes_with_kind_tag() {
        let owner = BookingOwner::Registered { user_id: 9 };
        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json["kind"], "registered");
        assert_eq!(json["user_id"], 9);
    }

    #[test]
    fn test_cancelled_does_not_block_schedule() {
        assert!(BookingStatus::Pending.blocks_schedule());
        assert!(BookingStatus::Completed.blocks_schedule());
        assert!(!BookingStatus::Cancelled.blocks_schedule());
    }

    #[test]
    fn test_default_tax_mode_is_inclusive() {
        assert_eq!(TaxMode::default(), TaxMode::Inclusive);
    }
}
