//! # Reporting Aggregator
//!
//! Folds bookings and invoices for a date range into totals, collection rate
//! and per-service / per-client breakdowns.
//!
//! ## Aggregation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Store (read-only)                                                      │
//! │  ├── bookings  WHERE scheduled_date ∈ [start, end], no placeholders     │
//! │  └── invoices  JOIN bookings ON service date ∈ [start, end]             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ClientFilter ── case-insensitive substring on customer name           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  aggregate()                                                           │
//! │  ├── booking revenue    (completed only)                               │
//! │  ├── invoiced / paid / pending / overdue                               │
//! │  ├── collection rate    paid ÷ invoiced                                │
//! │  └── per service, per client                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::schedule::ScheduledTime;
use crate::types::{BookingStatus, InvoiceStatus, PaymentMethod};

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        let range = DateRange { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.end < self.start {
            return Err(
                ValidationError::invalid_format("end_date", "must not precede start_date").into(),
            );
        }
        Ok(())
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// =============================================================================
// Report Rows
// =============================================================================

/// One booking as seen by the report.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportBooking {
    pub id: i64,
    pub service_name: String,
    #[ts(as = "String")]
    pub scheduled_date: NaiveDate,
    #[ts(as = "String")]
    pub scheduled_time: ScheduledTime,
    pub status: BookingStatus,
    pub total_price: Money,
    pub square_meters: f64,
    pub address: String,
    pub special_instructions: Option<String>,
    pub customer_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One invoice as seen by the report.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportInvoice {
    pub id: i64,
    pub invoice_number: String,
    pub service_name: String,
    #[ts(as = "String")]
    pub service_date: NaiveDate,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub payment_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub customer_name: String,
}

// =============================================================================
// Client Filter
// =============================================================================

/// Case-insensitive substring match on customer name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFilter {
    needle: Option<String>,
}

impl ClientFilter {
    /// A blank or missing filter matches everyone.
    pub fn new(client: Option<&str>) -> Self {
        let needle = client
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase);
        ClientFilter { needle }
    }

    pub fn matches(&self, customer_name: &str) -> bool {
        match &self.needle {
            Some(needle) => customer_name.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.needle.as_deref()
    }
}

// =============================================================================
// Analytics
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServiceStats {
    /// Every booking, cancelled included.
    pub count: u32,
    /// Non-cancelled bookings only.
    pub revenue: Money,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientStats {
    pub bookings: u32,
    pub revenue: Money,
    #[ts(as = "Option<String>")]
    pub last_service: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Analytics {
    pub total_bookings: u32,
    pub total_invoices: u32,

    /// Sum of completed booking prices.
    pub total_revenue: Money,

    pub total_invoiced: Money,
    pub total_paid: Money,
    pub total_pending: Money,
    pub total_overdue: Money,

    /// `paid / invoiced` as a ratio in `[0, 1]`; zero with nothing invoiced.
    pub collection_rate: f64,

    /// Tax on paid invoices.
    pub total_tax: Money,

    /// Mean total of paid invoices.
    pub average_invoice: Money,

    pub services: BTreeMap<String, ServiceStats>,
    pub clients: BTreeMap<String, ClientStats>,
}

/// Echo of the inputs that produced a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportFilters {
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub client: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Report {
    pub bookings: Vec<ReportBooking>,
    pub invoices: Vec<ReportInvoice>,
    pub analytics: Analytics,
    pub filters: ReportFilters,
}

/// Applies the client filter and folds the rows into a [`Report`].
pub fn aggregate(
    range: DateRange,
    client: Option<&str>,
    bookings: Vec<ReportBooking>,
    invoices: Vec<ReportInvoice>,
) -> Report {
    let filter = ClientFilter::new(client);

    let bookings: Vec<ReportBooking> = bookings
        .into_iter()
        .filter(|b| range.contains(b.scheduled_date) && filter.matches(&b.customer_name))
        .collect();
    let invoices: Vec<ReportInvoice> = invoices
        .into_iter()
        .filter(|i| range.contains(i.service_date) && filter.matches(&i.customer_name))
        .collect();

    let mut analytics = Analytics {
        total_bookings: bookings.len() as u32,
        total_invoices: invoices.len() as u32,
        ..Analytics::default()
    };

    for booking in &bookings {
        if booking.status == BookingStatus::Completed {
            analytics.total_revenue += booking.total_price;
        }

        let earned = if booking.status == BookingStatus::Cancelled {
            Money::zero()
        } else {
            booking.total_price
        };

        let service = analytics
            .services
            .entry(booking.service_name.clone())
            .or_default();
        service.count += 1;
        service.revenue += earned;

        let client = analytics
            .clients
            .entry(booking.customer_name.clone())
            .or_default();
        client.bookings += 1;
        client.revenue += earned;
        client.last_service = client.last_service.max(Some(booking.scheduled_date));
    }

    let mut paid_count = 0usize;
    for invoice in &invoices {
        analytics.total_invoiced += invoice.total_amount;
        match invoice.status {
            InvoiceStatus::Paid => {
                analytics.total_paid += invoice.total_amount;
                analytics.total_tax += invoice.tax_amount;
                paid_count += 1;
            }
            InvoiceStatus::Pending => analytics.total_pending += invoice.total_amount,
            InvoiceStatus::Overdue => analytics.total_overdue += invoice.total_amount,
            InvoiceStatus::Cancelled => {}
        }
    }

    if analytics.total_invoiced.is_positive() {
        analytics.collection_rate =
            analytics.total_paid.cents() as f64 / analytics.total_invoiced.cents() as f64;
    }
    analytics.average_invoice = Money::average(analytics.total_paid, paid_count);

    Report {
        bookings,
        invoices,
        analytics,
        filters: ReportFilters {
            start_date: range.start,
            end_date: range.end,
            client: client.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn booking(id: i64, day: u32, cents: i64, status: BookingStatus, client: &str) -> ReportBooking {
        ReportBooking {
            id,
            service_name: "Basic House Cleaning".to_string(),
            scheduled_date: date(day),
            scheduled_time: ScheduledTime::OPENING,
            status,
            total_price: Money::from_cents(cents),
            square_meters: 80.0,
            address: "12 Palm Ave".to_string(),
            special_instructions: None,
            customer_name: client.to_string(),
            created_at: Utc::now(),
        }
    }

    fn invoice(id: i64, day: u32, cents: i64, tax: i64, status: InvoiceStatus, client: &str) -> ReportInvoice {
        ReportInvoice {
            id,
            invoice_number: format!("PP-2025-{id:05}"),
            service_name: "Basic House Cleaning".to_string(),
            service_date: date(day),
            subtotal: Money::from_cents(cents - tax),
            tax_amount: Money::from_cents(tax),
            total_amount: Money::from_cents(cents),
            status,
            created_at: Utc::now(),
            payment_date: None,
            payment_method: None,
            customer_name: client.to_string(),
        }
    }

    fn june() -> DateRange {
        DateRange::new(date(1), date(30)).unwrap()
    }

    #[test]
    fn test_range_validation() {
        assert!(DateRange::new(date(2), date(1)).is_err());
        let single = DateRange::new(date(5), date(5)).unwrap();
        assert!(single.contains(date(5)));
        assert!(!single.contains(date(6)));
    }

    #[test]
    fn test_empty_report() {
        let report = aggregate(june(), None, vec![], vec![]);
        assert_eq!(report.analytics.total_bookings, 0);
        assert_eq!(report.analytics.collection_rate, 0.0);
        assert!(report.analytics.average_invoice.is_zero());
    }

    #[test]
    fn test_totals() {
        let bookings = vec![
            booking(1, 2, 10_000, BookingStatus::Completed, "Ana Lopez"),
            booking(2, 3, 20_000, BookingStatus::Pending, "Ana Lopez"),
            booking(3, 4, 5_000, BookingStatus::Cancelled, "Ben Ortiz"),
        ];
        let invoices = vec![
            invoice(1, 2, 10_700, 700, InvoiceStatus::Paid, "Ana Lopez"),
            invoice(2, 3, 21_400, 1_400, InvoiceStatus::Pending, "Ana Lopez"),
            invoice(3, 4, 5_350, 350, InvoiceStatus::Overdue, "Ben Ortiz"),
        ];

        let a = aggregate(june(), None, bookings, invoices).analytics;
        assert_eq!(a.total_bookings, 3);
        assert_eq!(a.total_revenue.cents(), 10_000);
        assert_eq!(a.total_invoiced.cents(), 37_450);
        assert_eq!(a.total_paid.cents(), 10_700);
        assert_eq!(a.total_pending.cents(), 21_400);
        assert_eq!(a.total_overdue.cents(), 5_350);
        assert_eq!(a.total_tax.cents(), 700);
        assert_eq!(a.average_invoice.cents(), 10_700);
        assert!((a.collection_rate - 10_700.0 / 37_450.0).abs() < 1e-9);

        let service = a.services["Basic House Cleaning"];
        assert_eq!(service.count, 3);
        assert_eq!(service.revenue.cents(), 30_000);

        let ana = a.clients["Ana Lopez"];
        assert_eq!(ana.bookings, 2);
        assert_eq!(ana.last_service, Some(date(3)));
        assert!(a.clients["Ben Ortiz"].revenue.is_zero());
    }

    #[test]
    fn test_client_filter() {
        let bookings = vec![
            booking(1, 2, 10_000, BookingStatus::Completed, "Ana Lopez"),
            booking(2, 3, 20_000, BookingStatus::Completed, "Ben Ortiz"),
        ];
        let report = aggregate(june(), Some("  LOPEZ "), bookings, vec![]);
        assert_eq!(report.bookings.len(), 1);
        assert_eq!(report.bookings[0].customer_name, "Ana Lopez");
        assert_eq!(report.filters.client.as_deref(), Some("LOPEZ"));
    }

    #[test]
    fn test_out_of_range_rows_dropped() {
        let range = DateRange::new(date(10), date(20)).unwrap();
        let bookings = vec![
            booking(1, 9, 10_000, BookingStatus::Completed, "Ana"),
            booking(2, 10, 10_000, BookingStatus::Completed, "Ana"),
            booking(3, 20, 10_000, BookingStatus::Completed, "Ana"),
            booking(4, 21, 10_000, BookingStatus::Completed, "Ana"),
        ];
        let report = aggregate(range, None, bookings, vec![]);
        let ids: Vec<i64> = report.bookings.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
