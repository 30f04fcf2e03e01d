//! # Report Repository
//!
//! Read-only projections of bookings and invoices for the reporting
//! aggregator. Rows that cannot be decoded are logged and skipped so one
//! damaged record never blanks a whole report.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};
use tracing::warn;

use crate::error::DbResult;
use primeclean_core::calendar::REGISTERED_USER_LABEL;
use primeclean_core::report::{DateRange, ReportBooking, ReportInvoice};
use primeclean_core::{BookingStatus, InvoiceStatus, Money, PaymentMethod, ScheduledTime};

#[derive(Debug, FromRow)]
struct BookingLine {
    id: i64,
    service_name: String,
    scheduled_date: NaiveDate,
    scheduled_time: String,
    status: BookingStatus,
    total_price_cents: i64,
    square_meters: f64,
    address: String,
    special_instructions: Option<String>,
    customer_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct InvoiceLine {
    id: i64,
    invoice_number: String,
    service_name: String,
    service_date: NaiveDate,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    status: InvoiceStatus,
    created_at: DateTime<Utc>,
    payment_date: Option<NaiveDate>,
    payment_method: Option<PaymentMethod>,
    customer_name: String,
}

/// Decodes each row on its own, dropping the ones that fail.
fn decode_rows<T>(entity: &'static str, rows: Vec<SqliteRow>) -> Vec<T>
where
    T: for<'r> FromRow<'r, SqliteRow>,
{
    rows.iter()
        .filter_map(|row| match T::from_row(row) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(entity, error = %err, "Skipping undecodable report row");
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Visible bookings with a service date inside `range`.
    pub async fn bookings_in(&self, range: &DateRange) -> DbResult<Vec<ReportBooking>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, s.name AS service_name, b.scheduled_date, b.scheduled_time,
                   b.status, b.total_price_cents, b.square_meters, b.address,
                   b.special_instructions,
                   COALESCE(p.full_name, b.guest_name, ?3) AS customer_name,
                   b.created_at
            FROM bookings b
            JOIN services s ON s.id = b.service_id
            LEFT JOIN customer_profiles p ON p.user_id = b.user_id
            WHERE b.is_placeholder = 0
              AND b.scheduled_date >= ?1 AND b.scheduled_date <= ?2
            ORDER BY b.scheduled_date, b.scheduled_time, b.id
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .bind(REGISTERED_USER_LABEL)
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_rows::<BookingLine>("booking", rows)
            .into_iter()
            .map(|line| {
                let scheduled_time = ScheduledTime::parse(&line.scheduled_time).unwrap_or_else(|err| {
                    warn!(booking_id = line.id, error = %err, "Unreadable scheduled_time in report");
                    ScheduledTime::OPENING
                });
                ReportBooking {
                    id: line.id,
                    service_name: line.service_name,
                    scheduled_date: line.scheduled_date,
                    scheduled_time,
                    status: line.status,
                    total_price: Money::from_cents(line.total_price_cents),
                    square_meters: line.square_meters,
                    address: line.address,
                    special_instructions: line.special_instructions,
                    customer_name: line.customer_name,
                    created_at: line.created_at,
                }
            })
            .collect())
    }

    /// Invoices whose booking's service date falls inside `range`.
    pub async fn invoices_in(&self, range: &DateRange) -> DbResult<Vec<ReportInvoice>> {
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.invoice_number, s.name AS service_name,
                   b.scheduled_date AS service_date,
                   i.subtotal_cents, i.tax_cents, i.total_cents, i.status,
                   i.created_at, i.payment_date, i.payment_method, i.customer_name
            FROM invoices i
            JOIN bookings b ON b.id = i.booking_id
            JOIN services s ON s.id = b.service_id
            WHERE b.scheduled_date >= ?1 AND b.scheduled_date <= ?2
            ORDER BY b.scheduled_date, i.id
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_rows::<InvoiceLine>("invoice", rows)
            .into_iter()
            .map(|line| ReportInvoice {
                id: line.id,
                invoice_number: line.invoice_number,
                service_name: line.service_name,
                service_date: line.service_date,
                subtotal: Money::from_cents(line.subtotal_cents),
                tax_amount: Money::from_cents(line.tax_cents),
                total_amount: Money::from_cents(line.total_cents),
                status: line.status,
                created_at: line.created_at,
                payment_date: line.payment_date,
                payment_method: line.payment_method,
                customer_name: line.customer_name,
            })
            .collect())
    }
}
