//! # Invoice Repository
//!
//! Database operations for invoices, their line items and the per-year
//! invoice number sequence.
//!
//! ## Issuance Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. next_sequence(year)     UPSERT … RETURNING  ← takes the write lock │
//! │   2. number_taken(number)?   skip numbers already used                  │
//! │   3. invoice_for_booking()   already invoiced → conflict                │
//! │   4. insert(invoice + items)                                            │
//! │   5. link booking → invoice                                             │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  UNIQUE(invoices.booking_id) turns a lost race into UniqueViolation.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteExecutor;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::BEGIN_WRITE;
use primeclean_core::invoicing::{CustomerSnapshot, DerivedLine, InvoiceTotals};
use primeclean_core::{
    BillingSnapshot, Invoice, InvoiceItem, InvoiceStatus, Money, PaymentMethod, TaxMode, TaxRate,
};

const INVOICE_COLUMNS: &str = r#"
    id, booking_id, invoice_number, issue_date, due_date,
    customer_name, customer_email, customer_phone,
    billing_address, billing_city, billing_state, billing_zip, billing_country,
    service_address, subtotal_cents, tax_rate_bps, tax_cents, total_cents, tax_mode,
    status, payment_method, payment_date, payment_reference,
    tax_exempt, tax_exempt_reason, notes, terms, created_at, updated_at
"#;

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: i64,
    booking_id: i64,
    invoice_number: String,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    billing_address: String,
    billing_city: String,
    billing_state: String,
    billing_zip: String,
    billing_country: String,
    service_address: String,
    subtotal_cents: i64,
    tax_rate_bps: i64,
    tax_cents: i64,
    total_cents: i64,
    tax_mode: TaxMode,
    status: InvoiceStatus,
    payment_method: Option<PaymentMethod>,
    payment_date: Option<NaiveDate>,
    payment_reference: Option<String>,
    tax_exempt: bool,
    tax_exempt_reason: Option<String>,
    notes: Option<String>,
    terms: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<InvoiceItem>) -> DbResult<Invoice> {
        let bps = u32::try_from(self.tax_rate_bps)
            .map_err(|_| DbError::decode("Invoice", self.id, "negative tax rate"))?;

        Ok(Invoice {
            id: self.id,
            booking_id: self.booking_id,
            invoice_number: self.invoice_number,
            issue_date: self.issue_date,
            due_date: self.due_date,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            billing: BillingSnapshot {
                address: self.billing_address,
                city: self.billing_city,
                state: self.billing_state,
                zip: self.billing_zip,
                country: self.billing_country,
            },
            service_address: self.service_address,
            subtotal: Money::from_cents(self.subtotal_cents),
            tax_rate: TaxRate::from_bps(bps),
            tax_amount: Money::from_cents(self.tax_cents),
            total_amount: Money::from_cents(self.total_cents),
            tax_mode: self.tax_mode,
            status: self.status,
            payment_method: self.payment_method,
            payment_date: self.payment_date,
            payment_reference: self.payment_reference,
            tax_exempt: self.tax_exempt,
            tax_exempt_reason: self.tax_exempt_reason,
            notes: self.notes,
            terms: self.terms,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct InvoiceItemRow {
    id: i64,
    invoice_id: i64,
    description: String,
    quantity: f64,
    unit_price_cents: i64,
    total_price_cents: i64,
    taxable: bool,
    position: i64,
}

impl From<InvoiceItemRow> for InvoiceItem {
    fn from(row: InvoiceItemRow) -> Self {
        InvoiceItem {
            id: row.id,
            invoice_id: row.invoice_id,
            description: row.description,
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price_cents),
            total_price: Money::from_cents(row.total_price_cents),
            taxable: row.taxable,
            position: row.position,
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// A fully derived invoice ready to insert.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub booking_id: i64,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub customer: CustomerSnapshot,
    pub billing: BillingSnapshot,
    pub service_address: String,
    pub totals: InvoiceTotals,
    pub tax_mode: TaxMode,
    pub tax_exempt: bool,
    pub tax_exempt_reason: Option<String>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub lines: Vec<DerivedLine>,
}

/// Sparse invoice update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct InvoiceChanges {
    pub status: Option<InvoiceStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_date: Option<NaiveDate>,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
    pub tax_exempt_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for InvoiceFilter {
    fn default() -> Self {
        InvoiceFilter {
            status: None,
            limit: 50,
            offset: 0,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Issuance helpers (run inside the caller's transaction)
    // -------------------------------------------------------------------------

    /// Increments and returns the sequence for `year` in one statement.
    pub async fn next_sequence<'e>(exec: impl SqliteExecutor<'e>, year: i32) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_sequences (year, last_value) VALUES (?1, 1)
            ON CONFLICT (year) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(exec)
        .await?;

        Ok(value)
    }

    pub async fn number_taken<'e>(exec: impl SqliteExecutor<'e>, number: &str) -> DbResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM invoices WHERE invoice_number = ?1)",
        )
        .bind(number)
        .fetch_one(exec)
        .await?;

        Ok(taken)
    }

    /// ID of the invoice already issued for a booking, if any.
    pub async fn invoice_for_booking<'e>(
        exec: impl SqliteExecutor<'e>,
        booking_id: i64,
    ) -> DbResult<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM invoices WHERE booking_id = ?1")
            .bind(booking_id)
            .fetch_optional(exec)
            .await?;

        Ok(id)
    }

    /// Inserts the invoice and its items, returning the invoice ID.
    pub async fn insert(conn: &mut SqliteConnection, invoice: &NewInvoice) -> DbResult<i64> {
        debug!(
            booking_id = invoice.booking_id,
            number = %invoice.invoice_number,
            total = %invoice.totals.total_amount,
            "Inserting invoice"
        );
        let now = Utc::now();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (
                booking_id, invoice_number, issue_date, due_date,
                customer_name, customer_email, customer_phone,
                billing_address, billing_city, billing_state, billing_zip, billing_country,
                service_address, subtotal_cents, tax_rate_bps, tax_cents, total_cents, tax_mode,
                status, tax_exempt, tax_exempt_reason, notes, terms,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18,
                'pending', ?19, ?20, ?21, ?22,
                ?23, ?23
            )
            RETURNING id
            "#,
        )
        .bind(invoice.booking_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(&invoice.customer.name)
        .bind(&invoice.customer.email)
        .bind(&invoice.customer.phone)
        .bind(&invoice.billing.address)
        .bind(&invoice.billing.city)
        .bind(&invoice.billing.state)
        .bind(&invoice.billing.zip)
        .bind(&invoice.billing.country)
        .bind(&invoice.service_address)
        .bind(invoice.totals.subtotal.cents())
        .bind(i64::from(invoice.totals.tax_rate.bps()))
        .bind(invoice.totals.tax_amount.cents())
        .bind(invoice.totals.total_amount.cents())
        .bind(invoice.tax_mode)
        .bind(invoice.tax_exempt)
        .bind(&invoice.tax_exempt_reason)
        .bind(&invoice.notes)
        .bind(&invoice.terms)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        for (position, line) in invoice.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    invoice_id, description, quantity, unit_price_cents,
                    total_price_cents, taxable, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(id)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .bind(line.total_price.cents())
            .bind(line.taxable)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
        }

        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Loads an invoice with its items on an open connection.
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Invoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1");
        let row: Option<InvoiceRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = Self::fetch_items(&mut *conn, id).await?;
        row.into_invoice(items).map(Some)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Lists invoices, newest first, each with its items.
    pub async fn list(&self, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE (?1 IS NULL OR status = ?1) \
             ORDER BY issue_date DESC, id DESC LIMIT ?2 OFFSET ?3"
        );
        let rows: Vec<InvoiceRow> = sqlx::query_as(&sql)
            .bind(filter.status)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&mut *conn)
            .await?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            let items = Self::fetch_items(&mut *conn, row.id).await?;
            invoices.push(row.into_invoice(items)?);
        }
        Ok(invoices)
    }

    async fn fetch_items<'e>(
        exec: impl SqliteExecutor<'e>,
        invoice_id: i64,
    ) -> DbResult<Vec<InvoiceItem>> {
        let rows: Vec<InvoiceItemRow> = sqlx::query_as(
            r#"
            SELECT id, invoice_id, description, quantity, unit_price_cents,
                   total_price_cents, taxable, position
            FROM invoice_items
            WHERE invoice_id = ?1
            ORDER BY position, id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(exec)
        .await?;

        Ok(rows.into_iter().map(InvoiceItem::from).collect())
    }

    /// Line items of an invoice, in position order.
    pub async fn items(&self, invoice_id: i64) -> DbResult<Vec<InvoiceItem>> {
        Self::fetch_items(&self.pool, invoice_id).await
    }

    // -------------------------------------------------------------------------
    // Updates
    // -------------------------------------------------------------------------

    /// Applies the present fields of `changes` and returns the new state.
    pub async fn update(&self, id: i64, changes: &InvoiceChanges) -> DbResult<Invoice> {
        debug!(id, ?changes, "Updating invoice");
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status = COALESCE(?2, status),
                payment_method = COALESCE(?3, payment_method),
                payment_date = COALESCE(?4, payment_date),
                payment_reference = COALESCE(?5, payment_reference),
                notes = COALESCE(?6, notes),
                tax_exempt_reason = COALESCE(?7, tax_exempt_reason),
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(changes.status)
        .bind(changes.payment_method)
        .bind(changes.payment_date)
        .bind(&changes.payment_reference)
        .bind(&changes.notes)
        .bind(&changes.tax_exempt_reason)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        Self::fetch(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    /// Records payment: status `paid` plus method, date and reference.
    pub async fn mark_paid(
        &self,
        id: i64,
        method: PaymentMethod,
        payment_date: NaiveDate,
        reference: Option<String>,
    ) -> DbResult<Invoice> {
        info!(id, method = method.as_str(), %payment_date, "Marking invoice paid");

        let changes = InvoiceChanges {
            status: Some(InvoiceStatus::Paid),
            payment_method: Some(method),
            payment_date: Some(payment_date),
            payment_reference: reference,
            ..InvoiceChanges::default()
        };
        self.update(id, &changes).await
    }

    /// Moves pending invoices due before `as_of` to overdue.
    pub async fn mark_overdue(&self, as_of: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET status = 'overdue', updated_at = ?2
            WHERE status = 'pending' AND due_date < ?1
            "#,
        )
        .bind(as_of)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            info!(swept, %as_of, "Invoices marked overdue");
        }
        Ok(swept)
    }

    /// Deletes an invoice and its items, and clears the booking's link.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;

        sqlx::query("UPDATE bookings SET invoice_id = NULL, updated_at = ?2 WHERE invoice_id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // tx dropped here, nothing is kept
            return Err(DbError::not_found("Invoice", id));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id, "Invoice deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::booking::BookingRepository;
    use crate::testing::{guest_booking, seed_service, test_db};
    use crate::Database;
    use primeclean_core::invoicing::{build_line_items, compute_totals, TaxPolicy};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    async fn booking_id(db: &Database) -> i64 {
        let service = seed_service(db, "Basic House Cleaning", 10_000).await;
        BookingRepository::insert(db.pool(), &guest_booking(service.id, day(1), "10:00"))
            .await
            .unwrap()
    }

    fn new_invoice(booking_id: i64, number: &str) -> NewInvoice {
        let lines = build_line_items(&[], Money::from_cents(10_700), "12 Palm Ave").unwrap();
        NewInvoice {
            booking_id,
            invoice_number: number.to_string(),
            issue_date: day(1),
            due_date: day(30),
            customer: CustomerSnapshot {
                name: "Ana Lopez".to_string(),
                email: "ana@example.com".to_string(),
                phone: None,
            },
            billing: BillingSnapshot {
                address: "12 Palm Ave".to_string(),
                city: "Miami".to_string(),
                state: "FL".to_string(),
                zip: "33101".to_string(),
                country: "United States".to_string(),
            },
            service_address: "12 Palm Ave".to_string(),
            totals: compute_totals(&lines, TaxPolicy::default(), false),
            tax_mode: TaxMode::Inclusive,
            tax_exempt: false,
            tax_exempt_reason: None,
            notes: None,
            terms: None,
            lines,
        }
    }

    #[tokio::test]
    async fn test_sequence_increments_per_year() {
        let db = test_db().await;
        assert_eq!(InvoiceRepository::next_sequence(db.pool(), 2025).await.unwrap(), 1);
        assert_eq!(InvoiceRepository::next_sequence(db.pool(), 2025).await.unwrap(), 2);
        assert_eq!(InvoiceRepository::next_sequence(db.pool(), 2026).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_and_fetch_with_items() {
        let db = test_db().await;
        let booking = booking_id(&db).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let id = InvoiceRepository::insert(&mut conn, &new_invoice(booking, "PP-2025-00001"))
            .await
            .unwrap();
        drop(conn);

        let invoice = db.invoices().get(id).await.unwrap().unwrap();
        assert_eq!(invoice.subtotal.cents(), 10_000);
        assert_eq!(invoice.tax_amount.cents(), 700);
        assert_eq!(invoice.total_amount.cents(), 10_700);
        assert_eq!(invoice.tax_rate.bps(), 700);
        assert_eq!(invoice.items.len(), 1);
        assert!(invoice.totals_consistent());

        assert_eq!(
            InvoiceRepository::invoice_for_booking(db.pool(), booking).await.unwrap(),
            Some(id)
        );
        assert!(InvoiceRepository::number_taken(db.pool(), "PP-2025-00001").await.unwrap());
    }

    #[tokio::test]
    async fn test_second_invoice_for_booking_is_unique_violation() {
        let db = test_db().await;
        let booking = booking_id(&db).await;
        let mut conn = db.pool().acquire().await.unwrap();

        InvoiceRepository::insert(&mut conn, &new_invoice(booking, "PP-2025-00001"))
            .await
            .unwrap();
        let err = InvoiceRepository::insert(&mut conn, &new_invoice(booking, "PP-2025-00002"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("booking_id"));
    }

    #[tokio::test]
    async fn test_mark_paid_and_overdue() {
        let db = test_db().await;
        let booking = booking_id(&db).await;
        let mut conn = db.pool().acquire().await.unwrap();
        let id = InvoiceRepository::insert(&mut conn, &new_invoice(booking, "PP-2025-00001"))
            .await
            .unwrap();
        drop(conn);

        assert_eq!(db.invoices().mark_overdue(day(30)).await.unwrap(), 0);
        assert_eq!(db.invoices().mark_overdue(day(30).succ_opt().unwrap()).await.unwrap(), 1);

        let paid = db
            .invoices()
            .mark_paid(id, PaymentMethod::CreditCard, day(25), Some("AUTH-42".to_string()))
            .await
            .unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.payment_method, Some(PaymentMethod::CreditCard));
        assert_eq!(paid.payment_reference.as_deref(), Some("AUTH-42"));

        let missing = db
            .invoices()
            .mark_paid(404, PaymentMethod::Cash, day(25), None)
            .await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_removes_items_and_link() {
        let db = test_db().await;
        let booking = booking_id(&db).await;
        let mut conn = db.pool().acquire().await.unwrap();
        let id = InvoiceRepository::insert(&mut conn, &new_invoice(booking, "PP-2025-00001"))
            .await
            .unwrap();
        BookingRepository::link_invoice(&mut *conn, booking, id).await.unwrap();
        drop(conn);

        db.invoices().delete(id).await.unwrap();

        assert!(db.invoices().get(id).await.unwrap().is_none());
        assert!(db.invoices().items(id).await.unwrap().is_empty());
        let linked = db.bookings().get(booking).await.unwrap().unwrap();
        assert_eq!(linked.invoice_id, None);

        assert!(matches!(
            db.invoices().delete(id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
