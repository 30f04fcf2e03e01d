//! # Invoice Operations
//!
//! Issues one invoice per booking and tracks its payment.
//!
//! ## Issuance Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN IMMEDIATE                       ◄── waits for the write lock     │
//! │    1. bump invoice_sequences[year]                                      │
//! │    2. skip numbers already taken                                        │
//! │    3. load booking                     ──► NOT_FOUND                    │
//! │    4. booking already invoiced?        ──► CONFLICT                     │
//! │    5. snapshot customer + billing                                       │
//! │    6. lines ─► totals (tax convention from config)                      │
//! │    7. insert invoice + items, link booking                              │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A second issuer for the same booking either waits on the write lock and
//! then sees step 4 fail, or loses the race on the unique booking index; both
//! surface as `CONFLICT`. Any failure rolls the whole unit back, so a number
//! is only consumed by an invoice that exists.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::services::booking::validate_billing;
use crate::services::page;
use primeclean_core::invoicing::{
    build_line_items, compute_totals, due_date, format_invoice_number, resolve_billing,
    resolve_customer, CustomerSnapshot, LineItemInput, ProfileIdentity,
};
use primeclean_core::pricing::BASELINE_AREA_SQM;
use primeclean_core::transitions::ensure_staff;
use primeclean_core::validation::{
    validate_email, validate_net_days, validate_optional_text, validate_required,
};
use primeclean_core::{
    Actor, BillingAddress, BookingOwner, BookingStatus, CoreError, GuestContact, Invoice,
    InvoiceItem, InvoiceStatus, Money, PaymentMethod, ScheduledTime, ValidationError,
};
use primeclean_db::repository::booking::{NewBooking, ScheduledBooking};
use primeclean_db::repository::invoice::{InvoiceChanges, InvoiceFilter, NewInvoice};
use primeclean_db::{
    BookingRepository, Database, DbError, DbTransaction, InvoiceRepository, ProfileRepository,
    ServiceRepository,
};

/// Upper bound on numbers skipped because a legacy invoice already holds them.
const MAX_NUMBER_ATTEMPTS: usize = 1_000;

// =============================================================================
// Requests
// =============================================================================

/// Options for invoicing an existing booking. Everything is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Wins over the booking's and the profile's billing address.
    #[serde(default)]
    pub billing: BillingAddress,
    #[serde(default)]
    pub tax_exempt: bool,
    #[serde(default)]
    pub tax_exempt_reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// One line for the booking price is synthesized when empty.
    #[serde(default)]
    pub items: Vec<LineItemInput>,
    #[serde(default)]
    pub net_days: Option<i64>,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
}

/// An invoice with no prior booking; a placeholder booking is created for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomInvoiceRequest {
    pub service_id: i64,
    pub service_date: NaiveDate,
    pub service_address: String,
    pub customer: GuestContact,
    pub items: Vec<LineItemInput>,
    #[serde(default)]
    pub billing: BillingAddress,
    #[serde(default)]
    pub tax_exempt: bool,
    #[serde(default)]
    pub tax_exempt_reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub net_days: Option<i64>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Sparse invoice update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceUpdate {
    pub status: Option<InvoiceStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_date: Option<NaiveDate>,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
    pub tax_exempt_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub reference: Option<String>,
}

// =============================================================================
// Validated Issuance Input
// =============================================================================

/// Request fields after validation, shared by both issuance paths.
#[derive(Debug, Clone)]
struct Issuance {
    overrides: CustomerSnapshot,
    billing: BillingAddress,
    tax_exempt: bool,
    tax_exempt_reason: Option<String>,
    notes: Option<String>,
    items: Vec<LineItemInput>,
    net_days: i64,
    issue_date: NaiveDate,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// =============================================================================
// Operations
// =============================================================================

impl Engine {
    /// Issues the invoice for a booking.
    pub async fn create_invoice(
        &self,
        actor: &Actor,
        booking_id: i64,
        request: InvoiceRequest,
    ) -> EngineResult<Invoice> {
        ensure_staff(actor)?;
        debug!(booking_id, items = request.items.len(), "create_invoice");

        let email = request
            .customer_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(validate_email)
            .transpose()?;
        let issuance = self.validate_issuance(
            CustomerSnapshot {
                name: validate_optional_text("customer_name", request.customer_name.as_deref())?
                    .unwrap_or_default(),
                email: email.unwrap_or_default(),
                phone: validate_optional_text("customer_phone", request.customer_phone.as_deref())?,
            },
            &request.billing,
            request.tax_exempt,
            request.tax_exempt_reason.as_deref(),
            request.notes.as_deref(),
            request.items,
            request.net_days,
            request.issue_date,
        )?;

        let mut tx = self.db.begin_write().await?;
        let invoice_number = reserve_number(&mut tx, issuance.issue_date.year()).await?;

        let booking = BookingRepository::fetch(&mut *tx, booking_id)
            .await?
            .ok_or(CoreError::BookingNotFound(booking_id))?;
        if InvoiceRepository::invoice_for_booking(&mut *tx, booking_id)
            .await?
            .is_some()
        {
            return Err(CoreError::InvoiceAlreadyExists { booking_id }.into());
        }
        if booking.booking.status == BookingStatus::Cancelled {
            return Err(ValidationError::NotAllowed {
                field: "booking_id".to_string(),
                allowed: vec!["bookings that are not cancelled".to_string()],
            }
            .into());
        }

        let invoice = self.issue(&mut tx, &booking, invoice_number, issuance).await?;
        Database::commit(tx).await?;

        info!(
            id = invoice.id,
            number = %invoice.invoice_number,
            booking_id,
            total = %invoice.total_amount,
            tax = %invoice.tax_amount,
            "Invoice issued"
        );
        Ok(invoice)
    }

    /// Issues an invoice for work that was never booked.
    pub async fn create_custom_invoice(
        &self,
        actor: &Actor,
        request: CustomInvoiceRequest,
    ) -> EngineResult<Invoice> {
        ensure_staff(actor)?;
        debug!(service_id = request.service_id, items = request.items.len(), "create_custom_invoice");

        if request.items.is_empty() {
            return Err(ValidationError::required("items").into());
        }
        let contact = GuestContact {
            name: validate_required("customer_name", &request.customer.name)?,
            email: validate_email(&request.customer.email)?,
            phone: validate_optional_text("customer_phone", Some(request.customer.phone.as_str()))?
                .unwrap_or_default(),
        };
        let service_address = validate_required("service_address", &request.service_address)?;
        let issuance = self.validate_issuance(
            CustomerSnapshot::default(),
            &request.billing,
            request.tax_exempt,
            request.tax_exempt_reason.as_deref(),
            request.notes.as_deref(),
            request.items,
            request.net_days,
            request.issue_date,
        )?;
        let lines = build_line_items(&issuance.items, Money::zero(), &service_address)?;
        let total_price: Money = lines.iter().map(|l| l.total_price).sum();

        let mut tx = self.db.begin_write().await?;
        let invoice_number = reserve_number(&mut tx, issuance.issue_date.year()).await?;

        ServiceRepository::fetch(&mut *tx, request.service_id)
            .await?
            .ok_or(CoreError::ServiceNotFound(request.service_id))?;

        let placeholder = NewBooking {
            owner: BookingOwner::Guest { contact },
            service_id: request.service_id,
            scheduled_date: request.service_date,
            scheduled_time: ScheduledTime::OPENING,
            address: service_address,
            square_meters: BASELINE_AREA_SQM,
            special_instructions: None,
            total_price,
            status: BookingStatus::Completed,
            billing: issuance.billing.clone(),
            is_placeholder: true,
        };
        let booking_id = BookingRepository::insert(&mut *tx, &placeholder).await?;
        let booking = BookingRepository::fetch(&mut *tx, booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Booking", booking_id))?;

        let invoice = self.issue(&mut tx, &booking, invoice_number, issuance).await?;
        Database::commit(tx).await?;

        info!(
            id = invoice.id,
            number = %invoice.invoice_number,
            placeholder_booking = booking_id,
            total = %invoice.total_amount,
            "Custom invoice issued"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(&self, actor: &Actor, id: i64) -> EngineResult<Invoice> {
        ensure_staff(actor)?;
        let invoice = self
            .db
            .invoices()
            .get(id)
            .await?
            .ok_or(CoreError::InvoiceNotFound(id))?;
        Ok(invoice)
    }

    pub async fn list_invoices(&self, actor: &Actor, query: InvoiceQuery) -> EngineResult<Vec<Invoice>> {
        ensure_staff(actor)?;
        let (limit, offset) = page(query.limit, query.offset);
        let filter = InvoiceFilter {
            status: query.status,
            limit,
            offset,
        };
        Ok(self.db.invoices().list(&filter).await?)
    }

    pub async fn invoice_items(&self, actor: &Actor, id: i64) -> EngineResult<Vec<InvoiceItem>> {
        // existence check so an unknown id is NOT_FOUND rather than empty
        self.get_invoice(actor, id).await?;
        Ok(self.db.invoices().items(id).await?)
    }

    pub async fn update_invoice(
        &self,
        actor: &Actor,
        id: i64,
        update: InvoiceUpdate,
    ) -> EngineResult<Invoice> {
        ensure_staff(actor)?;

        let changes = InvoiceChanges {
            status: update.status,
            payment_method: update.payment_method,
            payment_date: update.payment_date,
            payment_reference: validate_optional_text(
                "payment_reference",
                update.payment_reference.as_deref(),
            )?,
            notes: validate_optional_text("notes", update.notes.as_deref())?,
            tax_exempt_reason: validate_optional_text(
                "tax_exempt_reason",
                update.tax_exempt_reason.as_deref(),
            )?,
        };

        let updated = self.db.invoices().update(id, &changes).await?;
        info!(id, status = %updated.status, "Invoice updated");
        Ok(updated)
    }

    pub async fn mark_invoice_paid(
        &self,
        actor: &Actor,
        id: i64,
        payment: PaymentRequest,
    ) -> EngineResult<Invoice> {
        ensure_staff(actor)?;
        let reference = validate_optional_text("reference", payment.reference.as_deref())?;
        let paid_on = payment.payment_date.unwrap_or_else(today);

        Ok(self
            .db
            .invoices()
            .mark_paid(id, payment.method, paid_on, reference)
            .await?)
    }

    /// Removes an invoice and its items; the booking becomes invoiceable again.
    pub async fn delete_invoice(&self, actor: &Actor, id: i64) -> EngineResult<()> {
        ensure_staff(actor)?;
        Ok(self.db.invoices().delete(id).await?)
    }

    /// Pending invoices due before `as_of` become overdue. Returns how many moved.
    pub async fn mark_overdue(&self, actor: &Actor, as_of: NaiveDate) -> EngineResult<u64> {
        ensure_staff(actor)?;
        Ok(self.db.invoices().mark_overdue(as_of).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    fn validate_issuance(
        &self,
        overrides: CustomerSnapshot,
        billing: &BillingAddress,
        tax_exempt: bool,
        tax_exempt_reason: Option<&str>,
        notes: Option<&str>,
        items: Vec<LineItemInput>,
        net_days: Option<i64>,
        issue_date: Option<NaiveDate>,
    ) -> EngineResult<Issuance> {
        let net_days = validate_net_days(net_days.unwrap_or(self.config.invoicing.net_days))?;
        let tax_exempt_reason = validate_optional_text("tax_exempt_reason", tax_exempt_reason)?;
        if tax_exempt && tax_exempt_reason.is_none() {
            warn!("Tax-exempt invoice requested without a reason");
        }

        Ok(Issuance {
            overrides,
            billing: validate_billing(billing)?,
            tax_exempt,
            tax_exempt_reason,
            notes: validate_optional_text("notes", notes)?,
            items,
            net_days,
            issue_date: issue_date.unwrap_or_else(today),
        })
    }

    /// Derives and stores the invoice for `booking` inside `tx`.
    async fn issue(
        &self,
        tx: &mut DbTransaction,
        booking: &ScheduledBooking,
        invoice_number: String,
        issuance: Issuance,
    ) -> EngineResult<Invoice> {
        let booking = &booking.booking;

        let profile = match booking.owner.user_id() {
            Some(user_id) => ProfileRepository::fetch(&mut **tx, user_id).await?,
            None => None,
        };
        let identity = profile.as_ref().map(|p| ProfileIdentity {
            full_name: &p.full_name,
            email: &p.email,
            phone: p.phone.as_deref(),
        });
        let customer = resolve_customer(&issuance.overrides, &booking.owner, identity);

        let empty = BillingAddress::default();
        let profile_billing = profile.as_ref().map(|p| &p.billing).unwrap_or(&empty);
        let billing = resolve_billing(
            &[&issuance.billing, &booking.billing, profile_billing],
            &booking.address,
            &self.config.invoicing.default_country,
        );

        let lines = build_line_items(&issuance.items, booking.total_price, &booking.address)?;
        let policy = self.config.tax_policy();
        let totals = compute_totals(&lines, policy, issuance.tax_exempt);

        let new_invoice = NewInvoice {
            booking_id: booking.id,
            invoice_number,
            issue_date: issuance.issue_date,
            due_date: due_date(issuance.issue_date, issuance.net_days)?,
            customer,
            billing,
            service_address: booking.address.clone(),
            totals,
            tax_mode: policy.mode,
            tax_exempt: issuance.tax_exempt,
            tax_exempt_reason: issuance.tax_exempt_reason,
            notes: issuance.notes,
            terms: Some(self.config.terms(issuance.net_days)),
            lines,
        };

        let invoice_id = match InvoiceRepository::insert(&mut **tx, &new_invoice).await {
            Ok(id) => id,
            Err(err) if err.is_unique_violation_on("booking_id") => {
                return Err(CoreError::InvoiceAlreadyExists {
                    booking_id: booking.id,
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        };
        BookingRepository::link_invoice(&mut **tx, booking.id, invoice_id).await?;

        let invoice = InvoiceRepository::fetch(&mut **tx, invoice_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Invoice", invoice_id))?;
        Ok(invoice)
    }
}

/// Takes the next free number for `year` from the store sequence.
async fn reserve_number(tx: &mut DbTransaction, year: i32) -> EngineResult<String> {
    for _ in 0..MAX_NUMBER_ATTEMPTS {
        let sequence = InvoiceRepository::next_sequence(&mut **tx, year).await?;
        let number = format_invoice_number(year, sequence);
        if !InvoiceRepository::number_taken(&mut **tx, &number).await? {
            return Ok(number);
        }
        warn!(%number, "Invoice number already in use, skipping");
    }

    Err(DbError::Internal(format!("no free invoice number for {year}")).into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::ErrorKind;
    use crate::services::profile::ProfileRequest;
    use crate::testing::{add_service, booking_request, day, test_engine, test_engine_with, STAFF};
    use primeclean_core::TaxMode;
    use primeclean_db::DbConfig;
    use std::collections::HashSet;
    use std::path::PathBuf;

    async fn booked(engine: &Engine, base_cents: i64) -> i64 {
        let service = add_service(engine, "Basic House Cleaning", base_cents, 120).await;
        engine
            .create_booking(&Actor::guest(), booking_request(service.id, day(2025, 6, 1), "10:00"))
            .await
            .unwrap()
            .id
    }

    fn issued_on(date: NaiveDate) -> InvoiceRequest {
        InvoiceRequest {
            issue_date: Some(date),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_inclusive_invoice_splits_out_tax() {
        let engine = test_engine().await;
        let booking_id = booked(&engine, 10_700).await;

        let invoice = engine
            .create_invoice(&STAFF, booking_id, issued_on(day(2025, 6, 2)))
            .await
            .unwrap();

        assert_eq!(invoice.invoice_number, "PP-2025-00001");
        assert_eq!(invoice.subtotal, Money::from_cents(10_000));
        assert_eq!(invoice.tax_amount, Money::from_cents(700));
        assert_eq!(invoice.total_amount, Money::from_cents(10_700));
        assert!(invoice.totals_consistent());
        assert_eq!(invoice.due_date, day(2025, 7, 2));
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.customer_name, "Ana Lopez");
        assert_eq!(invoice.billing.city, "Miami");
        assert_eq!(invoice.billing.state, "FL");
        assert_eq!(invoice.billing.country, "United States");
        assert!(invoice.terms.as_deref().unwrap().contains("Net 30 days"));

        let booking = engine.get_booking(&STAFF, booking_id).await.unwrap();
        assert_eq!(booking.invoice_id, Some(invoice.id));
    }

    #[tokio::test]
    async fn test_exclusive_mode_and_exemption() {
        let mut config = EngineConfig::default();
        config.tax.mode = TaxMode::Exclusive;
        let engine = test_engine_with(config).await;
        let service = add_service(&engine, "Office Cleaning", 10_000, 60).await;
        let date = day(2025, 6, 1);

        let first = engine
            .create_booking(&Actor::guest(), booking_request(service.id, date, "09:00"))
            .await
            .unwrap();
        let invoice = engine
            .create_invoice(&STAFF, first.id, issued_on(date))
            .await
            .unwrap();
        assert_eq!(invoice.subtotal, Money::from_cents(10_000));
        assert_eq!(invoice.tax_amount, Money::from_cents(700));
        assert_eq!(invoice.total_amount, Money::from_cents(10_700));

        let second = engine
            .create_booking(&Actor::guest(), booking_request(service.id, date, "11:00"))
            .await
            .unwrap();
        let exempt = InvoiceRequest {
            tax_exempt: true,
            tax_exempt_reason: Some("Nonprofit".to_string()),
            net_days: Some(15),
            ..issued_on(date)
        };
        let invoice = engine.create_invoice(&STAFF, second.id, exempt).await.unwrap();
        assert_eq!(invoice.tax_amount, Money::zero());
        assert_eq!(invoice.total_amount, invoice.subtotal);
        assert_eq!(invoice.due_date, day(2025, 6, 16));
        assert_eq!(invoice.invoice_number, "PP-2025-00002");
    }

    #[tokio::test]
    async fn test_caller_items_are_used_verbatim() {
        let engine = test_engine().await;
        let booking_id = booked(&engine, 10_000).await;

        let request = InvoiceRequest {
            items: vec![
                LineItemInput {
                    description: "Deep clean".to_string(),
                    quantity: 2.0,
                    unit_price: Money::from_cents(5_350),
                    taxable: true,
                },
                LineItemInput {
                    description: "Supplies".to_string(),
                    quantity: 1.0,
                    unit_price: Money::from_cents(1_000),
                    taxable: false,
                },
            ],
            ..issued_on(day(2025, 6, 2))
        };
        let invoice = engine.create_invoice(&STAFF, booking_id, request).await.unwrap();

        assert_eq!(invoice.items.len(), 2);
        assert_eq!(invoice.items[0].total_price, Money::from_cents(10_700));
        assert_eq!(invoice.total_amount, Money::from_cents(11_700));
        assert_eq!(invoice.tax_amount, Money::from_cents(700));
    }

    #[tokio::test]
    async fn test_issuing_twice_is_a_conflict() {
        let engine = test_engine().await;
        let booking_id = booked(&engine, 10_000).await;

        engine
            .create_invoice(&STAFF, booking_id, InvoiceRequest::default())
            .await
            .unwrap();
        let err = engine
            .create_invoice(&STAFF, booking_id, InvoiceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = engine
            .create_invoice(&STAFF, 9_999, InvoiceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let all = engine.list_invoices(&STAFF, InvoiceQuery::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_issuance_yields_one_invoice() {
        let engine = test_engine().await;
        let booking_id = booked(&engine, 10_000).await;

        let (a, b) = tokio::join!(
            engine.create_invoice(&STAFF, booking_id, InvoiceRequest::default()),
            engine.create_invoice(&STAFF, booking_id, InvoiceRequest::default()),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let failure = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(failure.kind(), ErrorKind::Conflict);

        let all = engine.list_invoices(&STAFF, InvoiceQuery::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    /// Removes a scratch store and its WAL files.
    struct ScratchFile(PathBuf);

    impl Drop for ScratchFile {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm"] {
                let mut path = self.0.clone().into_os_string();
                path.push(suffix);
                let _ = std::fs::remove_file(path);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_file_store_status_writes_race_issuance() {
        let path = std::env::temp_dir().join(format!(
            "primeclean-race-{}-{}.db",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let _scratch = ScratchFile(path.clone());
        let db = Database::new(DbConfig::new(&path).max_connections(5)).await.unwrap();
        let engine = Engine::new(db, EngineConfig::default());

        let service = add_service(&engine, "Basic House Cleaning", 10_000, 60).await;
        let mut booking_ids = Vec::new();
        for d in 1..=8 {
            let booking = engine
                .create_booking(&Actor::guest(), booking_request(service.id, day(2025, 6, d), "10:00"))
                .await
                .unwrap();
            booking_ids.push(booking.id);
        }

        let mut issuers = Vec::new();
        let mut status_writers = Vec::new();
        for &id in &booking_ids {
            for _ in 0..2 {
                let engine = engine.clone();
                issuers.push(tokio::spawn(async move {
                    engine.create_invoice(&STAFF, id, InvoiceRequest::default()).await
                }));
            }
            let engine = engine.clone();
            status_writers.push(tokio::spawn(async move {
                engine.update_status(&STAFF, id, BookingStatus::Completed).await
            }));
        }

        let mut issued = 0;
        for task in issuers {
            match task.await.unwrap() {
                Ok(_) => issued += 1,
                Err(err) => assert_eq!(err.kind(), ErrorKind::Conflict, "{err}"),
            }
        }
        assert_eq!(issued, booking_ids.len());

        for task in status_writers {
            let booking = task.await.unwrap().unwrap();
            assert_eq!(booking.status, BookingStatus::Completed);
        }

        let all = engine.list_invoices(&STAFF, InvoiceQuery::default()).await.unwrap();
        assert_eq!(all.len(), booking_ids.len());
        let numbers: HashSet<_> = all.iter().map(|i| i.invoice_number.clone()).collect();
        assert_eq!(numbers.len(), all.len());

        engine.db.close().await;
    }

    #[tokio::test]
    async fn test_registered_owner_snapshot_comes_from_profile() {
        let engine = test_engine().await;
        let service = add_service(&engine, "Basic House Cleaning", 10_000, 120).await;
        let customer = Actor::customer(7);
        engine
            .upsert_profile(
                &customer,
                ProfileRequest {
                    user_id: 7,
                    full_name: "Maria Gomez".to_string(),
                    email: "maria@example.com".to_string(),
                    phone: None,
                    billing: BillingAddress {
                        address: Some("1 Billing Way, Tampa, FL 33602".to_string()),
                        ..Default::default()
                    },
                },
            )
            .await
            .unwrap();
        let mut request = booking_request(service.id, day(2025, 6, 1), "10:00");
        request.guest = None;
        let booking = engine.create_booking(&customer, request).await.unwrap();

        let invoice = engine
            .create_invoice(&STAFF, booking.id, InvoiceRequest::default())
            .await
            .unwrap();
        assert_eq!(invoice.customer_name, "Maria Gomez");
        assert_eq!(invoice.billing.address, "1 Billing Way, Tampa, FL 33602");
        assert_eq!(invoice.billing.city, "Tampa");
        assert_eq!(invoice.billing.zip, "33602");

        // the snapshot does not follow later profile edits
        engine
            .upsert_profile(
                &customer,
                ProfileRequest {
                    user_id: 7,
                    full_name: "Maria G. Lopez".to_string(),
                    email: "maria@example.com".to_string(),
                    phone: None,
                    billing: BillingAddress::default(),
                },
            )
            .await
            .unwrap();
        let reread = engine.get_invoice(&STAFF, invoice.id).await.unwrap();
        assert_eq!(reread.customer_name, "Maria Gomez");
    }

    #[tokio::test]
    async fn test_custom_invoice_creates_hidden_booking() {
        let engine = test_engine().await;
        let service = add_service(&engine, "Office Cleaning", 10_000, 60).await;
        let date = day(2025, 6, 1);

        let request = CustomInvoiceRequest {
            service_id: service.id,
            service_date: date,
            service_address: "77 Flagler St, Miami, FL 33130".to_string(),
            customer: GuestContact {
                name: "Acme Corp".to_string(),
                email: "billing@acme.example".to_string(),
                phone: String::new(),
            },
            items: vec![LineItemInput {
                description: "After-party cleanup".to_string(),
                quantity: 1.0,
                unit_price: Money::from_cents(21_400),
                taxable: true,
            }],
            billing: BillingAddress::default(),
            tax_exempt: false,
            tax_exempt_reason: None,
            notes: None,
            net_days: None,
            issue_date: Some(date),
        };
        let invoice = engine.create_custom_invoice(&STAFF, request).await.unwrap();
        assert_eq!(invoice.total_amount, Money::from_cents(21_400));
        assert_eq!(invoice.customer_name, "Acme Corp");
        assert_eq!(invoice.customer_phone, None);

        // the placeholder neither shows up nor blocks the schedule
        let err = engine.get_booking(&STAFF, invoice.booking_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let slots = engine.available_slots(date, None).await.unwrap();
        assert!(slots.iter().all(|s| s.available));
    }

    #[tokio::test]
    async fn test_payment_overdue_and_delete() {
        let engine = test_engine().await;
        let service = add_service(&engine, "Basic House Cleaning", 10_000, 60).await;
        let date = day(2025, 6, 1);
        let first = engine
            .create_booking(&Actor::guest(), booking_request(service.id, date, "09:00"))
            .await
            .unwrap();
        let second = engine
            .create_booking(&Actor::guest(), booking_request(service.id, date, "11:00"))
            .await
            .unwrap();

        let paid = engine
            .create_invoice(&STAFF, first.id, issued_on(date))
            .await
            .unwrap();
        let unpaid = engine
            .create_invoice(&STAFF, second.id, issued_on(date))
            .await
            .unwrap();

        let paid = engine
            .mark_invoice_paid(
                &STAFF,
                paid.id,
                PaymentRequest {
                    method: PaymentMethod::Check,
                    payment_date: Some(day(2025, 6, 10)),
                    reference: Some("CHK-1042".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.payment_reference.as_deref(), Some("CHK-1042"));

        let swept = engine.mark_overdue(&STAFF, day(2025, 8, 1)).await.unwrap();
        assert_eq!(swept, 1);
        let overdue = engine.get_invoice(&STAFF, unpaid.id).await.unwrap();
        assert_eq!(overdue.status, InvoiceStatus::Overdue);

        engine.delete_invoice(&STAFF, unpaid.id).await.unwrap();
        let err = engine.invoice_items(&STAFF, unpaid.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(engine.db().invoices().items(unpaid.id).await.unwrap().is_empty());

        // the booking can be invoiced again
        let reissued = engine
            .create_invoice(&STAFF, second.id, issued_on(date))
            .await
            .unwrap();
        assert_eq!(reissued.invoice_number, "PP-2025-00003");

        let err = engine
            .mark_invoice_paid(
                &STAFF,
                9_999,
                PaymentRequest {
                    method: PaymentMethod::Cash,
                    payment_date: None,
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_invoicing_is_staff_only() {
        let engine = test_engine().await;
        let booking_id = booked(&engine, 10_000).await;

        let err = engine
            .create_invoice(&Actor::customer(7), booking_id, InvoiceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
