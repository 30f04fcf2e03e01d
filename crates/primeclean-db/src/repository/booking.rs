//! # Booking Repository
//!
//! Database operations for bookings.
//!
//! ## Read vs. Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reads (pool)                        Writes (caller's transaction)      │
//! │  ──────────────────────────────      ─────────────────────────────────  │
//! │  get / list / get_guest              booked_windows(tx, date, except)   │
//! │  in_range (calendar)                 insert(tx, NewBooking)             │
//! │  created_since (stats)               apply_changes(tx, id, changes)     │
//! │                                      link_invoice(tx, id, invoice_id)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write helpers take any [`SqliteExecutor`] so the engine can run the
//! availability check and the write inside one transaction.
//!
//! Placeholder bookings (carriers for custom invoices) are invisible to every
//! read here except [`BookingRepository::fetch`].

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteExecutor;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use primeclean_core::calendar::StatsRow;
use primeclean_core::schedule::{duration_for_service_name, BookedWindow, ScheduledTime};
use primeclean_core::{BillingAddress, Booking, BookingOwner, BookingStatus, GuestContact, Money};

/// Columns and joins shared by every full booking read.
const BOOKING_SELECT: &str = r#"
    SELECT
        b.id, b.user_id, b.guest_name, b.guest_email, b.guest_phone,
        b.service_id, s.name AS service_name, s.duration_minutes AS service_duration,
        b.scheduled_date, b.scheduled_time, b.address, b.square_meters,
        b.special_instructions, b.total_price_cents, b.status, b.invoice_id,
        b.billing_address, b.billing_city, b.billing_state, b.billing_zip, b.billing_country,
        b.reschedule_reason, b.is_placeholder, b.created_at, b.updated_at,
        p.full_name AS profile_name
    FROM bookings b
    JOIN services s ON s.id = b.service_id
    LEFT JOIN customer_profiles p ON p.user_id = b.user_id
"#;

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct BookingRow {
    id: i64,
    user_id: Option<i64>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    service_id: i64,
    service_name: String,
    service_duration: Option<i64>,
    scheduled_date: NaiveDate,
    scheduled_time: String,
    address: String,
    square_meters: f64,
    special_instructions: Option<String>,
    total_price_cents: i64,
    status: BookingStatus,
    invoice_id: Option<i64>,
    billing_address: Option<String>,
    billing_city: Option<String>,
    billing_state: Option<String>,
    billing_zip: Option<String>,
    billing_country: Option<String>,
    reschedule_reason: Option<String>,
    is_placeholder: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    profile_name: Option<String>,
}

/// A booking together with what the calendar needs to place it.
#[derive(Debug, Clone)]
pub struct ScheduledBooking {
    pub booking: Booking,
    /// Effective duration of the booked service.
    pub duration_minutes: u32,
    /// Profile name of a registered owner, when one is on file.
    pub profile_name: Option<String>,
}

impl TryFrom<BookingRow> for ScheduledBooking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> DbResult<Self> {
        let guest = match (row.guest_name, row.guest_email) {
            (Some(name), Some(email)) => Some(GuestContact {
                name,
                email,
                phone: row.guest_phone.unwrap_or_default(),
            }),
            _ => None,
        };
        let owner = BookingOwner::from_parts(row.user_id, guest)
            .map_err(|e| DbError::decode("Booking", row.id, e))?;

        let duration_minutes = effective_duration(row.service_duration, &row.service_name);
        let scheduled_time = parse_stored_time(row.id, &row.scheduled_time);

        let booking = Booking {
            id: row.id,
            owner,
            service_id: row.service_id,
            service_name: row.service_name,
            scheduled_date: row.scheduled_date,
            scheduled_time,
            address: row.address,
            square_meters: row.square_meters,
            special_instructions: row.special_instructions,
            total_price: Money::from_cents(row.total_price_cents),
            status: row.status,
            invoice_id: row.invoice_id,
            billing: BillingAddress {
                address: row.billing_address,
                city: row.billing_city,
                state: row.billing_state,
                zip: row.billing_zip,
                country: row.billing_country,
            },
            reschedule_reason: row.reschedule_reason,
            is_placeholder: row.is_placeholder,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };

        Ok(ScheduledBooking {
            booking,
            duration_minutes,
            profile_name: row.profile_name,
        })
    }
}

#[derive(Debug, FromRow)]
struct WindowRow {
    id: i64,
    scheduled_time: String,
    service_name: String,
    service_duration: Option<i64>,
}

#[derive(Debug, FromRow)]
struct StatsRecord {
    status: BookingStatus,
    service_name: String,
    total_price_cents: i64,
    created_at: DateTime<Utc>,
}

/// Recorded duration when positive, otherwise inferred from the name.
fn effective_duration(recorded: Option<i64>, service_name: &str) -> u32 {
    recorded
        .and_then(|m| u32::try_from(m).ok())
        .filter(|m| *m > 0)
        .unwrap_or_else(|| duration_for_service_name(service_name))
}

/// Reads a stored wall-clock time, falling back to opening time.
fn parse_stored_time(booking_id: i64, raw: &str) -> ScheduledTime {
    ScheduledTime::parse(raw).unwrap_or_else(|err| {
        warn!(booking_id, raw, error = %err, "Unreadable scheduled_time, assuming opening time");
        ScheduledTime::OPENING
    })
}

// =============================================================================
// Inputs
// =============================================================================

/// A validated, priced booking ready to insert.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub owner: BookingOwner,
    pub service_id: i64,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: ScheduledTime,
    pub address: String,
    pub square_meters: f64,
    pub special_instructions: Option<String>,
    pub total_price: Money,
    pub status: BookingStatus,
    pub billing: BillingAddress,
    pub is_placeholder: bool,
}

/// Sparse booking update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BookingChanges {
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<ScheduledTime>,
    pub address: Option<String>,
    pub square_meters: Option<f64>,
    pub special_instructions: Option<String>,
    pub total_price: Option<Money>,
    pub status: Option<BookingStatus>,
    pub reschedule_reason: Option<String>,
}

impl BookingChanges {
    /// Whether applying these changes can move the booking in time.
    pub fn touches_schedule(&self) -> bool {
        self.scheduled_date.is_some() || self.scheduled_time.is_some()
    }
}

/// Listing filter. Placeholders are always excluded.
#[derive(Debug, Clone)]
pub struct BookingFilter {
    /// Restrict to one registered owner.
    pub user_id: Option<i64>,
    pub status: Option<BookingStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for BookingFilter {
    fn default() -> Self {
        BookingFilter {
            user_id: None,
            status: None,
            from: None,
            to: None,
            limit: 50,
            offset: 0,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for booking database operations.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: SqlitePool,
}

impl BookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BookingRepository { pool }
    }

    /// Gets a visible (non-placeholder) booking by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<Booking>> {
        Ok(Self::fetch(&self.pool, id)
            .await?
            .map(|s| s.booking)
            .filter(|b| !b.is_placeholder))
    }

    /// Gets any booking, placeholders included, on any executor.
    pub async fn fetch<'e>(
        exec: impl SqliteExecutor<'e>,
        id: i64,
    ) -> DbResult<Option<ScheduledBooking>> {
        let sql = format!("{BOOKING_SELECT} WHERE b.id = ?1");
        let row: Option<BookingRow> = sqlx::query_as(&sql).bind(id).fetch_optional(exec).await?;
        row.map(ScheduledBooking::try_from).transpose()
    }

    /// Guest lookup: the booking ID plus the e-mail it was made with.
    pub async fn get_guest(&self, id: i64, email: &str) -> DbResult<Option<Booking>> {
        let sql = format!(
            "{BOOKING_SELECT} WHERE b.id = ?1 AND b.user_id IS NULL \
             AND lower(b.guest_email) = lower(?2) AND b.is_placeholder = 0"
        );
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .map(ScheduledBooking::try_from)
            .transpose()?
            .map(|s| s.booking))
    }

    /// Lists bookings, newest service date first.
    pub async fn list(&self, filter: &BookingFilter) -> DbResult<Vec<Booking>> {
        let sql = format!(
            r#"{BOOKING_SELECT}
            WHERE b.is_placeholder = 0
              AND (?1 IS NULL OR b.user_id = ?1)
              AND (?2 IS NULL OR b.status = ?2)
              AND (?3 IS NULL OR b.scheduled_date >= ?3)
              AND (?4 IS NULL OR b.scheduled_date <= ?4)
            ORDER BY b.scheduled_date DESC, b.scheduled_time DESC, b.id DESC
            LIMIT ?5 OFFSET ?6"#
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(filter.user_id)
            .bind(filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| ScheduledBooking::try_from(row).map(|s| s.booking))
            .collect()
    }

    /// Every visible booking with a service date in `[start, end]`, in
    /// calendar order. Cancelled bookings are included.
    pub async fn in_range(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<ScheduledBooking>> {
        let sql = format!(
            r#"{BOOKING_SELECT}
            WHERE b.is_placeholder = 0
              AND b.scheduled_date >= ?1 AND b.scheduled_date <= ?2
            ORDER BY b.scheduled_date, b.scheduled_time, b.id"#
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ScheduledBooking::try_from).collect()
    }

    /// Minimal rows for booking statistics, created at or after `since`.
    pub async fn created_since(&self, since: DateTime<Utc>) -> DbResult<Vec<StatsRow>> {
        let rows: Vec<StatsRecord> = sqlx::query_as(
            r#"
            SELECT b.status, s.name AS service_name, b.total_price_cents, b.created_at
            FROM bookings b
            JOIN services s ON s.id = b.service_id
            WHERE b.is_placeholder = 0 AND b.created_at >= ?1
            ORDER BY b.created_at
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StatsRow {
                status: r.status,
                service_name: r.service_name,
                total_price: Money::from_cents(r.total_price_cents),
                created_at: r.created_at,
            })
            .collect())
    }

    /// Windows occupied on `date` by bookings that block the schedule.
    ///
    /// Cancelled and placeholder bookings are skipped; `except` leaves one
    /// booking out (the one being moved).
    pub async fn booked_windows<'e>(
        exec: impl SqliteExecutor<'e>,
        date: NaiveDate,
        except: Option<i64>,
    ) -> DbResult<Vec<BookedWindow>> {
        let rows: Vec<WindowRow> = sqlx::query_as(
            r#"
            SELECT b.id, b.scheduled_time, s.name AS service_name,
                   s.duration_minutes AS service_duration
            FROM bookings b
            JOIN services s ON s.id = b.service_id
            WHERE b.scheduled_date = ?1
              AND b.status != 'cancelled'
              AND b.is_placeholder = 0
              AND (?2 IS NULL OR b.id != ?2)
            "#,
        )
        .bind(date)
        .bind(except)
        .fetch_all(exec)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let start = parse_stored_time(row.id, &row.scheduled_time);
                let minutes = effective_duration(row.service_duration, &row.service_name);
                BookedWindow {
                    booking_id: row.id,
                    window: start.window(minutes),
                }
            })
            .collect())
    }

    /// Inserts a booking and returns its ID.
    pub async fn insert<'e>(exec: impl SqliteExecutor<'e>, booking: &NewBooking) -> DbResult<i64> {
        debug!(
            service_id = booking.service_id,
            date = %booking.scheduled_date,
            time = %booking.scheduled_time,
            placeholder = booking.is_placeholder,
            "Inserting booking"
        );

        let (user_id, guest) = match &booking.owner {
            BookingOwner::Registered { user_id } => (Some(*user_id), None),
            BookingOwner::Guest { contact } => (None, Some(contact)),
        };
        let now = Utc::now();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO bookings (
                user_id, guest_name, guest_email, guest_phone,
                service_id, scheduled_date, scheduled_time, address, square_meters,
                special_instructions, total_price_cents, status,
                billing_address, billing_city, billing_state, billing_zip, billing_country,
                is_placeholder, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?19
            )
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(guest.map(|g| g.name.as_str()))
        .bind(guest.map(|g| g.email.as_str()))
        .bind(guest.map(|g| g.phone.as_str()))
        .bind(booking.service_id)
        .bind(booking.scheduled_date)
        .bind(booking.scheduled_time.to_storage())
        .bind(&booking.address)
        .bind(booking.square_meters)
        .bind(&booking.special_instructions)
        .bind(booking.total_price.cents())
        .bind(booking.status)
        .bind(&booking.billing.address)
        .bind(&booking.billing.city)
        .bind(&booking.billing.state)
        .bind(&booking.billing.zip)
        .bind(&booking.billing.country)
        .bind(booking.is_placeholder)
        .bind(now)
        .fetch_one(exec)
        .await?;

        Ok(id)
    }

    /// Applies the present fields of `changes`.
    pub async fn apply_changes<'e>(
        exec: impl SqliteExecutor<'e>,
        id: i64,
        changes: &BookingChanges,
    ) -> DbResult<()> {
        debug!(id, ?changes, "Updating booking");

        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                scheduled_date = COALESCE(?2, scheduled_date),
                scheduled_time = COALESCE(?3, scheduled_time),
                address = COALESCE(?4, address),
                square_meters = COALESCE(?5, square_meters),
                special_instructions = COALESCE(?6, special_instructions),
                total_price_cents = COALESCE(?7, total_price_cents),
                status = COALESCE(?8, status),
                reschedule_reason = COALESCE(?9, reschedule_reason),
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(changes.scheduled_date)
        .bind(changes.scheduled_time.map(|t| t.to_storage()))
        .bind(&changes.address)
        .bind(changes.square_meters)
        .bind(&changes.special_instructions)
        .bind(changes.total_price.map(|m| m.cents()))
        .bind(changes.status)
        .bind(&changes.reschedule_reason)
        .bind(Utc::now())
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Booking", id));
        }
        Ok(())
    }

    /// Sets a booking's status.
    pub async fn set_status(&self, id: i64, status: BookingStatus) -> DbResult<()> {
        let changes = BookingChanges {
            status: Some(status),
            ..BookingChanges::default()
        };
        Self::apply_changes(&self.pool, id, &changes).await
    }

    /// Points a booking at its invoice.
    pub async fn link_invoice<'e>(
        exec: impl SqliteExecutor<'e>,
        booking_id: i64,
        invoice_id: i64,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE bookings SET invoice_id = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(booking_id)
            .bind(invoice_id)
            .bind(Utc::now())
            .execute(exec)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Booking", booking_id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{guest_booking, registered_booking, seed_service, test_db};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_fetch_guest_booking() {
        let db = test_db().await;
        let service = seed_service(&db, "Deep House Cleaning", 15_000).await;

        let new = guest_booking(service.id, date(1), "10:00");
        let id = BookingRepository::insert(db.pool(), &new).await.unwrap();

        let booking = db.bookings().get(id).await.unwrap().unwrap();
        assert_eq!(booking.service_name, "Deep House Cleaning");
        assert_eq!(booking.scheduled_time.to_string(), "10:00");
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.owner.is_guest());

        let found = db.bookings().get_guest(id, "ANA@example.com").await.unwrap();
        assert!(found.is_some());
        assert!(db.bookings().get_guest(id, "other@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_booked_windows_skip_cancelled_and_placeholders() {
        let db = test_db().await;
        let service = seed_service(&db, "Basic House Cleaning", 10_000).await;

        let live = BookingRepository::insert(db.pool(), &guest_booking(service.id, date(1), "10:00"))
            .await
            .unwrap();
        let cancelled =
            BookingRepository::insert(db.pool(), &guest_booking(service.id, date(1), "13:00"))
                .await
                .unwrap();
        db.bookings()
            .set_status(cancelled, BookingStatus::Cancelled)
            .await
            .unwrap();

        let mut placeholder = guest_booking(service.id, date(1), "15:00");
        placeholder.is_placeholder = true;
        BookingRepository::insert(db.pool(), &placeholder).await.unwrap();

        let windows = BookingRepository::booked_windows(db.pool(), date(1), None)
            .await
            .unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].booking_id, live);
        assert_eq!(windows[0].window.duration_minutes(), 120);

        let without_live = BookingRepository::booked_windows(db.pool(), date(1), Some(live))
            .await
            .unwrap();
        assert!(without_live.is_empty());
    }

    #[tokio::test]
    async fn test_legacy_time_formats_are_read() {
        let db = test_db().await;
        let service = seed_service(&db, "Office Cleaning", 20_000).await;
        let id = BookingRepository::insert(db.pool(), &guest_booking(service.id, date(2), "09:00"))
            .await
            .unwrap();

        sqlx::query("UPDATE bookings SET scheduled_time = '0000-01-01T14:00:00Z' WHERE id = ?1")
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();
        let booking = db.bookings().get(id).await.unwrap().unwrap();
        assert_eq!(booking.scheduled_time.to_string(), "14:00");

        sqlx::query("UPDATE bookings SET scheduled_time = 'noon' WHERE id = ?1")
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();
        let booking = db.bookings().get(id).await.unwrap().unwrap();
        assert_eq!(booking.scheduled_time, ScheduledTime::OPENING);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        let service = seed_service(&db, "Basic House Cleaning", 10_000).await;

        BookingRepository::insert(db.pool(), &registered_booking(7, service.id, date(3), "09:00"))
            .await
            .unwrap();
        BookingRepository::insert(db.pool(), &registered_booking(8, service.id, date(4), "09:00"))
            .await
            .unwrap();
        BookingRepository::insert(db.pool(), &guest_booking(service.id, date(5), "09:00"))
            .await
            .unwrap();

        let all = db.bookings().list(&BookingFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].scheduled_date, date(5));

        let mine = db
            .bookings()
            .list(&BookingFilter {
                user_id: Some(7),
                ..BookingFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id(), Some(7));

        let window = db
            .bookings()
            .list(&BookingFilter {
                from: Some(date(4)),
                to: Some(date(4)),
                ..BookingFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
    }

    #[tokio::test]
    async fn test_sparse_changes() {
        let db = test_db().await;
        let service = seed_service(&db, "Basic House Cleaning", 10_000).await;
        let id = BookingRepository::insert(db.pool(), &guest_booking(service.id, date(1), "10:00"))
            .await
            .unwrap();

        let changes = BookingChanges {
            scheduled_date: Some(date(9)),
            reschedule_reason: Some("Customer travelling".to_string()),
            ..BookingChanges::default()
        };
        assert!(changes.touches_schedule());
        BookingRepository::apply_changes(db.pool(), id, &changes)
            .await
            .unwrap();

        let booking = db.bookings().get(id).await.unwrap().unwrap();
        assert_eq!(booking.scheduled_date, date(9));
        assert_eq!(booking.scheduled_time.to_string(), "10:00");
        assert_eq!(booking.address, "12 Palm Ave, Miami, FL 33101");
        assert_eq!(booking.reschedule_reason.as_deref(), Some("Customer travelling"));

        let missing = BookingRepository::apply_changes(db.pool(), 404, &changes).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_non_positive_price_rejected_by_store() {
        let db = test_db().await;
        let service = seed_service(&db, "Basic House Cleaning", 10_000).await;
        let mut bad = guest_booking(service.id, date(1), "10:00");
        bad.total_price = Money::zero();

        let err = BookingRepository::insert(db.pool(), &bad).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
