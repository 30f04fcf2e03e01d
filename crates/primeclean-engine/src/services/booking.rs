//! # Booking Operations
//!
//! Creating, reading and changing bookings.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request ──► lock schedule ──► BEGIN IMMEDIATE                 │
//! │                                           │                             │
//! │                                           ├─ load booking / service     │
//! │                                           ├─ authorize against row      │
//! │                                           ├─ booked_windows(date)       │
//! │                                           ├─ overlap? ──► CONFLICT      │
//! │                                           ├─ write                      │
//! │                                           └─ COMMIT ──► Booking         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every booking write goes through the scheduling lock so the overlap check
//! and the write are never interleaved with another writer in this process.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::services::page;
use primeclean_core::pricing;
use primeclean_core::schedule::{find_conflict, BookedWindow, BUSINESS_END_HOUR, BUSINESS_START_HOUR};
use primeclean_core::transitions::{check_transition, ensure_can_access, ensure_staff};
use primeclean_core::validation::{
    validate_email, validate_optional_text, validate_positive_amount, validate_required,
    validate_square_meters, ValidationResult,
};
use primeclean_core::{
    Actor, BillingAddress, Booking, BookingOwner, BookingStatus, CoreError, CoreResult,
    GuestContact, Money, ScheduledTime, Service, ValidationError,
};
use primeclean_db::repository::booking::{BookingChanges, BookingFilter, NewBooking};
use primeclean_db::{BookingRepository, Database, ServiceRepository};

// =============================================================================
// Requests
// =============================================================================

/// A new booking. The price is derived from the service and area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service_id: i64,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: ScheduledTime,
    pub address: String,
    pub square_meters: f64,
    #[serde(default)]
    pub special_instructions: Option<String>,
    /// Required when the caller is not signed in.
    #[serde(default)]
    pub guest: Option<GuestContact>,
    #[serde(default)]
    pub billing: BillingAddress,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingQuery {
    /// Staff only; customers always see their own bookings.
    pub user_id: Option<i64>,
    pub status: Option<BookingStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Staff patch; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminBookingUpdate {
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<ScheduledTime>,
    pub address: Option<String>,
    pub square_meters: Option<f64>,
    pub special_instructions: Option<String>,
    pub total_price: Option<Money>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub scheduled_date: NaiveDate,
    pub scheduled_time: ScheduledTime,
    #[serde(default)]
    pub reason: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_guest(contact: &GuestContact) -> ValidationResult<GuestContact> {
    Ok(GuestContact {
        name: validate_required("guest_name", &contact.name)?,
        email: validate_email(&contact.email)?,
        phone: validate_required("guest_phone", &contact.phone)?,
    })
}

/// Signed-in callers own what they book; guests must leave contact details.
/// Staff may book on behalf of a guest by supplying the contact.
fn resolve_owner(actor: &Actor, guest: Option<&GuestContact>) -> ValidationResult<BookingOwner> {
    match (actor.user_id, guest) {
        (Some(_), Some(contact)) if actor.is_staff() => Ok(BookingOwner::Guest {
            contact: validate_guest(contact)?,
        }),
        (Some(user_id), _) => Ok(BookingOwner::Registered { user_id }),
        (None, Some(contact)) => Ok(BookingOwner::Guest {
            contact: validate_guest(contact)?,
        }),
        (None, None) => Err(ValidationError::required("guest")),
    }
}

/// Start must fall inside business hours.
fn validate_start(time: ScheduledTime) -> ValidationResult<ScheduledTime> {
    if !(BUSINESS_START_HOUR..BUSINESS_END_HOUR).contains(&time.hour()) {
        return Err(ValidationError::OutOfRange {
            field: "scheduled_time".to_string(),
            min: BUSINESS_START_HOUR as i64,
            max: BUSINESS_END_HOUR as i64,
        });
    }
    Ok(time)
}

pub(crate) fn validate_billing(billing: &BillingAddress) -> ValidationResult<BillingAddress> {
    Ok(BillingAddress {
        address: validate_optional_text("billing_address", billing.address.as_deref())?,
        city: validate_optional_text("billing_city", billing.city.as_deref())?,
        state: validate_optional_text("billing_state", billing.state.as_deref())?,
        zip: validate_optional_text("billing_zip", billing.zip.as_deref())?,
        country: validate_optional_text("billing_country", billing.country.as_deref())?,
    })
}

pub(crate) fn ensure_bookable(service: &Service) -> ValidationResult<()> {
    if !service.is_active {
        return Err(ValidationError::NotAllowed {
            field: "service_id".to_string(),
            allowed: vec!["active services".to_string()],
        });
    }
    Ok(())
}

fn ensure_free(
    booked: &[BookedWindow],
    date: NaiveDate,
    time: ScheduledTime,
    duration_minutes: u32,
) -> CoreResult<()> {
    match find_conflict(&time.window(duration_minutes), booked) {
        Some(conflicting_booking) => Err(CoreError::SlotUnavailable {
            date,
            time: time.to_string(),
            conflicting_booking,
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Operations
// =============================================================================

impl Engine {
    /// Books a cleaning. The slot check and insert share one transaction.
    pub async fn create_booking(&self, actor: &Actor, request: BookingRequest) -> EngineResult<Booking> {
        debug!(service_id = request.service_id, date = %request.scheduled_date, time = %request.scheduled_time, "create_booking");

        let owner = resolve_owner(actor, request.guest.as_ref())?;
        let address = validate_required("address", &request.address)?;
        let square_meters = validate_square_meters(request.square_meters)?;
        let special_instructions =
            validate_optional_text("special_instructions", request.special_instructions.as_deref())?;
        let scheduled_time = validate_start(request.scheduled_time)?;
        let billing = validate_billing(&request.billing)?;

        let _guard = self.lock_schedule().await;
        let mut tx = self.db.begin_write().await?;

        let service = ServiceRepository::fetch(&mut *tx, request.service_id)
            .await?
            .ok_or(CoreError::ServiceNotFound(request.service_id))?;
        ensure_bookable(&service)?;
        let total_price = pricing::price(service.base_price, square_meters)?;

        let booked = BookingRepository::booked_windows(&mut *tx, request.scheduled_date, None).await?;
        ensure_free(
            &booked,
            request.scheduled_date,
            scheduled_time,
            service.effective_duration_minutes(),
        )?;

        let new_booking = NewBooking {
            owner,
            service_id: service.id,
            scheduled_date: request.scheduled_date,
            scheduled_time,
            address,
            square_meters,
            special_instructions,
            total_price,
            status: BookingStatus::Pending,
            billing,
            is_placeholder: false,
        };
        let id = BookingRepository::insert(&mut *tx, &new_booking).await?;
        let created = BookingRepository::fetch(&mut *tx, id)
            .await?
            .ok_or_else(|| EngineError::not_found("Booking", id))?;
        Database::commit(tx).await?;

        info!(
            booking_id = id,
            service = %service.name,
            date = %created.booking.scheduled_date,
            time = %created.booking.scheduled_time,
            price = %created.booking.total_price,
            guest = created.booking.owner.is_guest(),
            "Booking created"
        );
        Ok(created.booking)
    }

    pub async fn get_booking(&self, actor: &Actor, id: i64) -> EngineResult<Booking> {
        let booking = self
            .db
            .bookings()
            .get(id)
            .await?
            .ok_or(CoreError::BookingNotFound(id))?;
        ensure_can_access(actor, &booking.owner)?;
        Ok(booking)
    }

    /// Staff see everything; customers only their own bookings.
    pub async fn list_bookings(&self, actor: &Actor, query: BookingQuery) -> EngineResult<Vec<Booking>> {
        let user_id = if actor.is_staff() {
            query.user_id
        } else {
            Some(
                actor
                    .user_id
                    .ok_or_else(|| CoreError::forbidden("sign in to list bookings"))?,
            )
        };
        let (limit, offset) = page(query.limit, query.offset);

        let filter = BookingFilter {
            user_id,
            status: query.status,
            from: query.from,
            to: query.to,
            limit,
            offset,
        };
        Ok(self.db.bookings().list(&filter).await?)
    }

    /// Guest self-service lookup by booking number and e-mail.
    pub async fn find_guest_booking(&self, id: i64, email: &str) -> EngineResult<Booking> {
        let email = validate_email(email)?;
        let booking = self
            .db
            .bookings()
            .get_guest(id, &email)
            .await?
            .ok_or(CoreError::BookingNotFound(id))?;
        Ok(booking)
    }

    /// Status change limited by the transition table.
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: i64,
        status: BookingStatus,
    ) -> EngineResult<Booking> {
        debug!(id, status = %status, "update_status");

        let changes = BookingChanges {
            status: Some(status),
            ..BookingChanges::default()
        };
        let updated = self
            .write_booking(id, changes, |current| {
                ensure_can_access(actor, &current.owner)?;
                check_transition(actor, current.status, status)
            })
            .await?;

        info!(id, status = %updated.status, "Booking status updated");
        Ok(updated)
    }

    /// Staff edit of any subset of booking fields.
    pub async fn admin_update(
        &self,
        actor: &Actor,
        id: i64,
        update: AdminBookingUpdate,
    ) -> EngineResult<Booking> {
        ensure_staff(actor)?;
        debug!(id, ?update, "admin_update");

        let changes = BookingChanges {
            scheduled_date: update.scheduled_date,
            scheduled_time: update.scheduled_time.map(validate_start).transpose()?,
            address: update
                .address
                .as_deref()
                .map(|a| validate_required("address", a))
                .transpose()?,
            square_meters: update.square_meters.map(validate_square_meters).transpose()?,
            special_instructions: validate_optional_text(
                "special_instructions",
                update.special_instructions.as_deref(),
            )?,
            total_price: update
                .total_price
                .map(|p| validate_positive_amount("total_price", p))
                .transpose()?,
            status: update.status,
            reschedule_reason: None,
        };

        let updated = self.write_booking(id, changes, |_| Ok(())).await?;
        info!(id, "Booking updated by staff");
        Ok(updated)
    }

    /// Moves a booking to a new date and time, keeping the slot rules.
    pub async fn reschedule(
        &self,
        actor: &Actor,
        id: i64,
        request: RescheduleRequest,
    ) -> EngineResult<Booking> {
        ensure_staff(actor)?;

        let changes = BookingChanges {
            scheduled_date: Some(request.scheduled_date),
            scheduled_time: Some(validate_start(request.scheduled_time)?),
            reschedule_reason: validate_optional_text("reason", request.reason.as_deref())?,
            ..BookingChanges::default()
        };

        let updated = self.write_booking(id, changes, |_| Ok(())).await?;
        info!(
            id,
            date = %updated.scheduled_date,
            time = %updated.scheduled_time,
            "Booking rescheduled"
        );
        Ok(updated)
    }

    /// Applies `changes` under the scheduling lock.
    ///
    /// Availability is re-checked when the booking moves, or when it comes
    /// back from a non-blocking status, as long as it ends up blocking.
    async fn write_booking(
        &self,
        id: i64,
        changes: BookingChanges,
        authorize: impl FnOnce(&Booking) -> CoreResult<()>,
    ) -> EngineResult<Booking> {
        let _guard = self.lock_schedule().await;
        let mut tx = self.db.begin_write().await?;

        let current = BookingRepository::fetch(&mut *tx, id)
            .await?
            .filter(|s| !s.booking.is_placeholder)
            .ok_or(CoreError::BookingNotFound(id))?;
        authorize(&current.booking)?;

        let status = changes.status.unwrap_or(current.booking.status);
        let reopening = !current.booking.status.blocks_schedule() && status.blocks_schedule();

        if status.blocks_schedule() && (changes.touches_schedule() || reopening) {
            let date = changes.scheduled_date.unwrap_or(current.booking.scheduled_date);
            let time = changes.scheduled_time.unwrap_or(current.booking.scheduled_time);
            let booked = BookingRepository::booked_windows(&mut *tx, date, Some(id)).await?;
            ensure_free(&booked, date, time, current.duration_minutes)?;
        }

        BookingRepository::apply_changes(&mut *tx, id, &changes).await?;
        let updated = BookingRepository::fetch(&mut *tx, id)
            .await?
            .ok_or_else(|| EngineError::not_found("Booking", id))?;
        Database::commit(tx).await?;

        Ok(updated.booking)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
