//! # Slot Availability
//!
//! The daily grid of nine one-hour slots from 09:00 to 17:00. A slot is
//! taken when any pending, confirmed, in-progress or completed booking on
//! the date overlaps it; the whole business is one schedule, so the service
//! asked about does not narrow the check.

use chrono::NaiveDate;
use tracing::debug;

use crate::engine::Engine;
use crate::error::EngineResult;
use primeclean_core::schedule::{available_slots, AvailableSlot};
use primeclean_core::CoreError;
use primeclean_db::BookingRepository;

impl Engine {
    /// Availability for `date`; `service_id`, when given, must exist and is
    /// echoed back as the slots' service type.
    pub async fn available_slots(
        &self,
        date: NaiveDate,
        service_id: Option<i64>,
    ) -> EngineResult<Vec<AvailableSlot>> {
        let service_type = match service_id {
            Some(id) => {
                let service = self
                    .db
                    .services()
                    .get_by_id(id)
                    .await?
                    .ok_or(CoreError::ServiceNotFound(id))?;
                Some(service.service_type.as_str().to_string())
            }
            None => None,
        };

        let booked = BookingRepository::booked_windows(self.db.pool(), date, None).await?;
        debug!(%date, booked = booked.len(), "Computing slot availability");

        Ok(available_slots(&booked)
            .into_iter()
            .map(|slot| AvailableSlot {
                service_type: service_type.clone(),
                ..slot
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{add_service, at, booking_request, day, test_engine, STAFF};
    use primeclean_core::{Actor, BookingStatus};

    #[tokio::test]
    async fn test_two_hour_booking_blocks_two_slots() {
        let engine = test_engine().await;
        let service = add_service(&engine, "Basic House Cleaning", 10_000, 120).await;
        let date = day(2025, 6, 1);
        engine
            .create_booking(&Actor::guest(), booking_request(service.id, date, "10:00"))
            .await
            .unwrap();

        let slots = engine.available_slots(date, Some(service.id)).await.unwrap();
        assert_eq!(slots.len(), 9);

        let free = |time: &str| slots.iter().find(|s| s.time == at(time)).unwrap().available;
        assert!(free("09:00"));
        assert!(!free("10:00"));
        assert!(!free("11:00"));
        assert!(free("12:00"));
        assert!(slots.iter().all(|s| s.service_type.as_deref() == Some("residential")));

        // other days are untouched
        let next = engine.available_slots(day(2025, 6, 2), None).await.unwrap();
        assert!(next.iter().all(|s| s.available && s.service_type.is_none()));
    }

    #[tokio::test]
    async fn test_cancelled_bookings_do_not_block() {
        let engine = test_engine().await;
        let service = add_service(&engine, "Basic House Cleaning", 10_000, 120).await;
        let date = day(2025, 6, 1);
        let booking = engine
            .create_booking(&Actor::guest(), booking_request(service.id, date, "15:00"))
            .await
            .unwrap();
        engine
            .update_status(&STAFF, booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        let slots = engine.available_slots(date, None).await.unwrap();
        assert!(slots.iter().all(|s| s.available));

        let rebooked = engine
            .create_booking(&Actor::guest(), booking_request(service.id, date, "15:00"))
            .await
            .unwrap();
        assert_ne!(rebooked.id, booking.id);
    }

    #[tokio::test]
    async fn test_unknown_service_is_not_found() {
        let engine = test_engine().await;
        let err = engine.available_slots(day(2025, 6, 1), Some(42)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
