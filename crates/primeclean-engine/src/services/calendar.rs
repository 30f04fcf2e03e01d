//! # Calendar
//!
//! Staff views over the schedule. Cancelled bookings stay on the calendar
//! (drawn in their own color) so staff can see what dropped out.

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::engine::Engine;
use crate::error::EngineResult;
use primeclean_core::calendar::{
    self, build_event, customer_display_name, BookingStats, CalendarEvent, DaySchedule,
    StatsPeriod,
};
use primeclean_core::report::DateRange;
use primeclean_core::transitions::ensure_staff;
use primeclean_core::Actor;

impl Engine {
    /// Events for every booking scheduled in `[start, end]`.
    pub async fn calendar_events(
        &self,
        actor: &Actor,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<Vec<CalendarEvent>> {
        ensure_staff(actor)?;
        let range = DateRange::new(start, end)?;
        self.events_in(range).await
    }

    pub async fn day_schedule(&self, actor: &Actor, date: NaiveDate) -> EngineResult<DaySchedule> {
        ensure_staff(actor)?;
        let events = self.events_in(DateRange::new(date, date)?).await?;
        Ok(calendar::day_schedule(date, events))
    }

    /// Statistics over bookings created in the trailing `period`.
    pub async fn booking_stats(&self, actor: &Actor, period: StatsPeriod) -> EngineResult<BookingStats> {
        ensure_staff(actor)?;
        let now = Utc::now();
        let rows = self
            .db
            .bookings()
            .created_since(period.fetch_since(now))
            .await?;
        debug!(%period, rows = rows.len(), "booking_stats");
        Ok(calendar::booking_stats(period, now, &rows))
    }

    async fn events_in(&self, range: DateRange) -> EngineResult<Vec<CalendarEvent>> {
        let scheduled = self.db.bookings().in_range(range.start, range.end).await?;
        debug!(start = %range.start, end = %range.end, count = scheduled.len(), "calendar events");

        Ok(scheduled
            .iter()
            .map(|s| {
                let customer = customer_display_name(&s.booking.owner, s.profile_name.as_deref());
                build_event(&s.booking, customer, s.duration_minutes)
            })
            .collect())
    }
}
