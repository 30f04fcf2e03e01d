//! # Calendar Views
//!
//! Staff-facing projections of bookings: calendar events, a day schedule
//! with totals, and booking statistics over a trailing period.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Booking, BookingOwner, BookingStatus};

/// Shown when a registered customer has no profile name.
pub const REGISTERED_USER_LABEL: &str = "Registered User";

// =============================================================================
// Events
// =============================================================================

/// One booking placed on the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CalendarEvent {
    pub id: i64,
    /// `"{service} - {customer}"`.
    pub title: String,
    #[ts(as = "String")]
    pub start: NaiveDateTime,
    #[ts(as = "String")]
    pub end: NaiveDateTime,
    pub color: String,
    pub status: BookingStatus,
    pub service_name: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub address: String,
    pub square_meters: f64,
    pub total_price: Money,
    pub is_guest_booking: bool,
}

impl CalendarEvent {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Name shown for a booking's customer.
pub fn customer_display_name(owner: &BookingOwner, profile_name: Option<&str>) -> String {
    match owner {
        BookingOwner::Guest { contact } => contact.name.clone(),
        BookingOwner::Registered { .. } => profile_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(REGISTERED_USER_LABEL)
            .to_string(),
    }
}

/// Places a booking on the calendar.
///
/// `duration_minutes` is the effective duration of the booked service.
pub fn build_event(booking: &Booking, customer_name: String, duration_minutes: u32) -> CalendarEvent {
    let time = booking.scheduled_time;
    let start_time =
        NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(NaiveTime::MIN);
    let start = booking.scheduled_date.and_time(start_time);
    let end = start + Duration::minutes(i64::from(duration_minutes));

    let (email, phone) = match booking.owner.guest() {
        Some(guest) => (Some(guest.email.clone()), Some(guest.phone.clone())),
        None => (None, None),
    };

    CalendarEvent {
        id: booking.id,
        title: format!("{} - {}", booking.service_name, customer_name),
        start,
        end,
        color: booking.status.calendar_color().to_string(),
        status: booking.status,
        service_name: booking.service_name.clone(),
        customer_name,
        customer_email: email,
        customer_phone: phone,
        address: booking.address.clone(),
        square_meters: booking.square_meters,
        total_price: booking.total_price,
        is_guest_booking: booking.owner.is_guest(),
    }
}

// =============================================================================
// Day Schedule
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DayStats {
    pub total_bookings: u32,
    pub revenue: Money,
    /// Mean event length in hours.
    pub avg_duration_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DaySchedule {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub bookings: Vec<CalendarEvent>,
    pub stats: DayStats,
}

/// Wraps one day's events with their totals.
pub fn day_schedule(date: NaiveDate, events: Vec<CalendarEvent>) -> DaySchedule {
    let revenue = events.iter().map(|e| e.total_price).sum();
    let minutes: i64 = events.iter().map(CalendarEvent::duration_minutes).sum();
    let avg_duration_hours = if events.is_empty() {
        0.0
    } else {
        minutes as f64 / 60.0 / events.len() as f64
    };

    DaySchedule {
        date,
        stats: DayStats {
            total_bookings: events.len() as u32,
            revenue,
            avg_duration_hours,
        },
        bookings: events,
    }
}

// =============================================================================
// Booking Statistics
// =============================================================================

/// Trailing window for booking statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl StatsPeriod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::Weekly => "weekly",
            StatsPeriod::Monthly => "monthly",
            StatsPeriod::Yearly => "yearly",
        }
    }

    /// Start of the counting window.
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            StatsPeriod::Weekly => now - Duration::days(7),
            StatsPeriod::Monthly => now.checked_sub_months(Months::new(1)).unwrap_or(now),
            StatsPeriod::Yearly => now.checked_sub_months(Months::new(12)).unwrap_or(now),
        }
    }

    /// Whether the stats carry a revenue-by-month series.
    pub const fn has_monthly_series(&self) -> bool {
        matches!(self, StatsPeriod::Monthly | StatsPeriod::Yearly)
    }

    /// Earliest creation timestamp any part of the stats looks at.
    pub fn fetch_since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if self.has_monthly_series() {
            self.since(now).min(revenue_series_start(now))
        } else {
            self.since(now)
        }
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(StatsPeriod::Weekly),
            "monthly" => Ok(StatsPeriod::Monthly),
            "yearly" => Ok(StatsPeriod::Yearly),
            _ => Err(ValidationError::NotAllowed {
                field: "period".to_string(),
                allowed: vec!["weekly".into(), "monthly".into(), "yearly".into()],
            }),
        }
    }
}

fn revenue_series_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(12)).unwrap_or(now)
}

/// Minimal booking facts the statistics fold over.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub status: BookingStatus,
    pub service_name: String,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthRevenue {
    /// `YYYY-MM`.
    pub month: String,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingStats {
    pub period: StatsPeriod,
    pub total_bookings: u32,
    pub completed_bookings: u32,
    pub cancelled_bookings: u32,
    pub pending_bookings: u32,
    /// Completed bookings only.
    pub total_revenue: Money,
    pub avg_booking_value: Money,
    pub bookings_by_status: BTreeMap<String, u32>,
    pub bookings_by_service: BTreeMap<String, u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub revenue_by_month: Vec<MonthRevenue>,
}

/// Folds rows (by creation time) into statistics for `period` ending at `now`.
pub fn booking_stats(period: StatsPeriod, now: DateTime<Utc>, rows: &[StatsRow]) -> BookingStats {
    let since = period.since(now);

    let mut stats = BookingStats {
        period,
        total_bookings: 0,
        completed_bookings: 0,
        cancelled_bookings: 0,
        pending_bookings: 0,
        total_revenue: Money::zero(),
        avg_booking_value: Money::zero(),
        bookings_by_status: BTreeMap::new(),
        bookings_by_service: BTreeMap::new(),
        revenue_by_month: Vec::new(),
    };

    for row in rows.iter().filter(|r| r.created_at >= since && r.created_at <= now) {
        stats.total_bookings += 1;
        match row.status {
            BookingStatus::Completed => {
                stats.completed_bookings += 1;
                stats.total_revenue += row.total_price;
            }
            BookingStatus::Cancelled => stats.cancelled_bookings += 1,
            BookingStatus::Pending => stats.pending_bookings += 1,
            BookingStatus::Confirmed | BookingStatus::InProgress => {}
        }
        *stats
            .bookings_by_status
            .entry(row.status.as_str().to_string())
            .or_default() += 1;
        *stats
            .bookings_by_service
            .entry(row.service_name.clone())
            .or_default() += 1;
    }

    stats.avg_booking_value =
        Money::average(stats.total_revenue, stats.completed_bookings as usize);

    if period.has_monthly_series() {
        let series_start = revenue_series_start(now);
        let mut months: BTreeMap<String, Money> = BTreeMap::new();
        for row in rows
            .iter()
            .filter(|r| r.created_at >= series_start && r.created_at <= now)
        {
            let key = format!("{:04}-{:02}", row.created_at.year(), row.created_at.month());
            let entry = months.entry(key).or_default();
            if row.status == BookingStatus::Completed {
                *entry += row.total_price;
            }
        }
        stats.revenue_by_month = months
            .into_iter()
            .map(|(month, revenue)| MonthRevenue { month, revenue })
            .collect();
    }

    stats
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ScheduledTime;
    use crate::types::{BillingAddress, GuestContact};
    use chrono::TimeZone;

    fn guest_booking(hour: u32, cents: i64, status: BookingStatus) -> Booking {
        Booking {
            id: 7,
            owner: BookingOwner::Guest {
                contact: GuestContact {
                    name: "Ana Lopez".to_string(),
                    email: "ana@example.com".to_string(),
                    phone: "555-0100".to_string(),
                },
            },
            service_id: 1,
            service_name: "Deep House Cleaning".to_string(),
            scheduled_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            scheduled_time: ScheduledTime::from_hm(hour, 30).unwrap(),
            address: "12 Palm Ave".to_string(),
            square_meters: 90.0,
            special_instructions: None,
            total_price: Money::from_cents(cents),
            status,
            invoice_id: None,
            billing: BillingAddress::default(),
            reschedule_reason: None,
            is_placeholder: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn row(status: BookingStatus, cents: i64, created_at: DateTime<Utc>) -> StatsRow {
        StatsRow {
            status,
            service_name: "Office Cleaning".to_string(),
            total_price: Money::from_cents(cents),
            created_at,
        }
    }

    #[test]
    fn test_event_shape() {
        let booking = guest_booking(10, 18_000, BookingStatus::Confirmed);
        let name = customer_display_name(&booking.owner, None);
        let event = build_event(&booking, name, 240);

        assert_eq!(event.title, "Deep House Cleaning - Ana Lopez");
        assert_eq!(event.start.time(), NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert_eq!(event.end.time(), NaiveTime::from_hms_opt(14, 30, 0).unwrap());
        assert_eq!(event.color, "#4CAF50");
        assert!(event.is_guest_booking);
        assert_eq!(event.customer_email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn test_registered_name_fallback() {
        let owner = BookingOwner::Registered { user_id: 4 };
        assert_eq!(customer_display_name(&owner, None), "Registered User");
        assert_eq!(customer_display_name(&owner, Some(" ")), "Registered User");
        assert_eq!(customer_display_name(&owner, Some("Ben Ortiz")), "Ben Ortiz");
    }

    #[test]
    fn test_day_schedule_totals() {
        let a = build_event(&guest_booking(9, 10_000, BookingStatus::Pending), "A".into(), 120);
        let b = build_event(&guest_booking(13, 20_000, BookingStatus::Pending), "B".into(), 240);
        let day = day_schedule(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), vec![a, b]);

        assert_eq!(day.stats.total_bookings, 2);
        assert_eq!(day.stats.revenue.cents(), 30_000);
        assert!((day.stats.avg_duration_hours - 3.0).abs() < 1e-9);

        let empty = day_schedule(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(), vec![]);
        assert_eq!(empty.stats.avg_duration_hours, 0.0);
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("Weekly".parse::<StatsPeriod>().unwrap(), StatsPeriod::Weekly);
        assert!("daily".parse::<StatsPeriod>().is_err());
    }

    #[test]
    fn test_weekly_stats_window() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let rows = vec![
            row(BookingStatus::Completed, 10_000, now - Duration::days(1)),
            row(BookingStatus::Completed, 30_000, now - Duration::days(2)),
            row(BookingStatus::Cancelled, 5_000, now - Duration::days(3)),
            row(BookingStatus::Completed, 99_900, now - Duration::days(20)),
        ];

        let stats = booking_stats(StatsPeriod::Weekly, now, &rows);
        assert_eq!(stats.total_bookings, 3);
        assert_eq!(stats.completed_bookings, 2);
        assert_eq!(stats.cancelled_bookings, 1);
        assert_eq!(stats.total_revenue.cents(), 40_000);
        assert_eq!(stats.avg_booking_value.cents(), 20_000);
        assert_eq!(stats.bookings_by_service["Office Cleaning"], 3);
        assert!(stats.revenue_by_month.is_empty());
    }

    #[test]
    fn test_monthly_series() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let rows = vec![
            row(BookingStatus::Completed, 10_000, now - Duration::days(1)),
            row(BookingStatus::Completed, 20_000, now - Duration::days(60)),
            row(BookingStatus::Pending, 50_000, now - Duration::days(61)),
        ];

        let stats = booking_stats(StatsPeriod::Monthly, now, &rows);
        assert_eq!(stats.total_bookings, 1);
        assert_eq!(
            stats.revenue_by_month,
            vec![
                MonthRevenue {
                    month: "2025-04".to_string(),
                    revenue: Money::from_cents(20_000),
                },
                MonthRevenue {
                    month: "2025-06".to_string(),
                    revenue: Money::from_cents(10_000),
                },
            ]
        );
        assert!(StatsPeriod::Monthly.fetch_since(now) <= StatsPeriod::Monthly.since(now));
    }
}
