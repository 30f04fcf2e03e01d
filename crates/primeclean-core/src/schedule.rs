//! # Schedule Module
//!
//! Wall-clock times, booking windows and slot availability.
//!
//! ## Slot Grid
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Business window 09:00 ─────────────────────────────────────── 18:00    │
//! │                                                                         │
//! │  09 │ 10 │ 11 │ 12 │ 13 │ 14 │ 15 │ 16 │ 17 │   9 slots × 60 min        │
//! │  ───┼────┼────┼────┼────┼────┼────┼────┼────┤                          │
//! │     │████████│    │    │    │    │    │    │   booking 10:00 + 2h      │
//! │                                                                         │
//! │  slot unavailable ⇔ slot_start < booking_end ∧ slot_end > booking_start │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stored Time Formats
//! Legacy rows hold the time as `HH:MM:SS`, `HH:MM`, or a zero-date timestamp
//! artifact `0000-01-01THH:MM:SSZ`. [`ScheduledTime::parse`] accepts exactly
//! those three shapes and nothing else; the store layer normalizes on write.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

// =============================================================================
// Constants
// =============================================================================

/// First bookable hour.
pub const BUSINESS_START_HOUR: u32 = 9;

/// Business day ends at this hour; the last slot starts one hour earlier.
pub const BUSINESS_END_HOUR: u32 = 18;

/// Length of each candidate slot.
pub const SLOT_MINUTES: u32 = 60;

/// Duration assumed for services without a recorded or known duration.
pub const DEFAULT_SERVICE_MINUTES: u32 = 120;

/// Known service durations by catalog name.
const KNOWN_DURATIONS: &[(&str, u32)] = &[
    ("Basic House Cleaning", 120),
    ("Deep House Cleaning", 240),
    ("Office Cleaning", 180),
];

/// Prefix of the zero-date timestamp artifact.
const ZERO_DATE_PREFIX: &str = "0000-01-01T";

/// Infers a duration from the service name, defaulting to two hours.
///
/// ## Example
/// ```rust
/// use primeclean_core::schedule::duration_for_service_name;
///
/// assert_eq!(duration_for_service_name("Deep House Cleaning"), 240);
/// assert_eq!(duration_for_service_name("Window Washing"), 120);
/// ```
pub fn duration_for_service_name(name: &str) -> u32 {
    KNOWN_DURATIONS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, minutes)| *minutes)
        .unwrap_or(DEFAULT_SERVICE_MINUTES)
}

// =============================================================================
// Scheduled Time
// =============================================================================

/// A wall-clock start time with minute precision, independent of the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduledTime(u32);

impl ScheduledTime {
    /// Fallback used when a stored row cannot be read.
    pub const OPENING: ScheduledTime = ScheduledTime(BUSINESS_START_HOUR * 60);

    /// Creates a time from hour and minute.
    pub fn from_hm(hour: u32, minute: u32) -> ValidationResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::invalid_format(
                "scheduled_time",
                format!("{hour:02}:{minute:02} is not a valid time of day"),
            ));
        }
        Ok(ScheduledTime(hour * 60 + minute))
    }

    /// Parses `HH:MM`, `HH:MM:SS` or `0000-01-01THH:MM:SSZ`.
    ///
    /// Seconds are accepted and truncated.
    ///
    /// ## Example
    /// ```rust
    /// use primeclean_core::schedule::ScheduledTime;
    ///
    /// let a = ScheduledTime::parse("10:00").unwrap();
    /// let b = ScheduledTime::parse("10:00:00").unwrap();
    /// let c = ScheduledTime::parse("0000-01-01T10:00:00Z").unwrap();
    /// assert!(a == b && b == c);
    /// assert!(ScheduledTime::parse("10am").is_err());
    /// ```
    pub fn parse(input: &str) -> ValidationResult<Self> {
        let raw = input.trim();
        let clock = match raw.strip_prefix(ZERO_DATE_PREFIX) {
            Some(rest) => rest.strip_suffix('Z').ok_or_else(|| {
                ValidationError::invalid_format("scheduled_time", "timestamp must end in Z")
            })?,
            None => raw,
        };

        let parsed = NaiveTime::parse_from_str(clock, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(clock, "%H:%M"))
            .map_err(|_| {
                ValidationError::invalid_format(
                    "scheduled_time",
                    format!("'{raw}' is not HH:MM or HH:MM:SS"),
                )
            })?;

        Ok(ScheduledTime(parsed.hour() * 60 + parsed.minute()))
    }

    #[inline]
    pub const fn minutes_since_midnight(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn hour(&self) -> u32 {
        self.0 / 60
    }

    #[inline]
    pub const fn minute(&self) -> u32 {
        self.0 % 60
    }

    /// Canonical store representation (`HH:MM:SS`).
    pub fn to_storage(&self) -> String {
        format!("{:02}:{:02}:00", self.hour(), self.minute())
    }

    /// The window this start time occupies for a given duration.
    pub fn window(&self, duration_minutes: u32) -> TimeWindow {
        TimeWindow::new(self.0, self.0 + duration_minutes)
    }
}

/// Renders as `HH:MM`.
impl fmt::Display for ScheduledTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ScheduledTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScheduledTime::parse(s)
    }
}

impl Serialize for ScheduledTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScheduledTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ScheduledTime::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Dates
// =============================================================================

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &str, input: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::invalid_format(field, format!("'{}' is not YYYY-MM-DD", input.trim()))
    })
}

// =============================================================================
// Time Windows
// =============================================================================

/// A half-open interval `[start, end)` in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: u32,
    pub end: u32,
}

impl TimeWindow {
    pub const fn new(start: u32, end: u32) -> Self {
        TimeWindow { start, end }
    }

    /// Interval intersection: `self.start < other.end && self.end > other.start`.
    #[inline]
    pub const fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub const fn duration_minutes(&self) -> u32 {
        self.end - self.start
    }
}

/// A booking's occupied window, tagged with its id for conflict reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedWindow {
    pub booking_id: i64,
    pub window: TimeWindow,
}

/// Returns the first booking whose window overlaps `candidate`, if any.
pub fn find_conflict(candidate: &TimeWindow, booked: &[BookedWindow]) -> Option<i64> {
    booked
        .iter()
        .find(|b| b.window.overlaps(candidate))
        .map(|b| b.booking_id)
}

/// True when `candidate` overlaps none of the booked windows.
pub fn is_window_free(candidate: &TimeWindow, booked: &[BookedWindow]) -> bool {
    find_conflict(candidate, booked).is_none()
}

// =============================================================================
// Slots
// =============================================================================

/// One candidate slot on the availability grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    /// Slot start, `HH:MM`.
    pub time: ScheduledTime,
    pub available: bool,
    pub duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
}

/// Builds the fixed 09:00–18:00 grid and marks each slot against `booked`.
///
/// ## Example
/// ```rust
/// use primeclean_core::schedule::{available_slots, BookedWindow, ScheduledTime};
///
/// let ten = ScheduledTime::from_hm(10, 0).unwrap();
/// let booked = [BookedWindow { booking_id: 1, window: ten.window(120) }];
/// let slots = available_slots(&booked);
/// assert_eq!(slots.len(), 9);
/// assert!(!slots[1].available); // 10:00
/// assert!(slots[3].available);  // 12:00
/// ```
pub fn available_slots(booked: &[BookedWindow]) -> Vec<AvailableSlot> {
    (BUSINESS_START_HOUR..BUSINESS_END_HOUR)
        .map(|hour| {
            let start = hour * 60;
            let window = TimeWindow::new(start, start + SLOT_MINUTES);
            AvailableSlot {
                time: ScheduledTime(start),
                available: is_window_free(&window, booked),
                duration_minutes: SLOT_MINUTES,
                service_type: None,
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
