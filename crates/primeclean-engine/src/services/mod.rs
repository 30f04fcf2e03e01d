//! # Engine Operations
//!
//! Each module adds one `impl Engine` block plus the request types its
//! operations accept.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Module      Operations                              Who                │
//! │  ──────────  ──────────────────────────────────────  ────────────────── │
//! │  booking     create / get / list / guest lookup      anyone (own data)  │
//! │              update_status                           owner or staff     │
//! │              admin_update / reschedule               staff              │
//! │  slots       available_slots                         anyone             │
//! │  catalog     list / get / estimate                   anyone             │
//! │              create / update service                 staff              │
//! │  quote       create                                  anyone             │
//! │              list / get / update                     staff              │
//! │  invoice     everything                              staff              │
//! │  report      report                                  staff              │
//! │  calendar    events / day schedule / stats           staff              │
//! │  profile     upsert / get                            owner or staff     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod booking;
pub mod calendar;
pub mod catalog;
pub mod invoice;
pub mod profile;
pub mod quote;
pub mod report;
pub mod slots;

/// Clamps caller paging to sane bounds.
pub(crate) fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (limit.unwrap_or(50).clamp(1, 500), offset.unwrap_or(0).max(0))
}
