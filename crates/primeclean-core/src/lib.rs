//! # primeclean-core: Pure Scheduling & Invoicing Logic
//!
//! Every rule that decides a price, a free slot, a permitted status change or
//! an invoice total lives here, as deterministic functions with no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      PrimeClean Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              primeclean-engine (Engine services)                │   │
//! │  │   bookings • slots • invoices • quotes • reports • calendar     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ primeclean-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌─────────────┐ ┌───────────┐      │   │
//! │  │   │ pricing  │ │ schedule │ │ transitions │ │ invoicing │      │   │
//! │  │   │  price   │ │  slots   │ │  role table │ │ tax/totals│      │   │
//! │  │   └──────────┘ └──────────┘ └─────────────┘ └───────────┘      │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌─────────────┐ ┌───────────┐      │   │
//! │  │   │  report  │ │ calendar │ │    money    │ │   types   │      │   │
//! │  │   └──────────┘ └──────────┘ └─────────────┘ └───────────┘      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               primeclean-db (Database Layer)                    │   │
//! │  │          SQLite pool, migrations, repositories                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Service, Booking, Invoice, Quote, ...)
//! - [`money`] - Integer-cent money with tax arithmetic
//! - [`schedule`] - Wall-clock times, windows and the slot grid
//! - [`pricing`] - Area-based booking price and quote estimate
//! - [`transitions`] - Who may change a booking's status
//! - [`invoicing`] - Line items, tax, totals, numbering, snapshots
//! - [`report`] - Date-range analytics
//! - [`calendar`] - Calendar events, day schedule, booking statistics
//! - [`validation`] - Input rules shared by every write
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use primeclean_core::invoicing::{build_line_items, compute_totals, TaxPolicy};
//! use primeclean_core::money::Money;
//! use primeclean_core::pricing::price;
//!
//! // 100 m² of a $100.00 service
//! let total = price(Money::from_cents(10_000), 100.0).unwrap();
//! assert_eq!(total.cents(), 20_000);
//!
//! // Tax is already inside the booking price by default
//! let lines = build_line_items(&[], total, "12 Palm Ave").unwrap();
//! let totals = compute_totals(&lines, TaxPolicy::default(), false);
//! assert_eq!(totals.subtotal + totals.tax_amount, totals.total_amount);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calendar;
pub mod error;
pub mod invoicing;
pub mod money;
pub mod pricing;
pub mod report;
pub mod schedule;
pub mod transitions;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use schedule::ScheduledTime;
pub use transitions::{Actor, Role};
pub use types::*;
