//! # Repository Module
//!
//! One repository per table family, each a thin handle over the pool.
//!
//! ## Pool vs. Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.bookings().list(&filter)           &self methods use the pool       │
//! │                                                                         │
//! │  let mut tx = db.begin_write().await?;                                  │
//! │  BookingRepository::booked_windows(&mut *tx, date, None)                │
//! │  BookingRepository::insert(&mut *tx, &new_booking)                      │
//! │  tx.commit().await?;                   associated fns take an executor  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`service::ServiceRepository`] - Service catalog
//! - [`booking::BookingRepository`] - Bookings, schedule windows, statistics rows
//! - [`invoice::InvoiceRepository`] - Invoices, line items, number sequences
//! - [`quote::QuoteRepository`] - Quote requests
//! - [`profile::ProfileRepository`] - Registered customer profiles
//! - [`report::ReportRepository`] - Read-only report projections

pub mod booking;
pub mod invoice;
pub mod profile;
pub mod quote;
pub mod report;
pub mod service;
