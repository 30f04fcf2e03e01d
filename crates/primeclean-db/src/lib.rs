//! # primeclean-db: Database Layer for PrimeClean
//!
//! SQLite persistence for services, bookings, invoices, quotes and customer
//! profiles, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PrimeClean Data Flow                             │
//! │                                                                         │
//! │  Engine operation (create_booking, create_invoice, report, ...)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   primeclean-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ServiceRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ BookingRepo   │    │ 001_initial  │  │   │
//! │  │   │ begin_write() │    │ InvoiceRepo   │    │   _schema    │  │   │
//! │  │   │               │    │ QuoteRepo ... │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL, foreign keys on)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Store handle, configuration and transactions
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use primeclean_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("primeclean.db")).await?;
//! let services = db.services().list(true).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, DbTransaction};

pub use repository::booking::{BookingRepository, ScheduledBooking};
pub use repository::invoice::InvoiceRepository;
pub use repository::profile::ProfileRepository;
pub use repository::quote::QuoteRepository;
pub use repository::report::ReportRepository;
pub use repository::service::ServiceRepository;
