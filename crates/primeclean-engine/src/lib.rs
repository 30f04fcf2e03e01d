//! # PrimeClean Engine
//!
//! Booking scheduling and financial derivation for a cleaning-service
//! business. The engine composes the pure rules of `primeclean-core` with the
//! SQLite store of `primeclean-db` and exposes every operation a caller
//! (HTTP layer, CLI, admin tool) invokes.
//!
//! ## Module Organization
//! ```text
//! primeclean_engine/
//! ├── lib.rs          ◄─── You are here (exports, tracing setup)
//! ├── engine.rs       ◄─── Engine handle: store, config, scheduling lock
//! ├── config.rs       ◄─── TOML + environment configuration
//! ├── error.rs        ◄─── EngineError and stable error kinds
//! └── services/
//!     ├── booking.rs  ◄─── Create, list, status, admin edit, reschedule
//!     ├── slots.rs    ◄─── Daily availability grid
//!     ├── catalog.rs  ◄─── Services and instant estimates
//!     ├── quote.rs    ◄─── Quote requests
//!     ├── invoice.rs  ◄─── Invoice issuance and payment tracking
//!     ├── report.rs   ◄─── Date-range reports
//!     ├── calendar.rs ◄─── Calendar events, day schedule, statistics
//!     └── profile.rs  ◄─── Customer profiles
//! ```
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller ── Actor + request ──► Engine::operation                        │
//! │                                   │                                     │
//! │                                   ├─ validate input (core)              │
//! │                                   ├─ authorize actor (core)             │
//! │                                   ├─ [scheduling lock]                  │
//! │                                   ├─ transaction: check + write (db)    │
//! │                                   └─ Result<T, EngineError>             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use primeclean_engine::{Engine, EngineConfig};
//!
//! # async fn run() -> primeclean_engine::EngineResult<()> {
//! primeclean_engine::init_tracing();
//! let engine = Engine::open(EngineConfig::load_or_default(None)).await?;
//! let services = engine.list_services(true).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod services;

#[cfg(test)]
mod testing;

use tracing_subscriber::EnvFilter;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult, ErrorBody, ErrorKind};
pub use services::booking::{AdminBookingUpdate, BookingQuery, BookingRequest, RescheduleRequest};
pub use services::catalog::{Estimate, ServiceRequest, ServiceUpdate};
pub use services::invoice::{CustomInvoiceRequest, InvoiceQuery, InvoiceRequest, InvoiceUpdate, PaymentRequest};
pub use services::profile::ProfileRequest;
pub use services::quote::{QuoteRequest, QuoteUpdate};

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=primeclean=trace` - Show trace for primeclean crates only
/// - Default: INFO, DEBUG for primeclean crates, WARN for sqlx
///
/// Calling it twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,primeclean=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
