//! # Store Handle
//!
//! Opens the PrimeClean SQLite file, applies migrations and hands out
//! repositories and transactions.
//!
//! ## Reads and Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::new(DbConfig) ── open file (WAL, FK on) ── migrate           │
//! │       │                                                                 │
//! │       ├── db.bookings().list(..)      one pooled connection per query   │
//! │       │                                                                 │
//! │       └── db.begin_write() ─► tx      one connection for the whole unit │
//! │              ├── BookingRepository::booked_windows(&mut *tx, ..)        │
//! │              ├── BookingRepository::insert(&mut *tx, ..)                │
//! │              └── Database::commit(tx)   (drop = rollback)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL keeps readers (slot grids, reports) off the writer's back; SQLite
//! still allows a single writer, which is what serializes invoice numbering.
//! Units of work open with `BEGIN IMMEDIATE`, so a writer waits for the lock
//! up front (bounded by the busy timeout) instead of failing with
//! `database is locked` when its read snapshot goes stale.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::booking::BookingRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::profile::ProfileRepository;
use crate::repository::quote::QuoteRepository;
use crate::repository::report::ReportRepository;
use crate::repository::service::ServiceRepository;

const MEMORY: &str = ":memory:";

/// Takes the write lock when the transaction opens.
pub(crate) const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

// =============================================================================
// Configuration
// =============================================================================

/// Where the store lives and how many connections it may hold.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
    /// How long a writer waits on another connection's write lock.
    pub busy_timeout: Duration,
}

impl DbConfig {
    /// File-backed store; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(10),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Private in-memory store for tests.
    ///
    /// One connection only: every connection to `:memory:` would otherwise
    /// see its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }

    fn is_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY
    }
}

// =============================================================================
// Database
// =============================================================================

/// An open unit of work; rolled back when dropped uncommitted.
pub type DbTransaction = Transaction<'static, Sqlite>;

/// Shared store handle. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the store and brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening store");

        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let mut options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);
        if !config.is_memory() {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            // an in-memory database vanishes with its last connection
            .idle_timeout(if config.is_memory() { None } else { Some(Duration::from_secs(600)) })
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(max_connections = config.max_connections, "Pool ready");

        migrations::run_migrations(&pool).await?;
        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a unit of work holding the store's write lock.
    ///
    /// The transaction holds one pooled connection until committed or
    /// dropped. Don't call pool-backed repository methods while holding it:
    /// with the single-connection test store they would wait forever.
    pub async fn begin_write(&self) -> DbResult<DbTransaction> {
        self.pool
            .begin_with(BEGIN_WRITE)
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    pub async fn commit(tx: DbTransaction) -> DbResult<()> {
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    pub fn services(&self) -> ServiceRepository {
        ServiceRepository::new(self.pool.clone())
    }

    pub fn bookings(&self) -> BookingRepository {
        BookingRepository::new(self.pool.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    pub fn quotes(&self) -> QuoteRepository {
        QuoteRepository::new(self.pool.clone())
    }

    pub fn profiles(&self) -> ProfileRepository {
        ProfileRepository::new(self.pool.clone())
    }

    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    pub async fn close(&self) {
        info!("Closing store");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
