//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied on every open. `_sqlx_migrations` records what already ran, so
//! reopening an up-to-date store is a no-op.
//!
//! | File                     | Adds                                           |
//! |--------------------------|------------------------------------------------|
//! | `001_initial_schema.sql` | services, bookings, invoices + items, yearly   |
//! |                          | invoice sequences, quotes, customer profiles   |
//!
//! Schema changes go in a new `NNN_description.sql`; applied files are never
//! edited.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(count = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    // a store that was never migrated has no bookkeeping table
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
