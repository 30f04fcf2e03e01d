//! # Engine Handle
//!
//! [`Engine`] owns the store handle, the loaded configuration and the
//! scheduling lock. It is cheap to clone; every clone shares the same pool
//! and the same lock.
//!
//! ## Scheduling Lock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_booking ─┐                                                      │
//! │  admin_update ───┼──► lock ──► BEGIN ─► booked_windows ─► write ─► COMMIT│
//! │  reschedule ─────┤                                                      │
//! │  update_status ──┘    (one writer at a time per process)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A slot read as free inside the lock cannot be taken by another task
//! before this task's write commits.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use primeclean_db::Database;

#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) db: Database,
    pub(crate) config: Arc<EngineConfig>,
    schedule_lock: Arc<Mutex<()>>,
}

impl Engine {
    /// Wraps an already connected store.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Engine {
            db,
            config: Arc::new(config),
            schedule_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Connects to the configured database (running migrations) and builds
    /// the engine.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        info!(path = %config.database.path.display(), "Opening engine store");

        if let Some(dir) = config.database.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    EngineError::Config(format!("cannot create {}: {e}", dir.display()))
                })?;
            }
        }

        let db = Database::new(config.db_config()).await?;
        Ok(Self::new(db, config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Waits for exclusive access to the schedule.
    pub(crate) async fn lock_schedule(&self) -> MutexGuard<'_, ()> {
        self.schedule_lock.lock().await
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
