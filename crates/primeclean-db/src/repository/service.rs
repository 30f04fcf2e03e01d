//! # Service Repository
//!
//! The service catalog: what can be booked and at what base price.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteExecutor;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use primeclean_core::{Money, Service, ServiceType};

/// Columns selected for every service read.
const SERVICE_COLUMNS: &str = r#"
    id, name, description, base_price_cents, duration_minutes,
    service_type, is_active, created_at, updated_at
"#;

#[derive(Debug, FromRow)]
struct ServiceRow {
    id: i64,
    name: String,
    description: Option<String>,
    base_price_cents: i64,
    duration_minutes: Option<i64>,
    service_type: ServiceType,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            name: row.name,
            description: row.description,
            base_price: Money::from_cents(row.base_price_cents),
            duration_minutes: row
                .duration_minutes
                .and_then(|m| u32::try_from(m).ok())
                .filter(|m| *m > 0),
            service_type: row.service_type,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A validated service ready to insert.
#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub base_price: Money,
    pub duration_minutes: Option<u32>,
    pub service_type: ServiceType,
    pub is_active: bool,
}

/// Sparse service update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ServiceChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<Money>,
    pub duration_minutes: Option<u32>,
    pub service_type: Option<ServiceType>,
    pub is_active: Option<bool>,
}

/// Repository for service database operations.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    /// Lists services by name, optionally only the active ones.
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Service>> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE (?1 = 0 OR is_active = 1) ORDER BY name"
        );
        let rows: Vec<ServiceRow> = sqlx::query_as(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Service::from).collect())
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Service>> {
        Self::fetch(&self.pool, id).await
    }

    /// Looks a service up on any executor (pool or open transaction).
    pub async fn fetch<'e>(exec: impl SqliteExecutor<'e>, id: i64) -> DbResult<Option<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1");
        let row: Option<ServiceRow> = sqlx::query_as(&sql).bind(id).fetch_optional(exec).await?;
        Ok(row.map(Service::from))
    }

    /// Inserts a service; a taken name surfaces as `UniqueViolation`.
    pub async fn insert(&self, service: &NewService) -> DbResult<Service> {
        debug!(name = %service.name, "Inserting service");
        let now = Utc::now();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO services (
                name, description, base_price_cents, duration_minutes,
                service_type, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING id
            "#,
        )
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.base_price.cents())
        .bind(service.duration_minutes.map(i64::from))
        .bind(service.service_type)
        .bind(service.is_active)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Service", id))
    }

    /// Applies the present fields of `changes`.
    pub async fn update(&self, id: i64, changes: &ServiceChanges) -> DbResult<Service> {
        debug!(id, "Updating service");

        let result = sqlx::query(
            r#"
            UPDATE services SET
                name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                base_price_cents = COALESCE(?4, base_price_cents),
                duration_minutes = COALESCE(?5, duration_minutes),
                service_type = COALESCE(?6, service_type),
                is_active = COALESCE(?7, is_active),
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.base_price.map(|m| m.cents()))
        .bind(changes.duration_minutes.map(i64::from))
        .bind(changes.service_type)
        .bind(changes.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Service", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
