//! # Customer Profile Repository
//!
//! Identity and default billing details of registered customers. Invoices
//! snapshot these at issue time; later profile edits never reach issued
//! invoices.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteExecutor;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use primeclean_core::{BillingAddress, CustomerProfile};

#[derive(Debug, FromRow)]
struct ProfileRow {
    user_id: i64,
    full_name: String,
    email: String,
    phone: Option<String>,
    billing_address: Option<String>,
    billing_city: Option<String>,
    billing_state: Option<String>,
    billing_zip: Option<String>,
    billing_country: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for CustomerProfile {
    fn from(row: ProfileRow) -> Self {
        CustomerProfile {
            user_id: row.user_id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            billing: BillingAddress {
                address: row.billing_address,
                city: row.billing_city,
                state: row.billing_state,
                zip: row.billing_zip,
                country: row.billing_country,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Profile fields written by an upsert.
#[derive(Debug, Clone)]
pub struct ProfileInput {
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub billing: BillingAddress,
}

#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProfileRepository { pool }
    }

    pub async fn get(&self, user_id: i64) -> DbResult<Option<CustomerProfile>> {
        Self::fetch(&self.pool, user_id).await
    }

    pub async fn fetch<'e>(
        exec: impl SqliteExecutor<'e>,
        user_id: i64,
    ) -> DbResult<Option<CustomerProfile>> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            SELECT user_id, full_name, email, phone,
                   billing_address, billing_city, billing_state, billing_zip, billing_country,
                   created_at, updated_at
            FROM customer_profiles
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(exec)
        .await?;

        Ok(row.map(CustomerProfile::from))
    }

    /// Creates or replaces the profile of `input.user_id`.
    pub async fn upsert(&self, input: &ProfileInput) -> DbResult<CustomerProfile> {
        debug!(user_id = input.user_id, "Upserting customer profile");
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO customer_profiles (
                user_id, full_name, email, phone,
                billing_address, billing_city, billing_state, billing_zip, billing_country,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            ON CONFLICT (user_id) DO UPDATE SET
                full_name = excluded.full_name,
                email = excluded.email,
                phone = excluded.phone,
                billing_address = excluded.billing_address,
                billing_city = excluded.billing_city,
                billing_state = excluded.billing_state,
                billing_zip = excluded.billing_zip,
                billing_country = excluded.billing_country,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(input.user_id)
        .bind(&input.full_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.billing.address)
        .bind(&input.billing.city)
        .bind(&input.billing.state)
        .bind(&input.billing.zip)
        .bind(&input.billing.country)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(input.user_id)
            .await?
            .ok_or_else(|| DbError::not_found("CustomerProfile", input.user_id))
    }
}
