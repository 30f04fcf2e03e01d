//! # Quote Repository
//!
//! Price estimate requests and their admin follow-up.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use primeclean_core::{Money, Quote, QuoteStatus};

const QUOTE_SELECT: &str = r#"
    SELECT
        q.id, q.service_id, s.name AS service_name, q.square_meters, q.address,
        q.special_requirements, q.preferred_date,
        q.contact_name, q.contact_email, q.contact_phone,
        q.estimated_price_cents, q.status, q.admin_notes, q.created_at, q.updated_at
    FROM quotes q
    JOIN services s ON s.id = q.service_id
"#;

#[derive(Debug, FromRow)]
struct QuoteRow {
    id: i64,
    service_id: i64,
    service_name: String,
    square_meters: f64,
    address: String,
    special_requirements: Option<String>,
    preferred_date: Option<NaiveDate>,
    contact_name: String,
    contact_email: String,
    contact_phone: Option<String>,
    estimated_price_cents: i64,
    status: QuoteStatus,
    admin_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<QuoteRow> for Quote {
    fn from(row: QuoteRow) -> Self {
        Quote {
            id: row.id,
            service_id: row.service_id,
            service_name: row.service_name,
            square_meters: row.square_meters,
            address: row.address,
            special_requirements: row.special_requirements,
            preferred_date: row.preferred_date,
            contact_name: row.contact_name,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            estimated_price: Money::from_cents(row.estimated_price_cents),
            status: row.status,
            admin_notes: row.admin_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A priced quote request ready to insert.
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub service_id: i64,
    pub square_meters: f64,
    pub address: String,
    pub special_requirements: Option<String>,
    pub preferred_date: Option<NaiveDate>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub estimated_price: Money,
}

/// Admin-side quote update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct QuoteChanges {
    pub status: Option<QuoteStatus>,
    pub estimated_price: Option<Money>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: SqlitePool,
}

impl QuoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        QuoteRepository { pool }
    }

    pub async fn insert(&self, quote: &NewQuote) -> DbResult<Quote> {
        debug!(service_id = quote.service_id, price = %quote.estimated_price, "Inserting quote");
        let now = Utc::now();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO quotes (
                service_id, square_meters, address, special_requirements, preferred_date,
                contact_name, contact_email, contact_phone, estimated_price_cents,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending', ?10, ?10)
            RETURNING id
            "#,
        )
        .bind(quote.service_id)
        .bind(quote.square_meters)
        .bind(&quote.address)
        .bind(&quote.special_requirements)
        .bind(quote.preferred_date)
        .bind(&quote.contact_name)
        .bind(&quote.contact_email)
        .bind(&quote.contact_phone)
        .bind(quote.estimated_price.cents())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Quote", id))
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Quote>> {
        let sql = format!("{QUOTE_SELECT} WHERE q.id = ?1");
        let row: Option<QuoteRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Quote::from))
    }

    /// Newest first, optionally narrowed to one status.
    pub async fn list(
        &self,
        status: Option<QuoteStatus>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Quote>> {
        let sql = format!(
            "{QUOTE_SELECT} WHERE (?1 IS NULL OR q.status = ?1) \
             ORDER BY q.created_at DESC, q.id DESC LIMIT ?2 OFFSET ?3"
        );
        let rows: Vec<QuoteRow> = sqlx::query_as(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Quote::from).collect())
    }

    pub async fn update(&self, id: i64, changes: &QuoteChanges) -> DbResult<Quote> {
        debug!(id, ?changes, "Updating quote");

        let result = sqlx::query(
            r#"
            UPDATE quotes SET
                status = COALESCE(?2, status),
                estimated_price_cents = COALESCE(?3, estimated_price_cents),
                admin_notes = COALESCE(?4, admin_notes),
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(changes.status)
        .bind(changes.estimated_price.map(|m| m.cents()))
        .bind(&changes.admin_notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Quote", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Quote", id))
    }
}
