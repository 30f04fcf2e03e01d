//! # Quote Requests
//!
//! Prospective customers ask for a price; staff follow up. The estimate uses
//! the booking price rule plus a surcharge for long special requirements.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::Engine;
use crate::error::EngineResult;
use crate::services::booking::ensure_bookable;
use crate::services::page;
use primeclean_core::pricing;
use primeclean_core::transitions::ensure_staff;
use primeclean_core::validation::{
    validate_email, validate_optional_text, validate_positive_amount, validate_required,
    validate_square_meters,
};
use primeclean_core::{Actor, CoreError, Money, Quote, QuoteStatus};
use primeclean_db::repository::quote::{NewQuote, QuoteChanges};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub service_id: i64,
    pub square_meters: f64,
    pub address: String,
    #[serde(default)]
    pub special_requirements: Option<String>,
    #[serde(default)]
    pub preferred_date: Option<NaiveDate>,
    pub contact_name: String,
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteUpdate {
    pub status: Option<QuoteStatus>,
    pub estimated_price: Option<Money>,
    pub admin_notes: Option<String>,
}

impl Engine {
    pub async fn create_quote(&self, request: QuoteRequest) -> EngineResult<Quote> {
        let square_meters = validate_square_meters(request.square_meters)?;
        let special_requirements =
            validate_optional_text("special_requirements", request.special_requirements.as_deref())?;

        let service = self.get_service(request.service_id).await?;
        ensure_bookable(&service)?;

        let quote = NewQuote {
            service_id: service.id,
            square_meters,
            address: validate_required("address", &request.address)?,
            estimated_price: pricing::quote_estimate(
                service.base_price,
                square_meters,
                special_requirements.as_deref(),
            )?,
            special_requirements,
            preferred_date: request.preferred_date,
            contact_name: validate_required("contact_name", &request.contact_name)?,
            contact_email: validate_email(&request.contact_email)?,
            contact_phone: validate_optional_text("contact_phone", request.contact_phone.as_deref())?,
        };

        let created = self.db.quotes().insert(&quote).await?;
        info!(id = created.id, service = %created.service_name, estimate = %created.estimated_price, "Quote requested");
        Ok(created)
    }

    pub async fn list_quotes(
        &self,
        actor: &Actor,
        status: Option<QuoteStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> EngineResult<Vec<Quote>> {
        ensure_staff(actor)?;
        let (limit, offset) = page(limit, offset);
        Ok(self.db.quotes().list(status, limit, offset).await?)
    }

    pub async fn get_quote(&self, actor: &Actor, id: i64) -> EngineResult<Quote> {
        ensure_staff(actor)?;
        let quote = self
            .db
            .quotes()
            .get(id)
            .await?
            .ok_or(CoreError::QuoteNotFound(id))?;
        Ok(quote)
    }

    pub async fn update_quote(&self, actor: &Actor, id: i64, update: QuoteUpdate) -> EngineResult<Quote> {
        ensure_staff(actor)?;

        let changes = QuoteChanges {
            status: update.status,
            estimated_price: update
                .estimated_price
                .map(|p| validate_positive_amount("estimated_price", p))
                .transpose()?,
            admin_notes: validate_optional_text("admin_notes", update.admin_notes.as_deref())?,
        };

        let updated = self.db.quotes().update(id, &changes).await?;
        info!(id, status = %updated.status, "Quote updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{add_service, test_engine, STAFF};

    fn request(service_id: i64, requirements: Option<String>) -> QuoteRequest {
        QuoteRequest {
            service_id,
            square_meters: 100.0,
            address: "400 Brickell Ave, Miami, FL 33131".to_string(),
            special_requirements: requirements,
            preferred_date: None,
            contact_name: "Luis Diaz".to_string(),
            contact_email: "Luis@Example.com".to_string(),
            contact_phone: None,
        }
    }

    #[tokio::test]
    async fn test_long_requirements_add_surcharge() {
        let engine = test_engine().await;
        let service = add_service(&engine, "Deep House Cleaning", 10_000, 240).await;

        let plain = engine.create_quote(request(service.id, None)).await.unwrap();
        assert_eq!(plain.estimated_price, Money::from_cents(20_000));
        assert_eq!(plain.contact_email, "luis@example.com");

        let complex = engine
            .create_quote(request(service.id, Some("x".repeat(101))))
            .await
            .unwrap();
        assert_eq!(complex.estimated_price, Money::from_cents(24_000));
    }

    #[tokio::test]
    async fn test_quote_follow_up_is_staff_only() {
        let engine = test_engine().await;
        let service = add_service(&engine, "Deep House Cleaning", 10_000, 240).await;
        let quote = engine.create_quote(request(service.id, None)).await.unwrap();

        let err = engine.get_quote(&Actor::customer(4), quote.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let update = QuoteUpdate {
            status: Some(QuoteStatus::Sent),
            estimated_price: Some(Money::from_cents(18_000)),
            admin_notes: Some("Loyalty discount".to_string()),
        };
        let sent = engine.update_quote(&STAFF, quote.id, update).await.unwrap();
        assert_eq!(sent.status, QuoteStatus::Sent);
        assert_eq!(sent.estimated_price, Money::from_cents(18_000));

        let listed = engine
            .list_quotes(&STAFF, Some(QuoteStatus::Sent), None, None)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let err = engine.get_quote(&STAFF, 999).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
