//! # Service Catalog
//!
//! The cleaning services customers can book, and the instant price estimate
//! shown before booking.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::Engine;
use crate::error::EngineResult;
use primeclean_core::pricing;
use primeclean_core::transitions::ensure_staff;
use primeclean_core::validation::{
    validate_optional_text, validate_positive_amount, validate_required, validate_square_meters,
    ValidationResult,
};
use primeclean_core::{Actor, CoreError, Money, Service, ServiceType, ValidationError};
use primeclean_db::repository::service::{NewService, ServiceChanges};

const MAX_DURATION_MINUTES: u32 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub base_price: Money,
    /// Falls back to the name-based default when absent.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub service_type: ServiceType,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<Money>,
    pub duration_minutes: Option<u32>,
    pub service_type: Option<ServiceType>,
    pub is_active: Option<bool>,
}

/// Price shown before booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub service_id: i64,
    pub service_name: String,
    pub base_price: Money,
    pub estimated_price: Money,
}

fn validate_duration(minutes: u32) -> ValidationResult<u32> {
    if minutes == 0 || minutes > MAX_DURATION_MINUTES {
        return Err(ValidationError::OutOfRange {
            field: "duration_minutes".to_string(),
            min: 1,
            max: MAX_DURATION_MINUTES as i64,
        });
    }
    Ok(minutes)
}

impl Engine {
    pub async fn list_services(&self, active_only: bool) -> EngineResult<Vec<Service>> {
        Ok(self.db.services().list(active_only).await?)
    }

    pub async fn get_service(&self, id: i64) -> EngineResult<Service> {
        let service = self
            .db
            .services()
            .get_by_id(id)
            .await?
            .ok_or(CoreError::ServiceNotFound(id))?;
        Ok(service)
    }

    pub async fn create_service(&self, actor: &Actor, request: ServiceRequest) -> EngineResult<Service> {
        ensure_staff(actor)?;

        let service = NewService {
            name: validate_required("name", &request.name)?,
            description: validate_optional_text("description", request.description.as_deref())?,
            base_price: validate_positive_amount("base_price", request.base_price)?,
            duration_minutes: request.duration_minutes.map(validate_duration).transpose()?,
            service_type: request.service_type,
            is_active: request.is_active,
        };

        let created = self.db.services().insert(&service).await?;
        info!(id = created.id, name = %created.name, price = %created.base_price, "Service created");
        Ok(created)
    }

    pub async fn update_service(
        &self,
        actor: &Actor,
        id: i64,
        update: ServiceUpdate,
    ) -> EngineResult<Service> {
        ensure_staff(actor)?;

        let changes = ServiceChanges {
            name: update
                .name
                .as_deref()
                .map(|n| validate_required("name", n))
                .transpose()?,
            description: validate_optional_text("description", update.description.as_deref())?,
            base_price: update
                .base_price
                .map(|p| validate_positive_amount("base_price", p))
                .transpose()?,
            duration_minutes: update.duration_minutes.map(validate_duration).transpose()?,
            service_type: update.service_type,
            is_active: update.is_active,
        };

        let updated = self.db.services().update(id, &changes).await?;
        info!(id, name = %updated.name, active = updated.is_active, "Service updated");
        Ok(updated)
    }

    /// The booking price for `square_meters` of the given service.
    pub async fn instant_estimate(&self, service_id: i64, square_meters: f64) -> EngineResult<Estimate> {
        let square_meters = validate_square_meters(square_meters)?;
        let service = self.get_service(service_id).await?;

        Ok(Estimate {
            service_id,
            estimated_price: pricing::price(service.base_price, square_meters)?,
            base_price: service.base_price,
            service_name: service.name,
        })
    }
}
