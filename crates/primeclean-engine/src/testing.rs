//! Fixtures shared by the engine tests.

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::services::booking::BookingRequest;
use crate::services::catalog::ServiceRequest;
use primeclean_core::{Actor, BillingAddress, GuestContact, Money, ScheduledTime, Service, ServiceType};
use primeclean_db::{Database, DbConfig};

pub const STAFF: Actor = Actor::staff(1);

pub async fn test_engine() -> Engine {
    test_engine_with(EngineConfig::default()).await
}

pub async fn test_engine_with(config: EngineConfig) -> Engine {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Engine::new(db, config)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(time: &str) -> ScheduledTime {
    ScheduledTime::parse(time).unwrap()
}

/// Adds an active residential service with an explicit duration.
pub async fn add_service(engine: &Engine, name: &str, base_cents: i64, minutes: u32) -> Service {
    let request = ServiceRequest {
        name: name.to_string(),
        description: None,
        base_price: Money::from_cents(base_cents),
        duration_minutes: Some(minutes),
        service_type: ServiceType::Residential,
        is_active: true,
    };
    engine.create_service(&STAFF, request).await.unwrap()
}

pub fn ana() -> GuestContact {
    GuestContact {
        name: "Ana Lopez".to_string(),
        email: "ana@example.com".to_string(),
        phone: "305-555-0100".to_string(),
    }
}

pub fn booking_request(service_id: i64, date: NaiveDate, time: &str) -> BookingRequest {
    BookingRequest {
        service_id,
        scheduled_date: date,
        scheduled_time: at(time),
        address: "12 Palm Ave, Miami, FL 33101".to_string(),
        square_meters: 50.0,
        special_instructions: None,
        guest: Some(ana()),
        billing: BillingAddress::default(),
    }
}
