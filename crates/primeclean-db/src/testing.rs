//! Fixtures shared by the repository tests.

use chrono::NaiveDate;

use crate::pool::{Database, DbConfig};
use crate::repository::booking::NewBooking;
use crate::repository::service::NewService;
use primeclean_core::{
    BillingAddress, BookingOwner, BookingStatus, GuestContact, Money, ScheduledTime, Service,
    ServiceType,
};

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub fn basic_cleaning() -> NewService {
    NewService {
        name: "Basic House Cleaning".to_string(),
        description: Some("Kitchen, bathrooms, floors".to_string()),
        base_price: Money::from_cents(10_000),
        duration_minutes: None,
        service_type: ServiceType::Residential,
        is_active: true,
    }
}

pub async fn seed_service(db: &Database, name: &str, base_cents: i64) -> Service {
    let service = NewService {
        name: name.to_string(),
        base_price: Money::from_cents(base_cents),
        ..basic_cleaning()
    };
    db.services().insert(&service).await.unwrap()
}

pub fn guest_booking(service_id: i64, date: NaiveDate, time: &str) -> NewBooking {
    NewBooking {
        owner: BookingOwner::Guest {
            contact: GuestContact {
                name: "Ana Lopez".to_string(),
                email: "ana@example.com".to_string(),
                phone: "555-0100".to_string(),
            },
        },
        service_id,
        scheduled_date: date,
        scheduled_time: ScheduledTime::parse(time).unwrap(),
        address: "12 Palm Ave, Miami, FL 33101".to_string(),
        square_meters: 80.0,
        special_instructions: None,
        total_price: Money::from_cents(16_000),
        status: BookingStatus::Pending,
        billing: BillingAddress::default(),
        is_placeholder: false,
    }
}

pub fn registered_booking(user_id: i64, service_id: i64, date: NaiveDate, time: &str) -> NewBooking {
    NewBooking {
        owner: BookingOwner::Registered { user_id },
        ..guest_booking(service_id, date, time)
    }
}
