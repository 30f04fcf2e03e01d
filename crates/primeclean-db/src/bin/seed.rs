//! # Seed Data Generator
//!
//! Populates a development database with the service catalog and,
//! optionally, a handful of demo guest bookings.
//!
//! ## Usage
//! ```bash
//! # Seed the three standard services
//! cargo run -p primeclean-db --bin seed
//!
//! # Also create 20 demo bookings over the next days
//! cargo run -p primeclean-db --bin seed -- --bookings 20
//!
//! # Start the demo bookings on a given date
//! cargo run -p primeclean-db --bin seed -- --bookings 20 --from 2025-06-02
//!
//! # Specify database path
//! cargo run -p primeclean-db --bin seed -- --db ./data/primeclean.db
//! ```
//!
//! ## Generated Data
//! - Basic House Cleaning: $120.00, 120 min, residential
//! - Deep House Cleaning: $240.00, 240 min, residential
//! - Office Cleaning: $180.00, 180 min, commercial
//!
//! Demo bookings are placed only into windows that are still free, so the
//! seeded schedule never contains overlaps.

use std::env;

use chrono::{Days, NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

use primeclean_core::pricing;
use primeclean_core::schedule::{
    is_window_free, parse_date, ScheduledTime, BUSINESS_END_HOUR, BUSINESS_START_HOUR,
};
use primeclean_core::{
    BillingAddress, BookingOwner, BookingStatus, GuestContact, Money, Service, ServiceType,
};
use primeclean_db::repository::booking::NewBooking;
use primeclean_db::repository::service::NewService;
use primeclean_db::{BookingRepository, Database, DbConfig};

/// (name, description, price in cents, minutes, type)
const SERVICES: &[(&str, &str, i64, u32, ServiceType)] = &[
    (
        "Basic House Cleaning",
        "Dusting, vacuuming, kitchen and bathroom surfaces",
        12_000,
        120,
        ServiceType::Residential,
    ),
    (
        "Deep House Cleaning",
        "Basic cleaning plus inside appliances, baseboards and cabinets",
        24_000,
        240,
        ServiceType::Residential,
    ),
    (
        "Office Cleaning",
        "Workstations, common areas, restrooms and trash removal",
        18_000,
        180,
        ServiceType::Commercial,
    ),
];

/// Demo customers: (name, email, phone, address)
const GUESTS: &[(&str, &str, &str, &str)] = &[
    ("Ana Lopez", "ana@example.com", "305-555-0100", "12 Palm Ave, Miami, FL 33101"),
    ("Carlos Ruiz", "carlos@example.com", "305-555-0111", "88 Coral Way, Miami, FL 33145"),
    ("Jenna Park", "jenna@example.com", "954-555-0122", "5 Las Olas Blvd, Fort Lauderdale, FL 33301"),
    ("Omar Haddad", "omar@example.com", "561-555-0133", "230 Clematis St, West Palm Beach, FL 33401"),
    ("Grace Kim", "grace@example.com", "305-555-0144", "1400 Ocean Dr, Miami Beach, FL 33139"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut bookings: usize = 0;
    let mut db_path = String::from("./primeclean_dev.db");
    let mut from = Utc::now().date_naive();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bookings" | "-b" => {
                if i + 1 < args.len() {
                    bookings = args[i + 1].parse().unwrap_or(0);
                    i += 1;
                }
            }
            "--from" | "-f" => {
                if i + 1 < args.len() {
                    from = parse_date("--from", &args[i + 1])?;
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("PrimeClean Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -b, --bookings <N> Demo bookings to create (default: 0)");
                println!("  -f, --from <DATE>  Demo bookings start the day after (default: today)");
                println!("  -d, --db <PATH>    Database file path (default: ./primeclean_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 PrimeClean Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let services = seed_services(&db).await?;
    println!("✓ Service catalog: {} services", services.len());

    if bookings > 0 {
        let created = seed_bookings(&db, &services, from, bookings).await?;
        println!("✓ Created {} demo bookings", created);
    }

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

/// Inserts any catalog service that is not there yet.
async fn seed_services(db: &Database) -> Result<Vec<Service>, Box<dyn std::error::Error>> {
    let existing = db.services().list(false).await?;

    for (name, description, cents, minutes, service_type) in SERVICES {
        if existing.iter().any(|s| s.name == *name) {
            println!("  • {} already present", name);
            continue;
        }

        let service = NewService {
            name: name.to_string(),
            description: Some(description.to_string()),
            base_price: Money::from_cents(*cents),
            duration_minutes: Some(*minutes),
            service_type: *service_type,
            is_active: true,
        };
        let created = db.services().insert(&service).await?;
        println!("  + {} ({})", created.name, created.base_price);
    }

    Ok(db.services().list(true).await?)
}

/// Spreads `count` guest bookings over the days after `from`, skipping taken windows.
async fn seed_bookings(
    db: &Database,
    services: &[Service],
    from: NaiveDate,
    count: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    if services.is_empty() {
        return Ok(0);
    }

    let mut created = 0;
    let mut seed = 0usize;

    for offset in 1..=60u64 {
        let Some(date) = from.checked_add_days(Days::new(offset)) else {
            break;
        };

        for hour in (BUSINESS_START_HOUR..BUSINESS_END_HOUR).step_by(3) {
            if created >= count {
                return Ok(created);
            }
            seed += 1;

            let service = &services[seed % services.len()];
            let (name, email, phone, address) = GUESTS[seed % GUESTS.len()];
            let time = ScheduledTime::from_hm(hour, 0)?;
            let window = time.window(service.effective_duration_minutes());

            let mut tx = db.begin_write().await?;
            let booked = BookingRepository::booked_windows(&mut *tx, date, None).await?;
            if !is_window_free(&window, &booked) {
                continue;
            }

            let square_meters = 40.0 + ((seed * 23) % 160) as f64;
            let booking = NewBooking {
                owner: BookingOwner::Guest {
                    contact: GuestContact {
                        name: name.to_string(),
                        email: email.to_string(),
                        phone: phone.to_string(),
                    },
                },
                service_id: service.id,
                scheduled_date: date,
                scheduled_time: time,
                address: address.to_string(),
                square_meters,
                special_instructions: None,
                total_price: pricing::price(service.base_price, square_meters)?,
                status: BookingStatus::ALL[seed % 3],
                billing: BillingAddress::default(),
                is_placeholder: false,
            };
            BookingRepository::insert(&mut *tx, &booking).await?;
            Database::commit(tx).await?;
            created += 1;
        }
    }

    Ok(created)
}
