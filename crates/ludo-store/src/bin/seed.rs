//! # Seed Data Generator
//!
//! Populates the database with the venue's demo catalog and the default
//! membership price list, for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default dev database
//! cargo run -p ludo-store --bin seed
//!
//! # Specify database path
//! cargo run -p ludo-store --bin seed -- --db ./data/ludo.db
//! ```

use chrono::Utc;
use std::env;

use ludo_core::ServiceCategory;
use ludo_store::{Database, DbConfig};

/// Demo catalog: (name, price in cents, initial stock).
const PRODUCTS: &[(&str, i64, i64)] = &[
    ("Agua 600 ml", 1200, 30),
    ("Leche Santa Clara 1 L", 3200, 18),
    ("Sabritas 45 g", 1700, 25),
    ("Huevo Finder docena", 4800, 10),
];

/// Default membership price list: (service, tier, price in cents).
const MEMBERSHIP_PRICES: &[(ServiceCategory, &str, i64)] = &[
    (ServiceCategory::Playroom, "v12", 8000),
    (ServiceCategory::Playroom, "v36", 13000),
    (ServiceCategory::Playroom, "p1", 45000),
    (ServiceCategory::Playroom, "p2", 75000),
    (ServiceCategory::Tutoring, "visit", 9900),
    (ServiceCategory::Tutoring, "m12", 89900),
    (ServiceCategory::Tutoring, "m15", 105000),
    (ServiceCategory::Tutoring, "m20", 129900),
    (ServiceCategory::SpeechTherapy, "single", 40000),
    (ServiceCategory::SpeechTherapy, "eight", 280000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./ludo_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Ludo POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./ludo_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Ludo POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.inventory().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let engine = db.engine();
    let now = Utc::now();

    println!();
    println!("Seeding catalog...");
    for (name, price_cents, stock) in PRODUCTS {
        let product = engine.create_product(name, *price_cents, *stock, now).await?;
        println!("  {} ({} in stock)", product.name, product.stock);
    }

    println!();
    println!("Seeding membership prices...");
    for (service, tier, price_cents) in MEMBERSHIP_PRICES {
        engine
            .set_membership_price(*service, tier, *price_cents)
            .await?;
    }
    let table = db.membership().table().await?;
    println!("  {} price entries", table.entries.len());

    println!();
    println!("Opening register...");
    let state = db.register().get_or_init(now).await?;
    println!(
        "  Opening balance {} (opened {})",
        state.opening_balance(),
        state.opened_at
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
