//! # Seed Data Generator
//!
//! Populates a development database with products.
//!
//! ## Usage
//! ```bash
//! # Generate the full catalog (default)
//! cargo run -p stockline-db --bin seed
//!
//! # Generate fewer products
//! cargo run -p stockline-db --bin seed -- --count 10
//!
//! # Specify database path
//! cargo run -p stockline-db --bin seed -- --db ./data/stockline.db
//!
//! # Top up every existing product by 20 units
//! cargo run -p stockline-db --bin seed -- --restock 20
//! ```
//!
//! Each product gets a name from [`CATALOG`] combined with a variant, a
//! price derived from the base price and variant, and stock between 0 and 60.
//! Running against a database that already has products generates nothing;
//! with `--restock` it tops up the existing catalog instead.

use std::env;
use stockline_db::{Database, DbConfig};

/// (name, description, base price in minor units)
const CATALOG: &[(&str, &str, i64)] = &[
    ("Over-Ear Headphones", "Closed-back, 30 hour battery", 24_000),
    ("Fitness Band", "Heart rate and sleep tracking", 18_500),
    ("Power Bank", "20000mAh, two USB-C ports", 8_500),
    ("Mechanical Keyboard", "Hot-swappable switches", 17_000),
    ("Webcam", "1080p with privacy shutter", 12_000),
    ("Desk Lamp", "Dimmable LED, USB charging port", 6_500),
    ("Laptop Stand", "Aluminium, adjustable height", 9_000),
    ("Wireless Mouse", "Silent clicks, 18 month battery", 4_500),
    ("USB-C Hub", "7-in-1 with HDMI and card reader", 11_000),
    ("Bluetooth Speaker", "Waterproof, 12 hour playback", 15_500),
];

/// (variant suffix, price addon in minor units)
const VARIANTS: &[(&str, i64)] = &[("Black", 0), ("White", 0), ("Pro", 5_000)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = CATALOG.len() * VARIANTS.len();
    let mut db_path = String::from("./stockline_dev.db");
    let mut restock: i64 = 0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--restock" | "-r" => {
                if i + 1 < args.len() {
                    restock = args[i + 1].parse().unwrap_or(0);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockline Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: full catalog)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockline_dev.db)");
                println!("  -r, --restock <N>  Add N units to every existing product");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockline Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 && restock > 0 {
        let products = db.products().list(u32::try_from(existing).unwrap_or(u32::MAX)).await?;
        for product in &products {
            db.products().restock(&product.id, restock).await?;
        }
        println!("✓ Restocked {} products by {} units", products.len(), restock);
        return Ok(());
    }

    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate, or pass --restock <N>.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (idx, (name, description, base_price)) in CATALOG.iter().enumerate() {
        for (variant_idx, (variant, addon)) in VARIANTS.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let seed = idx * VARIANTS.len() + variant_idx;
            let full_name = format!("{} ({})", name, variant);
            let stock = ((seed * 7) % 61) as i64;

            if let Err(e) = db
                .products()
                .create(&full_name, Some(description), base_price + addon, stock)
                .await
            {
                eprintln!("Failed to insert {}: {}", full_name, e);
                continue;
            }

            generated += 1;
        }
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    for product in db.products().list(5).await? {
        println!("  {} {:>10} stock {:>3}  {}", product.id, product.unit_price(), product.stock, product.name);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
