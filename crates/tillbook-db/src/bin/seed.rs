//! # Seed Data Generator
//!
//! Populates the database with a demo catalog and customers for development.
//!
//! ## Usage
//! ```bash
//! # Generate 60 products (default)
//! cargo run -p tillbook-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tillbook-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p tillbook-db --bin seed -- --db ./data/tillbook.db
//! ```
//!
//! ## Generated Data
//! - Products across apparel categories, each with an HSN code
//! - Two to four colour/size variants per product with stock 0 - 24
//! - An offer price on every third product
//! - A handful of customers with `CUST001`-style codes

use std::env;

use tillbook_core::{NewCustomer, NewProduct, NewVariant};
use tillbook_db::{Database, DbConfig};

/// (category, HSN code, names)
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "Kurtas",
        "6211",
        &["Cotton Kurta", "Silk Kurta", "Linen Kurta", "Printed Kurta", "Chikankari Kurta"],
    ),
    (
        "Sarees",
        "5407",
        &["Banarasi Saree", "Kanjivaram Saree", "Chiffon Saree", "Cotton Saree", "Georgette Saree"],
    ),
    (
        "Shirts",
        "6205",
        &["Oxford Shirt", "Denim Shirt", "Linen Shirt", "Checked Shirt", "Mandarin Shirt"],
    ),
    (
        "Dupattas",
        "6214",
        &["Phulkari Dupatta", "Bandhani Dupatta", "Net Dupatta", "Silk Dupatta"],
    ),
];

const COLORS: &[&str] = &["Red", "Blue", "Green", "Black", "Ivory"];
const SIZES: &[&str] = &["S", "M", "L", "XL"];

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Asha Menon", "9847012345", "Kerala"),
    ("Ravi Kumar", "9900112233", "Karnataka"),
    ("Fatima Shaikh", "9820098200", "Maharashtra"),
    ("Gurpreet Singh", "9814011223", "Punjab"),
    ("Lakshmi Iyer", "9444055667", "Tamil Nadu"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path = String::from("./tillbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(60);
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
                println!("Tillbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./tillbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tillbook Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let mut variants = 0;
    let start = std::time::Instant::now();

    'outer: for round in 0.. {
        for (category_idx, (category, hsn, names)) in CATEGORIES.iter().enumerate() {
            for (name_idx, name) in names.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = round * 100 + category_idx * 10 + name_idx;
                let product = generate_product(category, hsn, name, round, seed);

                let created = match db.products().insert(&product).await {
                    Ok(p) => p,
                    Err(e) => {
                        eprintln!("Failed to insert {}: {}", product.name, e);
                        continue;
                    }
                };

                for variant in generate_variants(seed) {
                    db.products().add_variant(&created.id, &variant).await?;
                    variants += 1;
                }

                generated += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products and {} variants in {:?}", generated, variants, elapsed);

    println!();
    println!("Generating customers...");
    for (name, phone, state) in CUSTOMERS {
        let customer = db
            .customers()
            .create(NewCustomer {
                name: name.to_string(),
                phone: Some(phone.to_string()),
                address: None,
                state: Some(state.to_string()),
            })
            .await?;
        println!("  {} {}", customer.cust_id, customer.name);
    }

    println!();
    println!("Verifying search...");
    let results = db.products().search("kurta", 10).await?;
    println!("  Search 'kurta': {} results", results.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates one catalog product.
fn generate_product(category: &str, hsn: &str, name: &str, round: usize, seed: usize) -> NewProduct {
    // ₹499 - ₹4,999 in ₹50 steps
    let price_paise = (499 + ((seed * 37) % 91) as i64 * 50) * 100;
    let offer_price_paise = (seed % 3 == 0).then(|| price_paise * 85 / 100 / 100 * 100);

    let name = if round == 0 {
        name.to_string()
    } else {
        format!("{} {}", name, round + 1)
    };

    NewProduct {
        name,
        description: Some(format!("{} from the {} collection", category, hsn)),
        price_paise,
        offer_price_paise,
        category: Some(category.to_string()),
        hsn_code: Some(hsn.to_string()),
        is_active: true,
        featured: seed % 7 == 0,
        ..NewProduct::default()
    }
}

/// Two to four colour/size combinations.
fn generate_variants(seed: usize) -> Vec<NewVariant> {
    let n = 2 + seed % 3;
    (0..n)
        .map(|i| NewVariant {
            color: Some(COLORS[(seed + i) % COLORS.len()].to_string()),
            size: Some(SIZES[i % SIZES.len()].to_string()),
            price_paise: None,
            stock_quantity: ((seed * 7 + i * 5) % 25) as i64,
            image_url: None,
        })
        .collect()
}
