//! Sample business data
//!
//! Creates the tables the bundled skills document (`sales_analytics`,
//! `inventory_management`) and fills them with random rows, so a fresh
//! install has a database worth querying. Seeding replaces any existing
//! copies of these tables.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};
use serde::Serialize;

const SCHEMA: &str = r#"
DROP TABLE IF EXISTS order_items;
DROP TABLE IF EXISTS orders;
DROP TABLE IF EXISTS customers;
DROP TABLE IF EXISTS stock_movements;
DROP TABLE IF EXISTS inventory;
DROP TABLE IF EXISTS warehouses;
DROP TABLE IF EXISTS products;

CREATE TABLE customers (
    customer_id INTEGER PRIMARY KEY,
    name TEXT,
    email TEXT,
    signup_date TEXT,
    status TEXT,
    customer_tier TEXT
);

CREATE TABLE orders (
    order_id INTEGER PRIMARY KEY,
    customer_id INTEGER REFERENCES customers (customer_id),
    order_date TEXT,
    status TEXT,
    total_amount REAL,
    sales_region TEXT
);

CREATE TABLE order_items (
    item_id INTEGER PRIMARY KEY,
    order_id INTEGER REFERENCES orders (order_id),
    product_id INTEGER REFERENCES products (product_id),
    quantity INTEGER,
    unit_price REAL,
    discount_percent REAL
);

CREATE TABLE products (
    product_id INTEGER PRIMARY KEY,
    product_name TEXT,
    sku TEXT UNIQUE,
    category TEXT,
    unit_cost REAL,
    reorder_point INTEGER,
    discontinued INTEGER
);

CREATE TABLE warehouses (
    warehouse_id INTEGER PRIMARY KEY,
    warehouse_name TEXT,
    location TEXT,
    capacity INTEGER
);

CREATE TABLE inventory (
    inventory_id INTEGER PRIMARY KEY,
    product_id INTEGER REFERENCES products (product_id),
    warehouse_id INTEGER REFERENCES warehouses (warehouse_id),
    quantity_on_hand INTEGER,
    last_updated TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE stock_movements (
    movement_id INTEGER PRIMARY KEY,
    product_id INTEGER REFERENCES products (product_id),
    warehouse_id INTEGER REFERENCES warehouses (warehouse_id),
    movement_type TEXT,
    quantity INTEGER,
    movement_date TEXT,
    reference_number TEXT
);
"#;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Bruno", "Chen", "Dana", "Elif", "Farah", "Goran", "Hana", "Ivan", "Jun", "Kofi",
    "Lena", "Mateo", "Nia", "Omar", "Priya",
];
const LAST_NAMES: &[&str] = &[
    "Silva", "Okafor", "Novak", "Tanaka", "Berg", "Haddad", "Kowalski", "Moreau", "Singh",
    "Reyes", "Larsen", "Nguyen",
];
const CUSTOMER_STATUSES: &[&str] = &["active", "inactive"];
const TIERS: &[&str] = &["bronze", "silver", "gold", "platinum"];
const ORDER_STATUSES: &[&str] = &["pending", "shipped", "delivered", "cancelled"];
const REGIONS: &[&str] = &["north", "south", "east", "west"];
const CATEGORIES: &[&str] = &["Electronics", "Clothing", "Home", "Toys"];
const ADJECTIVES: &[&str] = &["Classic", "Compact", "Deluxe", "Eco", "Smart", "Ultra", "Rugged"];
const NOUNS: &[&str] = &["Lamp", "Jacket", "Speaker", "Kettle", "Puzzle", "Backpack", "Drone"];
const CITIES: &[&str] = &["Lisbon", "Austin", "Osaka", "Lagos", "Krakow", "Denver", "Lyon"];
const STREETS: &[&str] = &["Harbor", "Mill", "Station", "Cedar", "Union"];
const MOVEMENT_TYPES: &[&str] = &["inbound", "outbound", "transfer", "adjustment"];

/// How much data to generate
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub customers: usize,
    pub products: usize,
    pub warehouses: usize,
    pub orders: usize,
    /// Fixed RNG seed for reproducible data
    pub rng_seed: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            customers: 100,
            products: 50,
            warehouses: 5,
            orders: 300,
            rng_seed: None,
        }
    }
}

/// Rows written per table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub customers: usize,
    pub products: usize,
    pub warehouses: usize,
    pub inventory: usize,
    pub orders: usize,
    pub order_items: usize,
    pub stock_movements: usize,
}

/// Create (or recreate) the sample tables in the database file at `path`
pub fn seed_database(path: &Path, config: &SeedConfig) -> Result<SeedReport> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {:?}", path))?;
    let report = seed_connection(&mut conn, config)?;

    tracing::info!(?report, "Seeded sample data into {:?}", path);
    Ok(report)
}

/// Seed an open connection in one transaction
pub fn seed_connection(conn: &mut Connection, config: &SeedConfig) -> Result<SeedReport> {
    let mut rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let today = Utc::now().date_naive();
    let mut report = SeedReport::default();

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA).context("Failed to create sample tables")?;

    {
        let mut insert = tx.prepare(
            "INSERT INTO customers (customer_id, name, email, signup_date, status, customer_tier)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for id in 1..=config.customers {
            let first = pick(&mut rng, FIRST_NAMES);
            let last = pick(&mut rng, LAST_NAMES);
            insert.execute(params![
                id as i64,
                format!("{} {}", first, last),
                format!("{}.{}{}@example.com", first, last, id).to_lowercase(),
                days_ago(&mut rng, today, 730),
                pick(&mut rng, CUSTOMER_STATUSES),
                pick(&mut rng, TIERS),
            ])?;
            report.customers += 1;
        }
    }

    {
        let mut insert = tx.prepare(
            "INSERT INTO products (product_id, product_name, sku, category, unit_cost, reorder_point, discontinued)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for id in 1..=config.products {
            insert.execute(params![
                id as i64,
                format!("{} {}", pick(&mut rng, ADJECTIVES), pick(&mut rng, NOUNS)),
                format!("SKU-{:06}", id),
                pick(&mut rng, CATEGORIES),
                cents(rng.gen_range(5.0..500.0)),
                rng.gen_range(10..=100),
                rng.gen_bool(0.5) as i64,
            ])?;
            report.products += 1;
        }
    }

    {
        let mut insert = tx.prepare(
            "INSERT INTO warehouses (warehouse_id, warehouse_name, location, capacity)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for id in 1..=config.warehouses {
            let city = pick(&mut rng, CITIES);
            insert.execute(params![
                id as i64,
                format!("Warehouse {}", city),
                format!("{} {} St, {}", rng.gen_range(1..=999), pick(&mut rng, STREETS), city),
                rng.gen_range(1000..=10000),
            ])?;
            report.warehouses += 1;
        }
    }

    {
        let mut insert = tx.prepare(
            "INSERT INTO inventory (product_id, warehouse_id, quantity_on_hand) VALUES (?1, ?2, ?3)",
        )?;
        for product in 1..=config.products {
            for warehouse in 1..=config.warehouses {
                // Roughly 70% of products are stocked in any given warehouse
                if rng.gen_bool(0.7) {
                    insert.execute(params![
                        product as i64,
                        warehouse as i64,
                        rng.gen_range(0..=500)
                    ])?;
                    report.inventory += 1;
                }
            }
        }
    }

    if config.customers > 0 && config.products > 0 {
        let mut insert_order = tx.prepare(
            "INSERT INTO orders (order_id, customer_id, order_date, status, total_amount, sales_region)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        let mut insert_item = tx.prepare(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price, discount_percent)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        for order_id in 1..=config.orders {
            let items: Vec<(usize, i64, f64, f64)> = (0..rng.gen_range(1..=5))
                .map(|_| {
                    (
                        rng.gen_range(1..=config.products),
                        rng.gen_range(1..=10),
                        cents(rng.gen_range(10.0..200.0)),
                        cents(rng.gen_range(0.0..10.0)),
                    )
                })
                .collect();
            let total: f64 = items
                .iter()
                .map(|(_, qty, price, discount)| *qty as f64 * price * (1.0 - discount / 100.0))
                .sum();

            insert_order.execute(params![
                order_id as i64,
                rng.gen_range(1..=config.customers) as i64,
                days_ago(&mut rng, today, 365),
                pick(&mut rng, ORDER_STATUSES),
                cents(total),
                pick(&mut rng, REGIONS),
            ])?;
            report.orders += 1;

            for (product, qty, price, discount) in items {
                insert_item.execute(params![order_id as i64, product as i64, qty, price, discount])?;
                report.order_items += 1;
            }
        }
    }

    if config.products > 0 && config.warehouses > 0 {
        let mut insert = tx.prepare(
            "INSERT INTO stock_movements (product_id, warehouse_id, movement_type, quantity, movement_date, reference_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for n in 1..=config.products * 2 {
            insert.execute(params![
                rng.gen_range(1..=config.products) as i64,
                rng.gen_range(1..=config.warehouses) as i64,
                pick(&mut rng, MOVEMENT_TYPES),
                rng.gen_range(1..=200),
                days_ago(&mut rng, today, 90),
                format!("REF-{:05}", n),
            ])?;
            report.stock_movements += 1;
        }
    }

    tx.commit()?;
    Ok(report)
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

fn days_ago(rng: &mut StdRng, today: NaiveDate, max_days: i64) -> String {
    (today - TimeDelta::days(rng.gen_range(0..=max_days)))
        .format("%Y-%m-%d")
        .to_string()
}

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
