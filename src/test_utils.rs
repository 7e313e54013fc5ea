//! Shared test utilities for Freshmart.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        category,
        order::{OrderLineRequest, PaymentInfo, PlaceOrderRequest, ShippingInfo},
        product::{self, NewProduct},
        user,
    },
    entities,
    errors::Result,
};
use sea_orm::{ConnectOptions, DatabaseConnection};
use tempfile::TempDir;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database served by a pool of up to
/// `max_connections`, so transactions really run side by side.
///
/// In-memory databases are pinned to a single connection, which serializes
/// every transaction. Keep the returned directory alive for the whole test;
/// dropping it deletes the database file.
pub async fn setup_file_test_db(
    max_connections: u32,
) -> Result<(DatabaseConnection, TempDir)> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("freshmart.db").display());

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(max_connections)
        .min_connections(1)
        .sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, dir))
}

/// Creates an active test category with an empty description.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::category::Model> {
    category::create_category(db, name.to_string(), String::new()).await
}

/// Creates a test product with custom price and stock.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    name: &str,
    price: f64,
    stock: i64,
    category_id: i64,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        NewProduct {
            name: name.to_string(),
            description: format!("{name} for testing"),
            price,
            stock,
            unit: "piece".to_string(),
            category_id,
        },
    )
    .await
}

/// Sets up a complete test environment with one category and one product.
/// Returns (db, category, product) with the product holding `stock` units.
pub async fn setup_with_product(
    stock: i64,
) -> Result<(
    DatabaseConnection,
    entities::category::Model,
    entities::product::Model,
)> {
    let db = setup_test_db().await?;
    let category = create_test_category(&db, "Test Category").await?;
    let product = create_custom_product(&db, "Test Product", 50.0, stock, category.id).await?;
    Ok((db, category, product))
}

/// Registers a customer account with password `"password1"`.
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<entities::user::Model> {
    user::register(db, "Test Customer", email, "password1").await
}

/// Creates the administrator account `admin@freshmart.test` with password `"admin-pass"`.
pub async fn create_test_admin(db: &DatabaseConnection) -> Result<entities::user::Model> {
    user::ensure_admin(db, "admin@freshmart.test", "Test Admin", "admin-pass").await
}

/// Builds a checkout request for `(product_id, quantity)` lines with a
/// complete shipping address and cash-on-delivery payment.
pub fn order_request(lines: &[(i64, i64)]) -> PlaceOrderRequest {
    PlaceOrderRequest {
        order_items: lines
            .iter()
            .map(|&(product_id, quantity)| OrderLineRequest {
                product_id,
                quantity,
            })
            .collect(),
        shipping_info: ShippingInfo {
            name: "Test Customer".to_string(),
            address: "12 Market Road".to_string(),
            city: "Pune".to_string(),
            postal_code: "411001".to_string(),
            phone: "9800000000".to_string(),
        },
        payment_info: PaymentInfo::default(),
        ..Default::default()
    }
}
