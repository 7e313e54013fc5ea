//! Database configuration module for Freshmart.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models
//! without hand-written SQL. The connection is created once in `main` and handed to
//! the HTTP layer through `AppState`; nothing here keeps a global handle.

use crate::entities::{Category, Order, OrderItem, Product, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

/// Default location of the on-disk database when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/freshmart.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables that do not exist yet.
///
/// Parents are created before children so foreign keys resolve: users and
/// categories, then products and orders, then order items.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut user_table = schema.create_table_from_entity(User);
    let mut category_table = schema.create_table_from_entity(Category);
    let mut product_table = schema.create_table_from_entity(Product);
    let mut order_table = schema.create_table_from_entity(Order);
    let mut order_item_table = schema.create_table_from_entity(OrderItem);

    for table in [
        user_table.if_not_exists(),
        category_table.if_not_exists(),
        product_table.if_not_exists(),
        order_table.if_not_exists(),
        order_item_table.if_not_exists(),
    ] {
        db.execute(builder.build(&*table)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

/// Closes the connection pool. Called once after the server has stopped.
pub async fn close_connection(db: DatabaseConnection) -> Result<()> {
    db.close().await?;
    info!("Database connection closed");
    Ok(())
}
