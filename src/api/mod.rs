//! Axum router and shared state for the HTTP API.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Integration tests in `tests/` compose the bare router
//! directly against an in-memory database.

use crate::config::AppConfig;
use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;

pub mod auth;
mod catalog;
mod orders;
pub mod response;
mod users;

/// State shared by every handler
#[derive(Debug)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Settings from config.toml
    pub config: AppConfig,
}

impl AppState {
    /// Bundles a connection and settings for the router.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self { db, config }
    }
}

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are not applied here.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(users::register))
        .route("/auth/login", post(users::login))
        .route("/auth/me", get(users::me))
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/categories/:id",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route(
            "/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/products/:id",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/user", get(orders::my_orders))
        .route("/orders/admin/stats", get(orders::stats))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", put(orders::cancel_order))
        .route("/orders/:id/status", put(orders::update_status))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
