//! Catalog handlers: categories and products.
//!
//! Reads are public and only show active rows; writes need an administrator.

use super::{
    AppState,
    auth::AdminUser,
    response::{ApiJson, ApiPath, ApiQuery},
};
use crate::{
    core::{
        category,
        product::{self, NewProduct, ProductFilter, ProductUpdate},
    },
    errors::Result,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct NewCategory {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CategoryUpdate {
    name: Option<String>,
    description: Option<String>,
    is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub(crate) async fn list_categories(State(st): State<Arc<AppState>>) -> Result<Response> {
    let categories = category::get_all_active_categories(&st.db).await?;
    Ok(Json(json!({ "success": true, "categories": categories })).into_response())
}

pub(crate) async fn create_category(
    State(st): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiJson(body): ApiJson<NewCategory>,
) -> Result<Response> {
    let created = category::create_category(&st.db, body.name, body.description).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "category": created })),
    )
        .into_response())
}

pub(crate) async fn update_category(
    State(st): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CategoryUpdate>,
) -> Result<Response> {
    let updated =
        category::update_category(&st.db, id, body.name, body.description, body.is_active).await?;
    Ok(Json(json!({ "success": true, "category": updated })).into_response())
}

pub(crate) async fn delete_category(
    State(st): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response> {
    category::delete_category(&st.db, id).await?;
    Ok(Json(json!({ "success": true, "message": "Category deleted" })).into_response())
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub(crate) async fn list_products(
    State(st): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<Response> {
    let page = product::list_products(&st.db, &filter).await?;
    Ok(Json(json!({
        "success": true,
        "products": page.products,
        "totalProducts": page.total_products,
        "totalPages": page.total_pages,
    }))
    .into_response())
}

pub(crate) async fn get_product(
    State(st): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    let found = product::get_active_product(&st.db, id).await?;
    Ok(Json(json!({ "success": true, "product": found })))
}

pub(crate) async fn create_product(
    State(st): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiJson(body): ApiJson<NewProduct>,
) -> Result<Response> {
    let created = product::create_product(&st.db, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "product": created })),
    )
        .into_response())
}

pub(crate) async fn update_product(
    State(st): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ProductUpdate>,
) -> Result<Response> {
    let updated = product::update_product(&st.db, id, body).await?;
    Ok(Json(json!({ "success": true, "product": updated })).into_response())
}

pub(crate) async fn delete_product(
    State(st): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response> {
    product::delete_product(&st.db, id).await?;
    Ok(Json(json!({ "success": true, "message": "Product deleted" })).into_response())
}
