//! Order handlers: checkout, order history, cancellation and the admin views.

use super::{
    AppState,
    auth::{AdminUser, AuthUser},
    response::{ApiJson, ApiPath, ApiQuery},
};
use crate::{
    core::{
        dashboard,
        order::{self, OrderFilter, PlaceOrderRequest},
    },
    errors::{Error, Result},
};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CancelRequest {
    reason: Option<String>,
}

impl CancelRequest {
    /// An empty body carries no reason; anything else must be a valid request.
    fn parse(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| Error::validation(format!("Invalid cancellation body: {e}")))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    status: String,
}

// POST /orders
pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    AuthUser(account): AuthUser,
    ApiJson(request): ApiJson<PlaceOrderRequest>,
) -> Result<Response> {
    let placed = order::place_order(&st.db, account.id, request, &st.config.pricing).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "order": placed })),
    )
        .into_response())
}

// GET /orders/user
pub(crate) async fn my_orders(
    State(st): State<Arc<AppState>>,
    AuthUser(account): AuthUser,
) -> Result<Response> {
    let orders = order::list_user_orders(&st.db, account.id).await?;
    Ok(Json(json!({ "success": true, "orders": orders })).into_response())
}

// GET /orders/:id
pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    AuthUser(account): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response> {
    let found = order::get_order(&st.db, id, &account).await?;
    Ok(Json(json!({ "success": true, "order": found })).into_response())
}

// PUT /orders/:id/cancel
//
// The body is optional; without one the default customer reason is stored.
pub(crate) async fn cancel_order(
    State(st): State<Arc<AppState>>,
    AuthUser(account): AuthUser,
    ApiPath(id): ApiPath<i64>,
    body: Bytes,
) -> Result<Response> {
    let reason = CancelRequest::parse(&body)?.reason;
    let cancelled = order::cancel_order(&st.db, id, &account, reason).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Order cancelled",
        "order": cancelled,
    }))
    .into_response())
}

// GET /orders
pub(crate) async fn list_orders(
    State(st): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> Result<impl IntoResponse> {
    let page = order::list_orders(&st.db, &filter).await?;
    Ok(Json(json!({
        "success": true,
        "orders": page.orders,
        "totalOrders": page.total_orders,
        "totalPages": page.total_pages,
        "totalRevenue": page.total_revenue,
    })))
}

// PUT /orders/:id/status
pub(crate) async fn update_status(
    State(st): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<Response> {
    let updated = order::update_order_status(&st.db, id, &body.status).await?;
    Ok(Json(json!({ "success": true, "order": updated })).into_response())
}

// GET /orders/admin/stats
pub(crate) async fn stats(
    State(st): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Response> {
    let stats = dashboard::get_dashboard_stats(&st.db, &st.config.dashboard).await?;
    Ok(Json(json!({ "success": true, "stats": stats })).into_response())
}
