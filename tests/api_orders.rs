//! In-process tests for the Freshmart HTTP API.
//!
//! Each test builds the router over a fresh in-memory database and drives it
//! with `tower::ServiceExt::oneshot`; no socket is bound.

#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use freshmart::{
    api::{AppState, build_router},
    config::{AppConfig, database},
    core::{
        category::create_category,
        product::{NewProduct, create_product},
        user::ensure_admin,
    },
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestApp {
    router: Router,
    admin_token: String,
    product_id: i64,
}

/// Router over a fresh database holding one administrator and one product
/// priced 50.0 with `stock` units.
async fn make_app(stock: i64) -> TestApp {
    let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
    database::create_tables(&db).await.unwrap();

    let admin = ensure_admin(&db, "admin@freshmart.test", "Admin", "admin-pass")
        .await
        .unwrap();
    let category = create_category(&db, "Vegetables".to_string(), String::new())
        .await
        .unwrap();
    let product = create_product(
        &db,
        NewProduct {
            name: "Tomato".to_string(),
            description: String::new(),
            price: 50.0,
            stock,
            unit: "kg".to_string(),
            category_id: category.id,
        },
    )
    .await
    .unwrap();

    let state = Arc::new(AppState::new(db, AppConfig::default()));
    TestApp {
        router: build_router(state),
        admin_token: admin.api_token.unwrap(),
        product_id: product.id,
    }
}

/// Drive the router with a single request and return (status, json body).
async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is not valid JSON")
    };
    (status, json)
}

/// Like [`call`], but sends `body` verbatim as a JSON request.
async fn call_raw(
    router: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: &str,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).expect("body is not valid JSON"))
}

/// Register a customer through the API and return their token.
async fn register(router: &Router, email: &str) -> String {
    let (status, body) = call(
        router,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": "Asha", "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

fn checkout(product_id: i64, quantity: i64) -> Value {
    json!({
        "orderItems": [{ "productId": product_id, "quantity": quantity }],
        "shippingInfo": {
            "name": "Asha",
            "address": "12 Market Road",
            "city": "Pune",
            "postalCode": "411001",
            "phone": "9800000000"
        },
        "paymentInfo": { "method": "cod" }
    })
}

async fn stock_of(app: &TestApp) -> i64 {
    let (status, body) = call(
        &app.router,
        "GET",
        &format!("/products/{}", app.product_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["product"]["stock"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Public routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200() {
    let app = make_app(5).await;
    let (status, body) = call(&app.router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["service"], "freshmart");
}

#[tokio::test]
async fn register_then_me_returns_user_without_secrets() {
    let app = make_app(5).await;
    let token = register(&app.router, "asha@example.com").await;

    let (status, body) = call(&app.router, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "asha@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("apiToken").is_none());
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn orders_require_token() {
    let app = make_app(5).await;
    let (status, body) = call(
        &app.router,
        "POST",
        "/orders",
        None,
        Some(checkout(app.product_id, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(&app.router, "GET", "/orders/user", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_refuse_customers() {
    let app = make_app(5).await;
    let token = register(&app.router, "asha@example.com").await;

    let (status, body) = call(&app.router, "GET", "/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = call(
        &app.router,
        "DELETE",
        &format!("/products/{}", app.product_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Order workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn place_then_admin_cancel_restores_stock() {
    let app = make_app(5).await;
    let token = register(&app.router, "asha@example.com").await;

    // A forged total is replaced by the server's own computation
    let mut body = checkout(app.product_id, 3);
    body["totalPrice"] = json!(1.0);
    let (status, placed) = call(&app.router, "POST", "/orders", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["order"]["status"], "pending");
    assert_eq!(placed["order"]["itemsPrice"], 150.0);
    assert_eq!(placed["order"]["totalPrice"], 190.0);
    assert_eq!(placed["order"]["orderItems"][0]["quantity"], 3);
    assert_eq!(stock_of(&app).await, 2);

    let order_id = placed["order"]["id"].as_i64().unwrap();
    let (status, cancelled) = call(
        &app.router,
        "PUT",
        &format!("/orders/{order_id}/status"),
        Some(&app.admin_token),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["order"]["status"], "cancelled");
    assert_eq!(
        cancelled["order"]["cancelReason"],
        "Cancelled by administrator"
    );
    assert_eq!(stock_of(&app).await, 5);

    let (status, mine) = call(&app.router, "GET", "/orders/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn insufficient_stock_is_400_and_takes_nothing() {
    let app = make_app(2).await;
    let token = register(&app.router, "asha@example.com").await;

    let (status, body) = call(
        &app.router,
        "POST",
        "/orders",
        Some(&token),
        Some(checkout(app.product_id, 3)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Insufficient stock"));
    assert_eq!(stock_of(&app).await, 2);

    let (status, _) = call(
        &app.router,
        "POST",
        "/orders",
        Some(&token),
        Some(checkout(9999, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customer_cancel_rules() {
    let app = make_app(10).await;
    let owner = register(&app.router, "owner@example.com").await;
    let stranger = register(&app.router, "stranger@example.com").await;

    let (_, placed) = call(
        &app.router,
        "POST",
        "/orders",
        Some(&owner),
        Some(checkout(app.product_id, 2)),
    )
    .await;
    let order_id = placed["order"]["id"].as_i64().unwrap();

    // Someone else's order
    let (status, _) = call(
        &app.router,
        "GET",
        &format!("/orders/{order_id}"),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app.router,
        "PUT",
        &format!("/orders/{order_id}/cancel"),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Owner cancels without a body
    let (status, cancelled) = call(
        &app.router,
        "PUT",
        &format!("/orders/{order_id}/cancel"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["order"]["cancelReason"], "Cancelled by customer");
    assert_eq!(stock_of(&app).await, 10);

    // Second cancel is refused and changes nothing
    let (status, body) = call(
        &app.router,
        "PUT",
        &format!("/orders/{order_id}/cancel"),
        Some(&owner),
        Some(json!({ "reason": "again" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(stock_of(&app).await, 10);

    let (status, _) = call(&app.router, "GET", "/orders/424242", Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_cancel_body_is_400_and_keeps_order() {
    let app = make_app(10).await;
    let owner = register(&app.router, "owner@example.com").await;
    let (_, placed) = call(
        &app.router,
        "POST",
        "/orders",
        Some(&owner),
        Some(checkout(app.product_id, 2)),
    )
    .await;
    let order_id = placed["order"]["id"].as_i64().unwrap();
    let uri = format!("/orders/{order_id}/cancel");

    for malformed in [r#"{"reason": "#, r#"{"reason": 42}"#] {
        let (status, body) = call_raw(&app.router, "PUT", &uri, &owner, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    let (status, current) = call(
        &app.router,
        "GET",
        &format!("/orders/{order_id}"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["order"]["status"], "pending");
    assert_eq!(stock_of(&app).await, 8);

    // A well-formed reason is stored as given
    let (status, cancelled) =
        call_raw(&app.router, "PUT", &uri, &owner, r#"{"reason": "Ordered twice"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["order"]["cancelReason"], "Ordered twice");
    assert_eq!(stock_of(&app).await, 10);
}

#[tokio::test]
async fn illegal_transition_is_400() {
    let app = make_app(5).await;
    let token = register(&app.router, "asha@example.com").await;
    let (_, placed) = call(
        &app.router,
        "POST",
        "/orders",
        Some(&token),
        Some(checkout(app.product_id, 1)),
    )
    .await;
    let order_id = placed["order"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app.router,
        "PUT",
        &format!("/orders/{order_id}/status"),
        Some(&app.admin_token),
        Some(json!({ "status": "delivered" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("pending"));
}

#[tokio::test]
async fn malformed_body_is_400_envelope() {
    let app = make_app(5).await;
    let token = register(&app.router, "asha@example.com").await;

    let (status, body) = call(
        &app.router,
        "POST",
        "/orders",
        Some(&token),
        Some(json!({ "orderItems": "not a list" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

// ---------------------------------------------------------------------------
// Admin views
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_listing_and_stats() {
    let app = make_app(20).await;
    let token = register(&app.router, "asha@example.com").await;
    for quantity in [1, 2] {
        let (status, _) = call(
            &app.router,
            "POST",
            "/orders",
            Some(&token),
            Some(checkout(app.product_id, quantity)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = call(
        &app.router,
        "GET",
        "/orders?status=pending&limit=1",
        Some(&app.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["totalOrders"], 2);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["orders"].as_array().unwrap().len(), 1);
    assert_eq!(page["totalRevenue"], 0.0);

    let (status, body) = call(
        &app.router,
        "GET",
        "/orders/admin/stats",
        Some(&app.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["stats"];
    assert_eq!(stats["totalOrders"], 2);
    assert_eq!(stats["totalUsers"], 1);
    assert_eq!(stats["ordersByStatus"]["pending"], 2);
    assert_eq!(stats["ordersByStatus"]["delivered"], 0);
    assert_eq!(stats["recentOrders"][0]["productNames"][0], "Tomato");
}
