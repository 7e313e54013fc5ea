//! Account handlers: register, login and the current user.

use super::{
    AppState,
    auth::AuthUser,
    response::ApiJson,
};
use crate::{core::user, entities, errors::Result};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

fn session_body(account: entities::user::Model) -> serde_json::Value {
    let token = account.api_token.clone().unwrap_or_default();
    json!({ "success": true, "user": account, "token": token })
}

// POST /auth/register
pub(crate) async fn register(
    State(st): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Response> {
    let account = user::register(&st.db, &body.name, &body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(session_body(account))).into_response())
}

// POST /auth/login
pub(crate) async fn login(
    State(st): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Response> {
    let account = user::login(&st.db, &body.email, &body.password).await?;
    info!(user_id = account.id, "User logged in");
    Ok(Json(session_body(account)).into_response())
}

// GET /auth/me
pub(crate) async fn me(AuthUser(account): AuthUser) -> impl IntoResponse {
    Json(json!({ "success": true, "user": account }))
}
