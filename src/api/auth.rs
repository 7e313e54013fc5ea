//! Bearer-token extractors.
//!
//! `AuthUser` resolves `Authorization: Bearer <token>` to an account and
//! rejects with 401; `AdminUser` additionally requires the administrator role
//! and rejects everyone else with 403.

use super::AppState;
use crate::{
    core::user::{find_by_token, is_admin},
    entities::user,
    errors::{Error, Result},
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::warn;

/// Any signed-in account
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

/// A signed-in administrator
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let token = bearer_token(&parts.headers).ok_or_else(|| Error::Unauthorized {
            message: "Not authorized, no token".to_string(),
        })?;

        let account = find_by_token(&state.db, token)
            .await?
            .ok_or_else(|| Error::Unauthorized {
                message: "Not authorized, token invalid".to_string(),
            })?;
        Ok(Self(account))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let AuthUser(account) = AuthUser::from_request_parts(parts, state).await?;
        if !is_admin(&account) {
            warn!(user_id = account.id, path = %parts.uri.path(), "Admin route denied");
            return Err(Error::Forbidden {
                message: "Admin access required".to_string(),
            });
        }
        Ok(Self(account))
    }
}
