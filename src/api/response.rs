//! JSON envelope for every response, and the mapping from [`Error`] to HTTP status.
//!
//! Successful bodies carry `"success": true` next to the payload; failures are
//! `{"success": false, "message": ...}`. Extractor rejections go through the
//! same mapping via [`ApiJson`], [`ApiPath`] and [`ApiQuery`].

use crate::errors::Error;
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

/// JSON body extractor whose rejection is an [`Error::Validation`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejection is an [`Error::Validation`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);

/// Query-string extractor whose rejection is an [`Error::Validation`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl Error {
    /// HTTP status this error is reported with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::InvalidAmount { .. }
            | Self::InsufficientStock { .. }
            | Self::CannotCancel { .. }
            | Self::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::ProductNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::CategoryNotFound { .. }
            | Self::UserNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Database(_) if self.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::PasswordHash { .. }
            | Self::Conversion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the log
        let message = if status == StatusCode::SERVICE_UNAVAILABLE {
            warn!(error = %self, "Transient failure");
            "Service is busy, please retry".to_string()
        } else if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
