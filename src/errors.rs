//! Unified error type for the Freshmart backend.
//!
//! Every business-logic function returns [`Result`]. The HTTP layer maps each
//! variant to a status code in `api::response`.

use thiserror::Error;

/// All failures the backend can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or malformed
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Missing or malformed input
    #[error("{message}")]
    Validation {
        /// Human-readable description of the invalid input
        message: String,
    },

    /// Monetary amount that is negative or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Missing, unknown or wrong credentials
    #[error("{message}")]
    Unauthorized {
        /// Reason shown to the caller
        message: String,
    },

    /// Caller is authenticated but may not touch this resource
    #[error("{message}")]
    Forbidden {
        /// Reason shown to the caller
        message: String,
    },

    /// Referenced product is absent or inactive
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Product identifier as supplied
        id: i64,
    },

    /// Referenced order is absent
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// Order identifier as supplied
        id: i64,
    },

    /// Referenced category is absent
    #[error("Category not found: {id}")]
    CategoryNotFound {
        /// Category identifier as supplied
        id: i64,
    },

    /// Referenced user is absent
    #[error("User not found: {id}")]
    UserNotFound {
        /// User identifier as supplied
        id: i64,
    },

    /// Requested quantity exceeds the product's stock
    #[error("Insufficient stock for {product}: {available} available, {requested} requested")]
    InsufficientStock {
        /// Product name
        product: String,
        /// Units on hand when the reservation was attempted
        available: i64,
        /// Units requested
        requested: i64,
    },

    /// Order is no longer in a cancellable state
    #[error("Cannot cancel order in '{status}' status")]
    CannotCancel {
        /// Current lifecycle status
        status: String,
    },

    /// Requested status is not a legal successor of the current one
    #[error("Cannot change order status from '{from}' to '{to}'")]
    InvalidTransition {
        /// Current lifecycle status
        from: String,
        /// Requested lifecycle status
        to: String,
    },

    /// Password hashing failed
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Hasher's description of the failure
        message: String,
    },

    /// Integer conversion failed (pagination arithmetic)
    #[error("Numeric conversion error: {0}")]
    Conversion(#[from] std::num::TryFromIntError),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Only SQLite lock contention (`SQLITE_BUSY`, `SQLITE_LOCKED` and their
    /// extended codes) and connection pool exhaustion qualify; domain failures
    /// such as [`Error::InsufficientStock`] are permanent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(sea_orm::DbErr::ConnectionAcquire(_)) => true,
            Self::Database(err) => sqlite_code(err).is_some_and(|code| {
                matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)
            }),
            _ => false,
        }
    }
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Extended result code reported by the SQLite driver, if the error came from it.
fn sqlite_code(err: &sea_orm::DbErr) -> Option<i32> {
    use sea_orm::{DbErr, RuntimeErr};

    let (DbErr::Exec(runtime) | DbErr::Query(runtime) | DbErr::Conn(runtime)) = err else {
        return None;
    };
    let RuntimeErr::SqlxError(sqlx_err) = runtime else {
        return None;
    };
    sqlx_err.as_database_error()?.code()?.parse().ok()
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
