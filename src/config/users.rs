//! Administrator bootstrap configuration from environment variables.
//!
//! Reads `ADMIN_EMAIL`, `ADMIN_PASSWORD` and optionally `ADMIN_NAME` from the
//! environment (usually via `.env`). When both email and password are present the
//! account is created or promoted to administrator at startup.

/// Credentials for the bootstrap administrator account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    /// Login email
    pub email: String,
    /// Plain-text password, hashed before it is stored
    pub password: String,
    /// Display name
    pub name: String,
}

/// Gets the bootstrap administrator from the environment, if configured.
///
/// # Returns
///
/// `Some(credentials)` when both `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set and
/// non-empty, `None` otherwise. `ADMIN_NAME` defaults to `"Administrator"`.
#[must_use]
pub fn get_admin_credentials() -> Option<AdminCredentials> {
    admin_credentials_from(
        std::env::var("ADMIN_EMAIL").ok(),
        std::env::var("ADMIN_PASSWORD").ok(),
        std::env::var("ADMIN_NAME").ok(),
    )
}

fn admin_credentials_from(
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
) -> Option<AdminCredentials> {
    let email = email.filter(|e| !e.trim().is_empty())?;
    let password = password.filter(|p| !p.is_empty())?;
    let name = name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Administrator".to_string());

    Some(AdminCredentials {
        email: email.trim().to_string(),
        password,
        name,
    })
}
