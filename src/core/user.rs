//! User business logic - registration, login and bearer-token lookup.
//!
//! Passwords are stored as Argon2id PHC strings, which carry their own salt and
//! parameters. Tokens are random UUIDs kept on the user row and rotated on
//! every login, so a lost token is invalidated by logging in again.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{Set, prelude::*};
use tracing::{info, warn};
use uuid::Uuid;

/// Role name of customers
pub const ROLE_USER: &str = "user";
/// Role name of administrators
pub const ROLE_ADMIN: &str = "admin";

const MIN_PASSWORD_LEN: usize = 6;

/// Hashes `password` with Argon2id and a fresh random salt.
///
/// # Errors
/// Returns [`Error::PasswordHash`] if the hasher rejects its input.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

/// Checks `password` against a stored PHC string in constant time.
///
/// An unparseable stored hash never verifies.
#[must_use]
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_credentials(name: &str, email: &str, password: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Name cannot be empty"));
    }
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(Error::validation("A valid email address is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Finds a user by email, case-insensitively.
pub async fn get_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific user by its unique ID.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Resolves a bearer token to its user.
pub async fn find_by_token(db: &DatabaseConnection, token: &str) -> Result<Option<user::Model>> {
    if token.is_empty() {
        return Ok(None);
    }
    User::find()
        .filter(user::Column::ApiToken.eq(token))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn insert_user(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<user::Model> {
    validate_credentials(name, email, password)?;

    let email = normalize_email(email);
    if get_user_by_email(db, &email).await?.is_some() {
        return Err(Error::validation("An account with this email already exists"));
    }

    let account = user::ActiveModel {
        name: Set(name.trim().to_string()),
        email: Set(email),
        password_hash: Set(hash_password(password)?),
        role: Set(role.to_string()),
        api_token: Set(Some(new_token())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    account.insert(db).await.map_err(Into::into)
}

/// Registers a new customer account and returns it with a fresh token.
///
/// # Errors
/// Returns [`Error::Validation`] if the name is empty, the email is malformed or
/// already registered, or the password is too short.
pub async fn register(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
) -> Result<user::Model> {
    let account = insert_user(db, name, email, password, ROLE_USER).await?;
    info!(user_id = account.id, "Registered new user");
    Ok(account)
}

/// Checks credentials and rotates the user's token.
///
/// # Errors
/// Returns [`Error::Unauthorized`] for an unknown email or wrong password;
/// both cases produce the same message.
pub async fn login(db: &DatabaseConnection, email: &str, password: &str) -> Result<user::Model> {
    let invalid = || Error::Unauthorized {
        message: "Invalid email or password".to_string(),
    };

    let account = get_user_by_email(db, email).await?.ok_or_else(invalid)?;
    if !verify_password(&account.password_hash, password) {
        warn!(user_id = account.id, "Rejected login with wrong password");
        return Err(invalid());
    }

    let mut active: user::ActiveModel = account.into();
    active.api_token = Set(Some(new_token()));
    active.update(db).await.map_err(Into::into)
}

/// Creates the administrator account, or promotes an existing account with
/// the same email to administrator and resets its password.
pub async fn ensure_admin(
    db: &DatabaseConnection,
    email: &str,
    name: &str,
    password: &str,
) -> Result<user::Model> {
    let Some(existing) = get_user_by_email(db, email).await? else {
        let admin = insert_user(db, name, email, password, ROLE_ADMIN).await?;
        info!(user_id = admin.id, "Created administrator account");
        return Ok(admin);
    };

    validate_credentials(name, email, password)?;
    let mut active: user::ActiveModel = existing.into();
    active.role = Set(ROLE_ADMIN.to_string());
    active.password_hash = Set(hash_password(password)?);
    let admin = active.update(db).await?;
    info!(user_id = admin.id, "Administrator account refreshed");
    Ok(admin)
}

/// Whether the user holds the administrator role.
#[must_use]
pub fn is_admin(account: &user::Model) -> bool {
    account.role == ROLE_ADMIN
}
