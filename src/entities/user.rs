//! User entity - Represents customer and administrator accounts.
//!
//! Users own orders. Passwords are stored as Argon2id PHC strings, and the bearer
//! token handed out at login is kept in `api_token` so requests can be
//! authenticated with a single indexed lookup.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email, stored lower-cased
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2id PHC string (algorithm, parameters, salt and digest)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// `"user"` or `"admin"`
    pub role: String,
    /// Current bearer token, rotated on every login
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user places many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
