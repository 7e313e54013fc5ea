//! Order entity - A customer's checkout with its shipping and payment snapshot.
//!
//! `status` holds the lower-case name of a `core::status::OrderStatus`; it is
//! only changed through the transition table in that module.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the purchasing user
    pub user_id: i64,
    /// Recipient name
    pub shipping_name: String,
    /// Street address
    pub shipping_address: String,
    /// City
    pub shipping_city: String,
    /// Postal code
    pub shipping_postal_code: String,
    /// Contact phone number
    pub shipping_phone: String,
    /// `"cod"`, `"card"` or `"upi"`
    pub payment_method: String,
    /// `"pending"`, `"completed"` or `"failed"`
    pub payment_status: String,
    /// Sum of line item price times quantity
    pub items_price: f64,
    /// Delivery fee charged for this order
    pub delivery_charge: f64,
    /// Tax charged for this order
    pub tax_price: f64,
    /// Grand total, computed server-side
    pub total_price: f64,
    /// Lifecycle status
    pub status: String,
    /// Why the order was cancelled, if it was
    pub cancel_reason: Option<String>,
    /// When the order was placed
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
    /// When the order reached `delivered`
    pub delivered_at: Option<DateTimeUtc>,
    /// When the order reached `cancelled`
    pub cancelled_at: Option<DateTimeUtc>,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
