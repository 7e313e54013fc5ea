//! Product entity - Represents a sellable grocery item and its stock ledger.
//!
//! `stock` is only ever changed through atomic conditional updates in
//! `core::product`, so it never drops below zero.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Alphonso Mango")
    pub name: String,
    /// Storefront description
    pub description: String,
    /// Current unit price
    pub price: f64,
    /// Units available for sale
    pub stock: i64,
    /// Display unit (e.g., "kg", "pack")
    pub unit: String,
    /// ID of the category this product is listed under
    pub category_id: i64,
    /// Inactive products are hidden and cannot be ordered
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
