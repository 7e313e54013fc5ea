//! Category business logic - CRUD for the catalog's top-level groupings.

use crate::{
    entities::{Category, Product, category, product},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};
use tracing::info;

/// Retrieves all active categories, ordered alphabetically by name.
pub async fn get_all_active_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .filter(category::Column::IsActive.eq(true))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific category by its unique ID.
pub async fn get_category_by_id(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<Option<category::Model>> {
    Category::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by exact name.
pub async fn get_category_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<category::Model>> {
    Category::find()
        .filter(category::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new category.
///
/// # Errors
/// Returns [`Error::Validation`] if the name is empty or already taken.
pub async fn create_category(
    db: &DatabaseConnection,
    name: String,
    description: String,
) -> Result<category::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("Category name cannot be empty"));
    }
    if get_category_by_name(db, &name).await?.is_some() {
        return Err(Error::validation(format!(
            "Category '{}' already exists",
            name.trim()
        )));
    }

    let category = category::ActiveModel {
        name: Set(name.trim().to_string()),
        description: Set(description.trim().to_string()),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = category.insert(db).await?;
    info!(category_id = created.id, name = %created.name, "Created category");
    Ok(created)
}

/// Updates a category's name, description and visibility.
///
/// # Errors
/// Returns [`Error::CategoryNotFound`] if the category does not exist and
/// [`Error::Validation`] if the new name is empty or belongs to another category.
pub async fn update_category(
    db: &DatabaseConnection,
    category_id: i64,
    name: Option<String>,
    description: Option<String>,
    is_active: Option<bool>,
) -> Result<category::Model> {
    let existing = get_category_by_id(db, category_id)
        .await?
        .ok_or(Error::CategoryNotFound { id: category_id })?;

    let mut active: category::ActiveModel = existing.into();

    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(Error::validation("Category name cannot be empty"));
        }
        let taken = get_category_by_name(db, &name)
            .await?
            .is_some_and(|other| other.id != category_id);
        if taken {
            return Err(Error::validation(format!(
                "Category '{}' already exists",
                name.trim()
            )));
        }
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(is_active) = is_active {
        active.is_active = Set(is_active);
    }

    active.update(db).await.map_err(Into::into)
}

/// Deletes a category that no product references any more.
///
/// # Errors
/// Returns [`Error::CategoryNotFound`] if absent, or [`Error::Validation`] while
/// products are still filed under it.
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let existing = get_category_by_id(db, category_id)
        .await?
        .ok_or(Error::CategoryNotFound { id: category_id })?;

    let product_count = Product::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .count(db)
        .await?;
    if product_count > 0 {
        return Err(Error::validation(format!(
            "Category '{}' still has {product_count} product(s)",
            existing.name
        )));
    }

    existing.delete(db).await?;
    info!(category_id, "Deleted category");
    Ok(())
}
