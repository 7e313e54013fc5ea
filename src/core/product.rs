//! Product business logic - catalog CRUD, filtered listing and the stock ledger.
//!
//! Stock is never read, modified and written back. Every change is a single
//! `UPDATE` whose `WHERE` clause carries the precondition, so two concurrent
//! orders for the last unit cannot both succeed:
//! `UPDATE products SET stock = stock - ? WHERE id = ? AND is_active AND stock >= ?`

use crate::{
    entities::{Category, Product, product},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default page size for catalog listings
pub const DEFAULT_PAGE_SIZE: u64 = 12;
/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u64 = 100;

/// Fields for a new product
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// Product name
    pub name: String,
    /// Storefront description
    #[serde(default)]
    pub description: String,
    /// Unit price
    pub price: f64,
    /// Opening stock
    pub stock: i64,
    /// Display unit
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Category to file the product under
    pub category_id: i64,
}

fn default_unit() -> String {
    "piece".to_string()
}

/// Partial update of a product; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New unit price
    pub price: Option<f64>,
    /// New absolute stock level (administrative restock or correction)
    pub stock: Option<i64>,
    /// New display unit
    pub unit: Option<String>,
    /// New category
    pub category_id: Option<i64>,
    /// Show or hide the product
    pub is_active: Option<bool>,
}

/// Catalog listing filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    /// Only products in this category
    pub category_id: Option<i64>,
    /// Substring match on the product name
    pub search: Option<String>,
    /// Lowest unit price, inclusive
    pub min_price: Option<f64>,
    /// Highest unit price, inclusive
    pub max_price: Option<f64>,
    /// Only products with at least one unit in stock
    #[serde(default)]
    pub in_stock: bool,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size
    pub limit: Option<u64>,
}

/// One page of catalog results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    /// Products on this page
    pub products: Vec<product::Model>,
    /// Products matching the filter across all pages
    pub total_products: u64,
    /// Number of pages
    pub total_pages: u64,
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::InvalidAmount { amount: price });
    }
    Ok(())
}

fn validate_stock(stock: i64) -> Result<()> {
    if stock < 0 {
        return Err(Error::validation("Stock cannot be negative"));
    }
    Ok(())
}

async fn ensure_category_exists(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    Category::find_by_id(category_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or(Error::CategoryNotFound { id: category_id })
}

/// Retrieves a specific product by its unique ID, active or not.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product that is visible in the storefront.
///
/// # Errors
/// Returns [`Error::ProductNotFound`] if the product is absent or inactive.
pub async fn get_active_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    get_product_by_id(db, product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or(Error::ProductNotFound { id: product_id })
}

/// Lists active products matching `filter`, alphabetically, one page at a time.
pub async fn list_products(db: &DatabaseConnection, filter: &ProductFilter) -> Result<ProductPage> {
    let limit = filter
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = filter.page.unwrap_or(1).max(1);

    let mut query = Product::find().filter(product::Column::IsActive.eq(true));
    if let Some(category_id) = filter.category_id {
        query = query.filter(product::Column::CategoryId.eq(category_id));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(product::Column::Name.contains(search));
    }
    if let Some(min_price) = filter.min_price {
        query = query.filter(product::Column::Price.gte(min_price));
    }
    if let Some(max_price) = filter.max_price {
        query = query.filter(product::Column::Price.lte(max_price));
    }
    if filter.in_stock {
        query = query.filter(product::Column::Stock.gt(0));
    }

    let paginator = query
        .order_by_asc(product::Column::Name)
        .order_by_asc(product::Column::Id)
        .paginate(db, limit);
    let counts = paginator.num_items_and_pages().await?;
    let products = paginator.fetch_page(page - 1).await?;
    debug!(page, limit, total = counts.number_of_items, "Listed products");

    Ok(ProductPage {
        products,
        total_products: counts.number_of_items,
        total_pages: counts.number_of_pages,
    })
}

/// Creates a new product after validating its fields.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - The price is negative or not finite (NaN, infinity)
/// - The stock is negative
/// - The category does not exist
pub async fn create_product(db: &DatabaseConnection, new: NewProduct) -> Result<product::Model> {
    if new.name.trim().is_empty() {
        return Err(Error::validation("Product name cannot be empty"));
    }
    validate_price(new.price)?;
    validate_stock(new.stock)?;
    ensure_category_exists(db, new.category_id).await?;

    let now = chrono::Utc::now();
    let product = product::ActiveModel {
        name: Set(new.name.trim().to_string()),
        description: Set(new.description.trim().to_string()),
        price: Set(new.price),
        stock: Set(new.stock),
        unit: Set(new.unit.trim().to_string()),
        category_id: Set(new.category_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = product.insert(db).await?;
    info!(product_id = created.id, name = %created.name, "Created product");
    Ok(created)
}

/// Applies a partial update to a product.
///
/// Changing the price never touches existing orders; their line items keep the
/// price captured at checkout.
///
/// # Errors
/// Returns [`Error::ProductNotFound`] if the product does not exist, plus the
/// same validation errors as [`create_product`].
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    changes: ProductUpdate,
) -> Result<product::Model> {
    let mut product: product::ActiveModel = get_product_by_id(db, product_id)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?
        .into();

    if let Some(name) = changes.name {
        if name.trim().is_empty() {
            return Err(Error::validation("Product name cannot be empty"));
        }
        product.name = Set(name.trim().to_string());
    }
    if let Some(description) = changes.description {
        product.description = Set(description.trim().to_string());
    }
    if let Some(price) = changes.price {
        validate_price(price)?;
        product.price = Set(price);
    }
    if let Some(stock) = changes.stock {
        validate_stock(stock)?;
        product.stock = Set(stock);
    }
    if let Some(unit) = changes.unit {
        product.unit = Set(unit.trim().to_string());
    }
    if let Some(category_id) = changes.category_id {
        ensure_category_exists(db, category_id).await?;
        product.category_id = Set(category_id);
    }
    if let Some(is_active) = changes.is_active {
        product.is_active = Set(is_active);
    }
    product.updated_at = Set(chrono::Utc::now());

    product.update(db).await.map_err(Into::into)
}

/// Permanently removes a product. Orders that bought it keep their snapshot.
///
/// # Errors
/// Returns [`Error::ProductNotFound`] if the product does not exist.
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    let result = Product::delete_by_id(product_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::ProductNotFound { id: product_id });
    }
    info!(product_id, "Deleted product");
    Ok(())
}

/// Takes `quantity` units out of stock if, and only if, that many are available.
///
/// The check and the decrement are one statement, so concurrent callers can
/// never drive stock below zero. Returns the product as it is after the update.
///
/// # Errors
/// - [`Error::ProductNotFound`] if the product is absent or inactive
/// - [`Error::InsufficientStock`] if fewer than `quantity` units remain
pub async fn reserve_stock<C>(db: &C, product_id: i64, quantity: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    let result = Product::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::IsActive.eq(true))
        .filter(product::Column::Stock.gte(quantity))
        .exec(db)
        .await?;

    let current = get_product_by_id(db, product_id).await?;
    match current {
        Some(product) if result.rows_affected > 0 => Ok(product),
        Some(product) if product.is_active => Err(Error::InsufficientStock {
            product: product.name,
            available: product.stock,
            requested: quantity,
        }),
        _ => Err(Error::ProductNotFound { id: product_id }),
    }
}

/// Puts `quantity` units back into stock.
///
/// Returns `false` without error when the product has since been deleted;
/// there is nothing left to restock.
pub async fn restore_stock<C>(db: &C, product_id: i64, quantity: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Product::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).add(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        debug!(product_id, quantity, "Product gone, stock restoration skipped");
        return Ok(false);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn new_product(name: &str, price: f64, stock: i64, category_id: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: String::new(),
            price,
            stock,
            unit: "kg".to_string(),
            category_id,
        }
    }

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        // Test empty name validation
        let result = create_product(&db, new_product("   ", 10.0, 1, 1)).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // Test negative price validation
        let result = create_product(&db, new_product("Onion", -10.0, 1, 1)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -10.0 }
        ));

        // Test NaN price validation
        let result = create_product(&db, new_product("Onion", f64::NAN, 1, 1)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        // Test negative stock validation
        let result = create_product(&db, new_product("Onion", 10.0, -1, 1)).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_requires_category() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_product(&db, new_product("Onion", 30.0, 5, 77)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::CategoryNotFound { id: 77 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_partial() -> Result<()> {
        let (db, _category, product) = setup_with_product(5).await?;

        let updated = update_product(
            &db,
            product.id,
            ProductUpdate {
                price: Some(99.5),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.price, 99.5);
        assert_eq!(updated.name, product.name);
        assert_eq!(updated.stock, 5);

        let result = update_product(
            &db,
            product.id,
            ProductUpdate {
                stock: Some(-3),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_products_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let fruits = create_test_category(&db, "Fruits").await?;
        let dairy = create_test_category(&db, "Dairy").await?;

        create_product(&db, new_product("Apple", 120.0, 10, fruits.id)).await?;
        create_product(&db, new_product("Banana", 40.0, 0, fruits.id)).await?;
        create_product(&db, new_product("Paneer", 90.0, 4, dairy.id)).await?;
        let hidden = create_product(&db, new_product("Apricot", 300.0, 3, fruits.id)).await?;
        update_product(
            &db,
            hidden.id,
            ProductUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

        let all = list_products(&db, &ProductFilter::default()).await?;
        assert_eq!(all.total_products, 3);
        assert_eq!(all.products[0].name, "Apple");

        let fruit_page = list_products(
            &db,
            &ProductFilter {
                category_id: Some(fruits.id),
                in_stock: true,
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(fruit_page.total_products, 1);
        assert_eq!(fruit_page.products[0].name, "Apple");

        let priced = list_products(
            &db,
            &ProductFilter {
                min_price: Some(50.0),
                max_price: Some(100.0),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(priced.total_products, 1);
        assert_eq!(priced.products[0].name, "Paneer");

        let searched = list_products(
            &db,
            &ProductFilter {
                search: Some("nan".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(searched.total_products, 1);
        assert_eq!(searched.products[0].name, "Banana");

        Ok(())
    }

    #[tokio::test]
    async fn test_list_products_pagination() -> Result<()> {
        let db = setup_test_db().await?;
        let category = create_test_category(&db, "Snacks").await?;
        for i in 0..5 {
            create_product(&db, new_product(&format!("Chips {i}"), 20.0, 5, category.id)).await?;
        }

        let page = list_products(
            &db,
            &ProductFilter {
                page: Some(3),
                limit: Some(2),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(page.total_products, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.products[0].name, "Chips 4");

        Ok(())
    }

    #[tokio::test]
    async fn test_reserve_stock_decrements() -> Result<()> {
        let (db, _category, product) = setup_with_product(5).await?;

        let after = reserve_stock(&db, product.id, 3).await?;
        assert_eq!(after.stock, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_reserve_stock_insufficient_leaves_stock() -> Result<()> {
        let (db, _category, product) = setup_with_product(2).await?;

        let result = reserve_stock(&db, product.id, 3).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));
        let unchanged = get_product_by_id(&db, product.id).await?.unwrap();
        assert_eq!(unchanged.stock, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_reserve_stock_inactive_or_missing() -> Result<()> {
        let (db, _category, product) = setup_with_product(5).await?;
        update_product(
            &db,
            product.id,
            ProductUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

        let result = reserve_stock(&db, product.id, 1).await;
        assert!(matches!(result.unwrap_err(), Error::ProductNotFound { .. }));

        let result = reserve_stock(&db, 999, 1).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { id: 999 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_restore_stock_skips_deleted_product() -> Result<()> {
        let (db, _category, product) = setup_with_product(5).await?;

        assert!(restore_stock(&db, product.id, 4).await?);
        assert_eq!(get_product_by_id(&db, product.id).await?.unwrap().stock, 9);

        delete_product(&db, product.id).await?;
        assert!(!restore_stock(&db, product.id, 4).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = delete_product(&db, 999).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { id: 999 }
        ));
        Ok(())
    }
}
