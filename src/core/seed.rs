//! Starter catalog seeding from config.toml.
//!
//! Runs at startup. Only an empty catalog is seeded; once any category or
//! product exists the configuration entries are ignored, so edits made through
//! the API are never overwritten on restart.

use crate::{
    config::AppConfig,
    core::{
        category::{create_category, get_category_by_name},
        product::{NewProduct, create_product},
    },
    entities::{Category, Product},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use tracing::{debug, info};

/// What a seeding run inserted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Categories inserted
    pub categories: usize,
    /// Products inserted
    pub products: usize,
}

/// Seeds the configured categories and products into an empty catalog.
///
/// # Errors
/// Returns [`Error::Config`] if a product names a category that is neither
/// configured nor present, plus any validation error from the catalog
/// functions.
pub async fn seed_catalog(db: &DatabaseConnection, config: &AppConfig) -> Result<SeedSummary> {
    if config.categories.is_empty() && config.products.is_empty() {
        debug!("No starter catalog configured");
        return Ok(SeedSummary::default());
    }

    let existing = Category::find().count(db).await? + Product::find().count(db).await?;
    if existing > 0 {
        info!("Catalog already populated, skipping seed");
        return Ok(SeedSummary::default());
    }

    let mut summary = SeedSummary::default();
    for seed in &config.categories {
        create_category(db, seed.name.clone(), seed.description.clone()).await?;
        summary.categories += 1;
    }

    for seed in &config.products {
        let category = get_category_by_name(db, &seed.category)
            .await?
            .ok_or_else(|| Error::Config {
                message: format!(
                    "Product '{}' refers to unknown category '{}'",
                    seed.name, seed.category
                ),
            })?;
        create_product(
            db,
            NewProduct {
                name: seed.name.clone(),
                description: seed.description.clone(),
                price: seed.price,
                stock: seed.stock,
                unit: seed.unit.clone(),
                category_id: category.id,
            },
        )
        .await?;
        summary.products += 1;
    }

    info!(
        categories = summary.categories,
        products = summary.products,
        "Seeded starter catalog"
    );
    Ok(summary)
}
