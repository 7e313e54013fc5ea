//! Application settings loaded from config.toml
//!
//! The file carries the pricing rules used to compute order totals, the
//! dashboard low-stock threshold, and an optional starter catalog that is
//! seeded into an empty database. Every section is optional; a missing file
//! yields the defaults.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Delivery fee and tax rules
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Dashboard tuning
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Categories to seed when the catalog is empty
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    /// Products to seed when the catalog is empty
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

/// Rules used to compute order totals on the server
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PricingConfig {
    /// Flat delivery fee for orders below the free-delivery threshold
    #[serde(default = "default_delivery_charge")]
    pub delivery_charge: f64,
    /// Items subtotal at or above which delivery is free
    #[serde(default = "default_free_delivery_threshold")]
    pub free_delivery_threshold: f64,
    /// Tax as a fraction of the items subtotal (0.05 = 5%)
    #[serde(default)]
    pub tax_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            delivery_charge: default_delivery_charge(),
            free_delivery_threshold: default_free_delivery_threshold(),
            tax_rate: 0.0,
        }
    }
}

const fn default_delivery_charge() -> f64 {
    40.0
}

const fn default_free_delivery_threshold() -> f64 {
    500.0
}

/// Dashboard settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DashboardConfig {
    /// Products with fewer units than this count as low stock
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

const fn default_low_stock_threshold() -> i64 {
    10
}

/// Seed entry for a category
#[derive(Debug, Clone, Deserialize)]
pub struct CategorySeed {
    /// Category name
    pub name: String,
    /// Category description
    #[serde(default)]
    pub description: String,
}

/// Seed entry for a product; `category` refers to a seeded category by name
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSeed {
    /// Product name
    pub name: String,
    /// Product description
    #[serde(default)]
    pub description: String,
    /// Unit price
    pub price: f64,
    /// Starting stock
    pub stock: i64,
    /// Display unit
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Name of the category to file the product under
    pub category: String,
}

fn default_unit() -> String {
    "piece".to_string()
}

impl PricingConfig {
    /// Rejects negative or non-finite pricing rules.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("delivery_charge", self.delivery_charge),
            ("free_delivery_threshold", self.free_delivery_threshold),
            ("tax_rate", self.tax_rate),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config {
                    message: format!("pricing.{name} must be a non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// Parses settings from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.pricing.validate()?;
    Ok(config)
}

/// Loads settings from a TOML file, falling back to defaults when the file is absent.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed, or if
/// the pricing rules are invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        info!("No config file at {}, using defaults", path_ref.display());
        return Ok(AppConfig::default());
    }

    debug!("Loading configuration from {}", path_ref.display());
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads settings from `FRESHMART_CONFIG`, or ./config.toml when unset.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("FRESHMART_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}
