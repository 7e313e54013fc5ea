/// Database configuration and connection management
pub mod database;

/// Application settings loaded from config.toml
pub mod settings;

/// Administrator bootstrap from environment variables
pub mod users;

pub use settings::{AppConfig, DashboardConfig, PricingConfig};
