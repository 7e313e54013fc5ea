//! Dashboard business logic - store-wide statistics for administrators.
//!
//! Everything is aggregated on request from the current rows; nothing is
//! cached, so a cancellation shows up in the very next call.

use crate::{
    config::DashboardConfig,
    core::{
        order::{attach_items, count_by_status, total_revenue},
        user::ROLE_USER,
    },
    entities::{Order, Product, User, order, product, user},
    errors::Result,
};
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use sea_orm::{LoaderTrait, PaginatorTrait, QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Number of orders shown in the recent-orders panel
pub const RECENT_ORDER_COUNT: u64 = 5;

/// Condensed view of a recent order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    /// Order ID
    pub id: i64,
    /// Name of the purchasing user, empty if the account is gone
    pub customer_name: String,
    /// Names of the products bought, in line order
    pub product_names: Vec<String>,
    /// Grand total
    pub total_price: f64,
    /// Lifecycle status
    pub status: String,
    /// When the order was placed
    pub created_at: DateTime<Utc>,
}

/// Store-wide statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Active products in the catalog
    pub total_products: u64,
    /// All orders ever placed
    pub total_orders: u64,
    /// Customer accounts
    pub total_users: u64,
    /// Revenue over all time
    pub total_revenue: f64,
    /// Orders placed since midnight UTC
    pub today_orders: u64,
    /// Revenue from orders placed this calendar month (UTC)
    pub monthly_revenue: f64,
    /// Active products below the low-stock threshold
    pub low_stock_products: u64,
    /// Order count per lifecycle status
    pub orders_by_status: BTreeMap<String, u64>,
    /// Latest orders, newest first
    pub recent_orders: Vec<RecentOrder>,
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    today
        .with_day(1)
        .unwrap_or(today)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

async fn recent_orders(db: &DatabaseConnection) -> Result<Vec<RecentOrder>> {
    let orders = Order::find()
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .limit(RECENT_ORDER_COUNT)
        .all(db)
        .await?;
    let customers = orders.load_one(User, db).await?;
    let details = attach_items(db, orders).await?;

    Ok(details
        .into_iter()
        .zip(customers)
        .map(|(details, customer)| RecentOrder {
            id: details.order.id,
            customer_name: customer.map(|c| c.name).unwrap_or_default(),
            product_names: details.order_items.into_iter().map(|item| item.name).collect(),
            total_price: details.order.total_price,
            status: details.order.status,
            created_at: details.order.created_at,
        })
        .collect())
}

/// Computes the dashboard from the current state of the store.
pub async fn get_dashboard_stats(
    db: &DatabaseConnection,
    settings: &DashboardConfig,
) -> Result<DashboardStats> {
    let now = Utc::now();

    let total_products = Product::find()
        .filter(product::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let low_stock_products = Product::find()
        .filter(product::Column::IsActive.eq(true))
        .filter(product::Column::Stock.lt(settings.low_stock_threshold))
        .count(db)
        .await?;
    let total_users = User::find()
        .filter(user::Column::Role.eq(ROLE_USER))
        .count(db)
        .await?;
    let total_orders = Order::find().count(db).await?;
    let today_orders = Order::find()
        .filter(order::Column::CreatedAt.gte(start_of_day(now)))
        .count(db)
        .await?;

    let stats = DashboardStats {
        total_products,
        total_orders,
        total_users,
        total_revenue: total_revenue(db, None).await?,
        today_orders,
        monthly_revenue: total_revenue(db, Some(start_of_month(now))).await?,
        low_stock_products,
        orders_by_status: count_by_status(db).await?,
        recent_orders: recent_orders(db).await?,
    };
    debug!(
        orders = stats.total_orders,
        revenue = stats.total_revenue,
        "Computed dashboard stats"
    );
    Ok(stats)
}
