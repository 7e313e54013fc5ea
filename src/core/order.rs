//! Order business logic - placement, queries and lifecycle transitions.
//!
//! Placement reserves stock for every line item and writes the order inside one
//! database transaction: either every line is reserved and the order exists, or
//! nothing changed. Status changes are compare-and-set updates keyed on the
//! status that was read, and cancellation puts the reserved units back in the
//! same transaction.

use crate::{
    config::PricingConfig,
    core::{
        pricing::{OrderTotals, compute_totals, matches_client_total, round_cents},
        product::{reserve_stock, restore_stock},
        status::{OrderStatus, PaymentMethod, PaymentStatus},
        user::is_admin,
    },
    entities::{Order, OrderItem, order, order_item, user},
    errors::{Error, Result},
};
use sea_orm::{
    DatabaseTransaction, LoaderTrait, PaginatorTrait, QueryOrder, QuerySelect, Set,
    TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Reason stored when an administrator cancels an order
pub const ADMIN_CANCEL_REASON: &str = "Cancelled by administrator";
/// Reason stored when a customer cancels without giving one
pub const CUSTOMER_CANCEL_REASON: &str = "Cancelled by customer";

/// Default page size for the administrator order listing
pub const DEFAULT_ORDER_PAGE_SIZE: u64 = 10;
const MAX_ORDER_PAGE_SIZE: u64 = 100;

/// One requested line: which product and how many
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    /// Product to buy
    pub product_id: i64,
    /// Units to buy
    pub quantity: i64,
}

/// Delivery address captured with the order
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    /// Recipient name
    pub name: String,
    /// Street address
    pub address: String,
    /// City
    pub city: String,
    /// Postal code
    pub postal_code: String,
    /// Contact phone number
    pub phone: String,
}

/// Payment selection captured with the order
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    /// How the customer pays
    #[serde(default)]
    pub method: PaymentMethod,
    /// Payment state reported by the checkout flow; cash on delivery cannot
    /// arrive already completed
    #[serde(default)]
    pub status: PaymentStatus,
}

/// Checkout request body.
///
/// The price fields are what the storefront displayed. They are compared with
/// the server's own computation for logging and otherwise ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    /// Requested lines
    pub order_items: Vec<OrderLineRequest>,
    /// Delivery address
    pub shipping_info: ShippingInfo,
    /// Payment selection
    #[serde(default)]
    pub payment_info: PaymentInfo,
    /// Client-side items subtotal
    pub items_price: Option<f64>,
    /// Client-side delivery fee
    pub delivery_charge: Option<f64>,
    /// Client-side tax
    pub tax_price: Option<f64>,
    /// Client-side grand total
    pub total_price: Option<f64>,
}

/// An order together with its line items
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    /// The order row
    #[serde(flatten)]
    pub order: order::Model,
    /// Its line items
    pub order_items: Vec<order_item::Model>,
}

impl OrderDetails {
    /// Parsed lifecycle status of the order.
    pub fn status(&self) -> Result<OrderStatus> {
        self.order.status.parse()
    }
}

/// Administrator listing filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    /// Only orders in this status
    pub status: Option<String>,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size
    pub limit: Option<u64>,
}

/// One page of the administrator order listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    /// Orders on this page, newest first
    pub orders: Vec<OrderDetails>,
    /// Orders matching the filter across all pages
    pub total_orders: u64,
    /// Number of pages
    pub total_pages: u64,
    /// Revenue across all orders (see [`total_revenue`])
    pub total_revenue: f64,
}

/// Validates the requested lines and merges repeated products.
///
/// Returns `(product_id, quantity)` pairs in first-seen order.
fn merge_lines(lines: &[OrderLineRequest]) -> Result<Vec<(i64, i64)>> {
    if lines.is_empty() {
        return Err(Error::validation("Order must contain at least one item"));
    }

    let mut merged: Vec<(i64, i64)> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(Error::validation(format!(
                "Quantity for product {} must be positive",
                line.product_id
            )));
        }
        match merged.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, quantity)) => {
                *quantity = quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| Error::validation("Quantity is too large"))?;
            }
            None => merged.push((line.product_id, line.quantity)),
        }
    }
    Ok(merged)
}

fn validate_shipping(shipping: &ShippingInfo) -> Result<()> {
    let fields = [
        ("name", &shipping.name),
        ("address", &shipping.address),
        ("city", &shipping.city),
        ("postal code", &shipping.postal_code),
        ("phone", &shipping.phone),
    ];
    for (label, value) in fields {
        if value.trim().is_empty() {
            return Err(Error::validation(format!("Shipping {label} is required")));
        }
    }
    Ok(())
}

fn validate_payment(payment: PaymentInfo) -> Result<()> {
    if payment.method == PaymentMethod::Cod && payment.status == PaymentStatus::Completed {
        return Err(Error::validation(
            "Cash on delivery orders are paid on delivery, not at checkout",
        ));
    }
    Ok(())
}

fn warn_on_client_mismatch(request: &PlaceOrderRequest, totals: &OrderTotals, user_id: i64) {
    let submitted = [
        ("itemsPrice", request.items_price, totals.items_price),
        ("deliveryCharge", request.delivery_charge, totals.delivery_charge),
        ("taxPrice", request.tax_price, totals.tax_price),
        ("totalPrice", request.total_price, totals.total_price),
    ];
    for (field, client, server) in submitted {
        let Some(client) = client else { continue };
        if !matches_client_total(server, client) {
            warn!(user_id, field, client, server, "Client total ignored, using server value");
        }
    }
}

/// Places an order for `user_id`.
///
/// # Errors
/// - [`Error::Validation`] for an empty order, non-positive quantity, missing shipping
///   field, or a cash-on-delivery order claiming completed payment
/// - [`Error::ProductNotFound`] if a product is absent or inactive
/// - [`Error::InsufficientStock`] if any line cannot be covered
///
/// On any error no stock has been taken.
pub async fn place_order(
    db: &DatabaseConnection,
    user_id: i64,
    request: PlaceOrderRequest,
    pricing: &PricingConfig,
) -> Result<OrderDetails> {
    let lines = merge_lines(&request.order_items)?;
    validate_shipping(&request.shipping_info)?;
    validate_payment(request.payment_info)?;

    let txn = db.begin().await?;

    // (product_id, name, unit price, quantity) as of the reservation
    let mut snapshots = Vec::with_capacity(lines.len());
    for (product_id, quantity) in lines {
        let product = reserve_stock(&txn, product_id, quantity).await?;
        debug!(product_id, quantity, remaining = product.stock, "Reserved stock");
        snapshots.push((product_id, product.name, product.price, quantity));
    }

    let totals = compute_totals(
        snapshots.iter().map(|(_, _, price, quantity)| (*price, *quantity)),
        pricing,
    );
    warn_on_client_mismatch(&request, &totals, user_id);

    let now = chrono::Utc::now();
    let shipping = request.shipping_info;
    let new_order = order::ActiveModel {
        user_id: Set(user_id),
        shipping_name: Set(shipping.name.trim().to_string()),
        shipping_address: Set(shipping.address.trim().to_string()),
        shipping_city: Set(shipping.city.trim().to_string()),
        shipping_postal_code: Set(shipping.postal_code.trim().to_string()),
        shipping_phone: Set(shipping.phone.trim().to_string()),
        payment_method: Set(request.payment_info.method.as_str().to_string()),
        payment_status: Set(request.payment_info.status.as_str().to_string()),
        items_price: Set(totals.items_price),
        delivery_charge: Set(totals.delivery_charge),
        tax_price: Set(totals.tax_price),
        total_price: Set(totals.total_price),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        cancel_reason: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        delivered_at: Set(None),
        cancelled_at: Set(None),
        ..Default::default()
    };
    let order = new_order.insert(&txn).await?;

    let mut order_items = Vec::with_capacity(snapshots.len());
    for (product_id, name, price, quantity) in snapshots {
        let item = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(product_id),
            name: Set(name),
            price: Set(price),
            quantity: Set(quantity),
            ..Default::default()
        };
        order_items.push(item.insert(&txn).await?);
    }

    txn.commit().await?;
    info!(
        order_id = order.id,
        user_id,
        items = order_items.len(),
        total = order.total_price,
        "Order placed"
    );

    Ok(OrderDetails { order, order_items })
}

async fn load_items<C>(db: &C, order_id: i64) -> Result<Vec<order_item::Model>>
where
    C: ConnectionTrait,
{
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pairs every order with its line items using one extra query.
pub(crate) async fn attach_items(
    db: &DatabaseConnection,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderDetails>> {
    let items = orders.load_many(OrderItem, db).await?;
    Ok(orders
        .into_iter()
        .zip(items)
        .map(|(order, order_items)| OrderDetails { order, order_items })
        .collect())
}

/// Retrieves an order visible to `requester`: its owner or any administrator.
///
/// # Errors
/// [`Error::OrderNotFound`] if absent, [`Error::Forbidden`] for anyone else.
pub async fn get_order(
    db: &DatabaseConnection,
    order_id: i64,
    requester: &user::Model,
) -> Result<OrderDetails> {
    let order = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })?;

    if order.user_id != requester.id && !is_admin(requester) {
        warn!(order_id, user_id = requester.id, "Order access denied");
        return Err(Error::Forbidden {
            message: "You are not allowed to view this order".to_string(),
        });
    }

    let order_items = load_items(db, order_id).await?;
    Ok(OrderDetails { order, order_items })
}

/// All orders placed by `user_id`, newest first.
pub async fn list_user_orders(db: &DatabaseConnection, user_id: i64) -> Result<Vec<OrderDetails>> {
    let orders = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    attach_items(db, orders).await
}

/// Sum of `total_price` over orders that count as revenue: not cancelled and
/// with completed payment. Restricted to orders created at or after `since`
/// when given.
pub async fn total_revenue(
    db: &DatabaseConnection,
    since: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<f64> {
    let mut query = Order::find()
        .select_only()
        .column_as(Expr::col(order::Column::TotalPrice).sum(), "revenue")
        .filter(order::Column::Status.ne(OrderStatus::Cancelled.as_str()))
        .filter(order::Column::PaymentStatus.eq(PaymentStatus::Completed.as_str()));
    if let Some(since) = since {
        query = query.filter(order::Column::CreatedAt.gte(since));
    }

    let revenue: Option<Option<f64>> = query.into_tuple().one(db).await?;
    Ok(round_cents(revenue.flatten().unwrap_or(0.0)))
}

/// Number of orders in each lifecycle status. Every status is present.
pub async fn count_by_status(db: &DatabaseConnection) -> Result<BTreeMap<String, u64>> {
    let rows: Vec<(String, i64)> = Order::find()
        .select_only()
        .column(order::Column::Status)
        .column_as(Expr::col(order::Column::Id).count(), "count")
        .group_by(order::Column::Status)
        .into_tuple()
        .all(db)
        .await?;

    let mut counts: BTreeMap<String, u64> = OrderStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    for (status, count) in rows {
        counts.insert(status, u64::try_from(count)?);
    }
    Ok(counts)
}

/// Administrator listing, newest first, optionally filtered by status.
///
/// # Errors
/// [`Error::Validation`] if `status` is not a lifecycle status.
pub async fn list_orders(db: &DatabaseConnection, filter: &OrderFilter) -> Result<OrderPage> {
    let limit = filter
        .limit
        .unwrap_or(DEFAULT_ORDER_PAGE_SIZE)
        .clamp(1, MAX_ORDER_PAGE_SIZE);
    let page = filter.page.unwrap_or(1).max(1);

    let mut query = Order::find();
    if let Some(status) = filter.status.as_deref().filter(|s| !s.trim().is_empty()) {
        let status: OrderStatus = status.parse()?;
        query = query.filter(order::Column::Status.eq(status.as_str()));
    }

    let paginator = query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .paginate(db, limit);
    let counts = paginator.num_items_and_pages().await?;
    let orders = paginator.fetch_page(page - 1).await?;

    Ok(OrderPage {
        orders: attach_items(db, orders).await?,
        total_orders: counts.number_of_items,
        total_pages: counts.number_of_pages,
        total_revenue: total_revenue(db, None).await?,
    })
}

/// Puts every line item's units back on the shelf. Deleted products are skipped.
async fn restore_order_stock(txn: &DatabaseTransaction, order_id: i64) -> Result<()> {
    let items = load_items(txn, order_id).await?;
    let mut skipped = 0_usize;
    for item in &items {
        if !restore_stock(txn, item.product_id, item.quantity).await? {
            skipped += 1;
        }
    }
    debug!(order_id, restored = items.len() - skipped, skipped, "Restored order stock");
    Ok(())
}

/// Moves `existing` to `target` if it is still in the status that was read.
///
/// The caller has already checked the transition table. When another request
/// changed the status in between, nothing is written and
/// [`Error::InvalidTransition`] reports the status actually found.
async fn apply_transition(
    txn: &DatabaseTransaction,
    existing: order::Model,
    target: OrderStatus,
    cancel_reason: Option<String>,
) -> Result<OrderDetails> {
    let now = chrono::Utc::now();
    let mut update = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(target.as_str()))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(existing.id))
        .filter(order::Column::Status.eq(existing.status.as_str()));

    match target {
        OrderStatus::Delivered => {
            update = update
                .col_expr(order::Column::DeliveredAt, Expr::value(Some(now)))
                .col_expr(
                    order::Column::PaymentStatus,
                    Expr::value(PaymentStatus::Completed.as_str()),
                );
        }
        OrderStatus::Cancelled => {
            update = update
                .col_expr(order::Column::CancelledAt, Expr::value(Some(now)))
                .col_expr(order::Column::CancelReason, Expr::value(cancel_reason));
        }
        OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Shipping => {}
    }

    let result = update.exec(txn).await?;
    let reloaded = Order::find_by_id(existing.id)
        .one(txn)
        .await?
        .ok_or(Error::OrderNotFound { id: existing.id })?;

    if result.rows_affected == 0 {
        return Err(Error::InvalidTransition {
            from: reloaded.status,
            to: target.to_string(),
        });
    }

    if target == OrderStatus::Cancelled {
        restore_order_stock(txn, existing.id).await?;
    }

    let order_items = load_items(txn, existing.id).await?;
    Ok(OrderDetails {
        order: reloaded,
        order_items,
    })
}

/// Administrator status change, validated against the transition table.
///
/// Moving to `delivered` stamps `delivered_at` and marks the payment completed.
/// Moving to `cancelled` stamps `cancelled_at` and restores stock.
///
/// # Errors
/// - [`Error::Validation`] if `target` is not a lifecycle status
/// - [`Error::OrderNotFound`] if the order does not exist
/// - [`Error::InvalidTransition`] if the table does not allow the move
pub async fn update_order_status(
    db: &DatabaseConnection,
    order_id: i64,
    target: &str,
) -> Result<OrderDetails> {
    let target: OrderStatus = target.parse()?;

    let txn = db.begin().await?;
    let existing = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })?;
    let current: OrderStatus = existing.status.parse()?;

    if let Err(err) = current.transition(target) {
        warn!(order_id, from = %current, to = %target, "Rejected status change");
        return Err(err);
    }

    let reason = (target == OrderStatus::Cancelled).then(|| ADMIN_CANCEL_REASON.to_string());
    let details = apply_transition(&txn, existing, target, reason).await?;
    txn.commit().await?;

    info!(order_id, from = %current, to = %target, "Order status changed");
    Ok(details)
}

/// Customer cancellation of their own order.
///
/// # Errors
/// - [`Error::OrderNotFound`] if the order does not exist
/// - [`Error::Forbidden`] if `requester` does not own it
/// - [`Error::CannotCancel`] unless the order is pending or processing
pub async fn cancel_order(
    db: &DatabaseConnection,
    order_id: i64,
    requester: &user::Model,
    reason: Option<String>,
) -> Result<OrderDetails> {
    let txn = db.begin().await?;
    let existing = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })?;

    if existing.user_id != requester.id {
        warn!(order_id, user_id = requester.id, "Cancellation by non-owner denied");
        return Err(Error::Forbidden {
            message: "You can only cancel your own orders".to_string(),
        });
    }

    let current: OrderStatus = existing.status.parse()?;
    if !current.is_cancellable() {
        return Err(Error::CannotCancel {
            status: current.to_string(),
        });
    }

    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| CUSTOMER_CANCEL_REASON.to_string());

    let details = apply_transition(&txn, existing, OrderStatus::Cancelled, Some(reason))
        .await
        .map_err(|err| match err {
            Error::InvalidTransition { from, .. } => Error::CannotCancel { status: from },
            other => other,
        })?;
    txn.commit().await?;

    info!(order_id, user_id = requester.id, "Order cancelled by customer");
    Ok(details)
}
