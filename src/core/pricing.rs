//! Order totals computed on the server.
//!
//! Prices come from the product rows read inside the placement transaction,
//! never from the request body. Amounts are rounded to whole cents at every
//! step so stored totals always add up exactly.

use crate::config::PricingConfig;
use serde::Serialize;

/// Breakdown of an order's charges
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    /// Sum of price times quantity over all lines
    pub items_price: f64,
    /// Delivery fee, zero above the free-delivery threshold
    pub delivery_charge: f64,
    /// Tax on the items subtotal
    pub tax_price: f64,
    /// Grand total
    pub total_price: f64,
}

/// Rounds a monetary amount to two decimal places.
#[must_use]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Computes the totals for `(unit price, quantity)` lines under `rules`.
#[must_use]
pub fn compute_totals<I>(lines: I, rules: &PricingConfig) -> OrderTotals
where
    I: IntoIterator<Item = (f64, i64)>,
{
    // Cast safety: quantities are validated positive and far below 2^52.
    #[allow(clippy::cast_precision_loss)]
    let items_price = round_cents(
        lines
            .into_iter()
            .map(|(price, quantity)| price * quantity as f64)
            .sum(),
    );

    let delivery_charge = if items_price >= rules.free_delivery_threshold {
        0.0
    } else {
        round_cents(rules.delivery_charge)
    };
    let tax_price = round_cents(items_price * rules.tax_rate);
    let total_price = round_cents(items_price + delivery_charge + tax_price);

    OrderTotals {
        items_price,
        delivery_charge,
        tax_price,
        total_price,
    }
}

/// Whether a client-side total agrees with the server's to within one cent.
#[must_use]
pub fn matches_client_total(computed: f64, submitted: f64) -> bool {
    (computed - submitted).abs() < 0.01 + f64::EPSILON
}
