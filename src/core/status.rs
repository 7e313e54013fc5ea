//! Order lifecycle state machine.
//!
//! ```text
//!   pending ──► processing ──► shipping ──► delivered (terminal)
//!      │             │
//!      └─────────────┴──────► cancelled (terminal)
//! ```
//!
//! Every status change goes through [`OrderStatus::can_transition`]; anything
//! not drawn above is rejected, including staying in the same status.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, stock reserved, not yet picked
    Pending,
    /// Being packed
    Processing,
    /// Out for delivery
    Shipping,
    /// Handed to the customer. **Terminal.**
    Delivered,
    /// Cancelled by the customer or an administrator. **Terminal.**
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipping,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Lower-case name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipping => "shipping",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Only orders that have not left the store can be cancelled.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// The transition table.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Shipping)
                | (Self::Shipping, Self::Delivered)
                | (Self::Pending | Self::Processing, Self::Cancelled)
        )
    }

    /// Checks `self -> to` against the transition table.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] for any move the table does not allow.
    pub fn transition(self, to: Self) -> Result<Self> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(Error::InvalidTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::validation(format!("Unknown order status '{s}'")))
    }
}

/// Payment state recorded on an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Not yet paid (cash on delivery, or awaiting gateway)
    #[default]
    Pending,
    /// Paid; counts towards revenue
    Completed,
    /// Payment attempt failed
    Failed,
}

impl PaymentStatus {
    /// Lower-case name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery
    #[default]
    Cod,
    /// Card
    Card,
    /// UPI transfer
    Upi,
}

impl PaymentMethod {
    /// Lower-case name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Card => "card",
            Self::Upi => "upi",
        }
    }
}
