//! # Order Types
//!
//! Local order status and the transaction details recorded against a
//! validated order.

use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Local order status derived from the provider authorization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Funds confirmed captured for the exact order total
    Accepted,
    /// Conservative default: authorization held, capture not confirmed
    PendingCapture,
}

impl OrderStatus {
    /// Operator-facing status message recorded with the order
    pub fn message(&self) -> &'static str {
        match self {
            OrderStatus::Accepted => "Payment accepted.",
            OrderStatus::PendingCapture => "Pending payment capture.",
        }
    }
}

/// Provider transaction identifiers retained with the order.
///
/// Only opaque id strings are stored locally; provider-side state is always
/// re-fetched via lookup before acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_id: Option<String>,
    /// Authorized/captured amount as reported by the provider
    pub amount: String,
    pub currency: String,
    /// Provider state at validation time
    pub state: String,
}

/// A new order to record against a cart
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub cart_id: u64,
    pub status: OrderStatus,
    pub total: Money,
    pub currency: Currency,
    /// Payment method name shown on the order ("PayPal")
    pub payment_method: String,
    pub message: String,
    pub transaction: TransactionDetails,
    /// Must match the cart owner's secure key
    pub secure_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        assert_eq!(OrderStatus::Accepted.message(), "Payment accepted.");
        assert_eq!(
            OrderStatus::PendingCapture.message(),
            "Pending payment capture."
        );
    }
}
