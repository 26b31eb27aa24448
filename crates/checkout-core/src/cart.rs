//! # Cart Types
//!
//! Snapshot of the platform cart consumed by the checkout flow.
//! The cart itself is owned by the merchant platform; the flow only reads
//! totals and line items, and mutates the address/carrier assignment when
//! the provider reports a different shipping address.

use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// A cart line item with and without tax
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Product name (denormalized for the provider document)
    pub name: String,
    /// Quantity
    pub quantity: u32,
    /// Unit price without tax
    pub price_without_tax: f64,
    /// Unit price with tax
    pub price_with_tax: f64,
}

impl CartItem {
    pub fn new(name: impl Into<String>, quantity: u32, without_tax: f64, with_tax: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            price_without_tax: without_tax,
            price_with_tax: with_tax,
        }
    }

    /// Per-item tax, rounded to 2 decimal places
    pub fn tax(&self, currency: Currency) -> Money {
        Money::from_major(self.price_with_tax, currency)
            .minus(Money::from_major(self.price_without_tax, currency))
    }
}

/// Point-in-time view of a platform cart.
///
/// Totals are re-derived by the platform on every fetch, so money decisions
/// made against a freshly loaded snapshot reflect the current cart state,
/// not the state at payment initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub id: u64,
    /// Owning customer, if the cart has been attached to one
    pub customer_id: Option<u64>,
    pub currency: Currency,
    pub items: Vec<CartItem>,
    /// Order total including tax
    pub total_with_tax: f64,
    /// Order total excluding tax
    pub total_without_tax: f64,
    /// Shipping cost excluding tax
    pub shipping_without_tax: f64,
    /// Gift wrapping cost excluding tax (zero when not gift-wrapped)
    pub gift_wrap_without_tax: f64,
    pub delivery_address_id: Option<u64>,
    pub invoice_address_id: Option<u64>,
    /// Currently assigned carrier
    pub carrier_id: Option<u64>,
    /// Carriers able to deliver this cart
    pub delivery_options: Vec<u64>,
    /// Secure key tying order validation to this cart's owner
    pub secure_key: String,
}

impl CartSnapshot {
    /// Current order total including tax, rounded to 2 decimal places.
    /// This is the amount captured, re-evaluated at capture time.
    pub fn order_total(&self) -> Money {
        Money::from_major(self.total_with_tax, self.currency)
    }

    /// Cart-level tax: total with tax minus total without tax
    pub fn tax(&self) -> Money {
        self.order_total()
            .minus(Money::from_major(self.total_without_tax, self.currency))
    }

    /// Shipping without tax, rounded
    pub fn shipping(&self) -> Money {
        Money::from_major(self.shipping_without_tax, self.currency)
    }

    /// Gift wrap (handling fee) without tax, rounded
    pub fn handling_fee(&self) -> Money {
        Money::from_major(self.gift_wrap_without_tax, self.currency)
    }

    /// Subtotal: total without tax, less shipping and gift wrap
    pub fn subtotal(&self) -> Money {
        Money::from_major(self.total_without_tax, self.currency)
            .minus(self.shipping())
            .minus(self.handling_fee())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
