//! # Order Finalization
//!
//! Records the local order once the provider side of the checkout has
//! settled. The order status is derived conservatively: `Accepted` only
//! when a capture is confirmed `completed` for the exact order total with
//! immediate capture enabled; anything else lands as `PendingCapture` for
//! operator review.

use checkout_core::{
    CartSnapshot, CheckoutError, CheckoutResult, CustomerStore, NewOrder, OrderStatus,
    OrderValidator, TransactionDetails,
};
use checkout_paypal::{Authorization, Payment, PayPalConfig};
use tracing::info;

/// Outcome of recording an order
#[derive(Debug, Clone)]
pub struct FinalizedOrder {
    pub order_id: u64,
    /// Guest accounts get the guest confirmation view
    pub guest: bool,
    pub status: OrderStatus,
}

/// Record the order for a settled payment.
///
/// The authoritative (state, amount) pair comes from the freshly captured
/// authorization when one is at hand, then from the authorization attached
/// to the payment, and only as a last resort from the payment state and
/// first transaction amount.
pub fn finalize_order(
    cart: &CartSnapshot,
    payment: &Payment,
    payer_id: Option<&str>,
    captured: Option<&Authorization>,
    config: &PayPalConfig,
    customers: &dyn CustomerStore,
    orders: &dyn OrderValidator,
) -> CheckoutResult<FinalizedOrder> {
    let (state, amount, authorization_id) = match captured.or_else(|| payment.authorization()) {
        Some(auth) => (
            auth.state.clone(),
            auth.amount.to_money(),
            Some(auth.id.clone()),
        ),
        None => (
            payment.state.clone().unwrap_or_default(),
            payment.transaction_amount().and_then(|a| a.to_money()),
            None,
        ),
    };

    let total = cart.order_total();
    let status = if state == "completed" && amount == Some(total) && config.immediate_capture {
        OrderStatus::Accepted
    } else {
        OrderStatus::PendingCapture
    };

    let order = NewOrder {
        cart_id: cart.id,
        status,
        total,
        currency: cart.currency,
        payment_method: "PayPal".to_string(),
        message: status.message().to_string(),
        transaction: TransactionDetails {
            payment_id: payment.id.clone(),
            payer_id: payer_id.map(String::from),
            authorization_id,
            amount: amount.map(|a| a.format()).unwrap_or_default(),
            currency: cart.currency.as_str().to_string(),
            state,
        },
        secure_key: cart.secure_key.clone(),
    };

    let order_id = orders.validate_order(order)?;

    let guest = match cart.customer_id {
        Some(customer_id) => customers
            .get(customer_id)
            .ok_or_else(|| CheckoutError::NotFound(format!("customer {}", customer_id)))?
            .is_guest,
        None => true,
    };

    info!(
        "Recorded order {} for cart {}: {:?}",
        order_id, cart.id, status
    );
    Ok(FinalizedOrder {
        order_id,
        guest,
        status,
    })
}
