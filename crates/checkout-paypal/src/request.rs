//! # Payment Request Builder
//!
//! Pure mapping from local cart state into the provider's payment document.
//! Built fresh per checkout attempt; only the provider's response
//! identifiers are retained afterwards.
//!
//! Rounding rules:
//! - every money value is rounded to exactly 2 decimal places
//! - `tax = totalWithTax - totalWithoutTax` at cart level,
//!   `itemTax = priceWithTax - priceWithoutTax` per item
//! - `subtotal = totalWithoutTax - shippingWithoutTax - giftWrapWithoutTax`
//!
//! Return and cancel URLs both point at the same checkout-resume endpoint,
//! parameterized by cart id; the provider distinguishes cancel from approve
//! via its own query parameters.

use crate::config::PayPalConfig;
use crate::types::{
    Amount, AmountDetails, ItemList, ItemRequest, Payer, PaymentRequest, RedirectUrls,
    TransactionRequest,
};
use checkout_core::{CartSnapshot, CheckoutError, CheckoutResult, Money};

/// Build the payment document for one checkout attempt.
///
/// `experience_profile_id` is included only when non-empty, per
/// configuration.
pub fn build_payment_request(
    cart: &CartSnapshot,
    config: &PayPalConfig,
    experience_profile_id: Option<&str>,
) -> CheckoutResult<PaymentRequest> {
    if cart.is_empty() {
        return Err(CheckoutError::Validation("cart has no items".to_string()));
    }

    let currency = cart.currency;
    let total = cart.order_total();
    if total.cents <= 0 {
        return Err(CheckoutError::Validation(format!(
            "cart {} has a non-positive total",
            cart.id
        )));
    }

    let items = cart
        .items
        .iter()
        .map(|item| ItemRequest {
            name: item.name.clone(),
            currency: currency.as_str().to_string(),
            quantity: item.quantity,
            price: Money::from_major(item.price_without_tax, currency).format(),
            tax: item.tax(currency).format(),
        })
        .collect();

    let details = AmountDetails {
        subtotal: cart.subtotal().format(),
        tax: cart.tax().format(),
        shipping: cart.shipping().format(),
        handling_fee: cart.handling_fee().format(),
    };

    let resume_url = checkout_resume_url(&config.base_return_url, cart.id);

    Ok(PaymentRequest {
        intent: "sale".to_string(),
        payer: Payer {
            payment_method: "paypal".to_string(),
        },
        transactions: vec![TransactionRequest {
            amount: Amount {
                total: total.format(),
                currency: currency.as_str().to_string(),
                details,
            },
            item_list: ItemList { items },
            description: format!("Payment for cart {}", cart.id),
        }],
        redirect_urls: RedirectUrls {
            return_url: resume_url.clone(),
            cancel_url: resume_url,
        },
        experience_profile_id: experience_profile_id
            .filter(|id| !id.is_empty())
            .map(String::from),
    })
}

/// The checkout-resume endpoint both redirect URLs point at
pub fn checkout_resume_url(base_url: &str, cart_id: u64) -> String {
    format!(
        "{}/checkout/paypal/confirm?cart_id={}",
        base_url.trim_end_matches('/'),
        cart_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::{CartItem, Currency};

    fn sample_cart() -> CartSnapshot {
        CartSnapshot {
            id: 42,
            customer_id: Some(10),
            currency: Currency::USD,
            items: vec![
                CartItem::new("Widget", 2, 18.0, 19.8),
                CartItem::new("Gadget", 1, 9.0, 9.9),
            ],
            total_with_tax: 54.45,
            total_without_tax: 49.5,
            shipping_without_tax: 3.5,
            gift_wrap_without_tax: 1.0,
            delivery_address_id: Some(3),
            invoice_address_id: Some(3),
            carrier_id: Some(2),
            delivery_options: vec![2],
            secure_key: "key".to_string(),
        }
    }

    fn config() -> PayPalConfig {
        PayPalConfig::new("id", "secret", true).with_base_return_url("https://shop.example.com")
    }

    fn parse_amount(s: &str) -> i64 {
        Money::parse(s, Currency::USD).unwrap().cents
    }

    #[test]
    fn test_total_equals_sum_of_components() {
        let request = build_payment_request(&sample_cart(), &config(), None).unwrap();
        let amount = &request.transactions[0].amount;
        let details = &amount.details;

        let sum = parse_amount(&details.subtotal)
            + parse_amount(&details.tax)
            + parse_amount(&details.shipping)
            + parse_amount(&details.handling_fee);
        assert_eq!(sum, parse_amount(&amount.total));
        assert_eq!(amount.total, "54.45");
        assert_eq!(amount.currency, "USD");
    }

    #[test]
    fn test_item_mapping() {
        let request = build_payment_request(&sample_cart(), &config(), None).unwrap();
        let items = &request.transactions[0].item_list.items;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Widget");
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].price, "18.00");
        assert_eq!(items[0].tax, "1.80");
    }

    #[test]
    fn test_redirect_urls_point_at_resume_endpoint() {
        let request = build_payment_request(&sample_cart(), &config(), None).unwrap();
        let urls = &request.redirect_urls;

        assert_eq!(urls.return_url, urls.cancel_url);
        assert_eq!(
            urls.return_url,
            "https://shop.example.com/checkout/paypal/confirm?cart_id=42"
        );
    }

    #[test]
    fn test_experience_profile_only_when_configured() {
        let without = build_payment_request(&sample_cart(), &config(), None).unwrap();
        assert!(without.experience_profile_id.is_none());

        let empty = build_payment_request(&sample_cart(), &config(), Some("")).unwrap();
        assert!(empty.experience_profile_id.is_none());

        let with = build_payment_request(&sample_cart(), &config(), Some("XP-123")).unwrap();
        assert_eq!(with.experience_profile_id.as_deref(), Some("XP-123"));

        let json = serde_json::to_value(&without).unwrap();
        assert!(json.get("experience_profile_id").is_none());
    }

    #[test]
    fn test_intent_and_payer() {
        let request = build_payment_request(&sample_cart(), &config(), None).unwrap();
        assert_eq!(request.intent, "sale");
        assert_eq!(request.payer.payment_method, "paypal");
    }

    #[test]
    fn test_empty_cart_rejected() {
        let mut cart = sample_cart();
        cart.items.clear();
        assert!(matches!(
            build_payment_request(&cart, &config(), None),
            Err(CheckoutError::Validation(_))
        ));
    }
}
