//! # PayPal REST Documents
//!
//! Typed request/response documents for the payments API. Responses decode
//! strictly where the flow depends on a field and default elsewhere, so a
//! missing required field fails loudly instead of silently finalizing.

use checkout_core::{Currency, Money};
use serde::{Deserialize, Serialize};

// =============================================================================
// Outgoing payment document
// =============================================================================

/// A payment-creation document, built fresh per checkout attempt
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub intent: String,
    pub payer: Payer,
    pub transactions: Vec<TransactionRequest>,
    pub redirect_urls: RedirectUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_profile_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Payer {
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    pub amount: Amount,
    pub item_list: ItemList,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Amount {
    /// Two-decimal string, e.g. "50.00"
    pub total: String,
    pub currency: String,
    pub details: AmountDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct AmountDetails {
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
    pub handling_fee: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemList {
    pub items: Vec<ItemRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemRequest {
    pub name: String,
    pub currency: String,
    pub quantity: u32,
    /// Unit price without tax, two-decimal string
    pub price: String,
    /// Per-unit tax, two-decimal string
    pub tax: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedirectUrls {
    pub return_url: String,
    pub cancel_url: String,
}

// =============================================================================
// Web experience profile
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct WebProfileRequest {
    pub name: String,
    pub presentation: ProfilePresentation,
    pub input_fields: ProfileInputFields,
    pub flow_config: ProfileFlowConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePresentation {
    pub brand_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_image: Option<String>,
    pub locale_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileInputFields {
    pub allow_note: bool,
    pub no_shipping: u8,
    pub address_override: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileFlowConfig {
    pub landing_page_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebProfileResponse {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// Incoming payment resource
// =============================================================================

/// A provider payment resource as returned by create/lookup/execute
#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub payer: Option<PayerResponse>,
    #[serde(default)]
    pub transactions: Vec<TransactionResponse>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayerResponse {
    #[serde(default)]
    pub payer_info: Option<PayerInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayerInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionResponse {
    #[serde(default)]
    pub amount: Option<AmountResponse>,
    #[serde(default)]
    pub related_resources: Vec<RelatedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmountResponse {
    pub total: String,
    pub currency: String,
}

impl AmountResponse {
    /// Parse into exact minor units; `None` if the amount or currency is
    /// malformed
    pub fn to_money(&self) -> Option<Money> {
        let currency = Currency::from_code(&self.currency)?;
        Money::parse(&self.total, currency)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedResource {
    #[serde(default)]
    pub authorization: Option<Authorization>,
}

/// A hold on funds created by executing an approved payment
#[derive(Debug, Clone, Deserialize)]
pub struct Authorization {
    pub id: String,
    pub state: String,
    pub amount: AmountResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
}

impl Payment {
    /// The authorization resource attached to the first transaction, if any
    pub fn authorization(&self) -> Option<&Authorization> {
        self.transactions
            .first()?
            .related_resources
            .iter()
            .find_map(|r| r.authorization.as_ref())
    }

    /// The buyer-approval URL returned at creation time
    pub fn approval_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == "approval_url")
            .map(|l| l.href.as_str())
    }

    /// True if the payment carries a link with the given rel
    pub fn has_link(&self, rel: &str) -> bool {
        self.links.iter().any(|l| l.rel == rel)
    }

    pub fn state_is(&self, state: &str) -> bool {
        self.state.as_deref() == Some(state)
    }

    pub fn payer_email(&self) -> Option<&str> {
        self.payer
            .as_ref()?
            .payer_info
            .as_ref()?
            .email
            .as_deref()
    }

    pub fn payer_info(&self) -> Option<&PayerInfo> {
        self.payer.as_ref()?.payer_info.as_ref()
    }

    /// The shipping address the provider reports for the payer
    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.payer_info()?.shipping_address.as_ref()
    }

    /// The amount authorized by the first transaction
    pub fn transaction_amount(&self) -> Option<&AmountResponse> {
        self.transactions.first()?.amount.as_ref()
    }
}

// =============================================================================
// Capture outcome
// =============================================================================

/// Result of a capture call.
///
/// The provider signals a refused capture with `name`/`message` fields in
/// an otherwise well-formed body; that is branch-driving data, not an error.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Captured(Authorization),
    Rejected { name: String, message: String },
}

impl CaptureOutcome {
    /// Parse a capture response body into an outcome.
    /// `None` means the body is neither a valid authorization nor a
    /// recognizable rejection.
    pub fn from_body(body: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        if let (Some(name), Some(message)) = (
            value.get("name").and_then(|v| v.as_str()),
            value.get("message").and_then(|v| v.as_str()),
        ) {
            return Some(CaptureOutcome::Rejected {
                name: name.to_string(),
                message: message.to_string(),
            });
        }
        serde_json::from_value::<Authorization>(value)
            .ok()
            .map(CaptureOutcome::Captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_body() -> &'static str {
        r#"{
            "id": "PAY-123",
            "state": "approved",
            "payer": {
                "payer_info": {
                    "email": "buyer@example.com",
                    "first_name": "Jane",
                    "last_name": "Doe",
                    "shipping_address": {
                        "recipient_name": "Jane Q Doe",
                        "line1": "1 Main St",
                        "city": "Springfield",
                        "postal_code": "12345",
                        "country_code": "US"
                    }
                }
            },
            "transactions": [{
                "amount": {"total": "50.00", "currency": "USD"},
                "related_resources": [{
                    "authorization": {
                        "id": "AUTH-1",
                        "state": "authorized",
                        "amount": {"total": "50.00", "currency": "USD"}
                    }
                }]
            }],
            "links": [
                {"href": "https://www.paypal.com/approve", "rel": "approval_url"},
                {"href": "https://api.paypal.com/capture", "rel": "capture"}
            ]
        }"#
    }

    #[test]
    fn test_payment_deserialization() {
        let payment: Payment = serde_json::from_str(lookup_body()).unwrap();

        assert_eq!(payment.id, "PAY-123");
        assert!(payment.state_is("approved"));
        assert_eq!(payment.payer_email(), Some("buyer@example.com"));
        assert_eq!(payment.authorization().unwrap().id, "AUTH-1");
        assert_eq!(
            payment.approval_url(),
            Some("https://www.paypal.com/approve")
        );
        assert!(payment.has_link("capture"));
        assert!(!payment.has_link("refund"));

        let shipping = payment.shipping_address().unwrap();
        assert_eq!(shipping.recipient_name.as_deref(), Some("Jane Q Doe"));
    }

    #[test]
    fn test_amount_to_money() {
        let amount = AmountResponse {
            total: "50.00".to_string(),
            currency: "USD".to_string(),
        };
        assert_eq!(amount.to_money().unwrap().cents, 5000);

        let bad = AmountResponse {
            total: "fifty".to_string(),
            currency: "USD".to_string(),
        };
        assert!(bad.to_money().is_none());
    }

    #[test]
    fn test_capture_outcome_captured() {
        let body = r#"{
            "id": "AUTH-1",
            "state": "completed",
            "amount": {"total": "50.00", "currency": "USD"}
        }"#;
        match CaptureOutcome::from_body(body).unwrap() {
            CaptureOutcome::Captured(auth) => {
                assert_eq!(auth.state, "completed");
                assert_eq!(auth.amount.total, "50.00");
            }
            CaptureOutcome::Rejected { .. } => panic!("expected captured"),
        }
    }

    #[test]
    fn test_capture_outcome_rejected() {
        let body = r#"{
            "name": "CANNOT_REAUTH_INSIDE_HONOR_PERIOD",
            "message": "Reauthorization not allowed within the honor period."
        }"#;
        match CaptureOutcome::from_body(body).unwrap() {
            CaptureOutcome::Rejected { name, .. } => {
                assert_eq!(name, "CANNOT_REAUTH_INSIDE_HONOR_PERIOD");
            }
            CaptureOutcome::Captured(_) => panic!("expected rejected"),
        }
    }

    #[test]
    fn test_payment_without_authorization() {
        let body = r#"{
            "id": "PAY-9",
            "state": "created",
            "transactions": [{"amount": {"total": "10.00", "currency": "USD"}}]
        }"#;
        let payment: Payment = serde_json::from_str(body).unwrap();
        assert!(payment.authorization().is_none());
        assert_eq!(payment.transaction_amount().unwrap().total, "10.00");
    }
}
