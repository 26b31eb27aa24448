//! # Checkout Flow Controller
//!
//! The redirect checkout state machine. Flow state lives in the redirect
//! query parameters (`paymentId`, `PayerID`, `authorized`, `addressChanged`)
//! plus the provider-side payment state; every money decision is made
//! against a freshly looked-up payment and a freshly loaded cart, never
//! against values remembered from an earlier step.
//!
//! The three entry points mirror the buyer's journey:
//! - [`CheckoutFlow::initiate`] builds the payment document and sends the
//!   buyer to the provider's approval page
//! - [`CheckoutFlow::confirm`] runs when the buyer returns: address
//!   reconciliation, then a single execute
//! - [`CheckoutFlow::complete`] captures the freshly recomputed order total
//!   and records the local order

use crate::finalize::finalize_order;
use crate::reconcile::{address_differs, reconcile_address, reconcile_customer};
use checkout_core::{
    AddressStore, CartSnapshot, CartStore, CheckoutError, CheckoutResult, CustomerStore,
    OrderValidator, PayPalCustomerStore, Session, SessionStore,
};
use checkout_paypal::{build_payment_request, CaptureOutcome, PayPalApi, PayPalConfig};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where the buyer goes next.
///
/// The flow decides, the HTTP layer translates into redirects or rendered
/// pages.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// Send the buyer to the provider's approval page
    RedirectToProvider(String),
    /// Re-enter the confirm step with updated flags
    RedirectToConfirm {
        cart_id: u64,
        payer_id: String,
        payment_id: String,
        authorized: bool,
        address_changed: bool,
    },
    /// Move on to capture and order recording
    RedirectToComplete {
        cart_id: u64,
        payer_id: String,
        payment_id: String,
    },
    /// The attempt is dead (voided or cancelled); the buyer starts over
    RestartCheckout { cart_id: u64 },
    /// Stale revisit of an already-finalized checkout
    RedirectToOrderHistory,
    /// Shipping address unusable; finish through the manual address step
    RedirectToManualOrder { cart_id: u64 },
    /// Order recorded
    OrderConfirmed {
        order_id: u64,
        cart_id: u64,
        guest: bool,
        secure_key: String,
    },
    /// Buyer-facing failure page
    Error {
        message: String,
        detail: Option<String>,
    },
}

/// Orchestrates one provider gateway against the platform stores
#[derive(Clone)]
pub struct CheckoutFlow {
    gateway: Arc<dyn PayPalApi>,
    carts: Arc<dyn CartStore>,
    customers: Arc<dyn CustomerStore>,
    addresses: Arc<dyn AddressStore>,
    paypal_customers: Arc<dyn PayPalCustomerStore>,
    orders: Arc<dyn OrderValidator>,
    sessions: Arc<SessionStore>,
    config: PayPalConfig,
}

impl CheckoutFlow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn PayPalApi>,
        carts: Arc<dyn CartStore>,
        customers: Arc<dyn CustomerStore>,
        addresses: Arc<dyn AddressStore>,
        paypal_customers: Arc<dyn PayPalCustomerStore>,
        orders: Arc<dyn OrderValidator>,
        sessions: Arc<SessionStore>,
        config: PayPalConfig,
    ) -> Self {
        Self {
            gateway,
            carts,
            customers,
            addresses,
            paypal_customers,
            orders,
            sessions,
            config,
        }
    }

    pub fn config(&self) -> &PayPalConfig {
        &self.config
    }

    /// Build the payment document for the cart and send the buyer to the
    /// provider's approval page.
    pub async fn initiate(&self, cart_id: u64) -> CheckoutResult<FlowOutcome> {
        let cart = self.cart(cart_id)?;
        let mut session = self.sessions.load(cart_id);
        let result = self.initiate_inner(&cart, &mut session).await;
        self.sessions.save(cart_id, session);
        result
    }

    async fn initiate_inner(
        &self,
        cart: &CartSnapshot,
        session: &mut Session,
    ) -> CheckoutResult<FlowOutcome> {
        let request = build_payment_request(
            cart,
            &self.config,
            self.config.experience_profile_id.as_deref(),
        )?;

        let payment = match self.gateway.create_payment(session, &request).await {
            Ok(payment) => payment,
            Err(CheckoutError::PaymentRejected { request, response }) => {
                error!("Provider rejected payment document: {}", response);
                debug!("Rejected document was: {}", request);
                return Ok(FlowOutcome::Error {
                    message: "Unable to initialize payment. Please contact support.".to_string(),
                    detail: self.config.diagnostics.then_some(response),
                });
            }
            Err(e) => return Err(e),
        };

        match payment.approval_url() {
            Some(url) => {
                info!("Cart {} redirecting to approval for {}", cart.id, payment.id);
                Ok(FlowOutcome::RedirectToProvider(url.to_string()))
            }
            None => Err(CheckoutError::StateInconsistency {
                state: payment.state.clone().unwrap_or_default(),
                payload: format!("payment {} carries no approval link", payment.id),
            }),
        }
    }

    /// The buyer is back from the approval page. Reconcile the shipping
    /// address once, then execute the approved payment once.
    pub async fn confirm(
        &self,
        cart_id: u64,
        payer_id: &str,
        payment_id: &str,
        authorized: bool,
        address_changed: bool,
    ) -> CheckoutResult<FlowOutcome> {
        let mut cart = self.cart(cart_id)?;
        let mut session = self.sessions.load(cart_id);
        let result = self
            .confirm_inner(
                &mut cart,
                &mut session,
                payer_id,
                payment_id,
                authorized,
                address_changed,
            )
            .await;
        self.sessions.save(cart_id, session);
        result
    }

    async fn confirm_inner(
        &self,
        cart: &mut CartSnapshot,
        session: &mut Session,
        payer_id: &str,
        payment_id: &str,
        authorized: bool,
        address_changed: bool,
    ) -> CheckoutResult<FlowOutcome> {
        let payment = self.gateway.look_up_payment(session, payment_id).await?;

        // Address reconciliation runs at most once per attempt; the
        // addressChanged flag breaks the redirect loop.
        if !address_changed {
            if let Some(shipping) = payment.shipping_address() {
                let stored = cart.delivery_address_id.and_then(|id| self.addresses.get(id));
                if address_differs(shipping, stored.as_ref()) {
                    let payer = payment.payer_info().ok_or_else(|| {
                        CheckoutError::Validation("payment carries no payer info".to_string())
                    })?;
                    let customer = reconcile_customer(
                        session,
                        payer,
                        self.customers.as_ref(),
                        self.paypal_customers.as_ref(),
                    )?;
                    let address = match reconcile_address(
                        &customer,
                        shipping,
                        payer,
                        self.addresses.as_ref(),
                    ) {
                        Ok(address) => address,
                        Err(CheckoutError::Validation(reason)) => {
                            warn!(
                                "Shipping address unusable ({}); buyer completes the order manually",
                                reason
                            );
                            return Ok(FlowOutcome::RedirectToManualOrder { cart_id: cart.id });
                        }
                        Err(e) => return Err(e),
                    };

                    cart.customer_id = Some(customer.id);
                    cart.secure_key = customer.secure_key.clone();
                    cart.delivery_address_id = Some(address.id);
                    cart.invoice_address_id = Some(address.id);

                    if cart.delivery_options.is_empty() {
                        return Ok(FlowOutcome::Error {
                            message:
                                "We cannot ship to your PayPal address. Please choose a different delivery address."
                                    .to_string(),
                            detail: None,
                        });
                    }
                    let carrier_ok = cart
                        .carrier_id
                        .map(|c| cart.delivery_options.contains(&c))
                        .unwrap_or(false);
                    if !carrier_ok {
                        cart.carrier_id = Some(cart.delivery_options[0]);
                    }
                    self.carts.update(cart)?;

                    return Ok(FlowOutcome::RedirectToConfirm {
                        cart_id: cart.id,
                        payer_id: payer_id.to_string(),
                        payment_id: payment_id.to_string(),
                        authorized,
                        address_changed: true,
                    });
                }
            }
        }

        // An authorization already exists: this is a re-entry, never a
        // second execute.
        if payment.authorization().is_some() {
            return Ok(FlowOutcome::RedirectToComplete {
                cart_id: cart.id,
                payer_id: payer_id.to_string(),
                payment_id: payment_id.to_string(),
            });
        }

        if !payment.has_link("capture") && !authorized {
            self.gateway
                .execute_payment(session, payer_id, payment_id)
                .await?;
            return Ok(FlowOutcome::RedirectToConfirm {
                cart_id: cart.id,
                payer_id: payer_id.to_string(),
                payment_id: payment_id.to_string(),
                authorized: true,
                address_changed,
            });
        }

        // Executed on an earlier visit but no authorization resource is
        // attached: the attempt is stale. Void and start over.
        if authorized && payment.state_is("authorized") {
            warn!("Payment {} stuck in authorized state; voiding", payment.id);
            self.gateway.void_authorization(session, payment_id).await?;
            return Ok(FlowOutcome::RestartCheckout { cart_id: cart.id });
        }

        Ok(FlowOutcome::RedirectToComplete {
            cart_id: cart.id,
            payer_id: payer_id.to_string(),
            payment_id: payment_id.to_string(),
        })
    }

    /// Capture the freshly recomputed order total and record the order.
    pub async fn complete(
        &self,
        cart_id: u64,
        payer_id: &str,
        payment_id: &str,
    ) -> CheckoutResult<FlowOutcome> {
        let cart = self.cart(cart_id)?;
        let mut session = self.sessions.load(cart_id);
        let result = self
            .complete_inner(&cart, &mut session, payer_id, payment_id)
            .await;
        self.sessions.save(cart_id, session);
        result
    }

    async fn complete_inner(
        &self,
        cart: &CartSnapshot,
        session: &mut Session,
        payer_id: &str,
        payment_id: &str,
    ) -> CheckoutResult<FlowOutcome> {
        let payment = self.gateway.look_up_payment(session, payment_id).await?;

        if let Some(authorization) = payment.authorization() {
            let total = cart.order_total();
            if total.is_zero() {
                // The cart was already emptied by a finalized order; this
                // is a stale revisit of the completion URL.
                info!("Cart {} already settled; redirecting to order history", cart.id);
                return Ok(FlowOutcome::RedirectToOrderHistory);
            }

            let authorization_id = authorization.id.clone();
            match self
                .gateway
                .capture_payment(session, &authorization_id, total)
                .await?
            {
                CaptureOutcome::Captured(captured) => {
                    let finalized = finalize_order(
                        cart,
                        &payment,
                        Some(payer_id),
                        Some(&captured),
                        &self.config,
                        self.customers.as_ref(),
                        self.orders.as_ref(),
                    )?;
                    return Ok(FlowOutcome::OrderConfirmed {
                        order_id: finalized.order_id,
                        cart_id: cart.id,
                        guest: finalized.guest,
                        secure_key: cart.secure_key.clone(),
                    });
                }
                CaptureOutcome::Rejected { name, message } => {
                    warn!(
                        "Capture of {} rejected ({}): {}; voiding and restarting",
                        authorization_id, name, message
                    );
                    self.gateway.void_authorization(session, payment_id).await?;
                    return Ok(FlowOutcome::RestartCheckout { cart_id: cart.id });
                }
            }
        }

        if payment.state_is("authorized") {
            warn!("Payment {} authorized but no authorization resource; voiding", payment.id);
            self.gateway.void_authorization(session, payment_id).await?;
            return Ok(FlowOutcome::RestartCheckout { cart_id: cart.id });
        }

        if payment.state_is("approved") {
            if let Some(original) = payment.transaction_amount().and_then(|a| a.to_money()) {
                let current = cart.order_total();
                if current.exceeds_by_ratio(original, self.config.reauth_tolerance) {
                    warn!(
                        "Cart {} total {} drifted past tolerance over approved {}; voiding",
                        cart.id,
                        current.format(),
                        original.format()
                    );
                    self.gateway.void_authorization(session, payment_id).await?;
                    return Ok(FlowOutcome::RestartCheckout { cart_id: cart.id });
                }
                // A capture link with no authorization resource: the confirm
                // step would skip the execute and bounce straight back here,
                // so the attempt cannot progress. Start over.
                if payment.has_link("capture") {
                    warn!(
                        "Payment {} approved with a capture link but no authorization; restarting",
                        payment.id
                    );
                    return Ok(FlowOutcome::RestartCheckout { cart_id: cart.id });
                }
                // Approved but never executed for this attempt: run the
                // confirm step again from scratch.
                return Ok(FlowOutcome::RedirectToConfirm {
                    cart_id: cart.id,
                    payer_id: payer_id.to_string(),
                    payment_id: payment_id.to_string(),
                    authorized: false,
                    address_changed: false,
                });
            }
        }

        let state = payment.state.clone().unwrap_or_else(|| "unknown".to_string());
        error!("Payment {} in unexpected state `{}` at completion", payment.id, state);
        Ok(FlowOutcome::Error {
            message: format!(
                "Unable to complete payment: unknown error, the payment authorization status is `{}`.",
                state
            ),
            detail: self
                .config
                .diagnostics
                .then(|| format!("{:?}", payment)),
        })
    }

    fn cart(&self, cart_id: u64) -> CheckoutResult<CartSnapshot> {
        self.carts
            .get(cart_id)
            .ok_or_else(|| CheckoutError::NotFound(format!("cart {}", cart_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockGateway;
    use checkout_core::{
        CartItem, Currency, MemoryAddressStore, MemoryCartStore, MemoryCustomerStore,
        MemoryOrderValidator, MemoryPayPalCustomerStore, NewCustomer, OrderStatus,
    };
    use checkout_paypal::Payment;

    struct Harness {
        flow: CheckoutFlow,
        gateway: Arc<MockGateway>,
        carts: Arc<MemoryCartStore>,
        customers: Arc<MemoryCustomerStore>,
        addresses: Arc<MemoryAddressStore>,
        orders: Arc<MemoryOrderValidator>,
    }

    fn harness(config: PayPalConfig) -> Harness {
        let gateway = Arc::new(MockGateway::new());
        let carts = Arc::new(MemoryCartStore::new());
        let customers = Arc::new(MemoryCustomerStore::new());
        let addresses = Arc::new(MemoryAddressStore::new());
        let paypal_customers = Arc::new(MemoryPayPalCustomerStore::new());
        let orders = Arc::new(MemoryOrderValidator::new());
        let sessions = Arc::new(SessionStore::new());

        let flow = CheckoutFlow::new(
            gateway.clone(),
            carts.clone(),
            customers.clone(),
            addresses.clone(),
            paypal_customers,
            orders.clone(),
            sessions,
            config,
        );
        Harness {
            flow,
            gateway,
            carts,
            customers,
            addresses,
            orders,
        }
    }

    fn seed_cart(h: &Harness, total_with_tax: f64) -> u64 {
        let customer = h
            .customers
            .create(NewCustomer {
                email: "owner@example.com".to_string(),
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                is_guest: false,
                password: "pw".to_string(),
            })
            .unwrap();
        let cart = CartSnapshot {
            id: 7,
            customer_id: Some(customer.id),
            currency: Currency::USD,
            items: vec![CartItem::new("Widget", 1, total_with_tax, total_with_tax)],
            total_with_tax,
            total_without_tax: total_with_tax,
            shipping_without_tax: 0.0,
            gift_wrap_without_tax: 0.0,
            delivery_address_id: None,
            invoice_address_id: None,
            carrier_id: Some(9),
            delivery_options: vec![2, 5],
            secure_key: customer.secure_key,
        };
        h.carts.put(cart);
        7
    }

    fn payment(json: &str) -> Payment {
        serde_json::from_str(json).unwrap()
    }

    fn approved_with_authorization() -> Payment {
        payment(
            r#"{
                "id": "PAY-1",
                "state": "approved",
                "transactions": [{
                    "amount": {"total": "50.00", "currency": "USD"},
                    "related_resources": [{
                        "authorization": {
                            "id": "AUTH-1",
                            "state": "authorized",
                            "amount": {"total": "50.00", "currency": "USD"}
                        }
                    }]
                }]
            }"#,
        )
    }

    fn approved_without_authorization() -> Payment {
        payment(
            r#"{
                "id": "PAY-1",
                "state": "approved",
                "transactions": [{"amount": {"total": "50.00", "currency": "USD"}}],
                "links": [{"href": "https://www.paypal.com/approve", "rel": "approval_url"}]
            }"#,
        )
    }

    fn completed_capture() -> CaptureOutcome {
        CaptureOutcome::Captured(
            serde_json::from_str(
                r#"{
                    "id": "AUTH-1",
                    "state": "completed",
                    "amount": {"total": "45.00", "currency": "USD"}
                }"#,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_initiate_redirects_to_approval() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_created(approved_without_authorization());

        let outcome = h.flow.initiate(cart_id).await.unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::RedirectToProvider("https://www.paypal.com/approve".to_string())
        );
        assert_eq!(h.gateway.calls(), vec!["create:50.00"]);
    }

    #[tokio::test]
    async fn test_initiate_provider_rejection_is_buyer_facing_error() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        // No created payment scripted: the mock rejects the document

        match h.flow.initiate(cart_id).await.unwrap() {
            FlowOutcome::Error { message, detail } => {
                assert_eq!(message, "Unable to initialize payment. Please contact support.");
                assert!(detail.is_none());
            }
            other => panic!("expected error outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_initiate_without_approval_link_is_inconsistent() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_created(payment(r#"{"id": "PAY-1", "state": "created"}"#));

        assert!(matches!(
            h.flow.initiate(cart_id).await,
            Err(CheckoutError::StateInconsistency { .. })
        ));
    }

    #[tokio::test]
    async fn test_confirm_executes_once() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_payment(approved_without_authorization());

        let outcome = h
            .flow
            .confirm(cart_id, "PAYER-1", "PAY-1", false, false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::RedirectToConfirm {
                cart_id,
                payer_id: "PAYER-1".to_string(),
                payment_id: "PAY-1".to_string(),
                authorized: true,
                address_changed: false,
            }
        );
        assert!(h.gateway.calls().contains(&"execute:PAY-1".to_string()));
    }

    #[tokio::test]
    async fn test_confirm_reentry_never_reexecutes() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_payment(approved_with_authorization());

        let outcome = h
            .flow
            .confirm(cart_id, "PAYER-1", "PAY-1", true, false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::RedirectToComplete {
                cart_id,
                payer_id: "PAYER-1".to_string(),
                payment_id: "PAY-1".to_string(),
            }
        );
        assert!(!h.gateway.calls().iter().any(|c| c.starts_with("execute")));
    }

    #[tokio::test]
    async fn test_confirm_stale_authorized_state_voids_and_restarts() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_payment(payment(
            r#"{"id": "PAY-1", "state": "authorized", "transactions": []}"#,
        ));

        let outcome = h
            .flow
            .confirm(cart_id, "PAYER-1", "PAY-1", true, false)
            .await
            .unwrap();
        assert_eq!(outcome, FlowOutcome::RestartCheckout { cart_id });
        assert!(h.gateway.calls().contains(&"void:PAY-1".to_string()));
    }

    #[tokio::test]
    async fn test_confirm_address_change_mutates_cart_once() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_payment(payment(
            r#"{
                "id": "PAY-1",
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
                "transactions": [{"amount": {"total": "50.00", "currency": "USD"}}]
            }"#,
        ));

        let outcome = h
            .flow
            .confirm(cart_id, "PAYER-1", "PAY-1", false, false)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::RedirectToConfirm {
                cart_id,
                payer_id: "PAYER-1".to_string(),
                payment_id: "PAY-1".to_string(),
                authorized: false,
                address_changed: true,
            }
        );

        let cart = h.carts.get(cart_id).unwrap();
        assert!(cart.delivery_address_id.is_some());
        assert_eq!(cart.delivery_address_id, cart.invoice_address_id);
        // Carrier 9 cannot deliver; first delivery option takes over
        assert_eq!(cart.carrier_id, Some(2));
        let customer_id = cart.customer_id.unwrap();
        assert_eq!(h.addresses.for_customer(customer_id).len(), 1);

        // Second pass carries the addressChanged flag: no further mutation
        h.flow
            .confirm(cart_id, "PAYER-1", "PAY-1", false, true)
            .await
            .unwrap();
        assert_eq!(h.addresses.for_customer(customer_id).len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_unusable_address_goes_to_manual_order() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_payment(payment(
            r#"{
                "id": "PAY-1",
                "state": "approved",
                "payer": {
                    "payer_info": {
                        "email": "buyer@example.com",
                        "shipping_address": {"city": "Springfield"}
                    }
                }
            }"#,
        ));

        let outcome = h
            .flow
            .confirm(cart_id, "PAYER-1", "PAY-1", false, false)
            .await
            .unwrap();
        assert_eq!(outcome, FlowOutcome::RedirectToManualOrder { cart_id });
    }

    #[tokio::test]
    async fn test_complete_captures_freshly_recomputed_total() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_payment(approved_with_authorization());
        h.gateway.set_capture(completed_capture());

        // The cart shrank after the payment was authorized for 50.00
        let mut cart = h.carts.get(cart_id).unwrap();
        cart.total_with_tax = 45.0;
        cart.total_without_tax = 45.0;
        h.carts.put(cart);

        let outcome = h.flow.complete(cart_id, "PAYER-1", "PAY-1").await.unwrap();
        assert!(matches!(outcome, FlowOutcome::OrderConfirmed { .. }));
        assert!(h.gateway.calls().contains(&"capture:AUTH-1:45.00".to_string()));
    }

    #[tokio::test]
    async fn test_complete_zero_total_is_stale_revisit() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 0.0);
        h.gateway.set_payment(approved_with_authorization());

        let outcome = h.flow.complete(cart_id, "PAYER-1", "PAY-1").await.unwrap();
        assert_eq!(outcome, FlowOutcome::RedirectToOrderHistory);
        assert!(!h.gateway.calls().iter().any(|c| c.starts_with("capture")));
    }

    #[tokio::test]
    async fn test_complete_capture_rejection_voids_and_restarts() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_payment(approved_with_authorization());
        h.gateway.set_capture(CaptureOutcome::Rejected {
            name: "CANNOT_REAUTH_INSIDE_HONOR_PERIOD".to_string(),
            message: "Reauthorization not allowed yet.".to_string(),
        });

        let outcome = h.flow.complete(cart_id, "PAYER-1", "PAY-1").await.unwrap();
        assert_eq!(outcome, FlowOutcome::RestartCheckout { cart_id });
        assert!(h.gateway.calls().contains(&"void:PAY-1".to_string()));
        assert!(h.orders.orders().is_empty());
    }

    #[tokio::test]
    async fn test_complete_immediate_capture_accepts_exact_amount() {
        let h = harness(PayPalConfig::new("id", "secret", true).with_immediate_capture(true));
        let cart_id = seed_cart(&h, 45.0);
        h.gateway.set_payment(approved_with_authorization());
        h.gateway.set_capture(completed_capture());

        let outcome = h.flow.complete(cart_id, "PAYER-1", "PAY-1").await.unwrap();
        match outcome {
            FlowOutcome::OrderConfirmed { guest, .. } => assert!(!guest),
            other => panic!("expected order, got {:?}", other),
        }
        let orders = h.orders.orders();
        assert_eq!(orders[0].order.status, OrderStatus::Accepted);
        assert_eq!(orders[0].order.message, "Payment accepted.");
    }

    #[tokio::test]
    async fn test_complete_price_drift_past_tolerance_restarts() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 60.0);
        h.gateway.set_payment(approved_without_authorization());

        let outcome = h.flow.complete(cart_id, "PAYER-1", "PAY-1").await.unwrap();
        assert_eq!(outcome, FlowOutcome::RestartCheckout { cart_id });
        assert!(h.gateway.calls().contains(&"void:PAY-1".to_string()));
    }

    #[tokio::test]
    async fn test_complete_drift_within_tolerance_reconfirms() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 55.0);
        h.gateway.set_payment(approved_without_authorization());

        let outcome = h.flow.complete(cart_id, "PAYER-1", "PAY-1").await.unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::RedirectToConfirm {
                cart_id,
                payer_id: "PAYER-1".to_string(),
                payment_id: "PAY-1".to_string(),
                authorized: false,
                address_changed: false,
            }
        );
        assert!(!h.gateway.calls().iter().any(|c| c.starts_with("void")));
    }

    #[tokio::test]
    async fn test_complete_approved_with_capture_link_restarts() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        // Approved within tolerance, carrying a capture link but no
        // authorization resource. Confirm would skip the execute for this
        // payment, so sending the buyer back there could never progress.
        h.gateway.set_payment(payment(
            r#"{
                "id": "PAY-1",
                "state": "approved",
                "transactions": [{"amount": {"total": "50.00", "currency": "USD"}}],
                "links": [
                    {"href": "https://www.paypal.com/approve", "rel": "approval_url"},
                    {"href": "https://api.paypal.com/capture", "rel": "capture"}
                ]
            }"#,
        ));

        let outcome = h.flow.complete(cart_id, "PAYER-1", "PAY-1").await.unwrap();
        assert_eq!(outcome, FlowOutcome::RestartCheckout { cart_id });
        assert!(!h.gateway.calls().iter().any(|c| c.starts_with("execute")));

        // The confirm side confirms the dead end: it neither executes nor
        // voids this payment, it only hands back to complete.
        let confirm = h
            .flow
            .confirm(cart_id, "PAYER-1", "PAY-1", false, false)
            .await
            .unwrap();
        assert_eq!(
            confirm,
            FlowOutcome::RedirectToComplete {
                cart_id,
                payer_id: "PAYER-1".to_string(),
                payment_id: "PAY-1".to_string(),
            }
        );
        assert!(!h.gateway.calls().iter().any(|c| c.starts_with("execute")));
    }

    #[tokio::test]
    async fn test_complete_unknown_state_reports_error() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_payment(payment(r#"{"id": "PAY-1", "state": "failed"}"#));

        match h.flow.complete(cart_id, "PAYER-1", "PAY-1").await.unwrap() {
            FlowOutcome::Error { message, detail } => {
                assert!(message.contains("`failed`"));
                assert!(detail.is_none());
            }
            other => panic!("expected error outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_unknown_state_detail_gated_by_diagnostics() {
        let mut config = PayPalConfig::new("id", "secret", true);
        config.diagnostics = true;
        let h = harness(config);
        let cart_id = seed_cart(&h, 50.0);
        h.gateway.set_payment(payment(r#"{"id": "PAY-1", "state": "failed"}"#));

        match h.flow.complete(cart_id, "PAYER-1", "PAY-1").await.unwrap() {
            FlowOutcome::Error { detail, .. } => assert!(detail.is_some()),
            other => panic!("expected error outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_cart_is_not_found() {
        let h = harness(PayPalConfig::new("id", "secret", true));
        assert!(matches!(
            h.flow.initiate(999).await,
            Err(CheckoutError::NotFound(_))
        ));
    }
}
