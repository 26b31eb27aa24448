//! Scripted gateway double for flow tests.

use async_trait::async_trait;
use checkout_core::{CheckoutError, CheckoutResult, Money, Session};
use checkout_paypal::{CaptureOutcome, PayPalApi, Payment, PaymentRequest};
use std::collections::HashMap;
use std::sync::Mutex;

/// Gateway whose responses are scripted per test; every call is recorded
/// as a `"verb:arg"` string for assertions on call order and absence.
#[derive(Default)]
pub struct MockGateway {
    payments: Mutex<HashMap<String, Payment>>,
    created: Mutex<Option<Payment>>,
    capture: Mutex<Option<CaptureOutcome>>,
    identity: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the payment returned by lookup and execute
    pub fn set_payment(&self, payment: Payment) {
        self.payments
            .lock()
            .unwrap()
            .insert(payment.id.clone(), payment);
    }

    /// Script the payment returned by create
    pub fn set_created(&self, payment: Payment) {
        *self.created.lock().unwrap() = Some(payment);
    }

    /// Script the capture outcome
    pub fn set_capture(&self, outcome: CaptureOutcome) {
        *self.capture.lock().unwrap() = Some(outcome);
    }

    /// Script the identity endpoint's verified email
    pub fn set_identity(&self, email: &str) {
        *self.identity.lock().unwrap() = Some(email.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn payment(&self, payment_id: &str) -> CheckoutResult<Payment> {
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| CheckoutError::NotFound(format!("payment {}", payment_id)))
    }
}

#[async_trait]
impl PayPalApi for MockGateway {
    async fn create_payment(
        &self,
        _session: &mut Session,
        request: &PaymentRequest,
    ) -> CheckoutResult<Payment> {
        self.record(format!("create:{}", request.transactions[0].amount.total));
        self.created
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CheckoutError::PaymentRejected {
                request: "{}".to_string(),
                response: r#"{"name":"VALIDATION_ERROR"}"#.to_string(),
            })
    }

    async fn look_up_payment(
        &self,
        _session: &mut Session,
        payment_id: &str,
    ) -> CheckoutResult<Payment> {
        self.record(format!("lookup:{}", payment_id));
        self.payment(payment_id)
    }

    async fn execute_payment(
        &self,
        _session: &mut Session,
        _payer_id: &str,
        payment_id: &str,
    ) -> CheckoutResult<Payment> {
        self.record(format!("execute:{}", payment_id));
        self.payment(payment_id)
    }

    async fn capture_payment(
        &self,
        _session: &mut Session,
        authorization_id: &str,
        amount: Money,
    ) -> CheckoutResult<CaptureOutcome> {
        self.record(format!("capture:{}:{}", authorization_id, amount.format()));
        self.capture
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CheckoutError::Internal("no capture scripted".to_string()))
    }

    async fn void_authorization(
        &self,
        _session: &mut Session,
        payment_id: &str,
    ) -> CheckoutResult<()> {
        self.record(format!("void:{}", payment_id));
        Ok(())
    }

    async fn get_web_profile(&self, _session: &mut Session) -> CheckoutResult<Option<String>> {
        self.record("web-profile".to_string());
        Ok(Some("XP-TEST".to_string()))
    }

    async fn verify_identity(&self, access_token: &str) -> CheckoutResult<String> {
        self.record(format!("identity:{}", access_token));
        self.identity
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CheckoutError::Unauthorized("token not recognized".to_string()))
    }
}
