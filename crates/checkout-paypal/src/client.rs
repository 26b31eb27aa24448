//! # Payment Gateway Client
//!
//! Create / lookup / execute / capture / void operations over the REST
//! transport, authenticating through the token manager.
//!
//! Failure policy: transport-level failures (timeout, TLS, malformed body)
//! are hard errors reported up; provider-level soft failures (error fields
//! in a well-formed capture body) surface as `CaptureOutcome::Rejected` and
//! drive branch logic in the flow.

use crate::config::PayPalConfig;
use crate::token::TokenManager;
use crate::transport::Transport;
use crate::types::{
    CaptureOutcome, Payment, PaymentRequest, ProfileFlowConfig, ProfileInputFields,
    ProfilePresentation, WebProfileRequest, WebProfileResponse,
};
use async_trait::async_trait;
use checkout_core::{CheckoutError, CheckoutResult, Money, Session};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

const PAYMENT_PATH: &str = "/v1/payments/payment";
const AUTHORIZATION_PATH: &str = "/v1/payments/authorization";
const WEB_PROFILE_PATH: &str = "/v1/payment-experience/web-profiles";
const IDENTITY_PATH: &str = "/v1/identity/openidconnect/userinfo/?schema=openid";

/// Provider operations consumed by the checkout flow.
///
/// Every operation needing auth takes the buyer session so the token cache
/// stays session-scoped.
#[async_trait]
pub trait PayPalApi: Send + Sync {
    /// Send a payment document; returns the created payment with its
    /// approval link. Provider rejection carries the raw request/response.
    async fn create_payment(
        &self,
        session: &mut Session,
        request: &PaymentRequest,
    ) -> CheckoutResult<Payment>;

    /// Idempotent GET; the source of truth before every state-changing
    /// decision.
    async fn look_up_payment(
        &self,
        session: &mut Session,
        payment_id: &str,
    ) -> CheckoutResult<Payment>;

    /// Convert an approved payment into an authorized one
    async fn execute_payment(
        &self,
        session: &mut Session,
        payer_id: &str,
        payment_id: &str,
    ) -> CheckoutResult<Payment>;

    /// Capture funds up to `amount`; a provider refusal is a soft outcome
    async fn capture_payment(
        &self,
        session: &mut Session,
        authorization_id: &str,
        amount: Money,
    ) -> CheckoutResult<CaptureOutcome>;

    /// Cancel the pending authorization attached to a payment
    async fn void_authorization(
        &self,
        session: &mut Session,
        payment_id: &str,
    ) -> CheckoutResult<()>;

    /// Resolve the web experience profile id: create, or find an existing
    /// profile by shop name
    async fn get_web_profile(&self, session: &mut Session) -> CheckoutResult<Option<String>>;

    /// Verify an access token against the identity endpoint, returning the
    /// payer email it belongs to
    async fn verify_identity(&self, access_token: &str) -> CheckoutResult<String>;
}

/// REST gateway to the provider
#[derive(Debug, Clone)]
pub struct PayPalGateway {
    config: PayPalConfig,
    transport: Transport,
    tokens: TokenManager,
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    #[serde(default)]
    email: Option<String>,
}

impl PayPalGateway {
    pub fn new(config: PayPalConfig) -> CheckoutResult<Self> {
        let transport = Transport::new(&config.api_base_url)?;
        let tokens = TokenManager::new(
            transport.clone(),
            &config.client_id,
            &config.client_secret,
        );
        Ok(Self {
            config,
            transport,
            tokens,
        })
    }

    /// Build from environment configuration
    pub fn from_env() -> CheckoutResult<Self> {
        Self::new(PayPalConfig::from_env()?)
    }

    pub fn config(&self) -> &PayPalConfig {
        &self.config
    }

    fn parse_payment(body: &str) -> CheckoutResult<Payment> {
        serde_json::from_str(body)
            .map_err(|e| CheckoutError::Serialization(format!("payment resource: {}", e)))
    }

    fn web_profile_request(&self) -> WebProfileRequest {
        WebProfileRequest {
            name: self.config.shop_name.clone(),
            presentation: ProfilePresentation {
                brand_name: self.config.shop_name.clone(),
                logo_image: self.config.logo_url.clone(),
                locale_code: self.config.locale.to_uppercase(),
            },
            input_fields: ProfileInputFields {
                allow_note: true,
                no_shipping: 1,
                address_override: 1,
            },
            flow_config: ProfileFlowConfig {
                landing_page_type: "billing".to_string(),
            },
        }
    }
}

#[async_trait]
impl PayPalApi for PayPalGateway {
    async fn create_payment(
        &self,
        session: &mut Session,
        request: &PaymentRequest,
    ) -> CheckoutResult<Payment> {
        let token = self.tokens.get_token(session).await?;
        let body = serde_json::to_value(request)
            .map_err(|e| CheckoutError::Serialization(e.to_string()))?;

        let (status, response) = self
            .transport
            .post_json(PAYMENT_PATH, &token.token, Some(&body))
            .await?;

        if !status.is_success() {
            error!("Payment creation rejected: status={}", status);
            return Err(CheckoutError::PaymentRejected {
                request: body.to_string(),
                response,
            });
        }

        let payment = Self::parse_payment(&response)?;
        info!("Created payment {}", payment.id);
        Ok(payment)
    }

    async fn look_up_payment(
        &self,
        session: &mut Session,
        payment_id: &str,
    ) -> CheckoutResult<Payment> {
        let token = self.tokens.get_token(session).await?;
        let path = format!("{}/{}", PAYMENT_PATH, payment_id);

        let (status, response) = self.transport.get_json(&path, &token.token).await?;

        if !status.is_success() {
            return Err(CheckoutError::Transport(format!(
                "payment lookup failed with HTTP {}: {}",
                status, response
            )));
        }

        Self::parse_payment(&response)
    }

    async fn execute_payment(
        &self,
        session: &mut Session,
        payer_id: &str,
        payment_id: &str,
    ) -> CheckoutResult<Payment> {
        let token = self.tokens.get_token(session).await?;
        let path = format!("{}/{}/execute", PAYMENT_PATH, payment_id);
        let body = json!({ "payer_id": payer_id });

        let (status, response) = self
            .transport
            .post_json(&path, &token.token, Some(&body))
            .await?;

        if !status.is_success() {
            return Err(CheckoutError::Transport(format!(
                "payment execute failed with HTTP {}: {}",
                status, response
            )));
        }

        let payment = Self::parse_payment(&response)?;
        info!("Executed payment {} for payer {}", payment.id, payer_id);
        Ok(payment)
    }

    async fn capture_payment(
        &self,
        session: &mut Session,
        authorization_id: &str,
        amount: Money,
    ) -> CheckoutResult<CaptureOutcome> {
        let token = self.tokens.get_token(session).await?;
        let path = format!("{}/{}/capture", AUTHORIZATION_PATH, authorization_id);
        let body = json!({
            "amount": {
                "total": amount.format(),
                "currency": amount.currency.as_str(),
            },
            "is_final_capture": true,
        });

        let (status, response) = self
            .transport
            .post_json(&path, &token.token, Some(&body))
            .await?;

        match CaptureOutcome::from_body(&response) {
            Some(outcome) => {
                if let CaptureOutcome::Rejected { name, message } = &outcome {
                    warn!("Capture refused: {} - {}", name, message);
                }
                Ok(outcome)
            }
            None => Err(CheckoutError::Transport(format!(
                "capture failed with HTTP {}: {}",
                status, response
            ))),
        }
    }

    async fn void_authorization(
        &self,
        session: &mut Session,
        payment_id: &str,
    ) -> CheckoutResult<()> {
        // The caller holds only the payment id; re-fetch to find the
        // authorization to void.
        let payment = self.look_up_payment(session, payment_id).await?;

        let authorization_id = match payment.authorization() {
            Some(auth) => auth.id.clone(),
            None => {
                debug!("Payment {} has no authorization to void", payment_id);
                return Ok(());
            }
        };

        let token = self.tokens.get_token(session).await?;
        let path = format!("{}/{}/void", AUTHORIZATION_PATH, authorization_id);

        let (status, response) = self.transport.post_json(&path, &token.token, None).await?;

        if !status.is_success() {
            return Err(CheckoutError::Transport(format!(
                "void failed with HTTP {}: {}",
                status, response
            )));
        }

        info!(
            "Voided authorization {} for payment {}",
            authorization_id, payment_id
        );
        Ok(())
    }

    async fn get_web_profile(&self, session: &mut Session) -> CheckoutResult<Option<String>> {
        let token = self.tokens.get_token(session).await?;
        let request = self.web_profile_request();
        let body = serde_json::to_value(&request)
            .map_err(|e| CheckoutError::Serialization(e.to_string()))?;

        let (status, response) = self
            .transport
            .post_json(WEB_PROFILE_PATH, &token.token, Some(&body))
            .await?;

        if status.is_success() {
            if let Ok(profile) = serde_json::from_str::<WebProfileResponse>(&response) {
                return Ok(Some(profile.id));
            }
        }

        // Creation refused (typically a name collision): find the existing
        // profile with our shop name.
        debug!("Web profile creation refused, listing existing profiles");
        let (status, response) = self
            .transport
            .get_json(WEB_PROFILE_PATH, &token.token)
            .await?;

        if !status.is_success() {
            return Err(CheckoutError::Transport(format!(
                "web profile list failed with HTTP {}",
                status
            )));
        }

        let profiles: Vec<WebProfileResponse> = serde_json::from_str(&response)
            .map_err(|e| CheckoutError::Serialization(format!("web profile list: {}", e)))?;

        Ok(profiles
            .into_iter()
            .find(|p| p.name.as_deref() == Some(self.config.shop_name.as_str()))
            .map(|p| p.id))
    }

    async fn verify_identity(&self, access_token: &str) -> CheckoutResult<String> {
        let (status, response) = self.transport.get_json(IDENTITY_PATH, access_token).await?;

        if !status.is_success() {
            return Err(CheckoutError::Unauthorized(format!(
                "identity verification failed with HTTP {}",
                status
            )));
        }

        let identity: IdentityResponse = serde_json::from_str(&response)
            .map_err(|e| CheckoutError::Serialization(format!("identity response: {}", e)))?;

        identity
            .email
            .ok_or_else(|| CheckoutError::Unauthorized("identity has no email".to_string()))
    }
}
