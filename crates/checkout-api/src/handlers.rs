//! # Request Handlers
//!
//! Axum request handlers for the redirect checkout. The handlers only
//! translate between HTTP and [`FlowOutcome`]; every decision lives in the
//! flow controller.
//!
//! The provider calls back with its own query parameter spelling
//! (`PayerID`, `paymentId`); the loop-guard flags (`authorized`,
//! `addressChanged`) ride along as `0`/`1`.

use crate::flow::FlowOutcome;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use checkout_core::{CheckoutError, LoginRecord};
use checkout_paypal::checkout_resume_url;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    pub cart_id: u64,
}

/// Query parameters on the provider return URL.
///
/// `PayerID`/`paymentId` are absent when the buyer cancelled at the
/// provider; the flags default to unset.
#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    pub cart_id: u64,
    #[serde(rename = "PayerID", default)]
    pub payer_id: Option<String>,
    #[serde(rename = "paymentId", default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub authorized: Option<u8>,
    #[serde(rename = "addressChanged", default)]
    pub address_changed: Option<u8>,
}

impl ReturnQuery {
    fn authorized(&self) -> bool {
        self.authorized == Some(1)
    }

    fn address_changed(&self) -> bool {
        self.address_changed == Some(1)
    }
}

/// In-context validation request posted by the checkout page script
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub cart_id: u64,
    pub payment_id: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GuestQuery {
    pub order_id: u64,
    pub cart_id: u64,
    pub key: String,
}

/// Login setup posted by the checkout page script after the provider's
/// login popup hands it an access token
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub cart_id: u64,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Callback URL the popup navigates to
    pub login_url: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginTokenQuery {
    pub token: String,
    pub cart_id: u64,
}

/// Validity window of a stored login token
const LOGIN_TOKEN_TTL_MINUTES: i64 = 15;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Outcome translation
// =============================================================================

pub(crate) fn confirm_url(
    cart_id: u64,
    payer_id: &str,
    payment_id: &str,
    authorized: bool,
    address_changed: bool,
) -> String {
    format!(
        "/checkout/paypal/confirm?cart_id={}&paymentId={}&PayerID={}&authorized={}&addressChanged={}",
        cart_id,
        payment_id,
        payer_id,
        u8::from(authorized),
        u8::from(address_changed)
    )
}

pub(crate) fn complete_url(cart_id: u64, payer_id: &str, payment_id: &str) -> String {
    format!(
        "/checkout/paypal/complete?cart_id={}&paymentId={}&PayerID={}",
        cart_id, payment_id, payer_id
    )
}

fn restart_url(cart_id: u64) -> String {
    format!("/checkout?cart_id={}", cart_id)
}

fn outcome_to_response(outcome: FlowOutcome) -> Response {
    match outcome {
        FlowOutcome::RedirectToProvider(url) => Redirect::to(&url).into_response(),
        FlowOutcome::RedirectToConfirm {
            cart_id,
            payer_id,
            payment_id,
            authorized,
            address_changed,
        } => Redirect::to(&confirm_url(
            cart_id,
            &payer_id,
            &payment_id,
            authorized,
            address_changed,
        ))
        .into_response(),
        FlowOutcome::RedirectToComplete {
            cart_id,
            payer_id,
            payment_id,
        } => Redirect::to(&complete_url(cart_id, &payer_id, &payment_id)).into_response(),
        FlowOutcome::RestartCheckout { cart_id } => {
            Redirect::to(&restart_url(cart_id)).into_response()
        }
        FlowOutcome::RedirectToOrderHistory => Redirect::to("/order-history").into_response(),
        FlowOutcome::RedirectToManualOrder { cart_id } => {
            Redirect::to(&format!("/checkout/address?cart_id={}", cart_id)).into_response()
        }
        FlowOutcome::OrderConfirmed {
            order_id,
            cart_id,
            guest,
            secure_key,
        } => {
            let url = if guest {
                format!(
                    "/checkout/paypal/guest?order_id={}&cart_id={}&key={}",
                    order_id, cart_id, secure_key
                )
            } else {
                format!("/order-confirmation?order_id={}", order_id)
            };
            Redirect::to(&url).into_response()
        }
        FlowOutcome::Error { message, detail } => error_page(&message, detail.as_deref()),
    }
}

fn error_page(message: &str, detail: Option<&str>) -> Response {
    let detail_block = detail
        .map(|d| format!("<pre style=\"text-align: left; color: #888;\">{}</pre>", d))
        .unwrap_or_default();
    (
        StatusCode::BAD_GATEWAY,
        Html(format!(
            r#"
<!DOCTYPE html>
<html>
<head><title>Payment Problem</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0;">
    <div style="padding: 60px; border-radius: 16px; text-align: center; border: 1px solid #ddd;">
        <h1>Payment Problem</h1>
        <p>{}</p>
        {}
        <p><a href="/checkout">Return to checkout</a></p>
    </div>
</body>
</html>
"#,
            message, detail_block
        )),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "paypal-checkout",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Build the payment document and redirect the buyer to the provider
#[instrument(skip(state), fields(cart_id = query.cart_id))]
pub async fn start_checkout(
    State(state): State<AppState>,
    Query(query): Query<StartQuery>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let outcome = state
        .flow
        .initiate(query.cart_id)
        .await
        .map_err(checkout_error_to_response)?;
    Ok(outcome_to_response(outcome))
}

/// The provider return URL: also the cancel URL, distinguished by the
/// presence of `PayerID`/`paymentId`.
#[instrument(skip(state), fields(cart_id = query.cart_id))]
pub async fn confirm_checkout(
    State(state): State<AppState>,
    Query(query): Query<ReturnQuery>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let (payer_id, payment_id) = match (&query.payer_id, &query.payment_id) {
        (Some(payer_id), Some(payment_id)) => (payer_id.clone(), payment_id.clone()),
        _ => {
            info!("Buyer cancelled at provider; restarting checkout");
            return Ok(Redirect::to(&restart_url(query.cart_id)).into_response());
        }
    };

    let outcome = state
        .flow
        .confirm(
            query.cart_id,
            &payer_id,
            &payment_id,
            query.authorized(),
            query.address_changed(),
        )
        .await
        .map_err(checkout_error_to_response)?;
    Ok(outcome_to_response(outcome))
}

/// Capture and record the order
#[instrument(skip(state), fields(cart_id = query.cart_id))]
pub async fn complete_checkout(
    State(state): State<AppState>,
    Query(query): Query<ReturnQuery>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let (payer_id, payment_id) = match (&query.payer_id, &query.payment_id) {
        (Some(payer_id), Some(payment_id)) => (payer_id.clone(), payment_id.clone()),
        _ => {
            warn!("Completion callback without payment identifiers");
            return Ok(Redirect::to(&restart_url(query.cart_id)).into_response());
        }
    };

    let outcome = state
        .flow
        .complete(query.cart_id, &payer_id, &payment_id)
        .await
        .map_err(checkout_error_to_response)?;
    Ok(outcome_to_response(outcome))
}

/// In-context validation: the checkout page script created a payment
/// client-side and posts its id before sending the buyer onward.
#[instrument(skip(state, request), fields(cart_id = request.cart_id))]
pub async fn validate_payment(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut session = state.sessions.load(request.cart_id);

    let payment = state
        .gateway
        .look_up_payment(&mut session, &request.payment_id)
        .await
        .map_err(|e| {
            state.sessions.save(request.cart_id, session.clone());
            checkout_error_to_response(e)
        })?;

    let payer = match payment.payer_info() {
        Some(payer) => payer,
        None => {
            state.sessions.save(request.cart_id, session);
            return Err(checkout_error_to_response(CheckoutError::Validation(
                "payment carries no payer info".to_string(),
            )));
        }
    };

    let customer = crate::reconcile::reconcile_customer(
        &session,
        payer,
        state.customers.as_ref(),
        state.paypal_customers.as_ref(),
    )
    .map_err(checkout_error_to_response)?;
    session.customer_id = Some(customer.id);

    let response = if payment.state_is("created") {
        let profile_id = match &state.paypal.experience_profile_id {
            Some(id) => Some(id.clone()),
            None => state
                .gateway
                .get_web_profile(&mut session)
                .await
                .unwrap_or_else(|e| {
                    warn!("Web profile unavailable: {}", e);
                    None
                }),
        };
        ValidateResponse {
            success: true,
            confirm_url: Some(format!(
                "{}&paymentId={}",
                checkout_resume_url(&state.paypal.base_return_url, request.cart_id),
                payment.id
            )),
            profile_id,
        }
    } else {
        warn!(
            "In-context payment {} in state {:?}; rejecting",
            payment.id, payment.state
        );
        if customer.is_guest {
            session.logout();
        }
        ValidateResponse {
            success: false,
            confirm_url: None,
            profile_id: None,
        }
    };

    state.sessions.save(request.cart_id, session);
    Ok(Json(response))
}

/// Guest order confirmation, gated by the cart owner's secure key
pub async fn guest_confirmation(
    State(state): State<AppState>,
    Query(query): Query<GuestQuery>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let cart = state.carts.get(query.cart_id).ok_or_else(|| {
        checkout_error_to_response(CheckoutError::NotFound(format!("cart {}", query.cart_id)))
    })?;

    if cart.secure_key != query.key {
        return Err(checkout_error_to_response(CheckoutError::Unauthorized(
            "secure key mismatch".to_string(),
        )));
    }

    Ok(Html(format!(
        r#"
<!DOCTYPE html>
<html>
<head><title>Order Confirmed</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0;">
    <div style="padding: 60px; border-radius: 16px; text-align: center; border: 1px solid #ddd;">
        <h1>Thank you!</h1>
        <p>Your order <code>{}</code> has been placed.</p>
        <p style="color: #666;">A confirmation email is on its way.</p>
    </div>
</body>
</html>
"#,
        query.order_id
    ))
    .into_response())
}

/// Store a login token for the popup callback.
///
/// The provider's login popup hands the page script an access token; it is
/// verified against the identity endpoint and must resolve to a linked
/// account before any record is stored. The callback then re-verifies the
/// stored token, so a forged POST here still cannot log anyone in.
#[instrument(skip(state, request), fields(cart_id = request.cart_id))]
pub async fn prepare_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<ErrorResponse>)> {
    let email = state
        .gateway
        .verify_identity(&request.access_token)
        .await
        .map_err(|e| {
            warn!("Login setup rejected: {}", e);
            checkout_error_to_response(e)
        })?;

    let mapping = state.paypal_customers.find_by_email(&email).ok_or_else(|| {
        checkout_error_to_response(CheckoutError::Unauthorized(
            "payer has no linked account".to_string(),
        ))
    })?;

    let token = uuid::Uuid::new_v4().to_string();
    state
        .login_tokens
        .insert(LoginRecord {
            token: token.clone(),
            customer_id: mapping.customer_id,
            access_token: request.access_token,
            expires_at: Utc::now() + Duration::minutes(LOGIN_TOKEN_TTL_MINUTES),
        })
        .map_err(checkout_error_to_response)?;
    info!("Stored login token for customer {}", mapping.customer_id);

    Ok(Json(LoginResponse {
        login_url: format!(
            "/checkout/paypal/login-token?token={}&cart_id={}",
            token, request.cart_id
        ),
    }))
}

/// Popup login callback: a stored login token is honored only after the
/// provider re-confirms the access token belongs to the mapped payer.
#[instrument(skip(state, query))]
pub async fn login_token(
    State(state): State<AppState>,
    Query(query): Query<LoginTokenQuery>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let record = state.login_tokens.find(&query.token).ok_or_else(|| {
        checkout_error_to_response(CheckoutError::Unauthorized(
            "unknown login token".to_string(),
        ))
    })?;

    if record.expires_at <= Utc::now() {
        return Err(checkout_error_to_response(CheckoutError::Unauthorized(
            "login token expired".to_string(),
        )));
    }

    let email = state
        .gateway
        .verify_identity(&record.access_token)
        .await
        .map_err(|e| {
            error!("Identity verification failed: {}", e);
            checkout_error_to_response(e)
        })?;

    let mapping = state.paypal_customers.find_by_email(&email).ok_or_else(|| {
        checkout_error_to_response(CheckoutError::Unauthorized(
            "payer has no linked account".to_string(),
        ))
    })?;
    if mapping.customer_id != record.customer_id {
        return Err(checkout_error_to_response(CheckoutError::Unauthorized(
            "login token does not match the linked account".to_string(),
        )));
    }

    let mut session = state.sessions.load(query.cart_id);
    session.customer_id = Some(record.customer_id);
    session.logged_in = true;
    state.sessions.save(query.cart_id, session);
    info!("Customer {} logged in via provider identity", record.customer_id);

    // Rendered inside the provider's login popup; close it and let the
    // opener continue the checkout.
    Ok(Html(
        r#"
<!DOCTYPE html>
<html>
<head><title>Signed in</title></head>
<body>
    <script>
        if (window.opener) { window.opener.location.reload(); }
        window.close();
    </script>
    <p>You are signed in. You can close this window.</p>
</body>
</html>
"#
        .to_string(),
    )
    .into_response())
}
