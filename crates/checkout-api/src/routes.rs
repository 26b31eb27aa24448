//! # Routes
//!
//! Axum router configuration for the checkout server.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health - Health check
/// - GET  /checkout/paypal/start - Build payment, redirect to approval
/// - GET  /checkout/paypal/confirm - Provider return/cancel URL
/// - GET  /checkout/paypal/complete - Capture and record the order
/// - POST /checkout/paypal/validate - In-context payment validation
/// - GET  /checkout/paypal/guest - Guest order confirmation
/// - POST /checkout/paypal/login - Verify payer identity, issue a login token
/// - GET  /checkout/paypal/login-token - Popup login callback
pub fn create_router(state: AppState) -> Router {
    // The confirm/complete callbacks arrive as top-level navigations from
    // the provider, so CORS stays permissive.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let paypal_routes = Router::new()
        .route("/start", get(handlers::start_checkout))
        .route("/confirm", get(handlers::confirm_checkout))
        .route("/complete", get(handlers::complete_checkout))
        .route("/validate", post(handlers::validate_payment))
        .route("/guest", get(handlers::guest_confirmation))
        .route("/login", post(handlers::prepare_login))
        .route("/login-token", get(handlers::login_token));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/checkout/paypal", paypal_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
