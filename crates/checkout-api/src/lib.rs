//! # checkout-api
//!
//! HTTP layer and checkout flow controller for paypal-checkout-rs.
//!
//! This crate provides:
//! - The redirect checkout state machine ([`flow::CheckoutFlow`])
//! - Customer/address reconciliation from provider payer data
//! - Order finalization with conservative status derivation
//! - Axum-based HTTP server translating flow outcomes into redirects
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/checkout/paypal/start` | Create payment, redirect to approval |
//! | GET | `/checkout/paypal/confirm` | Provider return/cancel callback |
//! | GET | `/checkout/paypal/complete` | Capture and record order |
//! | POST | `/checkout/paypal/validate` | In-context payment validation |
//! | GET | `/checkout/paypal/guest` | Guest order confirmation |
//! | POST | `/checkout/paypal/login` | Verify payer identity, issue a login token |
//! | GET | `/checkout/paypal/login-token` | Popup login callback |

pub mod finalize;
pub mod flow;
pub mod handlers;
pub mod reconcile;
pub mod routes;
pub mod state;

#[cfg(test)]
pub mod testutil;

pub use flow::{CheckoutFlow, FlowOutcome};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
