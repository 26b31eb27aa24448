//! # checkout-paypal
//!
//! PayPal REST payment strategy for paypal-checkout-rs.
//!
//! The crate covers the provider-facing half of the redirect checkout:
//!
//! 1. **Transport** - authenticated HTTP to the REST host (sandbox or live)
//! 2. **TokenManager** - OAuth2 client-credentials grant with a
//!    session-scoped cache
//! 3. **build_payment_request** - pure cart-to-payment-document mapping
//! 4. **PayPalGateway** - create / lookup / execute / capture / void, plus
//!    web experience profiles and identity verification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_paypal::{build_payment_request, PayPalApi, PayPalGateway};
//! use checkout_core::Session;
//!
//! // Create gateway from environment
//! let gateway = PayPalGateway::from_env()?;
//! let mut session = Session::new();
//!
//! // Create a payment and redirect the buyer to approve it
//! let request = build_payment_request(&cart, gateway.config(), None)?;
//! let payment = gateway.create_payment(&mut session, &request).await?;
//! let approval_url = payment.approval_url();
//! ```

pub mod client;
pub mod config;
pub mod request;
pub mod token;
pub mod transport;
pub mod types;

// Re-exports
pub use client::{PayPalApi, PayPalGateway};
pub use config::{PayPalConfig, DEFAULT_REAUTH_TOLERANCE, LIVE_API_URL, SANDBOX_API_URL};
pub use request::{build_payment_request, checkout_resume_url};
pub use token::TokenManager;
pub use transport::Transport;
pub use types::{
    Authorization, CaptureOutcome, Payment, PaymentRequest, PayerInfo, ShippingAddress,
    WebProfileResponse,
};
