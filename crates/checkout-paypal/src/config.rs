//! # PayPal Configuration
//!
//! Configuration management for the PayPal REST integration.
//! Secrets are loaded from environment variables; the sandbox flag selects
//! the API host.

use checkout_core::{CheckoutError, CheckoutResult};
use std::env;

/// Live REST API host
pub const LIVE_API_URL: &str = "https://api.paypal.com";
/// Sandbox REST API host
pub const SANDBOX_API_URL: &str = "https://api.sandbox.paypal.com";

/// Default reauthorization tolerance: the provider refuses to capture an
/// approved payment whose amount has grown by more than this ratio.
pub const DEFAULT_REAUTH_TOLERANCE: f64 = 0.15;

/// PayPal API configuration
#[derive(Debug, Clone)]
pub struct PayPalConfig {
    /// REST client id
    pub client_id: String,

    /// REST client secret
    pub client_secret: String,

    /// Use the sandbox environment
    pub sandbox: bool,

    /// API base URL (derived from `sandbox`, overridable for testing)
    pub api_base_url: String,

    /// Shop name used for the web experience profile
    pub shop_name: String,

    /// Logo shown on the provider's approval page
    pub logo_url: Option<String>,

    /// Locale code for the approval page (e.g. "US")
    pub locale: String,

    /// Pre-configured web experience profile id, included in payment
    /// documents only when non-empty
    pub experience_profile_id: Option<String>,

    /// Mark orders as accepted on confirmed capture; off leaves every
    /// order pending capture
    pub immediate_capture: bool,

    /// Price-drift ratio past which an approved payment is voided and the
    /// buyer re-initiates instead of capturing
    pub reauth_tolerance: f64,

    /// Base URL of the checkout-resume endpoint (return and cancel URLs)
    pub base_return_url: String,

    /// Attach raw provider payloads to operator-visible errors
    pub diagnostics: bool,
}

impl PayPalConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `PAYPAL_CLIENT_ID`
    /// - `PAYPAL_CLIENT_SECRET`
    pub fn from_env() -> CheckoutResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let client_id = env::var("PAYPAL_CLIENT_ID")
            .map_err(|_| CheckoutError::Configuration("PAYPAL_CLIENT_ID not set".to_string()))?;

        let client_secret = env::var("PAYPAL_CLIENT_SECRET").map_err(|_| {
            CheckoutError::Configuration("PAYPAL_CLIENT_SECRET not set".to_string())
        })?;

        let sandbox = env::var("PAYPAL_SANDBOX")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let reauth_tolerance = env::var("PAYPAL_REAUTH_TOLERANCE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_REAUTH_TOLERANCE);

        if !(0.0..1.0).contains(&reauth_tolerance) {
            return Err(CheckoutError::Configuration(format!(
                "PAYPAL_REAUTH_TOLERANCE must be in [0, 1), got {}",
                reauth_tolerance
            )));
        }

        Ok(Self {
            client_id,
            client_secret,
            sandbox,
            api_base_url: if sandbox { SANDBOX_API_URL } else { LIVE_API_URL }.to_string(),
            shop_name: env::var("SHOP_NAME").unwrap_or_else(|_| "Shop".to_string()),
            logo_url: env::var("SHOP_LOGO_URL").ok(),
            locale: env::var("SHOP_LOCALE").unwrap_or_else(|_| "US".to_string()),
            experience_profile_id: env::var("PAYPAL_WEB_PROFILE_ID")
                .ok()
                .filter(|v| !v.is_empty()),
            immediate_capture: env::var("PAYPAL_IMMEDIATE_CAPTURE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            reauth_tolerance,
            base_return_url: env::var("BASE_RETURN_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            diagnostics: env::var("PAYPAL_DIAGNOSTICS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    /// Create config with explicit credentials (for testing)
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, sandbox: bool) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            sandbox,
            api_base_url: if sandbox { SANDBOX_API_URL } else { LIVE_API_URL }.to_string(),
            shop_name: "Shop".to_string(),
            logo_url: None,
            locale: "US".to_string(),
            experience_profile_id: None,
            immediate_capture: false,
            reauth_tolerance: DEFAULT_REAUTH_TOLERANCE,
            base_return_url: "http://localhost:8080".to_string(),
            diagnostics: false,
        }
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set the experience profile id
    pub fn with_experience_profile(mut self, profile_id: impl Into<String>) -> Self {
        self.experience_profile_id = Some(profile_id.into());
        self
    }

    /// Builder: enable immediate capture
    pub fn with_immediate_capture(mut self, enabled: bool) -> Self {
        self.immediate_capture = enabled;
        self
    }

    /// Builder: set the reauthorization tolerance
    pub fn with_reauth_tolerance(mut self, tolerance: f64) -> Self {
        self.reauth_tolerance = tolerance;
        self
    }

    /// Builder: set the checkout-resume base URL
    pub fn with_base_return_url(mut self, url: impl Into<String>) -> Self {
        self.base_return_url = url.into();
        self
    }
}
