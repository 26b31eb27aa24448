//! # HTTP Transport
//!
//! Low-level authenticated requests to the provider's REST endpoints.
//! Network, TLS, timeout and body-read failures surface as
//! `CheckoutError::Transport`; response bodies are handed back raw so
//! callers can distinguish provider-level soft failures from hard ones.

use checkout_core::{CheckoutError, CheckoutResult};
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Upper bound on any provider round-trip
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Thin wrapper around `reqwest::Client` bound to one API host
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
}

impl Transport {
    pub fn new(base_url: impl Into<String>) -> CheckoutResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CheckoutError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a urlencoded form with basic auth (the token grant endpoint)
    pub async fn post_form(
        &self,
        path: &str,
        credentials: (&str, &str),
        form: &[(&str, &str)],
    ) -> CheckoutResult<(StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} (form)", path);

        let response = self
            .client
            .post(&url)
            .basic_auth(credentials.0, Some(credentials.1))
            .form(form)
            .send()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        Ok((status, body))
    }

    /// POST a JSON body (or an empty one) with bearer auth
    pub async fn post_json(
        &self,
        path: &str,
        access_token: &str,
        body: Option<&serde_json::Value>,
    ) -> CheckoutResult<(StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", path);

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header("Content-Type", "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        Ok((status, body))
    }

    /// GET with bearer auth
    pub async fn get_json(
        &self,
        path: &str,
        access_token: &str,
    ) -> CheckoutResult<(StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        Ok((status, body))
    }
}
