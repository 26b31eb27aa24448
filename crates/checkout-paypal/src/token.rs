//! # OAuth2 Token Manager
//!
//! Client-credentials token grant with a session-scoped cache.
//! A cached token is reused while its expiry watermark is in the future;
//! otherwise a fresh grant is performed and persisted into the session.
//! A grant response carrying an `error` field invalidates the cache and
//! surfaces as `CheckoutError::Auth` — no retry happens at this layer.

use crate::transport::Transport;
use checkout_core::{AccessToken, CheckoutError, CheckoutResult, Session};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::debug;

pub const TOKEN_PATH: &str = "/v1/oauth2/token";

#[derive(Debug, Clone)]
pub struct TokenManager {
    transport: Transport,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenManager {
    pub fn new(
        transport: Transport,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Return a valid access token, from the session cache when possible
    pub async fn get_token(&self, session: &mut Session) -> CheckoutResult<AccessToken> {
        if let Some(cached) = session.valid_token() {
            debug!("Reusing cached access token");
            return Ok(cached.clone());
        }
        session.invalidate_token();

        let (status, body) = self
            .transport
            .post_form(
                TOKEN_PATH,
                (&self.client_id, &self.client_secret),
                &[("grant_type", "client_credentials")],
            )
            .await?;

        let response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CheckoutError::Transport(format!("malformed token response: {}", e)))?;

        if let Some(error) = response.error {
            let description = response.error_description.unwrap_or_default();
            return Err(CheckoutError::Auth(format!("{}: {}", error, description)));
        }

        if !status.is_success() {
            return Err(CheckoutError::Auth(format!(
                "token grant failed with HTTP {}",
                status
            )));
        }

        let (access_token, expires_in) = match (response.access_token, response.expires_in) {
            (Some(token), Some(expires_in)) => (token, expires_in),
            _ => {
                return Err(CheckoutError::Auth(
                    "token response missing access_token/expires_in".to_string(),
                ))
            }
        };

        let token = AccessToken::new(access_token, Utc::now() + Duration::seconds(expires_in));
        debug!("Obtained fresh access token, expires {}", token.expires_at);
        session.access_token = Some(token.clone());

        Ok(token)
    }
}
