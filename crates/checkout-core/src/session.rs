//! # Session Context
//!
//! Explicit per-buyer session state, replacing ambient cookie globals.
//! The OAuth2 access token is cached here with its expiry watermark so a
//! token is reused across requests within its validity window and never
//! past it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// A cached OAuth2 access token with its expiry watermark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Bearer token value
    pub token: String,
    /// Instant past which the token must not be used
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// True if the expiry watermark is still in the future
    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

/// Per-buyer session state carried across the redirect round-trips
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Cached provider access token, if any
    pub access_token: Option<AccessToken>,
    /// Logged-in customer, if any
    pub customer_id: Option<u64>,
    /// Guest identifier for anonymous carts
    pub guest_id: Option<u64>,
    /// Whether the buyer is authenticated
    pub logged_in: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for a logged-in customer
    pub fn logged_in(customer_id: u64) -> Self {
        Self {
            access_token: None,
            customer_id: Some(customer_id),
            guest_id: None,
            logged_in: true,
        }
    }

    /// Return the cached token only while it is still valid
    pub fn valid_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref().filter(|t| t.is_valid())
    }

    /// Drop any cached token (stale or error-bearing response)
    pub fn invalidate_token(&mut self) {
        self.access_token = None;
    }

    /// Clear authentication state (guest logout on failed validation)
    pub fn logout(&mut self) {
        self.customer_id = None;
        self.logged_in = false;
    }
}

/// Session store keyed by cart id.
///
/// Each buyer session is independent; there is no cross-session token
/// sharing, so a plain mutex-guarded map is sufficient.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<u64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the session for a cart, or a fresh one
    pub fn load(&self, cart_id: u64) -> Session {
        self.inner
            .lock()
            .expect("session store poisoned")
            .get(&cart_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Persist the session for a cart
    pub fn save(&self, cart_id: u64, session: Session) {
        self.inner
            .lock()
            .expect("session store poisoned")
            .insert(cart_id, session);
    }
}
