//! # Checkout Error Types
//!
//! Typed error handling for the checkout engine.
//! All fallible operations return `Result<T, CheckoutError>`.
//!
//! Provider-level *soft* failures (a well-formed capture response carrying
//! `name`/`message` fields) are deliberately not part of this taxonomy;
//! they are modeled as `CaptureOutcome::Rejected` and drive branch logic
//! instead of aborting the request.

use thiserror::Error;

/// Core error type for all checkout operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Configuration errors (missing credentials, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network/TLS/timeout error talking to the payment provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// OAuth2 token grant rejected by the provider
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The provider rejected the payment document at creation time.
    /// Raw request and response bodies are retained for diagnostics.
    #[error("Payment rejected by provider")]
    PaymentRejected { request: String, response: String },

    /// Payment object missing expected fields or in an unexpected state
    #[error("Payment in inconsistent state `{state}`")]
    StateInconsistency { state: String, payload: String },

    /// Local validation failed (incomplete address, empty cart, ...)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Cart, customer or address record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Session is not authorized for this action
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Returns true if retrying the whole operation could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Transport(_) | CheckoutError::Auth(_))
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CheckoutError::Configuration(_) => 500,
            CheckoutError::Transport(_) => 502,
            CheckoutError::Auth(_) => 502,
            CheckoutError::PaymentRejected { .. } => 502,
            CheckoutError::StateInconsistency { .. } => 502,
            CheckoutError::Validation(_) => 400,
            CheckoutError::NotFound(_) => 404,
            CheckoutError::Unauthorized(_) => 401,
            CheckoutError::Serialization(_) => 500,
            CheckoutError::Internal(_) => 500,
        }
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(CheckoutError::Transport("timeout".into()).is_retryable());
        assert!(CheckoutError::Auth("grant rejected".into()).is_retryable());
        assert!(!CheckoutError::Validation("bad address".into()).is_retryable());
        assert!(!CheckoutError::PaymentRejected {
            request: "{}".into(),
            response: "{}".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CheckoutError::Validation("x".into()).status_code(), 400);
        assert_eq!(CheckoutError::NotFound("cart 7".into()).status_code(), 404);
        assert_eq!(CheckoutError::Transport("tls".into()).status_code(), 502);
        assert_eq!(
            CheckoutError::StateInconsistency {
                state: "pending".into(),
                payload: "{}".into()
            }
            .status_code(),
            502
        );
    }
}
