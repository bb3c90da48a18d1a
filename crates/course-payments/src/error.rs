//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Reason shown when the return URL does not carry a usable combination
pub const INVALID_PARAMETERS_REASON: &str = "invalid payment parameters";

/// Reason shown when nothing more specific is known
pub const GENERIC_VERIFICATION_REASON: &str = "Payment verification failed. Please try again.";

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Missing course id / session id / outcome hint combination
    #[error("invalid payment parameters")]
    InvalidParameters,

    /// Backend explicitly rejected the payment session
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Verification could not be completed
    #[error("Verification error: {0}")]
    VerificationError(String),

    /// Backend answered with a non-success HTTP status
    #[error("Backend returned status {status}")]
    Backend { status: u16, message: Option<String> },

    /// Request never got a usable answer
    #[error("{0}")]
    Transport(String),

    /// Payment session could not be created
    #[error("Checkout initiation failed: {0}")]
    CheckoutInitiationFailed(String),

    /// Retry action refused
    #[error("Retry unavailable: {0}")]
    RetryUnavailable(RetryBlocked),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Response body could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why the retry action is not available
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryBlocked {
    #[error("nothing to retry")]
    NotFailed,

    #[error("verification already in progress")]
    InFlight,

    #[error("no payment session to verify")]
    NoSession,

    #[error("payment parameters are invalid")]
    InvalidParameters,

    #[error("maximum retries reached")]
    Exhausted,
}

impl PaymentError {
    /// Human-readable reason for a failed verification.
    ///
    /// Prefers a message supplied by the server, then the error's own
    /// message, then a generic line.
    pub fn failure_reason(&self) -> String {
        let server_message = match self {
            Self::Backend { message, .. } => message.as_deref(),
            Self::VerificationFailed(msg)
            | Self::VerificationError(msg)
            | Self::CheckoutInitiationFailed(msg) => Some(msg.as_str()),
            _ => None,
        };

        server_message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .or_else(|| {
                let own = self.to_string();
                (!own.trim().is_empty()).then_some(own)
            })
            .unwrap_or_else(|| GENERIC_VERIFICATION_REASON.into())
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            Self::InvalidParameters => INVALID_PARAMETERS_REASON,
            Self::CheckoutInitiationFailed(_) => "Could not start checkout. Please try again.",
            Self::RetryUnavailable(RetryBlocked::Exhausted) => "Maximum retries reached.",
            Self::RetryUnavailable(_) => "Retry is not available right now.",
            Self::Config(_) => "Service configuration error.",
            _ => GENERIC_VERIFICATION_REASON,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_prefers_server_message() {
        let err = PaymentError::Backend {
            status: 402,
            message: Some("card declined".into()),
        };
        assert_eq!(err.failure_reason(), "card declined");
    }

    #[test]
    fn test_reason_falls_back_to_error_message() {
        let err = PaymentError::Backend { status: 500, message: None };
        assert_eq!(err.failure_reason(), "Backend returned status 500");

        let err = PaymentError::Transport("connection reset".into());
        assert_eq!(err.failure_reason(), "connection reset");
    }

    #[test]
    fn test_reason_generic_when_empty() {
        let err = PaymentError::Transport("  ".into());
        assert_eq!(err.failure_reason(), GENERIC_VERIFICATION_REASON);
    }

    #[test]
    fn test_json_error_reason() {
        let err: PaymentError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(err.failure_reason().starts_with("JSON error:"));
    }

    #[test]
    fn test_invalid_parameters_reason() {
        assert_eq!(PaymentError::InvalidParameters.failure_reason(), INVALID_PARAMETERS_REASON);
    }
}
