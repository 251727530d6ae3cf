//! Error types for the copyleaks client engine.

use thiserror::Error;

/// Failures produced below the engine, by the transport itself.
///
/// These are surfaced verbatim through [`ApiError::Transport`] unless the
/// service error header overrides them (see [`crate::core::serialize_json`]).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("request was cancelled")]
    Cancelled,

    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` for the cooperative-cancellation terminal error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Terminal error delivered to a request's completion handler, plus the
/// synchronous construction failure.
///
/// Every request resolves to exactly one `Result<_, ApiError>`; there is no
/// partial success. `Build` is the only variant raised at call time, the
/// rest arrive through the completion path.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connectivity, DNS, TLS or cancellation, as reported by the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Logical failure signaled by the service through the
    /// `copyleaks-error-code` response header.
    #[error("copyleaks error {code}: {reason}")]
    Service { code: i64, reason: String },

    /// The response body was missing, empty, or not valid JSON.
    #[error("response decoding failed: {0}")]
    Decode(String),

    /// The request could not be constructed (e.g. parameter serialization).
    #[error("request construction failed: {0}")]
    Build(String),
}

impl ApiError {
    /// The numeric service error code, when the service reported one.
    pub fn service_code(&self) -> Option<i64> {
        match self {
            ApiError::Service { code, .. } => Some(*code),
            _ => None,
        }
    }
}
