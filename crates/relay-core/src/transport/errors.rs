use thiserror::Error;

/// Provider error code for a relay made against a session the service node no longer
/// recognizes.
pub const INVALID_SESSION_CODE: i32 = 1124;

/// Errors surfaced by a [`RelayTransport`](super::RelayTransport) call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The call did not complete within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// The remote endpoint could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The remote endpoint answered with a coded error.
    #[error("provider error {code}: {message}")]
    Provider { code: i32, message: String },

    /// The remote endpoint answered with something that could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    pub fn provider(code: i32, message: impl Into<String>) -> Self {
        Self::Provider { code, message: message.into() }
    }

    /// Returns the provider error code, if the endpoint returned one.
    #[must_use]
    pub fn provider_code(&self) -> Option<i32> {
        match self {
            Self::Provider { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` if a service node rejected the relay's session.
    #[must_use]
    pub fn is_invalid_session(&self) -> bool {
        self.provider_code() == Some(INVALID_SESSION_CODE)
    }

    /// Returns `true` if the endpoint itself failed to answer.
    ///
    /// Provider and decoding errors mean the endpoint is reachable and are not transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_))
    }
}

/// Errors surfaced by a [`RelaySigner`](super::RelaySigner).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SignerError {
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("signing failed: {0}")]
    Failed(String),
}
