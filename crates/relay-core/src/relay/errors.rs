use crate::{
    dispatch::PoolError,
    transport::{SignerError, TransportError},
};
use thiserror::Error;

/// Coarse classification of relay failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The dispatcher pool has nothing to offer.
    PoolExhausted,
    /// A dispatcher or service node could not be reached in time.
    Transport,
    /// A service node rejected the relay's session.
    InvalidSession,
    /// A service node returned a coded error other than an invalid session.
    Provider,
    /// A response did not echo the request that was sent.
    Validation,
    /// Consensus participants could not agree.
    ConsensusNotReached,
    /// The session cannot serve the request as asked.
    Selection,
    Signer,
}

impl ErrorCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PoolExhausted => "pool_exhausted",
            Self::Transport => "transport",
            Self::InvalidSession => "invalid_session",
            Self::Provider => "provider",
            Self::Validation => "validation",
            Self::ConsensusNotReached => "consensus_not_reached",
            Self::Selection => "selection",
            Self::Signer => "signer",
        }
    }
}

/// Machine-readable error code carried by every [`RelayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoDispatchers,
    DispatcherPool,
    DispatchFailed,
    NoEligibleNodes,
    InsufficientNodes,
    ConsensusUnavailable,
    InvalidSession,
    RelayTimeout,
    RelayConnection,
    ProviderError,
    InvalidResponse,
    ResponseMismatch,
    ConsensusNotReached,
    SignerFailed,
}

impl ErrorCode {
    /// Returns a static string suitable for metric labels and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDispatchers => "no_dispatchers",
            Self::DispatcherPool => "dispatcher_pool",
            Self::DispatchFailed => "dispatch_failed",
            Self::NoEligibleNodes => "no_eligible_nodes",
            Self::InsufficientNodes => "insufficient_nodes",
            Self::ConsensusUnavailable => "consensus_unavailable",
            Self::InvalidSession => "invalid_session",
            Self::RelayTimeout => "relay_timeout",
            Self::RelayConnection => "relay_connection",
            Self::ProviderError => "provider_error",
            Self::InvalidResponse => "invalid_response",
            Self::ResponseMismatch => "response_mismatch",
            Self::ConsensusNotReached => "consensus_not_reached",
            Self::SignerFailed => "signer_failed",
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoDispatchers | Self::DispatcherPool => ErrorCategory::PoolExhausted,
            Self::DispatchFailed | Self::RelayTimeout | Self::RelayConnection => {
                ErrorCategory::Transport
            }
            Self::NoEligibleNodes | Self::InsufficientNodes | Self::ConsensusUnavailable => {
                ErrorCategory::Selection
            }
            Self::InvalidSession => ErrorCategory::InvalidSession,
            Self::ProviderError => ErrorCategory::Provider,
            Self::InvalidResponse | Self::ResponseMismatch => ErrorCategory::Validation,
            Self::ConsensusNotReached => ErrorCategory::ConsensusNotReached,
            Self::SignerFailed => ErrorCategory::Signer,
        }
    }
}

/// Errors returned by [`RelayCoordinator::send_relay`](super::RelayCoordinator::send_relay).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum RelayError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// A dispatcher failed to report the block height or hand out a session.
    #[error("dispatcher {dispatcher} failed: {source}")]
    Dispatch {
        dispatcher: String,
        #[source]
        source: TransportError,
    },

    #[error("no service node in session {session} serves chain {chain_id}")]
    NoEligibleNodes { session: String, chain_id: String },

    #[error("consensus needs {required} nodes serving chain {chain_id}, session has {available}")]
    InsufficientNodes { chain_id: String, required: usize, available: usize },

    #[error("consensus relays are disabled (consensusNodeCount is 0)")]
    ConsensusUnavailable,

    /// A service node failed the relay.
    #[error("relay to {node} failed: {source}")]
    Relay {
        node: String,
        #[source]
        source: TransportError,
    },

    #[error("response from {node} does not echo the request: {reason}")]
    ResponseMismatch { node: String, reason: String },

    #[error(
        "consensus not reached: largest group has {largest_group} of {successful} successful \
         responses from {participants} nodes"
    )]
    ConsensusNotReached { largest_group: usize, successful: usize, participants: usize },

    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl RelayError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Pool(PoolError::NoDispatchersAvailable) => ErrorCode::NoDispatchers,
            Self::Pool(_) => ErrorCode::DispatcherPool,
            Self::Dispatch { .. } => ErrorCode::DispatchFailed,
            Self::NoEligibleNodes { .. } => ErrorCode::NoEligibleNodes,
            Self::InsufficientNodes { .. } => ErrorCode::InsufficientNodes,
            Self::ConsensusUnavailable => ErrorCode::ConsensusUnavailable,
            Self::Relay { source, .. } => match source {
                TransportError::Timeout => ErrorCode::RelayTimeout,
                TransportError::Connection(_) => ErrorCode::RelayConnection,
                TransportError::InvalidResponse(_) => ErrorCode::InvalidResponse,
                _ if source.is_invalid_session() => ErrorCode::InvalidSession,
                _ => ErrorCode::ProviderError,
            },
            Self::ResponseMismatch { .. } => ErrorCode::ResponseMismatch,
            Self::ConsensusNotReached { .. } => ErrorCode::ConsensusNotReached,
            Self::Signer(_) => ErrorCode::SignerFailed,
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }

    /// Returns the provider error code when a service node answered with one.
    #[must_use]
    pub fn provider_code(&self) -> Option<i32> {
        match self {
            Self::Relay { source, .. } => source.provider_code(),
            _ => None,
        }
    }

    /// Returns `true` if a service node rejected the relay's session, meaning the cached
    /// session is stale and a fresh one should be dispatched.
    #[must_use]
    pub fn is_invalid_session(&self) -> bool {
        self.code() == ErrorCode::InvalidSession
    }

    /// Returns `true` if the failure was the network rather than the request.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Dispatch { source, .. } | Self::Relay { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Returns `true` if sending the same request again may succeed.
    ///
    /// Validation failures, consensus disagreement, and selection errors are
    /// deterministic for a given session and are not retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_transient() || self.is_invalid_session()
    }
}
