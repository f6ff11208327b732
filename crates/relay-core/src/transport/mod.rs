//! Collaborator contracts for network access and signing.
//!
//! The coordinator never talks to the network or touches key material directly. It
//! drives a [`RelayTransport`] for dispatcher and service-node calls and a
//! [`RelaySigner`] for proof signatures, so HTTP clients and keybases live outside
//! this crate.

pub mod errors;
pub mod types;

pub use errors::{SignerError, TransportError, INVALID_SESSION_CODE};
pub use types::{
    ApplicationAuthToken, ProofRequest, RelayMeta, RelayPayload, RelayProof, RelayResponse,
    SignedRelay,
};

use crate::{
    dispatch::Dispatcher,
    session::{ServiceNode, Session, SessionHeader},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Network access to dispatchers and service nodes.
///
/// Implementations should honor `timeout`; the coordinator also enforces it around each
/// call and maps expiry to [`TransportError::Timeout`].
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Asks `dispatcher` for the current network block height.
    async fn block_height(
        &self,
        dispatcher: &Dispatcher,
        timeout: Duration,
    ) -> Result<u64, TransportError>;

    /// Asks `dispatcher` for the session identified by `header`.
    async fn dispatch(
        &self,
        dispatcher: &Dispatcher,
        header: &SessionHeader,
        timeout: Duration,
    ) -> Result<Session, TransportError>;

    /// Sends a signed relay to `node`.
    async fn relay(
        &self,
        node: &ServiceNode,
        relay: &SignedRelay,
        timeout: Duration,
    ) -> Result<RelayResponse, TransportError>;
}

/// Produces proof signatures on behalf of the client.
#[async_trait]
pub trait RelaySigner: Send + Sync {
    async fn sign(&self, request: &ProofRequest) -> Result<Bytes, SignerError>;
}
