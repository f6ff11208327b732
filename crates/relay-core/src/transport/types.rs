//! Relay payloads as they travel between the coordinator, the signer, and service nodes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token authorizing a client to relay on behalf of an application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationAuthToken {
    pub version: String,
    pub application_public_key: String,
    pub client_public_key: String,
    pub signature: String,
}

/// The request half of a relay. Service nodes echo it back in their response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPayload {
    pub data: String,
    /// HTTP method for the node to use against the chain; empty selects the node's default.
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub chain_id: String,
}

/// Network state the relay was built against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMeta {
    pub block_height: u64,
}

/// Everything the signer needs to produce a proof signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRequest {
    pub entropy: u64,
    pub session_block_height: u64,
    pub session_key: Bytes,
    /// `None` for consensus relays, where one proof is shared by every participant.
    pub servicer_public_key: Option<String>,
    pub aat: ApplicationAuthToken,
    pub payload: RelayPayload,
}

/// Signed evidence that the application requested this relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayProof {
    pub entropy: u64,
    pub session_block_height: u64,
    pub servicer_public_key: Option<String>,
    pub chain_id: String,
    pub aat: ApplicationAuthToken,
    pub signature: Bytes,
}

/// A relay ready to send to a service node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRelay {
    pub payload: RelayPayload,
    pub meta: RelayMeta,
    pub proof: RelayProof,
}

/// A service node's answer to a relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    /// Opaque response body; consensus compares these bytes for equality.
    pub payload: Bytes,
    pub signature: Bytes,
    /// The request as the node received it, if the node echoed it.
    #[serde(default)]
    pub request: Option<RelayPayload>,
}

impl RelayResponse {
    pub fn new(payload: impl Into<Bytes>, request: Option<RelayPayload>) -> Self {
        Self { payload: payload.into(), signature: Bytes::new(), request }
    }
}
