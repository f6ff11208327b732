//! Session data model.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when constructing sessions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    /// A dispatcher returned a session without service nodes.
    #[error("session for {0} has no service nodes")]
    NoNodes(SessionHeader),
}

/// Returns the first block of the session epoch containing `height`.
///
/// Epochs are `frequency` blocks long and start at block 1, so with a frequency of 4
/// heights 1-4 map to 1, heights 5-8 map to 5, and so on. Height 0 maps to 0 and a
/// zero frequency leaves the height unchanged.
#[must_use]
pub fn epoch_start(height: u64, frequency: u64) -> u64 {
    if height == 0 || frequency == 0 {
        return height;
    }
    ((height - 1) / frequency) * frequency + 1
}

/// Cache key for a session: application, chain, and epoch start height.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHeader {
    pub application_public_key: String,
    pub chain_id: String,
    pub session_block_height: u64,
}

impl SessionHeader {
    pub fn new(
        application_public_key: impl Into<String>,
        chain_id: impl Into<String>,
        session_block_height: u64,
    ) -> Self {
        Self {
            application_public_key: application_public_key.into(),
            chain_id: chain_id.into(),
            session_block_height,
        }
    }

    /// Builds the header for the epoch containing the current network `height`.
    ///
    /// Every height inside one epoch yields an identical header, which is what lets
    /// repeated relays within an epoch hit the session cache.
    pub fn for_height(
        application_public_key: impl Into<String>,
        chain_id: impl Into<String>,
        height: u64,
        session_block_frequency: u64,
    ) -> Self {
        Self::new(
            application_public_key,
            chain_id,
            epoch_start(height, session_block_frequency),
        )
    }
}

impl fmt::Display for SessionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.application_public_key, self.chain_id, self.session_block_height
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingStatus {
    Unstaked,
    Unstaking,
    #[default]
    Staked,
}

/// A provider that serves relays for one or more chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNode {
    pub address: String,
    pub public_key: String,
    #[serde(default)]
    pub jailed: bool,
    #[serde(default)]
    pub staking_status: StakingStatus,
    #[serde(default)]
    pub staked_tokens: u64,
    pub service_url: String,
    pub chains: Vec<String>,
    #[serde(default)]
    pub unstaking_completion_time: Option<String>,
}

impl ServiceNode {
    #[must_use]
    pub fn supports_chain(&self, chain_id: &str) -> bool {
        self.chains.iter().any(|chain| chain == chain_id)
    }
}

/// Provider set handed out by a dispatcher for one [`SessionHeader`].
///
/// Sessions are immutable. A refresh produces a new `Session` that replaces the cached
/// one wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    header: SessionHeader,
    key: Bytes,
    nodes: Vec<ServiceNode>,
}

impl Session {
    /// Creates a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoNodes`] if `nodes` is empty; such a session can never
    /// serve a relay and must not be cached.
    pub fn new(
        header: SessionHeader,
        key: impl Into<Bytes>,
        nodes: Vec<ServiceNode>,
    ) -> Result<Self, SessionError> {
        if nodes.is_empty() {
            return Err(SessionError::NoNodes(header));
        }
        Ok(Self { header, key: key.into(), nodes })
    }

    #[must_use]
    pub fn header(&self) -> &SessionHeader {
        &self.header
    }

    #[must_use]
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    #[must_use]
    pub fn nodes(&self) -> &[ServiceNode] {
        &self.nodes
    }

    /// Iterates over the nodes serving `chain_id`, in session order.
    pub fn nodes_for_chain<'a>(
        &'a self,
        chain_id: &'a str,
    ) -> impl Iterator<Item = &'a ServiceNode> + 'a {
        self.nodes.iter().filter(move |node| node.supports_chain(chain_id))
    }
}
