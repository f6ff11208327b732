use super::consensus::ConsensusReport;
use crate::{
    session::{ServiceNode, SessionHeader},
    transport::{ApplicationAuthToken, RelayPayload, RelayResponse},
};
use std::collections::BTreeMap;

/// A relay as the caller describes it, before a session or proof is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub data: String,
    pub chain_id: String,
    pub aat: ApplicationAuthToken,
    pub headers: BTreeMap<String, String>,
    pub method: Option<String>,
    pub path: Option<String>,
    /// Pins single-node relays to this node. Ignored for consensus relays.
    pub node: Option<ServiceNode>,
    pub consensus: bool,
}

impl RelayRequest {
    pub fn new(
        data: impl Into<String>,
        chain_id: impl Into<String>,
        aat: ApplicationAuthToken,
    ) -> Self {
        Self {
            data: data.into(),
            chain_id: chain_id.into(),
            aat,
            headers: BTreeMap::new(),
            method: None,
            path: None,
            node: None,
            consensus: false,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_node(mut self, node: ServiceNode) -> Self {
        self.node = Some(node);
        self
    }

    #[must_use]
    pub fn with_consensus(mut self, consensus: bool) -> Self {
        self.consensus = consensus;
        self
    }

    /// Returns the payload sent to service nodes.
    #[must_use]
    pub fn payload(&self) -> RelayPayload {
        RelayPayload {
            data: self.data.clone(),
            method: self.method.clone().unwrap_or_default(),
            path: self.path.clone().unwrap_or_default(),
            headers: self.headers.clone(),
            chain_id: self.chain_id.clone(),
        }
    }
}

/// A successful relay.
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    pub response: RelayResponse,
    /// Address of the node whose response was returned.
    pub node: String,
    pub session: SessionHeader,
    /// Present for consensus relays.
    pub consensus: Option<ConsensusReport>,
}

impl RelayOutcome {
    /// Returns `true` if this was a consensus relay accepted without a strict majority.
    #[must_use]
    pub fn is_disputed(&self) -> bool {
        self.consensus.as_ref().is_some_and(|report| report.disputed)
    }
}
