//! Consensus result types and dispute artifacts.

use crate::transport::RelayResponse;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;

/// How the returned response was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// A strict majority of successful participants agreed.
    Majority,
    /// No strict majority; the largest group was accepted because disputed responses
    /// are allowed.
    LargestGroup,
}

/// Participants that returned byte-identical payloads.
#[derive(Debug, Clone)]
pub struct ResponseGroup {
    pub payload: Bytes,
    /// Addresses of the nodes in this group, in the order they were queried.
    pub nodes: Vec<Arc<str>>,
    pub count: usize,
    /// Response of the first node in the group.
    pub response: RelayResponse,
}

/// Evidence that a minority of service nodes disagreed with the majority.
///
/// Produced once per distinct minority payload, for the caller to submit to the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeRequest {
    pub majority_response: RelayResponse,
    pub majority_node: Arc<str>,
    pub minority_response: RelayResponse,
    pub minority_node: Arc<str>,
    /// Every node that returned the minority payload.
    pub minority_nodes: Vec<Arc<str>>,
}

/// A participant whose answer did not count as a vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantFailure {
    pub node: Arc<str>,
    pub reason: String,
}

/// What happened during one consensus round.
#[derive(Debug, Clone)]
pub struct ConsensusReport {
    /// Every node queried, in selection order.
    pub participants: Vec<Arc<str>>,
    /// Participants that returned a usable response.
    pub successful: usize,
    /// Size of the group whose response was returned.
    pub agreement_count: usize,
    pub selection_method: SelectionMethod,
    /// `true` when the response was accepted without a strict majority.
    pub disputed: bool,
    /// Response groups, largest first.
    pub groups: Vec<ResponseGroup>,
    pub challenges: Vec<ChallengeRequest>,
    pub failures: Vec<ParticipantFailure>,
}

impl ConsensusReport {
    #[must_use]
    pub fn has_challenges(&self) -> bool {
        !self.challenges.is_empty()
    }
}

/// The response chosen by a consensus round together with its report.
#[derive(Debug, Clone)]
pub struct ConsensusResult {
    pub response: RelayResponse,
    pub node: Arc<str>,
    pub report: ConsensusReport,
}
