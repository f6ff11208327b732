//! Majority determination over consensus responses.
//!
//! All functions here are stateless and operate on responses already collected from
//! participants.

use super::types::{
    ChallengeRequest, ConsensusReport, ConsensusResult, ResponseGroup, SelectionMethod,
};
use crate::{relay::errors::RelayError, transport::RelayResponse};
use ahash::RandomState;
use bytes::Bytes;
use std::{collections::HashMap, sync::Arc};

/// Groups responses by byte-identical payload.
///
/// Groups are returned in order of first appearance, and nodes within a group keep
/// their input order.
#[must_use]
pub fn group_responses(responses: Vec<(Arc<str>, RelayResponse)>) -> Vec<ResponseGroup> {
    let mut index: HashMap<Bytes, usize, RandomState> =
        HashMap::with_capacity_and_hasher(responses.len(), RandomState::new());
    let mut groups: Vec<ResponseGroup> = Vec::new();

    for (node, response) in responses {
        if let Some(&position) = index.get(&response.payload) {
            let group = &mut groups[position];
            group.nodes.push(node);
            group.count += 1;
        } else {
            index.insert(response.payload.clone(), groups.len());
            groups.push(ResponseGroup {
                payload: response.payload.clone(),
                nodes: vec![node],
                count: 1,
                response,
            });
        }
    }
    groups
}

/// Decides the consensus response among successful participants.
///
/// The largest group wins when it holds a strict majority of `responses`, and every
/// other group yields one [`ChallengeRequest`] against it. Without a strict majority the
/// largest group (earliest on ties) is still returned, flagged as disputed, if
/// `accept_disputed` is set.
///
/// `participants` is the number of nodes queried, used only for reporting.
///
/// # Errors
///
/// Returns [`RelayError::ConsensusNotReached`] if there are no responses, or if there is
/// no strict majority and `accept_disputed` is not set.
pub fn find_consensus(
    responses: Vec<(Arc<str>, RelayResponse)>,
    participants: usize,
    accept_disputed: bool,
) -> Result<ConsensusResult, RelayError> {
    let successful = responses.len();
    let mut groups = group_responses(responses);
    // Stable, so equal-sized groups keep first-appearance order.
    groups.sort_by(|a, b| b.count.cmp(&a.count));

    let Some(best) = groups.first() else {
        return Err(RelayError::ConsensusNotReached { largest_group: 0, successful, participants });
    };
    let agreement_count = best.count;
    let response = best.response.clone();
    let Some(node) = best.nodes.first().cloned() else {
        return Err(RelayError::ConsensusNotReached { largest_group: 0, successful, participants });
    };

    if agreement_count * 2 > successful {
        let challenges = groups.iter().skip(1).map(|minority| challenge(best, minority)).collect();
        return Ok(ConsensusResult {
            response,
            node,
            report: ConsensusReport {
                participants: Vec::new(),
                successful,
                agreement_count,
                selection_method: SelectionMethod::Majority,
                disputed: false,
                groups,
                challenges,
                failures: Vec::new(),
            },
        });
    }

    if !accept_disputed {
        return Err(RelayError::ConsensusNotReached {
            largest_group: agreement_count,
            successful,
            participants,
        });
    }

    Ok(ConsensusResult {
        response,
        node,
        report: ConsensusReport {
            participants: Vec::new(),
            successful,
            agreement_count,
            selection_method: SelectionMethod::LargestGroup,
            disputed: true,
            groups,
            challenges: Vec::new(),
            failures: Vec::new(),
        },
    })
}

fn challenge(majority: &ResponseGroup, minority: &ResponseGroup) -> ChallengeRequest {
    let first = |group: &ResponseGroup| group.nodes.first().cloned().unwrap_or_else(|| "".into());
    ChallengeRequest {
        majority_response: majority.response.clone(),
        majority_node: first(majority),
        minority_response: minority.response.clone(),
        minority_node: first(minority),
        minority_nodes: minority.nodes.clone(),
    }
}
