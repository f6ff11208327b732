//! Service node selection within a session.

use super::errors::RelayError;
use crate::session::{ServiceNode, Session};
use ahash::RandomState;
use rand::seq::IteratorRandom;
use std::collections::HashSet;

/// Nodes already queried during one relay attempt.
///
/// Lives only for the attempt that created it, so concurrent relays sharing a cached
/// session never see each other's choices.
#[derive(Debug, Default)]
pub struct Participation {
    queried: HashSet<String, RandomState>,
}

impl Participation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `node` as queried. Returns `false` if it already was.
    pub fn mark(&mut self, node: &ServiceNode) -> bool {
        self.queried.insert(node.address.clone())
    }

    #[must_use]
    pub fn has_participated(&self, node: &ServiceNode) -> bool {
        self.queried.contains(&node.address)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queried.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queried.is_empty()
    }
}

/// Picks one node of `session` serving `chain_id` that has not yet participated,
/// uniformly at random, and marks it.
///
/// # Errors
///
/// Returns [`RelayError::NoEligibleNodes`] if no such node exists.
pub fn select_node(
    session: &Session,
    chain_id: &str,
    participation: &mut Participation,
) -> Result<ServiceNode, RelayError> {
    let node = session
        .nodes_for_chain(chain_id)
        .filter(|node| !participation.has_participated(node))
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| RelayError::NoEligibleNodes {
            session: session.header().to_string(),
            chain_id: chain_id.to_string(),
        })?;
    participation.mark(&node);
    Ok(node)
}

/// Picks `count` distinct nodes of `session` serving `chain_id` that have not yet
/// participated, uniformly at random, and marks them.
///
/// # Errors
///
/// Returns [`RelayError::InsufficientNodes`] if fewer than `count` such nodes exist.
pub fn select_nodes(
    session: &Session,
    chain_id: &str,
    count: usize,
    participation: &mut Participation,
) -> Result<Vec<ServiceNode>, RelayError> {
    let eligible: Vec<&ServiceNode> = session
        .nodes_for_chain(chain_id)
        .filter(|node| !participation.has_participated(node))
        .collect();
    if eligible.len() < count {
        return Err(RelayError::InsufficientNodes {
            chain_id: chain_id.to_string(),
            required: count,
            available: eligible.len(),
        });
    }

    let selected: Vec<ServiceNode> = eligible
        .into_iter()
        .choose_multiple(&mut rand::thread_rng(), count)
        .into_iter()
        .cloned()
        .collect();
    for node in &selected {
        participation.mark(node);
    }
    Ok(selected)
}
