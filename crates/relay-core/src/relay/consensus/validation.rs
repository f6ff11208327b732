//! Sorting participant results into votes and failures.

use super::types::ParticipantFailure;
use crate::{
    relay::{errors::RelayError, validation::validate_echo},
    transport::{RelayPayload, RelayResponse, TransportError},
};
use std::sync::Arc;
use tracing::warn;

/// Participant results split by whether they count as a vote.
#[derive(Debug, Default)]
pub struct Tally {
    pub successes: Vec<(Arc<str>, RelayResponse)>,
    pub failures: Vec<ParticipantFailure>,
    /// Set when any participant rejected the session; the whole round is void.
    pub invalid_session: Option<RelayError>,
}

/// Splits consensus results into votes and failures.
///
/// When `sent` is given, responses that do not echo it are recorded as failures rather
/// than votes.
#[must_use]
pub fn process_results(
    results: Vec<(Arc<str>, Result<RelayResponse, TransportError>)>,
    sent: Option<&RelayPayload>,
) -> Tally {
    let mut tally = Tally {
        successes: Vec::with_capacity(results.len()),
        failures: Vec::new(),
        invalid_session: None,
    };

    for (node, result) in results {
        match result {
            Ok(response) => {
                if let Some(reason) = sent.and_then(|sent| validate_echo(sent, &response).err()) {
                    warn!(node = %node, %reason, "discarding consensus response");
                    tally.failures.push(ParticipantFailure { node, reason });
                } else {
                    tally.successes.push((node, response));
                }
            }
            Err(source) if source.is_invalid_session() => {
                warn!(node = %node, error = %source, "consensus participant rejected session");
                tally.failures.push(ParticipantFailure {
                    node: Arc::clone(&node),
                    reason: source.to_string(),
                });
                if tally.invalid_session.is_none() {
                    tally.invalid_session = Some(RelayError::Relay { node: node.to_string(), source });
                }
            }
            Err(source) => {
                warn!(node = %node, error = %source, "consensus participant failed");
                tally.failures.push(ParticipantFailure { node, reason: source.to_string() });
            }
        }
    }
    tally
}
