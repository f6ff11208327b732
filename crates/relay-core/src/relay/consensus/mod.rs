//! N-of-M consensus over service node responses.
//!
//! A consensus relay is sent with one shared proof to several distinct nodes of the same
//! session. Responses are compared byte for byte; a strict majority of successful
//! responses wins and every disagreeing group yields a [`ChallengeRequest`].

pub mod quorum;
pub mod types;
pub mod validation;

pub use quorum::{find_consensus, group_responses};
pub use types::{
    ChallengeRequest, ConsensusReport, ConsensusResult, ParticipantFailure, ResponseGroup,
    SelectionMethod,
};
pub use validation::{process_results, Tally};
