//! Integration tests for refreshing sessions rejected by service nodes.
//!
//! A service node answering with the invalid-session code means the cached session is
//! stale. These tests verify that the coordinator:
//! - Evicts the stale session and dispatches exactly one replacement per rejection
//! - Retries against the replacement, up to the configured budget
//! - Surfaces the last rejection once the budget is spent

use crate::mock_infrastructure::{test_nodes, test_request, NodeReply, TestHarness};
use relay_core::{
    config::ConfigurationOptions,
    relay::ErrorCode,
    transport::{TransportError, INVALID_SESSION_CODE},
};

fn invalid_session() -> NodeReply {
    NodeReply::Error(TransportError::provider(INVALID_SESSION_CODE, "session is invalid"))
}

fn harness_with_retries(retries: u32, nodes: usize) -> TestHarness {
    let options =
        ConfigurationOptions { max_session_refresh_retries: Some(retries), ..Default::default() };
    TestHarness::new(options, 1, test_nodes(nodes))
}

#[tokio::test]
async fn test_rejected_session_is_refreshed_once() {
    let harness = harness_with_retries(3, 1);
    harness.transport.push_reply("node-0", invalid_session());

    let outcome = harness.coordinator.send_relay(test_request("{}")).await.unwrap();
    assert_eq!(outcome.response.payload.as_ref(), b"ok");

    assert_eq!(harness.transport.dispatch_calls(), 2);
    assert_eq!(harness.transport.relay_calls(), 2);
    assert_eq!(harness.coordinator.metrics().snapshot().session_refreshes, 1);
    assert_eq!(harness.coordinator.sessions().stats().invalidations, 1);

    // The retry was signed against the replacement session.
    let keys: Vec<_> = harness.signer.requests().iter().map(|r| r.session_key.clone()).collect();
    assert_eq!(keys[0].as_ref(), b"key-1");
    assert_eq!(keys[1].as_ref(), b"key-2");

    let cached = harness.coordinator.sessions().get(&outcome.session).unwrap();
    assert_eq!(cached.key().as_ref(), b"key-2");
}

#[tokio::test]
async fn test_refresh_budget_is_bounded() {
    let harness = harness_with_retries(3, 1);
    harness.transport.set_reply("node-0", invalid_session());

    let err = harness.coordinator.send_relay(test_request("{}")).await.unwrap_err();
    assert!(err.is_invalid_session());
    assert_eq!(err.code(), ErrorCode::InvalidSession);
    assert_eq!(err.provider_code(), Some(INVALID_SESSION_CODE));

    // One initial attempt plus three refreshes, each with its own dispatch.
    assert_eq!(harness.transport.relay_calls(), 4);
    assert_eq!(harness.transport.dispatch_calls(), 4);
    assert_eq!(harness.coordinator.metrics().snapshot().session_refreshes, 3);
    assert_eq!(harness.coordinator.sessions().stats().invalidations, 4);
    assert!(harness.coordinator.sessions().is_empty());
}

#[tokio::test]
async fn test_minimum_refresh_budget() {
    let harness = harness_with_retries(1, 1);
    harness.transport.set_reply("node-0", invalid_session());

    harness.coordinator.send_relay(test_request("{}")).await.unwrap_err();
    assert_eq!(harness.transport.dispatch_calls(), 2);
    assert_eq!(harness.transport.relay_calls(), 2);
}

#[tokio::test]
async fn test_refresh_requeries_block_height() {
    let harness = harness_with_retries(3, 1);
    harness.transport.push_reply("node-0", invalid_session());
    harness.transport.push_reply("node-0", invalid_session());

    harness.coordinator.send_relay(test_request("{}")).await.unwrap();
    assert_eq!(harness.transport.height_calls(), 3);
}

#[tokio::test]
async fn test_other_sessions_survive_refresh() {
    let harness = harness_with_retries(3, 1);
    harness.transport.set_height(1);
    harness.coordinator.send_relay(test_request("{}")).await.unwrap();

    harness.transport.set_height(5);
    harness.transport.push_reply("node-0", invalid_session());
    let outcome = harness.coordinator.send_relay(test_request("{}")).await.unwrap();

    let headers = harness.coordinator.sessions().headers();
    assert_eq!(headers.len(), 2);
    assert_eq!(headers[0].session_block_height, 1);
    assert_eq!(headers[1], outcome.session);
}

#[tokio::test]
async fn test_consensus_participant_rejection_refreshes_round() {
    let options = ConfigurationOptions {
        consensus_node_count: Some(3),
        max_session_refresh_retries: Some(2),
        ..Default::default()
    };
    let harness = TestHarness::new(options, 1, test_nodes(3));
    harness.transport.push_reply("node-1", invalid_session());

    let outcome =
        harness.coordinator.send_relay(test_request("{}").with_consensus(true)).await.unwrap();

    let report = outcome.consensus.unwrap();
    assert_eq!(report.agreement_count, 3);
    assert_eq!(harness.transport.dispatch_calls(), 2);
    assert_eq!(harness.transport.relay_calls(), 6);
    assert_eq!(harness.coordinator.metrics().snapshot().session_refreshes, 1);
}
