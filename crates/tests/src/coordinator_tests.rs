//! Integration tests for single-node relays through `RelayCoordinator`.
//!
//! Covers the session lifecycle around a relay:
//! - Block height lookup and epoch-quantized session headers
//! - Session reuse within an epoch and dispatch on a new epoch
//! - Node selection, pinning, and chain filtering
//! - Response echo validation
//! - Dispatcher failure handling

use crate::mock_infrastructure::{
    test_dispatcher, test_node, test_node_for_chains, test_nodes, test_request, NodeReply,
    TestHarness, CHAIN,
};
use relay_core::{
    config::ConfigurationOptions,
    relay::{ErrorCategory, ErrorCode, RelayError},
    session::{epoch_start, SessionHeader},
    transport::{SignerError, TransportError},
};

#[tokio::test]
async fn test_single_relay_dispatches_and_signs() {
    let harness = TestHarness::with_nodes(3);
    harness.transport.set_height(10);

    let outcome = harness.coordinator.send_relay(test_request("{\"id\":1}")).await.unwrap();

    assert_eq!(outcome.response.payload.as_ref(), b"ok");
    assert!(outcome.consensus.is_none());
    assert_eq!(outcome.session.session_block_height, epoch_start(10, 4));
    assert_eq!(harness.transport.height_calls(), 1);
    assert_eq!(harness.transport.dispatch_calls(), 1);

    let relays = harness.transport.relays();
    assert_eq!(relays.len(), 1);
    assert_eq!(relays[0].node, outcome.node);
    assert_eq!(relays[0].relay.meta.block_height, 10);
    assert_eq!(relays[0].relay.proof.session_block_height, 9);
    assert_eq!(relays[0].relay.payload.method, "POST");

    let proofs = harness.signer.requests();
    assert_eq!(proofs.len(), 1);
    assert_eq!(proofs[0].session_key.as_ref(), b"key-1");
    assert_eq!(proofs[0].servicer_public_key, Some(format!("pk-{}", outcome.node)));
    assert_eq!(relays[0].relay.proof.entropy, proofs[0].entropy);
}

#[tokio::test]
async fn test_session_reused_within_epoch() {
    let harness = TestHarness::with_nodes(2);

    for height in [5, 6, 8] {
        harness.transport.set_height(height);
        harness.coordinator.send_relay(test_request("{}")).await.unwrap();
    }
    assert_eq!(harness.transport.dispatch_calls(), 1);

    harness.transport.set_height(9);
    harness.coordinator.send_relay(test_request("{}")).await.unwrap();
    assert_eq!(harness.transport.dispatch_calls(), 2);

    let app = test_request("{}").aat.application_public_key;
    assert_eq!(
        harness.coordinator.sessions().headers(),
        vec![SessionHeader::new(app.clone(), CHAIN, 5), SessionHeader::new(app, CHAIN, 9)]
    );
}

#[tokio::test]
async fn test_pinned_node_receives_relay() {
    let harness = TestHarness::with_nodes(5);
    let pinned = test_node("node-3");

    for _ in 0..5 {
        let outcome = harness
            .coordinator
            .send_relay(test_request("{}").with_node(pinned.clone()))
            .await
            .unwrap();
        assert_eq!(outcome.node, "node-3");
    }
    assert!(harness.transport.relays().iter().all(|recorded| recorded.node == "node-3"));
}

#[tokio::test]
async fn test_only_nodes_serving_chain_are_selected() {
    let nodes = vec![
        test_node_for_chains("other-0", &["0001"]),
        test_node("node-0"),
        test_node_for_chains("other-1", &["0001"]),
    ];
    let harness = TestHarness::new(ConfigurationOptions::default(), 1, nodes);

    for _ in 0..10 {
        let outcome = harness.coordinator.send_relay(test_request("{}")).await.unwrap();
        assert_eq!(outcome.node, "node-0");
    }
}

#[tokio::test]
async fn test_no_node_serves_chain() {
    let harness = TestHarness::new(
        ConfigurationOptions::default(),
        1,
        vec![test_node_for_chains("other", &["0001"])],
    );

    let err = harness.coordinator.send_relay(test_request("{}")).await.unwrap_err();
    assert!(matches!(err, RelayError::NoEligibleNodes { .. }));
    assert_eq!(err.category(), ErrorCategory::Selection);
    assert_eq!(harness.transport.relay_calls(), 0);
}

#[tokio::test]
async fn test_echo_mismatch_rejected_when_validating() {
    let harness = TestHarness::with_nodes(1);
    harness.transport.set_reply("node-0", NodeReply::WrongEcho("0x1".into()));

    let err = harness.coordinator.send_relay(test_request("{}")).await.unwrap_err();
    assert!(matches!(err, RelayError::ResponseMismatch { ref node, .. } if node == "node-0"));
    assert_eq!(err.code(), ErrorCode::ResponseMismatch);
}

#[tokio::test]
async fn test_echo_mismatch_accepted_without_validation() {
    let options =
        ConfigurationOptions { validate_relay_responses: Some(false), ..Default::default() };
    let harness = TestHarness::new(options, 1, test_nodes(1));
    harness.transport.set_reply("node-0", NodeReply::WrongEcho("0x1".into()));

    let outcome = harness.coordinator.send_relay(test_request("{}")).await.unwrap();
    assert_eq!(outcome.response.payload.as_ref(), b"0x1");
}

#[tokio::test]
async fn test_provider_error_is_not_retried() {
    let harness = TestHarness::with_nodes(1);
    harness
        .transport
        .set_reply("node-0", NodeReply::Error(TransportError::provider(26, "chain unavailable")));

    let err = harness.coordinator.send_relay(test_request("{}")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProviderError);
    assert_eq!(err.provider_code(), Some(26));
    assert_eq!(harness.transport.relay_calls(), 1);
    assert_eq!(harness.transport.dispatch_calls(), 1);
    assert_eq!(harness.coordinator.metrics().snapshot().session_refreshes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_node_times_out() {
    let harness = TestHarness::with_nodes(1);
    harness.transport.set_reply("node-0", NodeReply::Hang);

    let err = harness.coordinator.send_relay(test_request("{}")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::RelayTimeout);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unreachable_dispatcher_is_evicted() {
    let harness = TestHarness::new(ConfigurationOptions::default(), 2, test_nodes(2));
    harness.transport.fail_dispatcher(&test_dispatcher(0));

    let mut saw_dispatch_error = false;
    for _ in 0..64 {
        match harness.coordinator.send_relay(test_request("{}")).await {
            Ok(_) => {}
            Err(err) => {
                assert_eq!(err.code(), ErrorCode::DispatchFailed);
                saw_dispatch_error = true;
            }
        }
    }

    let pool = harness.coordinator.dispatchers();
    assert!(saw_dispatch_error);
    assert_eq!(pool.all(), vec![test_dispatcher(1)]);
    assert!(harness.coordinator.metrics().snapshot().dispatcher_failures >= 1);
}

#[tokio::test]
async fn test_last_dispatcher_is_never_evicted() {
    let harness = TestHarness::with_nodes(1);
    harness.transport.fail_dispatcher(&test_dispatcher(0));

    let err = harness.coordinator.send_relay(test_request("{}")).await.unwrap_err();
    assert!(matches!(err, RelayError::Dispatch { .. }));
    assert!(err.is_transient());
    assert_eq!(harness.coordinator.dispatchers().len(), 1);
}

#[tokio::test]
async fn test_signer_failure_surfaces() {
    let harness = TestHarness::with_nodes(1);
    harness.signer.fail_with(SignerError::KeyUnavailable("locked".to_string()));

    let err = harness.coordinator.send_relay(test_request("{}")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::SignerFailed);
    assert_eq!(harness.transport.relay_calls(), 0);
}

#[tokio::test]
async fn test_metrics_count_outcomes() {
    let harness = TestHarness::with_nodes(1);
    harness.coordinator.send_relay(test_request("{}")).await.unwrap();
    harness.transport.set_reply("node-0", NodeReply::Error(TransportError::provider(1, "x")));
    harness.coordinator.send_relay(test_request("{}")).await.unwrap_err();

    let stats = harness.coordinator.metrics().snapshot();
    assert_eq!(stats.relays_succeeded, 1);
    assert_eq!(stats.relays_failed, 1);
    assert_eq!(stats.sessions_dispatched, 1);
}
