//! Scripted transport and signer for driving a `RelayCoordinator` without a network.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use relay_core::{
    dispatch::Dispatcher,
    session::{ServiceNode, Session, SessionHeader},
    transport::{
        ProofRequest, RelayResponse, RelaySigner, RelayTransport, SignedRelay, SignerError,
        TransportError,
    },
};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
    time::Duration,
};

/// How a mock service node answers one relay.
#[derive(Debug, Clone)]
pub enum NodeReply {
    /// Returns `payload` and echoes the request faithfully.
    Payload(Bytes),
    /// Returns `payload` but echoes a request with different data.
    WrongEcho(Bytes),
    /// Fails with the given error.
    Error(TransportError),
    /// Never answers.
    Hang,
}

impl NodeReply {
    pub fn payload(payload: &str) -> Self {
        Self::Payload(Bytes::copy_from_slice(payload.as_bytes()))
    }
}

#[derive(Debug, Default)]
struct NodeScript {
    queued: VecDeque<NodeReply>,
    fallback: Option<NodeReply>,
}

/// A relay as the mock received it.
#[derive(Debug, Clone)]
pub struct RecordedRelay {
    pub node: String,
    pub relay: SignedRelay,
}

/// In-memory [`RelayTransport`].
///
/// Every dispatch returns a session over the configured nodes with a fresh session key
/// (`key-1`, `key-2`, ...), so tests can tell which dispatch a relay was built against.
/// Nodes answer from a per-node script; unscripted nodes return `"ok"`.
pub struct MockTransport {
    height: AtomicU64,
    nodes: Mutex<Vec<ServiceNode>>,
    scripts: Mutex<HashMap<String, NodeScript>>,
    failing_dispatchers: Mutex<HashSet<String>>,
    height_calls: AtomicUsize,
    dispatch_calls: AtomicUsize,
    dispatched_headers: Mutex<Vec<SessionHeader>>,
    relays: Mutex<Vec<RecordedRelay>>,
}

impl MockTransport {
    pub fn new(nodes: Vec<ServiceNode>) -> Self {
        Self {
            height: AtomicU64::new(1),
            nodes: Mutex::new(nodes),
            scripts: Mutex::new(HashMap::new()),
            failing_dispatchers: Mutex::new(HashSet::new()),
            height_calls: AtomicUsize::new(0),
            dispatch_calls: AtomicUsize::new(0),
            dispatched_headers: Mutex::new(Vec::new()),
            relays: Mutex::new(Vec::new()),
        }
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    /// Queues one reply for `node`, consumed before its fallback.
    pub fn push_reply(&self, node: &str, reply: NodeReply) {
        self.scripts.lock().entry(node.to_string()).or_default().queued.push_back(reply);
    }

    /// Sets the reply `node` gives once its queue is empty.
    pub fn set_reply(&self, node: &str, reply: NodeReply) {
        self.scripts.lock().entry(node.to_string()).or_default().fallback = Some(reply);
    }

    /// Makes every call to `dispatcher` fail with a connection error.
    pub fn fail_dispatcher(&self, dispatcher: &Dispatcher) {
        self.failing_dispatchers.lock().insert(dispatcher.to_string());
    }

    #[must_use]
    pub fn height_calls(&self) -> usize {
        self.height_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn dispatch_calls(&self) -> usize {
        self.dispatch_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn dispatched_headers(&self) -> Vec<SessionHeader> {
        self.dispatched_headers.lock().clone()
    }

    #[must_use]
    pub fn relays(&self) -> Vec<RecordedRelay> {
        self.relays.lock().clone()
    }

    #[must_use]
    pub fn relay_calls(&self) -> usize {
        self.relays.lock().len()
    }

    fn check_dispatcher(&self, dispatcher: &Dispatcher) -> Result<(), TransportError> {
        if self.failing_dispatchers.lock().contains(dispatcher.as_str()) {
            return Err(TransportError::Connection(format!("{dispatcher} refused connection")));
        }
        Ok(())
    }

    fn next_reply(&self, node: &str) -> NodeReply {
        let mut scripts = self.scripts.lock();
        let Some(script) = scripts.get_mut(node) else {
            return NodeReply::payload("ok");
        };
        script
            .queued
            .pop_front()
            .or_else(|| script.fallback.clone())
            .unwrap_or_else(|| NodeReply::payload("ok"))
    }
}

#[async_trait]
impl RelayTransport for MockTransport {
    async fn block_height(
        &self,
        dispatcher: &Dispatcher,
        _timeout: Duration,
    ) -> Result<u64, TransportError> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        self.check_dispatcher(dispatcher)?;
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn dispatch(
        &self,
        dispatcher: &Dispatcher,
        header: &SessionHeader,
        _timeout: Duration,
    ) -> Result<Session, TransportError> {
        let generation = self.dispatch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.check_dispatcher(dispatcher)?;
        self.dispatched_headers.lock().push(header.clone());

        let nodes = self.nodes.lock().clone();
        Session::new(header.clone(), format!("key-{generation}").into_bytes(), nodes)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    async fn relay(
        &self,
        node: &ServiceNode,
        relay: &SignedRelay,
        _timeout: Duration,
    ) -> Result<RelayResponse, TransportError> {
        self.relays
            .lock()
            .push(RecordedRelay { node: node.address.clone(), relay: relay.clone() });

        match self.next_reply(&node.address) {
            NodeReply::Payload(payload) => {
                Ok(RelayResponse::new(payload, Some(relay.payload.clone())))
            }
            NodeReply::WrongEcho(payload) => {
                let mut echo = relay.payload.clone();
                echo.data.push_str("-tampered");
                Ok(RelayResponse::new(payload, Some(echo)))
            }
            NodeReply::Error(err) => Err(err),
            NodeReply::Hang => std::future::pending().await,
        }
    }
}

/// [`RelaySigner`] that records proof requests and signs with their entropy.
#[derive(Default)]
pub struct MockSigner {
    requests: Mutex<Vec<ProofRequest>>,
    failure: Mutex<Option<SignerError>>,
}

impl MockSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: SignerError) {
        *self.failure.lock() = Some(error);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<ProofRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RelaySigner for MockSigner {
    async fn sign(&self, request: &ProofRequest) -> Result<Bytes, SignerError> {
        self.requests.lock().push(request.clone());
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        Ok(Bytes::from(request.entropy.to_be_bytes().to_vec()))
    }
}
