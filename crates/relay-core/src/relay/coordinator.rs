use super::{
    consensus::{self, ConsensusReport},
    errors::RelayError,
    request::{RelayOutcome, RelayRequest},
    selection::{self, Participation},
    validation::validate_echo,
};
use crate::{
    config::Configuration,
    dispatch::{Dispatcher, DispatcherPool},
    metrics::{MetricsCollector, RelayMode},
    session::{Session, SessionCache, SessionHeader},
    transport::{
        ProofRequest, RelayMeta, RelayProof, RelaySigner, RelayTransport, SignedRelay,
        TransportError,
    },
};
use futures::future::join_all;
use std::{future::Future, sync::Arc, time::Instant};
use tracing::{debug, info, instrument, warn};

/// The session a relay attempt runs against, plus the height it was derived from.
struct AttemptContext {
    header: SessionHeader,
    session: Arc<Session>,
    block_height: u64,
}

/// Sends relays through service nodes of the current session.
///
/// The coordinator owns the session lifecycle: it derives the session header from the
/// network height, serves sessions from the [`SessionCache`], dispatches new ones on a
/// miss, and discards a session as soon as a service node rejects it. Relays are sent
/// either to one node or, in consensus mode, to several nodes whose answers are
/// compared.
pub struct RelayCoordinator {
    config: Arc<Configuration>,
    dispatchers: Arc<DispatcherPool>,
    sessions: Arc<SessionCache>,
    transport: Arc<dyn RelayTransport>,
    signer: Arc<dyn RelaySigner>,
    metrics: Arc<MetricsCollector>,
}

impl RelayCoordinator {
    /// Creates a coordinator with a fresh session cache sized from `config`.
    pub fn new(
        config: Configuration,
        dispatchers: Arc<DispatcherPool>,
        transport: Arc<dyn RelayTransport>,
        signer: Arc<dyn RelaySigner>,
    ) -> Self {
        let sessions = Arc::new(SessionCache::from_config(&config));
        Self {
            config: Arc::new(config),
            dispatchers,
            sessions,
            transport,
            signer,
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Shares an existing session cache instead of the one created by [`Self::new`].
    #[must_use]
    pub fn with_session_cache(mut self, sessions: Arc<SessionCache>) -> Self {
        self.sessions = sessions;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    #[must_use]
    pub fn dispatchers(&self) -> &Arc<DispatcherPool> {
        &self.dispatchers
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionCache> {
        &self.sessions
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Sends a relay and returns the chosen response.
    ///
    /// When a service node rejects the session as invalid, the session is evicted from
    /// the cache, a fresh one is dispatched, and the relay is retried, up to
    /// `maxSessionRefreshRetries` times.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt. An invalid-session error is returned only
    /// once the refresh budget is spent.
    #[instrument(skip_all, fields(chain = %request.chain_id, consensus = request.consensus))]
    pub async fn send_relay(&self, request: RelayRequest) -> Result<RelayOutcome, RelayError> {
        let mode = if request.consensus { RelayMode::Consensus } else { RelayMode::Single };
        let started = Instant::now();

        let result = self.relay_with_refresh(&request).await;
        match &result {
            Ok(outcome) => {
                self.metrics.record_relay_success(mode, started.elapsed());
                debug!(node = %outcome.node, session = %outcome.session, "relay succeeded");
            }
            Err(err) => {
                self.metrics.record_relay_failure(mode, err.code());
                warn!(error = %err, code = err.code().as_str(), "relay failed");
            }
        }
        result
    }

    async fn relay_with_refresh(&self, request: &RelayRequest) -> Result<RelayOutcome, RelayError> {
        if request.consensus && !self.config.consensus_available() {
            return Err(RelayError::ConsensusUnavailable);
        }

        let max_refreshes = self.config.max_session_refresh_retries();
        let mut refreshes = 0;
        loop {
            let context = self.attempt_context(request).await?;
            let result = if request.consensus {
                self.consensus_attempt(request, &context).await
            } else {
                self.single_attempt(request, &context).await
            };

            match result {
                Err(err) if err.is_invalid_session() => {
                    self.sessions.invalidate(&context.header);
                    if refreshes >= max_refreshes {
                        warn!(
                            session = %context.header,
                            refreshes,
                            "session still rejected after exhausting refresh budget"
                        );
                        return Err(err);
                    }
                    refreshes += 1;
                    self.metrics.record_session_refresh();
                    info!(
                        session = %context.header,
                        attempt = refreshes,
                        "refreshing rejected session"
                    );
                }
                other => return other,
            }
        }
    }

    /// Resolves the session for the current block height, dispatching one if needed.
    async fn attempt_context(&self, request: &RelayRequest) -> Result<AttemptContext, RelayError> {
        let block_height = self.block_height().await?;
        let header = SessionHeader::for_height(
            request.aat.application_public_key.clone(),
            request.chain_id.clone(),
            block_height,
            self.config.session_block_frequency(),
        );
        let session = self.acquire_session(&header).await?;
        Ok(AttemptContext { header, session, block_height })
    }

    /// Queries a random dispatcher for the current block height.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Pool`] if the pool is empty and [`RelayError::Dispatch`] if
    /// the dispatcher fails.
    pub async fn block_height(&self) -> Result<u64, RelayError> {
        let dispatcher = self.dispatchers.random_one()?;
        self.with_deadline(self.transport.block_height(&dispatcher, self.config.request_timeout()))
            .await
            .map_err(|source| self.dispatcher_failed(&dispatcher, source))
    }

    /// Returns the session for `header`, from cache or from a random dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Pool`] if the pool is empty and [`RelayError::Dispatch`] if
    /// the dispatcher fails.
    pub async fn acquire_session(
        &self,
        header: &SessionHeader,
    ) -> Result<Arc<Session>, RelayError> {
        if let Some(session) = self.sessions.get(header) {
            return Ok(session);
        }

        let dispatcher = self.dispatchers.random_one()?;
        let session = self
            .with_deadline(self.transport.dispatch(
                &dispatcher,
                header,
                self.config.request_timeout(),
            ))
            .await
            .map_err(|source| self.dispatcher_failed(&dispatcher, source))?;

        let session = Arc::new(session);
        self.sessions.put(header.clone(), Arc::clone(&session));
        self.metrics.record_session_dispatched();
        debug!(
            session = %header,
            dispatcher = %dispatcher,
            nodes = session.nodes().len(),
            "dispatched new session"
        );
        Ok(session)
    }

    async fn single_attempt(
        &self,
        request: &RelayRequest,
        context: &AttemptContext,
    ) -> Result<RelayOutcome, RelayError> {
        let node = match &request.node {
            Some(node) => node.clone(),
            None => selection::select_node(
                &context.session,
                &request.chain_id,
                &mut Participation::new(),
            )?,
        };

        let relay = self.sign_relay(request, context, Some(node.public_key.clone())).await?;
        let response = self
            .with_deadline(self.transport.relay(&node, &relay, self.config.request_timeout()))
            .await
            .map_err(|source| RelayError::Relay { node: node.address.clone(), source })?;

        if self.config.validate_relay_responses() {
            validate_echo(&relay.payload, &response).map_err(|reason| {
                RelayError::ResponseMismatch { node: node.address.clone(), reason }
            })?;
        }

        Ok(RelayOutcome {
            response,
            node: node.address,
            session: context.header.clone(),
            consensus: None,
        })
    }

    async fn consensus_attempt(
        &self,
        request: &RelayRequest,
        context: &AttemptContext,
    ) -> Result<RelayOutcome, RelayError> {
        let mut participation = Participation::new();
        let nodes = selection::select_nodes(
            &context.session,
            &request.chain_id,
            self.config.consensus_node_count(),
            &mut participation,
        )?;

        // One proof for the whole set; participants are distinguished by their responses.
        let relay = self.sign_relay(request, context, None).await?;
        let timeout = self.config.request_timeout();

        let results = join_all(nodes.iter().map(|node| {
            let relay = &relay;
            async move {
                let result = self.with_deadline(self.transport.relay(node, relay, timeout)).await;
                (Arc::<str>::from(node.address.as_str()), result)
            }
        }))
        .await;

        let participants: Vec<Arc<str>> =
            results.iter().map(|(node, _)| Arc::clone(node)).collect();
        let sent = self.config.validate_relay_responses().then_some(&relay.payload);
        let tally = consensus::process_results(results, sent);
        if let Some(err) = tally.invalid_session {
            return Err(err);
        }

        let decided = consensus::find_consensus(
            tally.successes,
            participants.len(),
            self.config.accept_disputed_responses(),
        )?;
        let report = ConsensusReport { participants, failures: tally.failures, ..decided.report };

        self.metrics.record_consensus(&report);
        if report.disputed {
            warn!(
                agreement = report.agreement_count,
                successful = report.successful,
                "accepting disputed consensus response"
            );
        } else if report.has_challenges() {
            info!(
                agreement = report.agreement_count,
                challenges = report.challenges.len(),
                "consensus reached with dissenting nodes"
            );
        }

        Ok(RelayOutcome {
            response: decided.response,
            node: decided.node.to_string(),
            session: context.header.clone(),
            consensus: Some(report),
        })
    }

    /// Builds and signs a relay against the attempt's session.
    async fn sign_relay(
        &self,
        request: &RelayRequest,
        context: &AttemptContext,
        servicer_public_key: Option<String>,
    ) -> Result<SignedRelay, RelayError> {
        let payload = request.payload();
        let entropy: u64 = rand::random();
        let session_block_height = context.header.session_block_height;

        let signature = self
            .signer
            .sign(&ProofRequest {
                entropy,
                session_block_height,
                session_key: context.session.key().clone(),
                servicer_public_key: servicer_public_key.clone(),
                aat: request.aat.clone(),
                payload: payload.clone(),
            })
            .await?;

        Ok(SignedRelay {
            proof: RelayProof {
                entropy,
                session_block_height,
                servicer_public_key,
                chain_id: payload.chain_id.clone(),
                aat: request.aat.clone(),
                signature,
            },
            payload,
            meta: RelayMeta { block_height: context.block_height },
        })
    }

    /// Wraps a dispatcher failure, evicting the dispatcher if it could not be reached.
    fn dispatcher_failed(&self, dispatcher: &Dispatcher, source: TransportError) -> RelayError {
        let evicted = source.is_transient() && self.dispatchers.remove_unless_last(dispatcher);
        self.metrics.record_dispatcher_failure(evicted);
        warn!(dispatcher = %dispatcher, error = %source, evicted, "dispatcher request failed");
        RelayError::Dispatch { dispatcher: dispatcher.to_string(), source }
    }

    async fn with_deadline<T>(
        &self,
        call: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        tokio::time::timeout(self.config.request_timeout(), call)
            .await
            .unwrap_or(Err(TransportError::Timeout))
    }
}

impl std::fmt::Debug for RelayCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayCoordinator")
            .field("config", &self.config)
            .field("dispatchers", &self.dispatchers.len())
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}
