//! Relay metrics.
//!
//! Every event is emitted through the `metrics` facade so an embedding application can
//! install whichever recorder it likes. The collector also keeps its own atomic
//! counters, readable through [`MetricsCollector::snapshot`] with no recorder installed.

use crate::relay::{consensus::ConsensusReport, errors::ErrorCode};
use metrics::{counter, histogram};
use serde::Serialize;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Whether a relay went to one node or to a consensus set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayMode {
    Single,
    Consensus,
}

impl RelayMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Consensus => "consensus",
        }
    }
}

/// Point-in-time copy of the collector's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub relays_succeeded: u64,
    pub relays_failed: u64,
    pub sessions_dispatched: u64,
    pub session_refreshes: u64,
    pub dispatcher_failures: u64,
    pub consensus_disputes: u64,
    pub challenges: u64,
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    relays_succeeded: AtomicU64,
    relays_failed: AtomicU64,
    sessions_dispatched: AtomicU64,
    session_refreshes: AtomicU64,
    dispatcher_failures: AtomicU64,
    consensus_disputes: AtomicU64,
    challenges: AtomicU64,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_relay_success(&self, mode: RelayMode, duration: Duration) {
        self.relays_succeeded.fetch_add(1, Ordering::Relaxed);
        counter!("relay_requests_total", "mode" => mode.as_str(), "outcome" => "success")
            .increment(1);
        histogram!("relay_request_duration_seconds", "mode" => mode.as_str())
            .record(duration.as_secs_f64());
    }

    pub fn record_relay_failure(&self, mode: RelayMode, code: ErrorCode) {
        self.relays_failed.fetch_add(1, Ordering::Relaxed);
        counter!("relay_requests_total", "mode" => mode.as_str(), "outcome" => "error")
            .increment(1);
        counter!(
            "relay_errors_total",
            "code" => code.as_str(),
            "category" => code.category().as_str()
        )
        .increment(1);
    }

    pub fn record_session_dispatched(&self) {
        self.sessions_dispatched.fetch_add(1, Ordering::Relaxed);
        counter!("relay_sessions_dispatched_total").increment(1);
    }

    pub fn record_session_refresh(&self) {
        self.session_refreshes.fetch_add(1, Ordering::Relaxed);
        counter!("relay_session_refreshes_total").increment(1);
    }

    pub fn record_dispatcher_failure(&self, evicted: bool) {
        self.dispatcher_failures.fetch_add(1, Ordering::Relaxed);
        let evicted = if evicted { "true" } else { "false" };
        counter!("relay_dispatcher_failures_total", "evicted" => evicted).increment(1);
    }

    pub fn record_consensus(&self, report: &ConsensusReport) {
        let challenges = report.challenges.len() as u64;
        self.challenges.fetch_add(challenges, Ordering::Relaxed);
        counter!("relay_consensus_challenges_total").increment(challenges);
        histogram!("relay_consensus_agreement_ratio")
            .record(report.agreement_count as f64 / report.participants.len().max(1) as f64);

        if report.disputed {
            self.consensus_disputes.fetch_add(1, Ordering::Relaxed);
            counter!("relay_consensus_disputes_total").increment(1);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> RelayStats {
        RelayStats {
            relays_succeeded: self.relays_succeeded.load(Ordering::Relaxed),
            relays_failed: self.relays_failed.load(Ordering::Relaxed),
            sessions_dispatched: self.sessions_dispatched.load(Ordering::Relaxed),
            session_refreshes: self.session_refreshes.load(Ordering::Relaxed),
            dispatcher_failures: self.dispatcher_failures.load(Ordering::Relaxed),
            consensus_disputes: self.consensus_disputes.load(Ordering::Relaxed),
            challenges: self.challenges.load(Ordering::Relaxed),
        }
    }
}
