//! # Relay Core
//!
//! Client-side coordination for sending relays through a proof-of-stake relay network.
//!
//! An application holds an authorization token and wants to query a blockchain through
//! staked service nodes. This crate keeps track of where to ask for sessions, which
//! sessions are current, which nodes may serve a relay, and how to reconcile answers
//! when several nodes are asked the same question.
//!
//! - **[`config`]**: Validated client settings with file and environment loading.
//!
//! - **[`dispatch`]**: Bounded, deduplicated pool of bootstrap dispatchers with random
//!   sampling and FIFO eviction.
//!
//! - **[`session`]**: Session data model and a bounded FIFO session cache.
//!
//! - **[`relay`]**: The [`RelayCoordinator`], node selection, N-of-M consensus with
//!   dispute artifacts, and refresh-and-retry on rejected sessions.
//!
//! - **[`transport`]**: Collaborator contracts for network access and proof signing.
//!
//! - **[`collections`]**: The ordered queue backing the pool and the cache.
//!
//! ## Relay Flow
//!
//! ```text
//! send_relay
//!     │
//!     ▼
//! ┌─────────────────┐
//! │ Block height    │ ◄── random dispatcher
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Session header  │ ─── cache hit ──┐
//! └────────┬────────┘                 │
//!          │ miss                     │
//!          ▼                          │
//! ┌─────────────────┐                 │
//! │ Dispatch        │ ◄── random      │
//! │ (cache insert)  │     dispatcher  │
//! └────────┬────────┘                 │
//!          ◄──────────────────────────┘
//!          ▼
//!    Consensus?
//!    │        │
//!    ▼        ▼
//!  1 node   N distinct nodes ──► majority / challenges
//!    │        │
//!    └───┬────┘
//!        ▼
//!  code 1124? ─── yes ──► invalidate session, retry
//!        │ no
//!        ▼
//!     Outcome
//! ```

pub mod collections;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod metrics;
pub mod relay;
pub mod session;
pub mod transport;

pub use self::config::{ConfigError, Configuration, ConfigurationOptions};
pub use dispatch::{Dispatcher, DispatcherPool, PoolCapacity, PoolError};
pub use relay::{RelayCoordinator, RelayError, RelayOutcome, RelayRequest};
pub use session::{ServiceNode, Session, SessionCache, SessionHeader};
pub use transport::{RelaySigner, RelayTransport, TransportError};
