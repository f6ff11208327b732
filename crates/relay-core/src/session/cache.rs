use super::types::{Session, SessionHeader};
use crate::{collections::Queue, config::Configuration};
use ahash::RandomState;
use metrics::counter;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tracing::{debug, info, trace};

/// Point-in-time counters for a [`SessionCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

struct Entries {
    sessions: HashMap<SessionHeader, Arc<Session>, RandomState>,
    /// Headers in first-insertion order; the head is the next eviction candidate.
    order: Queue<SessionHeader>,
}

/// Bounded cache of sessions keyed by [`SessionHeader`].
///
/// Eviction is FIFO by first insertion. Replacing an existing entry keeps its position,
/// and lookups never reorder entries. There is no TTL: a stale session is detected when
/// a service node rejects a relay, at which point the caller invalidates it.
///
/// Lookups share the read lock; `put`, `invalidate`, and `clear` take the write lock so
/// that insert-then-evict is atomic and the size bound holds under concurrent callers.
pub struct SessionCache {
    entries: RwLock<Entries>,
    capacity: NonZeroUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl SessionCache {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(Entries {
                sessions: HashMap::with_capacity_and_hasher(capacity.get(), RandomState::new()),
                order: Queue::with_capacity(capacity.get()),
            }),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Creates a cache bounded by [`Configuration::max_sessions`].
    #[must_use]
    pub fn from_config(config: &Configuration) -> Self {
        Self::new(NonZeroUsize::new(config.max_sessions()).unwrap_or(NonZeroUsize::MIN))
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Looks up the session cached for `header`.
    pub fn get(&self, header: &SessionHeader) -> Option<Arc<Session>> {
        let session = self.entries.read().sessions.get(header).cloned();

        if session.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            counter!("relay_session_cache_hits_total").increment(1);
            trace!(%header, "session cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            counter!("relay_session_cache_misses_total").increment(1);
            trace!(%header, "session cache miss");
        }
        session
    }

    /// Caches `session` under `header`.
    ///
    /// An existing entry for `header` is replaced in place without affecting eviction
    /// order. Otherwise, if the cache is full, the oldest entry is evicted first.
    ///
    /// Returns the header of the evicted entry, if any.
    pub fn put(&self, header: SessionHeader, session: Arc<Session>) -> Option<SessionHeader> {
        let mut entries = self.entries.write();

        if let Some(existing) = entries.sessions.get_mut(&header) {
            *existing = session;
            debug!(%header, "replaced cached session");
            return None;
        }

        let mut evicted = None;
        if entries.sessions.len() >= self.capacity.get() {
            if let Some(oldest) = entries.order.remove_head() {
                entries.sessions.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                counter!("relay_session_cache_evictions_total").increment(1);
                info!(header = %oldest, capacity = self.capacity.get(), "evicted oldest session");
                evicted = Some(oldest);
            }
        }

        entries.order.append(header.clone());
        entries.sessions.insert(header, session);
        evicted
    }

    /// Removes the entry for `header`.
    ///
    /// Returns `true` if an entry was removed. Invalidating an absent header is a no-op.
    pub fn invalidate(&self, header: &SessionHeader) -> bool {
        let mut entries = self.entries.write();
        if entries.sessions.remove(header).is_none() {
            return false;
        }
        entries.order.remove(header);
        drop(entries);

        self.invalidations.fetch_add(1, Ordering::Relaxed);
        counter!("relay_session_invalidations_total").increment(1);
        debug!(%header, "invalidated cached session");
        true
    }

    #[must_use]
    pub fn contains(&self, header: &SessionHeader) -> bool {
        self.entries.read().sessions.contains_key(header)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().sessions.is_empty()
    }

    /// Returns cached headers, oldest first.
    #[must_use]
    pub fn headers(&self) -> Vec<SessionHeader> {
        self.entries.read().order.to_vec()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.sessions.clear();
        entries.order.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}
