use super::{dispatcher::Dispatcher, errors::PoolError};
use crate::{collections::Queue, config::Configuration};
use metrics::{counter, gauge};
use parking_lot::RwLock;
use rand::seq::IteratorRandom;
use std::num::NonZeroUsize;
use tracing::{debug, info};

/// Capacity policy for a [`DispatcherPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolCapacity {
    /// At most this many dispatchers; adding beyond it evicts the oldest.
    Bounded(NonZeroUsize),
    /// No limit.
    Unbounded,
}

impl PoolCapacity {
    /// Returns a bounded capacity, or `Unbounded` for zero.
    #[must_use]
    pub fn from_limit(limit: usize) -> Self {
        NonZeroUsize::new(limit).map_or(Self::Unbounded, Self::Bounded)
    }

    fn limit(self) -> Option<usize> {
        match self {
            Self::Bounded(limit) => Some(limit.get()),
            Self::Unbounded => None,
        }
    }
}

/// Bounded, deduplicated pool of bootstrap endpoints.
///
/// Dispatchers are kept in insertion order. When a bounded pool is full, adding a new
/// dispatcher evicts the one added longest ago (FIFO, not LRU: sampling a dispatcher
/// does not refresh its position).
///
/// Mutations take the write lock, so add-then-evict is atomic with respect to other
/// callers. Sampling and lookups share the read lock.
pub struct DispatcherPool {
    dispatchers: RwLock<Queue<Dispatcher>>,
    capacity: PoolCapacity,
}

impl DispatcherPool {
    /// Creates a pool seeded with `seed`.
    ///
    /// Duplicate seed entries are collapsed before the capacity check.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::EmptySeed`] if `seed` is empty, or
    /// [`PoolError::SeedExceedsCapacity`] if it holds more distinct dispatchers than a
    /// bounded `capacity` allows.
    pub fn new(
        seed: impl IntoIterator<Item = Dispatcher>,
        capacity: PoolCapacity,
    ) -> Result<Self, PoolError> {
        let mut dispatchers = Queue::new();
        for dispatcher in seed {
            dispatchers.append_unique(dispatcher);
        }

        if dispatchers.is_empty() {
            return Err(PoolError::EmptySeed);
        }
        if let Some(limit) = capacity.limit() {
            if dispatchers.len() > limit {
                return Err(PoolError::SeedExceedsCapacity {
                    seed: dispatchers.len(),
                    capacity: limit,
                });
            }
        }

        debug!(count = dispatchers.len(), ?capacity, "dispatcher pool seeded");
        Ok(Self { dispatchers: RwLock::new(dispatchers), capacity })
    }

    /// Creates a pool bounded by [`Configuration::max_dispatchers`].
    ///
    /// # Errors
    ///
    /// See [`DispatcherPool::new`].
    pub fn from_config(
        seed: impl IntoIterator<Item = Dispatcher>,
        config: &Configuration,
    ) -> Result<Self, PoolError> {
        Self::new(seed, PoolCapacity::from_limit(config.max_dispatchers()))
    }

    #[must_use]
    pub fn capacity(&self) -> PoolCapacity {
        self.capacity
    }

    /// Adds a dispatcher, evicting the oldest entry if the pool overflows.
    ///
    /// Returns `false` if the dispatcher is already pooled.
    pub fn add(&self, dispatcher: Dispatcher) -> bool {
        let mut dispatchers = self.dispatchers.write();
        if !dispatchers.append_unique(dispatcher) {
            return false;
        }

        if let Some(limit) = self.capacity.limit() {
            if dispatchers.len() > limit {
                if let Some(evicted) = dispatchers.remove_head() {
                    info!(dispatcher = %evicted, limit, "evicted oldest dispatcher");
                    counter!("relay_dispatcher_evictions_total").increment(1);
                }
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let size = dispatchers.len() as f64;
        gauge!("relay_dispatchers").set(size);
        true
    }

    /// Removes the dispatcher whose host and port match `dispatcher`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove(&self, dispatcher: &Dispatcher) -> bool {
        let removed = self
            .dispatchers
            .write()
            .remove_first_where(|candidate| candidate.same_host(dispatcher));

        if let Some(removed) = &removed {
            debug!(dispatcher = %removed, "removed dispatcher");
        }
        removed.is_some()
    }

    /// Removes `dispatcher` only if at least one other dispatcher would remain.
    ///
    /// Used after transport failures so a flaky endpoint is dropped without ever
    /// emptying the pool.
    pub fn remove_unless_last(&self, dispatcher: &Dispatcher) -> bool {
        let mut dispatchers = self.dispatchers.write();
        if dispatchers.len() <= 1 {
            return false;
        }
        dispatchers.remove_first_where(|candidate| candidate.same_host(dispatcher)).is_some()
    }

    /// Returns the pooled dispatcher matching `dispatcher`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NotFound`] if no pooled dispatcher matches.
    pub fn get(&self, dispatcher: &Dispatcher) -> Result<Dispatcher, PoolError> {
        self.dispatchers
            .read()
            .iter()
            .find(|candidate| *candidate == dispatcher)
            .cloned()
            .ok_or_else(|| PoolError::NotFound(dispatcher.to_string()))
    }

    /// Samples one dispatcher uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoDispatchersAvailable`] if the pool is empty.
    pub fn random_one(&self) -> Result<Dispatcher, PoolError> {
        self.dispatchers
            .read()
            .iter()
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(PoolError::NoDispatchersAvailable)
    }

    /// Samples up to `count` distinct dispatchers uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoDispatchersAvailable`] if the pool is empty.
    pub fn random_n(&self, count: usize) -> Result<Vec<Dispatcher>, PoolError> {
        let dispatchers = self.dispatchers.read();
        if dispatchers.is_empty() {
            return Err(PoolError::NoDispatchersAvailable);
        }
        Ok(dispatchers
            .iter()
            .choose_multiple(&mut rand::thread_rng(), count)
            .into_iter()
            .cloned()
            .collect())
    }

    #[must_use]
    pub fn contains(&self, dispatcher: &Dispatcher) -> bool {
        self.dispatchers.read().contains(dispatcher)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dispatchers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dispatchers.read().is_empty()
    }

    /// Returns a snapshot of the pool, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<Dispatcher> {
        self.dispatchers.read().to_vec()
    }
}
