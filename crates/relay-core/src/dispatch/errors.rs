use thiserror::Error;

/// Errors raised by [`DispatcherPool`](super::DispatcherPool) and dispatcher parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool was seeded with an empty list.
    #[error("dispatcher pool requires at least one dispatcher")]
    EmptySeed,

    /// The seed list is larger than the configured capacity.
    #[error("dispatcher seed of {seed} entries exceeds maxDispatchers ({capacity})")]
    SeedExceedsCapacity { seed: usize, capacity: usize },

    /// The pool holds no dispatchers to sample from.
    #[error("no dispatchers available")]
    NoDispatchersAvailable,

    /// No pooled dispatcher matches the requested address.
    #[error("dispatcher not found: {0}")]
    NotFound(String),

    /// The address could not be parsed into a dispatcher endpoint.
    #[error("invalid dispatcher address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },
}
