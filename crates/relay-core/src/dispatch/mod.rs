//! Bootstrap endpoints used to discover service nodes.
//!
//! - [`dispatcher`]: the [`Dispatcher`] endpoint type and its canonical identity
//! - [`pool`]: the bounded, deduplicated [`DispatcherPool`]
//! - [`errors`]: [`PoolError`]

pub mod dispatcher;
pub mod errors;
pub mod pool;

pub use dispatcher::Dispatcher;
pub use errors::PoolError;
pub use pool::{DispatcherPool, PoolCapacity};
